//! Command layer - parsing and executing record commands.
//!
//! # Components
//! - [`Statement`] / [`MetaCommand`] - Typed commands parsed from text
//! - [`execute`] / [`execute_meta`] - Run them against a [`Table`](crate::Table)

mod executor;
mod statement;

pub use executor::{execute, execute_meta, ExecuteOutcome, MetaOutcome};
pub use statement::{MetaCommand, Statement};
