//! Common types and utilities shared across StrataDB.
//!
//! This module contains fundamental primitives used throughout the codebase:
//! - Configuration constants and [`StoreConfig`](config::StoreConfig)
//! - Error types
//! - Page identifiers

pub mod config;
pub mod error;
mod page_id;

pub use error::{Error, Result};
pub use page_id::PageId;
