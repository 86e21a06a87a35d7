//! Page store.
//!
//! The pager is the in-memory layer between the B+Tree and the database
//! file. It keeps one slot per page number and never evicts.
//!
//! # Components
//! - [`Pager`] - Page cache, allocator and flush point
//! - [`MetaPage`] - Page 0: root pointer and in-use bitmap
//! - [`PagerStats`] - Counters for cache hits, I/O and allocation

mod meta;
mod pager;
mod stats;

pub use meta::MetaPage;
pub use pager::Pager;
pub use stats::{PagerStats, StatsSnapshot};
