//! StrataDB - a single-file, disk-backed B+Tree key-value store.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                            StrataDB                             │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │            Command Layer (execution/)                    │   │
//! │  │        Statement / MetaCommand → execute                 │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │        Table (table.rs) + Row codec (record/)            │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │              Index Layer (index/btree/)                  │   │
//! │  │   BPlusTree: search, split, borrow, merge, collapse      │   │
//! │  │   Node codec (LeafNode / InternalNode) + Cursor          │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │              Page Store (buffer/)                        │   │
//! │  │     Pager: slot per page, bitmap allocator, flush        │   │
//! │  │     MetaPage (page 0) + PagerStats                       │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │           Storage Layer (storage/)                       │   │
//! │  │        DiskManager + Page + NodeHeader                   │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//! - [`common`] - Shared primitives (PageId, Error, config)
//! - [`storage`] - Disk I/O and page formats
//! - [`buffer`] - The page store
//! - [`index`] - The B+Tree
//! - [`record`] - Row schema and encoding
//! - [`table`] - Row-level facade
//! - [`execution`] - Command parsing and execution
//!
//! # Durability
//! Pages are changed in memory only. [`Table::close`] writes every resident
//! page and syncs the file; a session that ends without it loses its writes.
//!
//! # Quick Start
//! ```no_run
//! use stratadb::{Row, Table};
//!
//! let mut table = Table::open("my_database.db")?;
//! table.insert(&Row::new(1, "alice", "alice@example.com")?)?;
//! for row in table.select_all()? {
//!     println!("{}", row);
//! }
//! table.close()?;
//! # Ok::<(), stratadb::Error>(())
//! ```

pub mod buffer;
pub mod common;
pub mod execution;
pub mod index;
pub mod record;
pub mod storage;
pub mod table;

// Re-export commonly used items at crate root for convenience
pub use common::config::{StoreConfig, PAGE_SIZE};
pub use common::{Error, PageId, Result};

pub use buffer::{Pager, PagerStats, StatsSnapshot};
pub use index::btree::{BPlusTree, Cursor};
pub use record::Row;
pub use storage::page::{NodeHeader, NodeType, Page};
pub use storage::DiskManager;
pub use table::Table;
