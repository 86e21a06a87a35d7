//! Index structures.
//!
//! - [`btree`] - The disk-backed B+Tree that stores every row

pub mod btree;
