//! B+Tree index over fixed-width rows.
//!
//! # Structure
//! - Leaves hold `(key, row)` cells in ascending key order.
//! - Internal nodes hold `(child, key)` cells plus a right child; each key
//!   is the maximum key in its child's subtree.
//! - Every level is a doubly linked list through the node headers, so a
//!   full scan walks the leaf level left to right.
//!
//! # Modules
//! - [`node`] - Typed views over leaf and internal pages
//! - `tree` - [`BPlusTree`] handle and root-to-leaf descent
//! - `insert` / `delete` - Split, borrow, merge and root changes
//! - [`Cursor`] - Ordered iteration over the leaf level
//! - `debug` - `verify`, `dump_tree` and `constants`

mod cursor;
mod debug;
mod delete;
mod insert;
pub mod node;
mod tree;

pub use cursor::Cursor;
pub use insert::{LEAF_NODE_LEFT_SPLIT_COUNT, LEAF_NODE_RIGHT_SPLIT_COUNT};
pub use tree::{BPlusTree, Position};
