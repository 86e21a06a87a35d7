//! Table - row-level access to the B+Tree.
//!
//! A [`Table`] keys each [`Row`] by its id and exposes the record command
//! surface: insert, select (all, one, range), delete and update.

use std::path::Path;

use tracing::debug;

use crate::common::config::StoreConfig;
use crate::common::{Error, Result};
use crate::index::btree::{BPlusTree, Cursor};
use crate::record::Row;

/// One table of `(id, username, email)` rows stored in one file.
///
/// # Example
/// ```no_run
/// use stratadb::{Row, Table};
///
/// let mut table = Table::open("users.db")?;
/// table.insert(&Row::new(1, "alice", "alice@example.com")?)?;
/// assert_eq!(table.select_all()?.len(), 1);
/// table.close()?;
/// # Ok::<(), stratadb::Error>(())
/// ```
pub struct Table {
    tree: BPlusTree,
}

impl Table {
    /// Open or create a table with the default configuration.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_config(path, StoreConfig::default())
    }

    pub fn open_with_config<P: AsRef<Path>>(path: P, config: StoreConfig) -> Result<Self> {
        Ok(Self {
            tree: BPlusTree::open_with_config(path, config)?,
        })
    }

    /// Persist every page and release the file.
    pub fn close(self) -> Result<()> {
        self.tree.close()
    }

    /// # Errors
    /// Returns `Error::DuplicateKey` if a row with the same id exists.
    pub fn insert(&mut self, row: &Row) -> Result<()> {
        self.tree.insert(row.id, &row.serialize())
    }

    /// Every row in ascending id order.
    pub fn select_all(&mut self) -> Result<Vec<Row>> {
        Cursor::start(&mut self.tree)?.collect()
    }

    /// The row with `id`.
    ///
    /// # Errors
    /// Returns `Error::KeyNotFound` if there is none.
    pub fn select_one(&mut self, id: u32) -> Result<Row> {
        self.tree
            .get(id)?
            .map(|bytes| Row::deserialize(&bytes))
            .ok_or(Error::KeyNotFound(id))
    }

    /// Rows with `start <= id <= end`, ascending.
    pub fn select_range(&mut self, start: u32, end: u32) -> Result<Vec<Row>> {
        let mut rows = Vec::new();
        if start > end {
            return Ok(rows);
        }
        for row in Cursor::seek(&mut self.tree, start)? {
            let row = row?;
            if row.id > end {
                break;
            }
            rows.push(row);
        }
        Ok(rows)
    }

    /// # Errors
    /// Returns `Error::KeyNotFound` if there is no row with `id`.
    pub fn delete(&mut self, id: u32) -> Result<()> {
        self.tree.delete(id)
    }

    /// Replace the row `old_id` with `row`, which may carry a new id.
    ///
    /// Runs as a delete followed by an insert. Both keys and the free page
    /// count are checked first, so any of the errors below leaves the table
    /// untouched. A delete never grows the tree, so the insert cannot run
    /// out of pages once the check has passed.
    ///
    /// # Errors
    /// - `Error::KeyNotFound` if `old_id` is absent
    /// - `Error::DuplicateKey` if `row.id` differs from `old_id` and exists
    /// - `Error::StoreFull` if the insert could need more pages than are free
    pub fn update(&mut self, old_id: u32, row: &Row) -> Result<()> {
        if !self.tree.contains(old_id)? {
            return Err(Error::KeyNotFound(old_id));
        }
        if row.id != old_id && self.tree.contains(row.id)? {
            return Err(Error::DuplicateKey(row.id));
        }
        self.tree.ensure_split_capacity()?;
        self.tree.delete(old_id)?;
        self.tree.insert(row.id, &row.serialize())?;
        debug!(old_id, new_id = row.id, "updated row");
        Ok(())
    }

    /// The underlying tree, for diagnostics.
    pub fn tree(&mut self) -> &mut BPlusTree {
        &mut self.tree
    }
}
