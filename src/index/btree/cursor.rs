//! Cursor - a position in the leaf level.

use crate::common::{Error, PageId, Result};
use crate::record::Row;

use super::tree::BPlusTree;

/// A forward-only position over the leaf level, in ascending key order.
///
/// The cursor holds page numbers, never page references, and borrows the
/// tree mutably for its whole life so nodes cannot change under it.
///
/// # Example
/// ```no_run
/// use stratadb::index::btree::{BPlusTree, Cursor};
///
/// let mut tree = BPlusTree::open("my.db")?;
/// let mut cursor = Cursor::start(&mut tree)?;
/// while !cursor.is_end() {
///     println!("{}", cursor.row()?);
///     cursor.advance()?;
/// }
/// # Ok::<(), stratadb::Error>(())
/// ```
pub struct Cursor<'a> {
    tree: &'a mut BPlusTree,
    page: PageId,
    cell: usize,
    end_of_table: bool,
}

impl<'a> Cursor<'a> {
    /// Position at the smallest key.
    pub fn start(tree: &'a mut BPlusTree) -> Result<Self> {
        let page = tree.first_leaf()?;
        let mut cursor = Self {
            tree,
            page,
            cell: 0,
            end_of_table: false,
        };
        cursor.settle()?;
        Ok(cursor)
    }

    /// Position at the first key `>= key`.
    pub fn seek(tree: &'a mut BPlusTree, key: u32) -> Result<Self> {
        let pos = tree.locate(key)?;
        let mut cursor = Self {
            tree,
            page: pos.page,
            cell: pos.cell,
            end_of_table: false,
        };
        cursor.settle()?;
        Ok(cursor)
    }

    /// Whether the cursor has run past the last key.
    #[inline]
    pub fn is_end(&self) -> bool {
        self.end_of_table
    }

    /// Current (page, slot).
    #[inline]
    pub fn position(&self) -> (PageId, usize) {
        (self.page, self.cell)
    }

    /// Key at the cursor.
    ///
    /// # Errors
    /// Returns `Error::EndOfTable` once the cursor is exhausted.
    pub fn key(&mut self) -> Result<u32> {
        if self.end_of_table {
            return Err(Error::EndOfTable);
        }
        Ok(self.tree.leaf(self.page)?.key(self.cell))
    }

    /// Row bytes at the cursor.
    ///
    /// # Errors
    /// Returns `Error::EndOfTable` once the cursor is exhausted.
    pub fn value(&mut self) -> Result<&[u8]> {
        if self.end_of_table {
            return Err(Error::EndOfTable);
        }
        Ok(self.tree.leaf(self.page)?.into_value(self.cell))
    }

    /// Decoded row at the cursor.
    pub fn row(&mut self) -> Result<Row> {
        Ok(Row::deserialize(self.value()?))
    }

    /// Step to the next key, following the leaf sibling chain.
    pub fn advance(&mut self) -> Result<()> {
        if self.end_of_table {
            return Ok(());
        }
        self.cell += 1;
        self.settle()
    }

    /// Move forward until the cursor names a real cell or the end.
    fn settle(&mut self) -> Result<()> {
        loop {
            let (count, next) = {
                let leaf = self.tree.leaf(self.page)?;
                (leaf.num_cells(), leaf.page().next_sibling())
            };
            if self.cell < count {
                return Ok(());
            }
            match next {
                Some(next) => {
                    self.page = next;
                    self.cell = 0;
                }
                None => {
                    self.end_of_table = true;
                    return Ok(());
                }
            }
        }
    }
}

impl Iterator for Cursor<'_> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.end_of_table {
            return None;
        }
        let row = self.row().and_then(|row| self.advance().map(|()| row));
        if row.is_err() {
            self.end_of_table = true;
        }
        Some(row)
    }
}
