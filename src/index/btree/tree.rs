//! The B+Tree handle: open/close, descent and node helpers.
//!
//! Mutating algorithms live in sibling modules as further `impl BPlusTree`
//! blocks: [`insert`](super::insert), [`delete`](super::delete) and the
//! diagnostics in [`debug`](super::debug).

use std::path::Path;

use tracing::info;

use crate::buffer::Pager;
use crate::common::config::StoreConfig;
use crate::common::{Error, PageId, Result};
use crate::record::ROW_SIZE;
use crate::storage::page::{NodeType, Page};

use super::node::{node_type_of, ChildSlot, InternalNode, LeafNode};

/// A cell address: leaf page plus slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub page: PageId,
    pub cell: usize,
}

/// A disk-backed B+Tree keyed by `u32`, storing fixed-width rows.
///
/// The tree owns its [`Pager`]; every node is addressed by page number and
/// borrowed from the pager only for the duration of one access.
///
/// # Example
/// ```no_run
/// use stratadb::index::btree::BPlusTree;
/// use stratadb::record::Row;
///
/// let mut tree = BPlusTree::open("my.db")?;
/// let row = Row::new(1, "alice", "alice@example.com")?;
/// tree.insert(1, &row.serialize())?;
/// assert!(tree.get(1)?.is_some());
/// tree.close()?;
/// # Ok::<(), stratadb::Error>(())
/// ```
pub struct BPlusTree {
    pub(crate) pager: Pager,
}

impl BPlusTree {
    /// Open or create a tree with the default [`StoreConfig`].
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_config(path, StoreConfig::default())
    }

    /// Open or create a tree.
    ///
    /// A new file gets an empty root leaf on page 1.
    ///
    /// # Errors
    /// Everything [`Pager::open`] reports, plus `Error::InvalidRoot` if the
    /// persisted root is not an allocated root node.
    pub fn open_with_config<P: AsRef<Path>>(path: P, config: StoreConfig) -> Result<Self> {
        let mut pager = Pager::open(path, config)?;

        if pager.is_fresh() {
            let root = pager.allocate()?;
            let mut leaf = LeafNode::init(root, pager.get_mut(root)?);
            leaf.page_mut().set_root(true);
            pager.set_root(root);
            info!(root = root.0, "initialized empty tree");
        } else {
            let root = pager.root();
            if !pager.is_allocated(root) {
                return Err(Error::InvalidRoot(root.0));
            }
            let page = pager.get(root)?;
            node_type_of(root, page)?;
            if !page.is_root() || page.parent().is_some() {
                return Err(Error::corrupt_node(root, "persisted root is not marked root"));
            }
        }

        Ok(Self { pager })
    }

    /// Flush every resident page and release the file.
    pub fn close(self) -> Result<()> {
        self.pager.close()
    }

    /// Current root page.
    #[inline]
    pub fn root(&self) -> PageId {
        self.pager.root()
    }

    #[inline]
    pub fn pager(&self) -> &Pager {
        &self.pager
    }

    // ========================================================================
    // Search
    // ========================================================================

    /// Descend from the root to the leaf slot where `key` is or would be.
    ///
    /// The slot holds the first key `>= key`, possibly one past the last cell.
    pub fn locate(&mut self, key: u32) -> Result<Position> {
        let mut page_id = self.root();
        for _ in 0..self.pager.max_pages() {
            match self.node_type(page_id)? {
                NodeType::Leaf => {
                    let cell = self.leaf(page_id)?.search(key);
                    return Ok(Position {
                        page: page_id,
                        cell,
                    });
                }
                NodeType::Internal => {
                    let node = self.internal(page_id)?;
                    page_id = node.child(node.find_child_index(key))?;
                }
            }
        }
        Err(Error::corrupt_node(page_id, "descent does not terminate"))
    }

    /// Row bytes stored under `key`, if any.
    pub fn get(&mut self, key: u32) -> Result<Option<[u8; ROW_SIZE]>> {
        let pos = self.locate(key)?;
        let leaf = self.leaf(pos.page)?;
        if pos.cell < leaf.num_cells() && leaf.key(pos.cell) == key {
            Ok(Some(leaf.cell(pos.cell).value))
        } else {
            Ok(None)
        }
    }

    pub fn contains(&mut self, key: u32) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// The leftmost leaf.
    pub fn first_leaf(&mut self) -> Result<PageId> {
        let mut page_id = self.root();
        for _ in 0..self.pager.max_pages() {
            match self.node_type(page_id)? {
                NodeType::Leaf => return Ok(page_id),
                NodeType::Internal => page_id = self.internal(page_id)?.child(0)?,
            }
        }
        Err(Error::corrupt_node(page_id, "descent does not terminate"))
    }

    /// Number of levels; a lone root leaf is height 1.
    pub fn height(&mut self) -> Result<usize> {
        let mut page_id = self.root();
        let mut height = 1;
        while self.node_type(page_id)? == NodeType::Internal {
            page_id = self.internal(page_id)?.child(0)?;
            height += 1;
            if height > self.pager.max_pages() {
                return Err(Error::corrupt_node(page_id, "descent does not terminate"));
            }
        }
        Ok(height)
    }

    // ========================================================================
    // Node helpers
    // ========================================================================

    pub(crate) fn node_type(&mut self, page_id: PageId) -> Result<NodeType> {
        node_type_of(page_id, self.pager.get(page_id)?)
    }

    pub(crate) fn leaf(&mut self, page_id: PageId) -> Result<LeafNode<&Page>> {
        LeafNode::new(page_id, self.pager.get(page_id)?)
    }

    pub(crate) fn leaf_mut(&mut self, page_id: PageId) -> Result<LeafNode<&mut Page>> {
        LeafNode::new(page_id, self.pager.get_mut(page_id)?)
    }

    pub(crate) fn internal(&mut self, page_id: PageId) -> Result<InternalNode<&Page>> {
        InternalNode::new(page_id, self.pager.get(page_id)?)
    }

    pub(crate) fn internal_mut(&mut self, page_id: PageId) -> Result<InternalNode<&mut Page>> {
        InternalNode::new(page_id, self.pager.get_mut(page_id)?)
    }

    pub(crate) fn parent_of(&mut self, page_id: PageId) -> Result<PageId> {
        self.pager
            .get(page_id)?
            .parent()
            .ok_or_else(|| Error::corrupt_node(page_id, "non-root node has no parent"))
    }

    pub(crate) fn set_parent(&mut self, child: PageId, parent: PageId) -> Result<()> {
        self.pager.get_mut(child)?.set_parent(Some(parent));
        Ok(())
    }

    /// Where `child` hangs off `parent`.
    pub(crate) fn slot_in_parent(&mut self, parent: PageId, child: PageId) -> Result<ChildSlot> {
        self.internal(parent)?.slot_of(child).ok_or_else(|| {
            Error::corrupt_node(parent, format!("{} is not a child", child))
        })
    }

    /// Largest key under `page_id`: a leaf's last key, or for an internal
    /// node the maximum of its right child's subtree.
    pub fn max_key(&mut self, page_id: PageId) -> Result<Option<u32>> {
        let mut page_id = page_id;
        for _ in 0..self.pager.max_pages() {
            match self.node_type(page_id)? {
                NodeType::Leaf => return Ok(self.leaf(page_id)?.max_key()),
                NodeType::Internal => {
                    page_id = self
                        .internal(page_id)?
                        .right_child()
                        .ok_or_else(|| Error::corrupt_node(page_id, "missing right child"))?;
                }
            }
        }
        Err(Error::corrupt_node(page_id, "descent does not terminate"))
    }

    /// Like [`BPlusTree::max_key`], failing on an empty subtree.
    pub(crate) fn required_max_key(&mut self, page_id: PageId) -> Result<u32> {
        self.max_key(page_id)?
            .ok_or_else(|| Error::corrupt_node(page_id, "subtree is empty"))
    }
}
