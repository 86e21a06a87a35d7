//! Insert path: leaf insert, leaf and internal splits, root creation.

use tracing::debug;

use crate::common::config::LEAF_NODE_MAX_CELLS;
use crate::common::{Error, PageId, Result};
use crate::record::ROW_SIZE;
use crate::storage::page::NodeType;

use super::node::{ChildSlot, InternalCell, InternalNode, LeafCell, LeafNode};
use super::tree::{BPlusTree, Position};

/// Cells kept in the left (existing) leaf when a full leaf splits.
pub const LEAF_NODE_LEFT_SPLIT_COUNT: usize = (LEAF_NODE_MAX_CELLS + 2) / 2;
/// Cells moved to the new leaf.
pub const LEAF_NODE_RIGHT_SPLIT_COUNT: usize = LEAF_NODE_MAX_CELLS + 1 - LEAF_NODE_LEFT_SPLIT_COUNT;

impl BPlusTree {
    /// Insert a row under `key`.
    ///
    /// # Errors
    /// - `Error::DuplicateKey` if `key` is present (nothing is modified)
    /// - `Error::StoreFull` if a split would need more pages than are free
    ///   (nothing is modified)
    pub fn insert(&mut self, key: u32, value: &[u8; ROW_SIZE]) -> Result<()> {
        let pos = self.locate(key)?;
        let is_full = {
            let leaf = self.leaf(pos.page)?;
            if pos.cell < leaf.num_cells() && leaf.key(pos.cell) == key {
                return Err(Error::DuplicateKey(key));
            }
            leaf.is_full()
        };

        if !is_full {
            self.leaf_mut(pos.page)?.insert_cell(pos.cell, key, value);
            return Ok(());
        }

        self.ensure_split_capacity()?;
        self.split_leaf_and_insert(pos, key, value)
    }

    /// Fail with `Error::StoreFull` unless a split reaching the root could
    /// allocate every page it needs.
    ///
    /// A split allocates at most one page per level plus a new root.
    pub(crate) fn ensure_split_capacity(&mut self) -> Result<()> {
        let needed = self.height()? + 1;
        if self.pager.free_count() < needed {
            return Err(Error::StoreFull {
                max: self.pager.max_pages(),
            });
        }
        Ok(())
    }

    /// Split a full leaf around a new cell.
    ///
    /// The left `LEAF_NODE_LEFT_SPLIT_COUNT` cells of the combined sequence
    /// stay in place; the rest move to a new leaf linked right after it.
    fn split_leaf_and_insert(&mut self, pos: Position, key: u32, value: &[u8; ROW_SIZE]) -> Result<()> {
        let old = pos.page;
        let (mut cells, parent, next, was_root) = {
            let leaf = self.leaf(old)?;
            let page = leaf.page();
            (leaf.cells(), page.parent(), page.next_sibling(), page.is_root())
        };
        cells.insert(pos.cell, LeafCell { key, value: *value });
        let right_cells = cells.split_off(LEAF_NODE_LEFT_SPLIT_COUNT);
        debug_assert_eq!(right_cells.len(), LEAF_NODE_RIGHT_SPLIT_COUNT);

        let new = self.pager.allocate()?;
        {
            let mut right = LeafNode::init(new, self.pager.get_mut(new)?);
            right.set_cells(&right_cells);
            let page = right.page_mut();
            page.set_parent(parent);
            page.set_prev_sibling(Some(old));
            page.set_next_sibling(next);
        }
        if let Some(next) = next {
            self.pager.get_mut(next)?.set_prev_sibling(Some(new));
        }
        {
            let mut left = self.leaf_mut(old)?;
            left.set_cells(&cells);
            left.page_mut().set_next_sibling(Some(new));
        }
        debug!(left = old.0, right = new.0, key, "split leaf");

        if was_root {
            self.create_new_root(new)
        } else {
            self.insert_into_parent(old, new)
        }
    }

    /// After `left` split off `new`, fix `left`'s separator and hang `new`
    /// off the same parent.
    fn insert_into_parent(&mut self, left: PageId, new: PageId) -> Result<()> {
        let parent = self.parent_of(left)?;
        let left_max = self.required_max_key(left)?;
        if let ChildSlot::Cell(index) = self.slot_in_parent(parent, left)? {
            self.internal_mut(parent)?.set_key(index, left_max);
        }
        self.insert_child(parent, new)
    }

    /// Add `child` to internal node `parent`, splitting it if full.
    fn insert_child(&mut self, parent: PageId, child: PageId) -> Result<()> {
        if self.internal(parent)?.is_full() {
            return self.split_internal_and_insert(parent, child);
        }

        let child_max = self.required_max_key(child)?;
        let right = self.internal(parent)?.right_child();
        match right {
            None => self.internal_mut(parent)?.set_right_child(child),
            Some(right) => {
                let right_max = self.required_max_key(right)?;
                let mut node = self.internal_mut(parent)?;
                if child_max > right_max {
                    let end = node.num_keys();
                    node.insert_cell(end, InternalCell { child: right, key: right_max });
                    node.set_right_child(child);
                } else {
                    let index = node.find_child_index(child_max);
                    node.insert_cell(index, InternalCell { child, key: child_max });
                }
            }
        }
        self.set_parent(child, parent)
    }

    /// Split a full internal node while adding `child`.
    ///
    /// All children (the right child included) plus the new one are laid
    /// out in key order. The existing node keeps the lower half, its last
    /// child becoming the right child; a new sibling takes the upper half.
    fn split_internal_and_insert(&mut self, node: PageId, child: PageId) -> Result<()> {
        let child_max = self.required_max_key(child)?;
        let (cells, right, parent, next, was_root) = {
            let n = self.internal(node)?;
            let page = n.page();
            (
                n.cells(),
                n.right_child()
                    .ok_or_else(|| Error::corrupt_node(node, "missing right child"))?,
                page.parent(),
                page.next_sibling(),
                page.is_root(),
            )
        };
        let right_max = self.required_max_key(right)?;

        let mut entries = cells;
        entries.push(InternalCell { child: right, key: right_max });
        let at = entries
            .iter()
            .position(|e| e.key > child_max)
            .unwrap_or(entries.len());
        entries.insert(at, InternalCell { child, key: child_max });

        let upper = entries.split_off((entries.len() + 1) / 2);
        let (lower_cells, lower_right) = split_right(node, &entries)?;
        let (upper_cells, upper_right) = split_right(node, &upper)?;

        let new = self.pager.allocate()?;
        {
            let mut sibling = InternalNode::init(new, self.pager.get_mut(new)?);
            sibling.set_cells(upper_cells, upper_right);
            let page = sibling.page_mut();
            page.set_parent(parent);
            page.set_prev_sibling(Some(node));
            page.set_next_sibling(next);
        }
        if let Some(next) = next {
            self.pager.get_mut(next)?.set_prev_sibling(Some(new));
        }
        {
            let mut n = self.internal_mut(node)?;
            n.set_cells(lower_cells, lower_right);
            n.page_mut().set_next_sibling(Some(new));
        }

        for entry in &entries {
            self.set_parent(entry.child, node)?;
        }
        for entry in &upper {
            self.set_parent(entry.child, new)?;
        }
        debug!(left = node.0, right = new.0, "split internal node");

        if was_root {
            self.create_new_root(new)
        } else {
            self.insert_into_parent(node, new)
        }
    }

    /// Grow the tree by one level after the root split off `right`.
    ///
    /// The root's contents move to a fresh page that becomes the left
    /// child; the root page is rewritten in place as an internal node over
    /// the two halves, so its page number never changes here.
    fn create_new_root(&mut self, right: PageId) -> Result<()> {
        let root = self.root();
        let left = self.pager.allocate()?;
        self.pager.copy_page(root, left)?;
        {
            let page = self.pager.get_mut(left)?;
            page.set_root(false);
            page.set_parent(Some(root));
            page.set_prev_sibling(None);
            page.set_next_sibling(Some(right));
        }
        if self.node_type(left)? == NodeType::Internal {
            let grandchildren = self.internal(left)?.children()?;
            for grandchild in grandchildren {
                self.set_parent(grandchild, left)?;
            }
        }
        {
            let page = self.pager.get_mut(right)?;
            page.set_parent(Some(root));
            page.set_prev_sibling(Some(left));
            page.set_next_sibling(None);
        }

        let left_max = self.required_max_key(left)?;
        let mut node = InternalNode::init(root, self.pager.get_mut(root)?);
        node.page_mut().set_root(true);
        node.set_cells(&[InternalCell { child: left, key: left_max }], right);
        debug!(root = root.0, left = left.0, right = right.0, "created new root");
        Ok(())
    }
}

/// Split an ordered child list into keyed cells plus a right child.
fn split_right(node: PageId, entries: &[InternalCell]) -> Result<(&[InternalCell], PageId)> {
    entries
        .split_last()
        .map(|(last, rest)| (rest, last.child))
        .ok_or_else(|| Error::corrupt_node(node, "split produced an empty half"))
}
