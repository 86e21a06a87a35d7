//! Delete path: leaf removal, borrow, merge and root collapse.
//!
//! Rebalancing only ever pairs a node with a neighbour that shares its
//! parent. Neighbours come from the level-wide sibling chain, so a node at
//! either edge of its parent's child list may find only one candidate.

use tracing::debug;

use crate::common::config::{INTERNAL_NODE_MIN_KEYS, LEAF_NODE_MIN_CELLS};
use crate::common::{Error, PageId, Result};
use crate::storage::page::NodeType;

use super::node::{ChildSlot, InternalCell};
use super::tree::BPlusTree;

/// Same-parent neighbours of a node.
struct Siblings {
    parent: PageId,
    left: Option<PageId>,
    right: Option<PageId>,
}

impl BPlusTree {
    /// Remove the row under `key`.
    ///
    /// # Errors
    /// - `Error::KeyNotFound` if `key` is absent (nothing is modified)
    /// - `Error::NoRebalanceSibling` if an underflowing node has no
    ///   neighbour under the same parent
    pub fn delete(&mut self, key: u32) -> Result<()> {
        let pos = self.locate(key)?;
        {
            let leaf = self.leaf(pos.page)?;
            if pos.cell >= leaf.num_cells() || leaf.key(pos.cell) != key {
                return Err(Error::KeyNotFound(key));
            }
        }

        let (remaining, is_root) = {
            let mut leaf = self.leaf_mut(pos.page)?;
            leaf.remove_cell(pos.cell);
            (leaf.num_cells(), leaf.page().is_root())
        };
        if is_root {
            return Ok(());
        }

        // Removing the last cell lowers this leaf's maximum.
        if pos.cell == remaining && remaining > 0 {
            self.refresh_separator(pos.page)?;
        }
        if remaining < LEAF_NODE_MIN_CELLS {
            self.rebalance_leaf(pos.page)?;
        }
        Ok(())
    }

    // ========================================================================
    // Separator upkeep
    // ========================================================================

    /// Record `new_max` as the maximum of `node`'s subtree in the nearest
    /// ancestor that keys it.
    ///
    /// A right child has no separator of its own, so the walk climbs while
    /// the node is its parent's right child.
    fn propagate_max(&mut self, node: PageId, new_max: u32) -> Result<()> {
        let mut child = node;
        while let Some(parent) = self.pager.get(child)?.parent() {
            match self.slot_in_parent(parent, child)? {
                ChildSlot::Cell(index) => {
                    self.internal_mut(parent)?.set_key(index, new_max);
                    return Ok(());
                }
                ChildSlot::Right => child = parent,
            }
        }
        Ok(())
    }

    /// Re-derive `node`'s maximum and propagate it.
    fn refresh_separator(&mut self, node: PageId) -> Result<()> {
        match self.max_key(node)? {
            Some(max) => self.propagate_max(node, max),
            None => Ok(()),
        }
    }

    fn same_parent_siblings(&mut self, node: PageId) -> Result<Siblings> {
        let (parent, prev, next) = {
            let page = self.pager.get(node)?;
            (page.parent(), page.prev_sibling(), page.next_sibling())
        };
        let parent =
            parent.ok_or_else(|| Error::corrupt_node(node, "non-root node has no parent"))?;

        let left = match prev {
            Some(id) if self.pager.get(id)?.parent() == Some(parent) => Some(id),
            _ => None,
        };
        let right = match next {
            Some(id) if self.pager.get(id)?.parent() == Some(parent) => Some(id),
            _ => None,
        };
        Ok(Siblings {
            parent,
            left,
            right,
        })
    }

    // ========================================================================
    // Leaf underflow
    // ========================================================================

    fn rebalance_leaf(&mut self, node: PageId) -> Result<()> {
        let siblings = self.same_parent_siblings(node)?;

        if let Some(left) = siblings.left {
            let count = self.leaf(left)?.num_cells();
            if count > LEAF_NODE_MIN_CELLS {
                let cell = self.leaf_mut(left)?.remove_cell(count - 1);
                self.leaf_mut(node)?.insert_cell(0, cell.key, &cell.value);
                self.refresh_separator(left)?;
                debug!(node = node.0, from = left.0, key = cell.key, "borrowed leaf cell from left");
                return Ok(());
            }
        }

        if let Some(right) = siblings.right {
            if self.leaf(right)?.num_cells() > LEAF_NODE_MIN_CELLS {
                let cell = self.leaf_mut(right)?.remove_cell(0);
                let mut leaf = self.leaf_mut(node)?;
                let end = leaf.num_cells();
                leaf.insert_cell(end, cell.key, &cell.value);
                self.refresh_separator(node)?;
                debug!(node = node.0, from = right.0, key = cell.key, "borrowed leaf cell from right");
                return Ok(());
            }
        }

        if let Some(left) = siblings.left {
            self.merge(siblings.parent, left, node, left)
        } else if let Some(right) = siblings.right {
            self.merge(siblings.parent, node, right, right)
        } else {
            Err(Error::NoRebalanceSibling { page: node })
        }
    }

    // ========================================================================
    // Internal underflow
    // ========================================================================

    fn rebalance_internal(&mut self, node: PageId) -> Result<()> {
        let siblings = self.same_parent_siblings(node)?;

        if let Some(left) = siblings.left {
            if self.internal(left)?.num_keys() > INTERNAL_NODE_MIN_KEYS {
                return self.borrow_internal_from_left(node, left);
            }
        }
        if let Some(right) = siblings.right {
            if self.internal(right)?.num_keys() > INTERNAL_NODE_MIN_KEYS {
                return self.borrow_internal_from_right(node, right);
            }
        }

        if let Some(left) = siblings.left {
            self.merge(siblings.parent, left, node, left)
        } else if let Some(right) = siblings.right {
            self.merge(siblings.parent, node, right, right)
        } else {
            Err(Error::NoRebalanceSibling { page: node })
        }
    }

    /// Move `left`'s right child to the front of `node`.
    fn borrow_internal_from_left(&mut self, node: PageId, left: PageId) -> Result<()> {
        let moved = self
            .internal(left)?
            .right_child()
            .ok_or_else(|| Error::corrupt_node(left, "missing right child"))?;
        let moved_max = self.required_max_key(moved)?;
        {
            let mut l = self.internal_mut(left)?;
            let last = l.num_keys() - 1;
            let promoted = l.remove_cell(last);
            l.set_right_child(promoted.child);
        }
        self.internal_mut(node)?
            .insert_cell(0, InternalCell { child: moved, key: moved_max });
        self.set_parent(moved, node)?;
        self.refresh_separator(left)?;
        debug!(node = node.0, from = left.0, child = moved.0, "borrowed internal child from left");
        Ok(())
    }

    /// Move `right`'s first child to the end of `node`.
    fn borrow_internal_from_right(&mut self, node: PageId, right: PageId) -> Result<()> {
        let moved = self.internal_mut(right)?.remove_cell(0);
        let old_right = self
            .internal(node)?
            .right_child()
            .ok_or_else(|| Error::corrupt_node(node, "missing right child"))?;
        let old_right_max = self.required_max_key(old_right)?;
        {
            let mut n = self.internal_mut(node)?;
            let end = n.num_keys();
            n.insert_cell(end, InternalCell { child: old_right, key: old_right_max });
            n.set_right_child(moved.child);
        }
        self.set_parent(moved.child, node)?;
        self.refresh_separator(node)?;
        debug!(node = node.0, from = right.0, child = moved.child.0, "borrowed internal child from right");
        Ok(())
    }

    // ========================================================================
    // Merge
    // ========================================================================

    /// Fold two adjacent same-parent nodes into `survivor` (one of them)
    /// and free the other.
    ///
    /// The parent loses the separator of `left`; the slot that held `right`
    /// now points at the survivor, whose maximum is `right`'s maximum.
    fn merge(&mut self, parent: PageId, left: PageId, right: PageId, survivor: PageId) -> Result<()> {
        let victim = if survivor == left { right } else { left };

        match self.node_type(left)? {
            NodeType::Leaf => {
                let mut cells = self.leaf(left)?.cells();
                cells.extend(self.leaf(right)?.cells());
                self.leaf_mut(survivor)?.set_cells(&cells);
            }
            NodeType::Internal => {
                let (left_cells, left_right) = {
                    let l = self.internal(left)?;
                    let right_child = l
                        .right_child()
                        .ok_or_else(|| Error::corrupt_node(left, "missing right child"))?;
                    (l.cells(), right_child)
                };
                let left_right_max = self.required_max_key(left_right)?;
                let (right_cells, right_right) = {
                    let r = self.internal(right)?;
                    let right_child = r
                        .right_child()
                        .ok_or_else(|| Error::corrupt_node(right, "missing right child"))?;
                    (r.cells(), right_child)
                };

                let mut cells = left_cells;
                cells.push(InternalCell { child: left_right, key: left_right_max });
                cells.extend(right_cells);
                self.internal_mut(survivor)?.set_cells(&cells, right_right);

                let moved = self.internal(survivor)?.children()?;
                for child in moved {
                    self.set_parent(child, survivor)?;
                }
            }
        }

        let left_index = match self.slot_in_parent(parent, left)? {
            ChildSlot::Cell(index) => index,
            ChildSlot::Right => {
                return Err(Error::corrupt_node(parent, "left merge partner is the right child"))
            }
        };
        let right_slot = self.slot_in_parent(parent, right)?;
        {
            let mut p = self.internal_mut(parent)?;
            match right_slot {
                ChildSlot::Cell(index) => p.set_child(index, survivor),
                ChildSlot::Right => p.set_right_child(survivor),
            }
            p.remove_cell(left_index);
        }

        self.pager.free(victim)?;
        self.refresh_separator(survivor)?;
        debug!(survivor = survivor.0, freed = victim.0, parent = parent.0, "merged nodes");

        self.handle_parent_after_merge(parent)
    }

    fn handle_parent_after_merge(&mut self, parent: PageId) -> Result<()> {
        let (keys, is_root) = {
            let p = self.internal(parent)?;
            (p.num_keys(), p.page().is_root())
        };
        if is_root {
            if keys == 0 {
                self.collapse_root()?;
            }
            return Ok(());
        }
        if keys < INTERNAL_NODE_MIN_KEYS {
            self.rebalance_internal(parent)?;
        }
        Ok(())
    }

    /// Replace an internal root that has lost its last separator with its
    /// only child.
    fn collapse_root(&mut self) -> Result<()> {
        let old_root = self.root();
        let new_root = self
            .internal(old_root)?
            .right_child()
            .ok_or_else(|| Error::corrupt_node(old_root, "missing right child"))?;
        {
            let page = self.pager.get_mut(new_root)?;
            page.set_root(true);
            page.set_parent(None);
            page.set_prev_sibling(None);
            page.set_next_sibling(None);
        }
        self.pager.free(old_root)?;
        self.pager.set_root(new_root);
        debug!(old = old_root.0, new = new_root.0, "collapsed root");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::config::LEAF_NODE_MAX_CELLS;
    use crate::record::ROW_SIZE;
    use tempfile::tempdir;

    fn value(key: u32) -> [u8; ROW_SIZE] {
        [key as u8; ROW_SIZE]
    }

    fn tree_with(dir: &tempfile::TempDir, keys: impl IntoIterator<Item = u32>) -> BPlusTree {
        let mut tree = BPlusTree::open(dir.path().join("test.db")).unwrap();
        for key in keys {
            tree.insert(key, &value(key)).unwrap();
        }
        tree
    }

    fn scan(tree: &mut BPlusTree) -> Vec<u32> {
        let mut out = Vec::new();
        let mut page = Some(tree.first_leaf().unwrap());
        while let Some(id) = page {
            let leaf = tree.leaf(id).unwrap();
            out.extend(leaf.cells().iter().map(|c| c.key));
            page = leaf.page().next_sibling();
        }
        out
    }

    #[test]
    fn test_delete_missing_key() {
        let dir = tempdir().unwrap();
        let mut tree = tree_with(&dir, [1, 2, 3]);

        assert!(matches!(tree.delete(7), Err(Error::KeyNotFound(7))));
        assert_eq!(scan(&mut tree), vec![1, 2, 3]);
    }

    #[test]
    fn test_delete_from_root_leaf() {
        let dir = tempdir().unwrap();
        let mut tree = tree_with(&dir, [1, 2, 3]);

        for key in [2, 1, 3] {
            tree.delete(key).unwrap();
        }
        assert!(scan(&mut tree).is_empty());
        assert_eq!(tree.root(), PageId::new(1));
        tree.verify().unwrap();
    }

    #[test]
    fn test_delete_last_cell_updates_separator() {
        let dir = tempdir().unwrap();
        // Leaves [10, 15, 20] [30, 40]; root key 20.
        let mut tree = tree_with(&dir, [10, 20, 30, 40, 15]);
        tree.verify().unwrap();

        tree.delete(20).unwrap();
        assert_eq!(tree.internal(tree.root()).unwrap().key(0), 15);
        tree.verify().unwrap();
    }

    #[test]
    fn test_borrow_from_left_leaf() {
        let dir = tempdir().unwrap();
        // Leaves [10, 15, 20] [30, 40].
        let mut tree = tree_with(&dir, [10, 20, 30, 40, 15]);

        tree.delete(40).unwrap();
        tree.verify().unwrap();
        assert_eq!(scan(&mut tree), vec![10, 15, 20, 30]);
        let root = tree.internal(tree.root()).unwrap();
        assert_eq!(root.num_keys(), 1);
        assert_eq!(root.key(0), 15);
    }

    #[test]
    fn test_borrow_from_right_leaf() {
        let dir = tempdir().unwrap();
        // Leaves [10, 20] [30, 40, 50].
        let mut tree = tree_with(&dir, [10, 20, 30, 40, 50]);

        tree.delete(10).unwrap();
        tree.verify().unwrap();
        assert_eq!(scan(&mut tree), vec![20, 30, 40, 50]);
        assert_eq!(tree.internal(tree.root()).unwrap().key(0), 30);
    }

    #[test]
    fn test_merge_collapses_root() {
        let dir = tempdir().unwrap();
        // Leaves [10, 20] [30, 40].
        let mut tree = tree_with(&dir, [10, 20, 30, 40]);
        let old_root = tree.root();

        tree.delete(30).unwrap();
        tree.verify().unwrap();

        assert_ne!(tree.root(), old_root);
        assert_eq!(tree.node_type(tree.root()).unwrap(), NodeType::Leaf);
        assert_eq!(scan(&mut tree), vec![10, 20, 40]);
        assert!(!tree.pager().is_allocated(old_root));
        assert_eq!(tree.pager().allocated_count(), 2);
    }

    #[test]
    fn test_deep_tree_drains_to_single_leaf() {
        let dir = tempdir().unwrap();
        let count = (LEAF_NODE_MAX_CELLS * 16) as u32;
        let mut tree = tree_with(&dir, 1..=count);
        assert!(tree.height().unwrap() >= 3);

        let mut remaining: Vec<u32> = (1..=count).collect();
        // Interleave deletes from both ends and the middle.
        while remaining.len() > 2 {
            let idx = match remaining.len() % 3 {
                0 => 0,
                1 => remaining.len() / 2,
                _ => remaining.len() - 1,
            };
            let key = remaining.remove(idx);
            tree.delete(key).unwrap();
            tree.verify().unwrap();
            assert_eq!(scan(&mut tree), remaining);
        }

        assert_eq!(tree.height().unwrap(), 1);
        assert_eq!(tree.pager().allocated_count(), 2);
    }

    #[test]
    fn test_missing_sibling_is_reported() {
        let dir = tempdir().unwrap();
        // Leaves [10, 20] [30, 40].
        let mut tree = tree_with(&dir, [10, 20, 30, 40]);

        // Detach the right leaf from the chain so it has no usable neighbour.
        let root = tree.root();
        let right = tree.internal(root).unwrap().right_child().unwrap();
        tree.pager.get_mut(right).unwrap().set_prev_sibling(None);

        assert!(matches!(
            tree.delete(30),
            Err(Error::NoRebalanceSibling { page }) if page == right
        ));
    }
}
