//! Diagnostics: structural verification, tree dump and layout constants.

use std::fmt::Write;

use crate::common::config::{
    INTERNAL_NODE_MAX_KEYS, INTERNAL_NODE_MIN_KEYS, LEAF_NODE_MAX_CELLS, LEAF_NODE_MIN_CELLS,
};
use crate::common::{Error, PageId, Result};
use crate::record::ROW_SIZE;
use crate::storage::page::NodeType;

use super::node::{
    COMMON_NODE_HEADER_SIZE, INTERNAL_NODE_CELL_SIZE, INTERNAL_NODE_HEADER_SIZE,
    LEAF_NODE_CELL_SIZE, LEAF_NODE_HEADER_SIZE, LEAF_NODE_SPACE_FOR_CELLS,
};
use super::tree::BPlusTree;

fn violation(message: String) -> Error {
    Error::InvariantViolation(message)
}

impl BPlusTree {
    /// Check every structural invariant of the tree.
    ///
    /// Walks the tree level by level and checks:
    /// - each separator equals the maximum key of its child's subtree
    /// - keys ascend strictly within nodes and along the leaf level
    /// - occupancy bounds (a root leaf may be empty, a root internal node
    ///   needs one key)
    /// - parent pointers, root flags and per-level sibling chains
    /// - all leaves are at the same depth
    /// - the bitmap marks exactly the reachable pages
    ///
    /// # Errors
    /// Returns `Error::InvariantViolation` describing the first failure.
    pub fn verify(&mut self) -> Result<()> {
        let root = self.root();
        {
            let page = self.pager.get(root)?;
            if !page.is_root() || page.parent().is_some() {
                return Err(violation(format!("{} is not marked as a parentless root", root)));
            }
        }

        let mut level = vec![root];
        let mut reachable = 0usize;
        let mut last_leaf_key: Option<u32> = None;

        loop {
            reachable += level.len();
            if reachable > self.pager.max_pages() {
                return Err(violation("more nodes than pages; the tree has a cycle".into()));
            }
            self.verify_chain(&level)?;

            let level_type = self.node_type(level[0])?;
            let mut next_level = Vec::new();
            for &id in &level {
                if self.node_type(id)? != level_type {
                    return Err(violation(format!("{} is at a mixed-type level", id)));
                }
                if id != root && self.pager.get(id)?.is_root() {
                    return Err(violation(format!("{} is marked root", id)));
                }
                match level_type {
                    NodeType::Leaf => self.verify_leaf(id, id == root, &mut last_leaf_key)?,
                    NodeType::Internal => {
                        next_level.extend(self.verify_internal(id, id == root)?);
                    }
                }
            }

            if level_type == NodeType::Leaf {
                break;
            }
            level = next_level;
        }

        let allocated = self.pager.allocated_count();
        if allocated != reachable + 1 {
            return Err(violation(format!(
                "{} pages allocated but {} reachable (plus page 0)",
                allocated, reachable
            )));
        }
        Ok(())
    }

    fn verify_chain(&mut self, level: &[PageId]) -> Result<()> {
        for (i, &id) in level.iter().enumerate() {
            let page = self.pager.get(id)?;
            let expected_prev = i.checked_sub(1).map(|p| level[p]);
            let expected_next = level.get(i + 1).copied();
            if page.prev_sibling() != expected_prev || page.next_sibling() != expected_next {
                return Err(violation(format!(
                    "{} has siblings ({:?}, {:?}), expected ({:?}, {:?})",
                    id,
                    page.prev_sibling(),
                    page.next_sibling(),
                    expected_prev,
                    expected_next
                )));
            }
        }
        Ok(())
    }

    fn verify_leaf(&mut self, id: PageId, is_root: bool, last_key: &mut Option<u32>) -> Result<()> {
        let leaf = self.leaf(id)?;
        let count = leaf.num_cells();
        if !is_root && count < LEAF_NODE_MIN_CELLS {
            return Err(violation(format!("leaf {} underflows with {} cells", id, count)));
        }
        for i in 0..count {
            let key = leaf.key(i);
            if last_key.is_some_and(|last| last >= key) {
                return Err(violation(format!("leaf {} breaks key order at {}", id, key)));
            }
            *last_key = Some(key);
        }
        Ok(())
    }

    /// Check one internal node and return its children in order.
    fn verify_internal(&mut self, id: PageId, is_root: bool) -> Result<Vec<PageId>> {
        let (cells, children) = {
            let node = self.internal(id)?;
            (node.cells(), node.children()?)
        };
        let min = if is_root { 1 } else { INTERNAL_NODE_MIN_KEYS };
        if cells.len() < min || cells.len() > INTERNAL_NODE_MAX_KEYS {
            return Err(violation(format!(
                "internal {} holds {} keys",
                id,
                cells.len()
            )));
        }

        for pair in cells.windows(2) {
            if pair[0].key >= pair[1].key {
                return Err(violation(format!("internal {} keys out of order", id)));
            }
        }
        for cell in &cells {
            let actual = self.max_key(cell.child)?;
            if actual != Some(cell.key) {
                return Err(violation(format!(
                    "separator {} in {} but {} holds max {:?}",
                    cell.key, id, cell.child, actual
                )));
            }
        }
        if let (Some(last), Some(&right)) = (cells.last(), children.last()) {
            let right_max = self.max_key(right)?;
            if right_max.map_or(true, |max| max <= last.key) {
                return Err(violation(format!(
                    "right child {} of {} does not exceed {}",
                    right, id, last.key
                )));
            }
        }

        for &child in &children {
            if self.pager.get(child)?.parent() != Some(id) {
                return Err(violation(format!("{} does not point back to parent {}", child, id)));
            }
        }
        Ok(children)
    }

    /// Render the tree, one node or key per line, children indented.
    pub fn dump_tree(&mut self) -> Result<String> {
        let mut out = String::new();
        let root = self.root();
        self.dump_node(root, 0, &mut out)?;
        Ok(out)
    }

    fn dump_node(&mut self, id: PageId, depth: usize, out: &mut String) -> Result<()> {
        if depth > self.pager.max_pages() {
            return Err(Error::corrupt_node(id, "descent does not terminate"));
        }
        let indent = "  ".repeat(depth);
        match self.node_type(id)? {
            NodeType::Leaf => {
                let leaf = self.leaf(id)?;
                let _ = writeln!(out, "{}- leaf (size {})", indent, leaf.num_cells());
                for i in 0..leaf.num_cells() {
                    let _ = writeln!(out, "{}  - {}", indent, leaf.key(i));
                }
            }
            NodeType::Internal => {
                let (cells, right) = {
                    let node = self.internal(id)?;
                    (node.cells(), node.child(node.num_keys())?)
                };
                let _ = writeln!(out, "{}- internal (size {})", indent, cells.len());
                for cell in cells {
                    self.dump_node(cell.child, depth + 1, out)?;
                    let _ = writeln!(out, "{}  - key {}", indent, cell.key);
                }
                self.dump_node(right, depth + 1, out)?;
            }
        }
        Ok(())
    }

    /// The node layout constants, one `NAME: value` per line.
    pub fn constants() -> String {
        let entries = [
            ("ROW_SIZE", ROW_SIZE),
            ("COMMON_NODE_HEADER_SIZE", COMMON_NODE_HEADER_SIZE),
            ("LEAF_NODE_HEADER_SIZE", LEAF_NODE_HEADER_SIZE),
            ("LEAF_NODE_CELL_SIZE", LEAF_NODE_CELL_SIZE),
            ("LEAF_NODE_SPACE_FOR_CELLS", LEAF_NODE_SPACE_FOR_CELLS),
            ("LEAF_NODE_MAX_CELLS", LEAF_NODE_MAX_CELLS),
            ("LEAF_NODE_MIN_CELLS", LEAF_NODE_MIN_CELLS),
            ("INTERNAL_NODE_HEADER_SIZE", INTERNAL_NODE_HEADER_SIZE),
            ("INTERNAL_NODE_CELL_SIZE", INTERNAL_NODE_CELL_SIZE),
            ("INTERNAL_NODE_MAX_KEYS", INTERNAL_NODE_MAX_KEYS),
            ("INTERNAL_NODE_MIN_KEYS", INTERNAL_NODE_MIN_KEYS),
        ];
        entries
            .iter()
            .map(|(name, value)| format!("{}: {}\n", name, value))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn tree_with(dir: &tempfile::TempDir, keys: &[u32]) -> BPlusTree {
        let mut tree = BPlusTree::open(dir.path().join("test.db")).unwrap();
        for &key in keys {
            tree.insert(key, &[0u8; ROW_SIZE]).unwrap();
        }
        tree
    }

    #[test]
    fn test_dump_single_leaf() {
        let dir = tempdir().unwrap();
        let mut tree = tree_with(&dir, &[3, 1, 2]);

        assert_eq!(
            tree.dump_tree().unwrap(),
            "- leaf (size 3)\n  - 1\n  - 2\n  - 3\n"
        );
    }

    #[test]
    fn test_dump_two_levels() {
        let dir = tempdir().unwrap();
        let mut tree = tree_with(&dir, &[1, 2, 3, 4]);

        let expected = "\
- internal (size 1)
  - leaf (size 2)
    - 1
    - 2
  - key 2
  - leaf (size 2)
    - 3
    - 4
";
        assert_eq!(tree.dump_tree().unwrap(), expected);
    }

    #[test]
    fn test_constants() {
        let text = BPlusTree::constants();
        assert!(text.contains("ROW_SIZE: 293\n"));
        assert!(text.contains("COMMON_NODE_HEADER_SIZE: 14\n"));
        assert!(text.contains("LEAF_NODE_CELL_SIZE: 297\n"));
        assert!(text.contains("LEAF_NODE_MAX_CELLS: 3\n"));
    }

    #[test]
    fn test_verify_detects_bad_separator() {
        let dir = tempdir().unwrap();
        let mut tree = tree_with(&dir, &[1, 2, 3, 4]);
        tree.verify().unwrap();

        let root = tree.root();
        tree.internal_mut(root).unwrap().set_key(0, 9);
        assert!(matches!(tree.verify(), Err(Error::InvariantViolation(_))));
    }

    #[test]
    fn test_verify_detects_broken_chain() {
        let dir = tempdir().unwrap();
        let mut tree = tree_with(&dir, &[1, 2, 3, 4]);

        let first = tree.first_leaf().unwrap();
        tree.pager.get_mut(first).unwrap().set_next_sibling(None);
        assert!(matches!(tree.verify(), Err(Error::InvariantViolation(_))));
    }

    #[test]
    fn test_verify_detects_leaked_page() {
        let dir = tempdir().unwrap();
        let mut tree = tree_with(&dir, &[1]);

        tree.pager.allocate().unwrap();
        assert!(matches!(tree.verify(), Err(Error::InvariantViolation(_))));
    }
}
