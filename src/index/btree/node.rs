//! Node codec - typed views over tree pages.
//!
//! A tree page is either a leaf or an internal node. Both start with the
//! common [`NodeHeader`]; the rest of the layout is fixed per type:
//!
//! ```text
//! Leaf
//! ┌──────────────┬───────────┬──────────┬──────────────────────────────┐
//! │ header (14)  │ cells (4) │ rsvd (4) │ [key u32 | row 293] × cells  │
//! └──────────────┴───────────┴──────────┴──────────────────────────────┘
//!
//! Internal
//! ┌──────────────┬──────────┬─────────────┬────────────────────────────┐
//! │ header (14)  │ keys (4) │ right (4)   │ [child u32 | key u32] × keys│
//! └──────────────┴──────────┴─────────────┴────────────────────────────┘
//! ```
//!
//! [`LeafNode`] and [`InternalNode`] wrap anything that dereferences to a
//! [`Page`], so the same view works over `&Page` for reads and `&mut Page`
//! for writes. Constructing a view checks the type byte and count.

use std::ops::{Deref, DerefMut};

use crate::common::config::{INTERNAL_NODE_MAX_KEYS, LEAF_NODE_MAX_CELLS, PAGE_SIZE};
use crate::common::{Error, PageId, Result};
use crate::record::ROW_SIZE;
use crate::storage::page::{NodeHeader, NodeType, Page};

// ============================================================================
// Layout constants
// ============================================================================

pub const COMMON_NODE_HEADER_SIZE: usize = NodeHeader::SIZE;

pub const LEAF_NODE_NUM_CELLS_OFFSET: usize = COMMON_NODE_HEADER_SIZE;
pub const LEAF_NODE_NUM_CELLS_SIZE: usize = 4;
/// Unused slot kept zero; sibling navigation goes through the common header.
pub const LEAF_NODE_RESERVED_OFFSET: usize = LEAF_NODE_NUM_CELLS_OFFSET + LEAF_NODE_NUM_CELLS_SIZE;
pub const LEAF_NODE_RESERVED_SIZE: usize = 4;
pub const LEAF_NODE_HEADER_SIZE: usize = LEAF_NODE_RESERVED_OFFSET + LEAF_NODE_RESERVED_SIZE;

pub const LEAF_NODE_KEY_SIZE: usize = 4;
pub const LEAF_NODE_VALUE_SIZE: usize = ROW_SIZE;
pub const LEAF_NODE_CELL_SIZE: usize = LEAF_NODE_KEY_SIZE + LEAF_NODE_VALUE_SIZE;
pub const LEAF_NODE_SPACE_FOR_CELLS: usize = PAGE_SIZE - LEAF_NODE_HEADER_SIZE;

pub const INTERNAL_NODE_NUM_KEYS_OFFSET: usize = COMMON_NODE_HEADER_SIZE;
pub const INTERNAL_NODE_NUM_KEYS_SIZE: usize = 4;
pub const INTERNAL_NODE_RIGHT_CHILD_OFFSET: usize =
    INTERNAL_NODE_NUM_KEYS_OFFSET + INTERNAL_NODE_NUM_KEYS_SIZE;
pub const INTERNAL_NODE_RIGHT_CHILD_SIZE: usize = 4;
pub const INTERNAL_NODE_HEADER_SIZE: usize =
    INTERNAL_NODE_RIGHT_CHILD_OFFSET + INTERNAL_NODE_RIGHT_CHILD_SIZE;

pub const INTERNAL_NODE_CHILD_SIZE: usize = 4;
pub const INTERNAL_NODE_KEY_SIZE: usize = 4;
pub const INTERNAL_NODE_CELL_SIZE: usize = INTERNAL_NODE_CHILD_SIZE + INTERNAL_NODE_KEY_SIZE;

const _: () = assert!(LEAF_NODE_MAX_CELLS * LEAF_NODE_CELL_SIZE <= LEAF_NODE_SPACE_FOR_CELLS);
const _: () = assert!(
    INTERNAL_NODE_HEADER_SIZE + INTERNAL_NODE_MAX_KEYS * INTERNAL_NODE_CELL_SIZE <= PAGE_SIZE
);

// ============================================================================
// Cells
// ============================================================================

/// An owned copy of one leaf cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafCell {
    pub key: u32,
    pub value: [u8; ROW_SIZE],
}

/// One internal cell: `key` is the maximum key under `child`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InternalCell {
    pub child: PageId,
    pub key: u32,
}

/// Where a child hangs off its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildSlot {
    /// The child of keyed cell `i`.
    Cell(usize),
    /// The right child.
    Right,
}

/// Decode the node type of a page, failing on unknown type bytes.
pub fn node_type_of(page_id: PageId, page: &Page) -> Result<NodeType> {
    page.node_type()
        .ok_or_else(|| Error::corrupt_node(page_id, "unknown node type"))
}

// ============================================================================
// LeafNode
// ============================================================================

/// View of a page as a leaf node.
pub struct LeafNode<P> {
    id: PageId,
    page: P,
}

impl<P: Deref<Target = Page>> LeafNode<P> {
    /// Wrap a page that already holds a leaf.
    ///
    /// # Errors
    /// Returns `Error::CorruptNode` if the page is not a leaf or its cell
    /// count exceeds the maximum.
    pub fn new(id: PageId, page: P) -> Result<Self> {
        if node_type_of(id, &page)? != NodeType::Leaf {
            return Err(Error::corrupt_node(id, "expected a leaf node"));
        }
        let node = Self { id, page };
        if node.num_cells() > LEAF_NODE_MAX_CELLS {
            return Err(Error::corrupt_node(
                id,
                format!("leaf holds {} cells", node.num_cells()),
            ));
        }
        Ok(node)
    }

    #[inline]
    pub fn id(&self) -> PageId {
        self.id
    }

    #[inline]
    pub fn page(&self) -> &Page {
        &self.page
    }

    #[inline]
    pub fn num_cells(&self) -> usize {
        self.page.read_u32(LEAF_NODE_NUM_CELLS_OFFSET) as usize
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.num_cells() >= LEAF_NODE_MAX_CELLS
    }

    #[inline]
    pub fn key(&self, index: usize) -> u32 {
        self.page.read_u32(cell_offset(index))
    }

    /// Row bytes of cell `index`.
    #[inline]
    pub fn value(&self, index: usize) -> &[u8] {
        let start = cell_offset(index) + LEAF_NODE_KEY_SIZE;
        &self.page.as_slice()[start..start + LEAF_NODE_VALUE_SIZE]
    }

    pub fn cell(&self, index: usize) -> LeafCell {
        let mut value = [0u8; ROW_SIZE];
        value.copy_from_slice(self.value(index));
        LeafCell {
            key: self.key(index),
            value,
        }
    }

    pub fn cells(&self) -> Vec<LeafCell> {
        (0..self.num_cells()).map(|i| self.cell(i)).collect()
    }

    /// Index of the first cell whose key is `>= key`, or `num_cells` if none.
    pub fn search(&self, key: u32) -> usize {
        let (mut lo, mut hi) = (0, self.num_cells());
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if self.key(mid) < key {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        lo
    }

    /// Last cell's key, `None` for an empty leaf.
    pub fn max_key(&self) -> Option<u32> {
        self.num_cells().checked_sub(1).map(|last| self.key(last))
    }
}

impl<'a> LeafNode<&'a Page> {
    /// Row bytes of cell `index`, borrowed for as long as the page is.
    pub fn into_value(self, index: usize) -> &'a [u8] {
        let start = cell_offset(index) + LEAF_NODE_KEY_SIZE;
        &self.page.as_slice()[start..start + LEAF_NODE_VALUE_SIZE]
    }
}

impl<P: DerefMut<Target = Page>> LeafNode<P> {
    /// Format a page as an empty, detached, non-root leaf.
    pub fn init(id: PageId, mut page: P) -> Self {
        page.set_header(&NodeHeader::new(NodeType::Leaf));
        page.write_u32(LEAF_NODE_NUM_CELLS_OFFSET, 0);
        page.write_u32(LEAF_NODE_RESERVED_OFFSET, 0);
        Self { id, page }
    }

    #[inline]
    pub fn page_mut(&mut self) -> &mut Page {
        &mut self.page
    }

    #[inline]
    fn set_num_cells(&mut self, count: usize) {
        self.page.write_u32(LEAF_NODE_NUM_CELLS_OFFSET, count as u32);
    }

    fn write_cell(&mut self, index: usize, key: u32, value: &[u8]) {
        let offset = cell_offset(index);
        self.page.write_u32(offset, key);
        let start = offset + LEAF_NODE_KEY_SIZE;
        self.page.as_mut_slice()[start..start + LEAF_NODE_VALUE_SIZE].copy_from_slice(value);
    }

    /// Insert a cell at `index`, shifting later cells right.
    ///
    /// # Panics
    /// Panics if the leaf is full, `index > num_cells` or `value` is not
    /// exactly one row wide.
    pub fn insert_cell(&mut self, index: usize, key: u32, value: &[u8]) {
        let count = self.num_cells();
        assert!(count < LEAF_NODE_MAX_CELLS, "leaf is full");
        assert!(index <= count, "cell index out of range");

        if index < count {
            let src = cell_offset(index)..cell_offset(count);
            self.page
                .as_mut_slice()
                .copy_within(src, cell_offset(index + 1));
        }
        self.write_cell(index, key, value);
        self.set_num_cells(count + 1);
    }

    /// Remove cell `index`, shifting later cells left, and return it.
    ///
    /// # Panics
    /// Panics if `index >= num_cells`.
    pub fn remove_cell(&mut self, index: usize) -> LeafCell {
        let count = self.num_cells();
        assert!(index < count, "cell index out of range");

        let cell = self.cell(index);
        if index + 1 < count {
            let src = cell_offset(index + 1)..cell_offset(count);
            self.page.as_mut_slice().copy_within(src, cell_offset(index));
        }
        self.set_num_cells(count - 1);
        cell
    }

    /// Replace the whole cell array.
    ///
    /// # Panics
    /// Panics if `cells` holds more than the maximum.
    pub fn set_cells(&mut self, cells: &[LeafCell]) {
        assert!(cells.len() <= LEAF_NODE_MAX_CELLS, "too many leaf cells");
        for (i, cell) in cells.iter().enumerate() {
            self.write_cell(i, cell.key, &cell.value);
        }
        self.set_num_cells(cells.len());
    }
}

#[inline]
fn cell_offset(index: usize) -> usize {
    LEAF_NODE_HEADER_SIZE + index * LEAF_NODE_CELL_SIZE
}

// ============================================================================
// InternalNode
// ============================================================================

/// View of a page as an internal node.
///
/// Holds `num_keys` keyed cells plus a right child, so `num_keys + 1`
/// children in all. Child index `num_keys` names the right child.
pub struct InternalNode<P> {
    id: PageId,
    page: P,
}

impl<P: Deref<Target = Page>> InternalNode<P> {
    /// Wrap a page that already holds an internal node.
    ///
    /// # Errors
    /// Returns `Error::CorruptNode` if the page is not an internal node or
    /// its key count exceeds the maximum.
    pub fn new(id: PageId, page: P) -> Result<Self> {
        if node_type_of(id, &page)? != NodeType::Internal {
            return Err(Error::corrupt_node(id, "expected an internal node"));
        }
        let node = Self { id, page };
        if node.num_keys() > INTERNAL_NODE_MAX_KEYS {
            return Err(Error::corrupt_node(
                id,
                format!("internal node holds {} keys", node.num_keys()),
            ));
        }
        Ok(node)
    }

    #[inline]
    pub fn id(&self) -> PageId {
        self.id
    }

    #[inline]
    pub fn page(&self) -> &Page {
        &self.page
    }

    #[inline]
    pub fn num_keys(&self) -> usize {
        self.page.read_u32(INTERNAL_NODE_NUM_KEYS_OFFSET) as usize
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.num_keys() >= INTERNAL_NODE_MAX_KEYS
    }

    #[inline]
    pub fn right_child(&self) -> Option<PageId> {
        PageId::from_raw(self.page.read_u32(INTERNAL_NODE_RIGHT_CHILD_OFFSET))
    }

    #[inline]
    pub fn key(&self, index: usize) -> u32 {
        self.page
            .read_u32(internal_cell_offset(index) + INTERNAL_NODE_CHILD_SIZE)
    }

    /// Child `index`, where `index == num_keys` is the right child.
    ///
    /// # Errors
    /// Returns `Error::CorruptNode` for an out-of-range index or a missing
    /// child pointer.
    pub fn child(&self, index: usize) -> Result<PageId> {
        let count = self.num_keys();
        let raw = if index < count {
            self.page.read_u32(internal_cell_offset(index))
        } else if index == count {
            self.page.read_u32(INTERNAL_NODE_RIGHT_CHILD_OFFSET)
        } else {
            return Err(Error::corrupt_node(
                self.id,
                format!("child index {} past {} keys", index, count),
            ));
        };
        PageId::from_raw(raw)
            .ok_or_else(|| Error::corrupt_node(self.id, format!("child {} is unset", index)))
    }

    /// Every child in key order, right child last.
    pub fn children(&self) -> Result<Vec<PageId>> {
        (0..=self.num_keys()).map(|i| self.child(i)).collect()
    }

    pub fn cells(&self) -> Vec<InternalCell> {
        (0..self.num_keys())
            .map(|i| InternalCell {
                child: PageId::new(self.page.read_u32(internal_cell_offset(i))),
                key: self.key(i),
            })
            .collect()
    }

    /// Index of the child whose subtree may hold `key`: the first cell whose
    /// key is `>= key`, or `num_keys` (the right child) if none.
    pub fn find_child_index(&self, key: u32) -> usize {
        let (mut lo, mut hi) = (0, self.num_keys());
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if self.key(mid) < key {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        lo
    }

    /// Where `child` hangs off this node, if it does.
    pub fn slot_of(&self, child: PageId) -> Option<ChildSlot> {
        if self.right_child() == Some(child) {
            return Some(ChildSlot::Right);
        }
        (0..self.num_keys())
            .find(|&i| self.page.read_u32(internal_cell_offset(i)) == child.0)
            .map(ChildSlot::Cell)
    }
}

impl<P: DerefMut<Target = Page>> InternalNode<P> {
    /// Format a page as an empty, detached, non-root internal node with no
    /// right child.
    pub fn init(id: PageId, mut page: P) -> Self {
        page.set_header(&NodeHeader::new(NodeType::Internal));
        page.write_u32(INTERNAL_NODE_NUM_KEYS_OFFSET, 0);
        page.write_u32(INTERNAL_NODE_RIGHT_CHILD_OFFSET, PageId::INVALID.0);
        Self { id, page }
    }

    #[inline]
    pub fn page_mut(&mut self) -> &mut Page {
        &mut self.page
    }

    #[inline]
    fn set_num_keys(&mut self, count: usize) {
        self.page
            .write_u32(INTERNAL_NODE_NUM_KEYS_OFFSET, count as u32);
    }

    #[inline]
    pub fn set_right_child(&mut self, child: PageId) {
        self.page
            .write_u32(INTERNAL_NODE_RIGHT_CHILD_OFFSET, child.0);
    }

    #[inline]
    pub fn set_key(&mut self, index: usize, key: u32) {
        self.page
            .write_u32(internal_cell_offset(index) + INTERNAL_NODE_CHILD_SIZE, key);
    }

    #[inline]
    pub fn set_child(&mut self, index: usize, child: PageId) {
        self.page.write_u32(internal_cell_offset(index), child.0);
    }

    fn write_cell(&mut self, index: usize, cell: InternalCell) {
        self.set_child(index, cell.child);
        self.set_key(index, cell.key);
    }

    /// Insert a keyed cell at `index`, shifting later cells right.
    ///
    /// # Panics
    /// Panics if the node is full or `index > num_keys`.
    pub fn insert_cell(&mut self, index: usize, cell: InternalCell) {
        let count = self.num_keys();
        assert!(count < INTERNAL_NODE_MAX_KEYS, "internal node is full");
        assert!(index <= count, "cell index out of range");

        if index < count {
            let src = internal_cell_offset(index)..internal_cell_offset(count);
            self.page
                .as_mut_slice()
                .copy_within(src, internal_cell_offset(index + 1));
        }
        self.write_cell(index, cell);
        self.set_num_keys(count + 1);
    }

    /// Remove keyed cell `index`, shifting later cells left, and return it.
    ///
    /// # Panics
    /// Panics if `index >= num_keys`.
    pub fn remove_cell(&mut self, index: usize) -> InternalCell {
        let count = self.num_keys();
        assert!(index < count, "cell index out of range");

        let cell = self.cells()[index];
        if index + 1 < count {
            let src = internal_cell_offset(index + 1)..internal_cell_offset(count);
            self.page
                .as_mut_slice()
                .copy_within(src, internal_cell_offset(index));
        }
        self.set_num_keys(count - 1);
        cell
    }

    /// Replace all keyed cells and the right child.
    ///
    /// # Panics
    /// Panics if `cells` holds more than the maximum.
    pub fn set_cells(&mut self, cells: &[InternalCell], right: PageId) {
        assert!(cells.len() <= INTERNAL_NODE_MAX_KEYS, "too many internal cells");
        for (i, cell) in cells.iter().enumerate() {
            self.write_cell(i, *cell);
        }
        self.set_num_keys(cells.len());
        self.set_right_child(right);
    }
}

#[inline]
fn internal_cell_offset(index: usize) -> usize {
    INTERNAL_NODE_HEADER_SIZE + index * INTERNAL_NODE_CELL_SIZE
}

// ============================================================================
// TESTS
// ============================================================================
