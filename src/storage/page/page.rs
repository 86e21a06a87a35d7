//! Page - the fundamental 4KB unit of storage.
//!
//! A [`Page`] is a raw 4KB byte array that serves as the unit of I/O
//! between disk and memory. The [`Pager`](crate::buffer::Pager) owns every
//! resident page; the B+Tree reads and writes them through the typed views
//! in [`crate::index::btree::node`].

use crate::common::config::PAGE_SIZE;
use crate::common::PageId;

use super::node_header::{NodeHeader, NodeType};

/// A page of data (4KB, 4KB-aligned).
///
/// # Memory Layout
/// - Size: 4096 bytes (4KB)
/// - Alignment: 4096 bytes
///
/// # Clone Implementation
/// `Page` does NOT implement `Clone` in production code; copying 4KB
/// should be explicit, see [`Page::copy_from`]. A `#[cfg(test)]` Clone is
/// provided for tests.
///
/// # Example
/// ```
/// use stratadb::storage::page::Page;
///
/// let mut page = Page::new();
/// page.write_u32(8, 0xDEADBEEF);
/// assert_eq!(page.read_u32(8), 0xDEADBEEF);
/// ```
#[repr(align(4096))]
pub struct Page {
    data: [u8; PAGE_SIZE],
}

impl Page {
    /// Create a new zeroed page.
    #[inline]
    pub fn new() -> Self {
        Self {
            data: [0u8; PAGE_SIZE],
        }
    }

    /// Get immutable slice of page data.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Get mutable slice of page data.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Overwrite this page with the contents of another.
    pub fn copy_from(&mut self, other: &Page) {
        self.data.copy_from_slice(&other.data);
    }

    /// Get the size of a page.
    #[inline]
    pub const fn size() -> usize {
        PAGE_SIZE
    }

    // ========================================================================
    // Little-endian field access
    // ========================================================================

    /// Read a little-endian u32 at `offset`.
    ///
    /// # Panics
    /// Panics if `offset + 4 > PAGE_SIZE`.
    #[inline]
    pub fn read_u32(&self, offset: usize) -> u32 {
        u32::from_le_bytes([
            self.data[offset],
            self.data[offset + 1],
            self.data[offset + 2],
            self.data[offset + 3],
        ])
    }

    /// Write a little-endian u32 at `offset`.
    ///
    /// # Panics
    /// Panics if `offset + 4 > PAGE_SIZE`.
    #[inline]
    pub fn write_u32(&mut self, offset: usize, value: u32) {
        self.data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    }

    // ========================================================================
    // Node header access
    // ========================================================================

    /// Read the node header, or `None` if the type byte is unknown.
    pub fn header(&self) -> Option<NodeHeader> {
        NodeHeader::from_bytes(&self.data)
    }

    /// Write a node header.
    pub fn set_header(&mut self, header: &NodeHeader) {
        header.write_to(&mut self.data);
    }

    /// The node type byte, decoded.
    #[inline]
    pub fn node_type(&self) -> Option<NodeType> {
        NodeType::from_u8(self.data[NodeHeader::OFFSET_NODE_TYPE])
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.data[NodeHeader::OFFSET_IS_ROOT] != 0
    }

    #[inline]
    pub fn set_root(&mut self, is_root: bool) {
        self.data[NodeHeader::OFFSET_IS_ROOT] = u8::from(is_root);
    }

    #[inline]
    pub fn parent(&self) -> Option<PageId> {
        PageId::from_raw(self.read_u32(NodeHeader::OFFSET_PARENT))
    }

    #[inline]
    pub fn set_parent(&mut self, parent: Option<PageId>) {
        self.write_u32(NodeHeader::OFFSET_PARENT, PageId::to_raw(parent));
    }

    #[inline]
    pub fn next_sibling(&self) -> Option<PageId> {
        PageId::from_raw(self.read_u32(NodeHeader::OFFSET_NEXT))
    }

    #[inline]
    pub fn set_next_sibling(&mut self, next: Option<PageId>) {
        self.write_u32(NodeHeader::OFFSET_NEXT, PageId::to_raw(next));
    }

    #[inline]
    pub fn prev_sibling(&self) -> Option<PageId> {
        PageId::from_raw(self.read_u32(NodeHeader::OFFSET_PREV))
    }

    #[inline]
    pub fn set_prev_sibling(&mut self, prev: Option<PageId>) {
        self.write_u32(NodeHeader::OFFSET_PREV, PageId::to_raw(prev));
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new()
    }
}

// Clone only available in tests - forces explicit copying in production
#[cfg(test)]
impl Clone for Page {
    fn clone(&self) -> Self {
        let mut new_page = Page::new();
        new_page.data.copy_from_slice(&self.data);
        new_page
    }
}

// ============================================================================
// TESTS
// ============================================================================
