//! Node header and type definitions.
//!
//! Every tree page (page 1 and up) starts with a [`NodeHeader`]:
//! - [`NodeType`] discriminator
//! - root flag
//! - parent pointer
//! - next/prev sibling pointers (one chain per tree level)

use crate::common::PageId;

/// Kind of node stored on a tree page.
///
/// Uses `#[repr(u8)]` to guarantee a 1-byte representation for serialization.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    /// Routing node: separator keys and child pointers.
    Internal = 0,
    /// Data node: keys and row values.
    Leaf = 1,
}

impl NodeType {
    /// Convert from u8, returning None for unknown values.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(NodeType::Internal),
            1 => Some(NodeType::Leaf),
            _ => None,
        }
    }
}

/// Metadata stored at the beginning of every tree page.
///
/// # Layout (14 bytes)
/// ```text
/// Offset  Size  Field
/// ------  ----  -----
/// 0       1     node_type (NodeType as u8)
/// 1       1     is_root (0 or 1)
/// 2       4     parent page (little-endian, u32::MAX = none)
/// 6       4     next sibling page (little-endian, u32::MAX = none)
/// 10      4     prev sibling page (little-endian, u32::MAX = none)
/// ```
///
/// The sibling chain spans a whole tree level, not just the children of
/// one parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeHeader {
    /// Leaf or internal.
    pub node_type: NodeType,
    /// True only for the page the metadata root pointer names.
    pub is_root: bool,
    /// Parent node, `None` for the root.
    pub parent: Option<PageId>,
    /// Next node on the same level, in ascending key order.
    pub next: Option<PageId>,
    /// Previous node on the same level.
    pub prev: Option<PageId>,
}

impl NodeHeader {
    /// Size of the header in bytes.
    pub const SIZE: usize = 14;

    /// Offset of each field within the header.
    pub const OFFSET_NODE_TYPE: usize = 0;
    pub const OFFSET_IS_ROOT: usize = 1;
    pub const OFFSET_PARENT: usize = 2;
    pub const OFFSET_NEXT: usize = 6;
    pub const OFFSET_PREV: usize = 10;

    /// Create a detached, non-root header of the given type.
    pub fn new(node_type: NodeType) -> Self {
        Self {
            node_type,
            is_root: false,
            parent: None,
            next: None,
            prev: None,
        }
    }

    /// Read a header from the beginning of a byte slice.
    ///
    /// Returns `None` if the type byte is not a known [`NodeType`].
    ///
    /// # Panics
    /// Panics if `data.len() < NodeHeader::SIZE`.
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        assert!(data.len() >= Self::SIZE, "buffer too small for NodeHeader");

        let node_type = NodeType::from_u8(data[Self::OFFSET_NODE_TYPE])?;
        let is_root = data[Self::OFFSET_IS_ROOT] != 0;

        Some(Self {
            node_type,
            is_root,
            parent: PageId::from_raw(read_u32(data, Self::OFFSET_PARENT)),
            next: PageId::from_raw(read_u32(data, Self::OFFSET_NEXT)),
            prev: PageId::from_raw(read_u32(data, Self::OFFSET_PREV)),
        })
    }

    /// Write this header to the beginning of a byte slice.
    ///
    /// # Panics
    /// Panics if `data.len() < NodeHeader::SIZE`.
    pub fn write_to(&self, data: &mut [u8]) {
        assert!(data.len() >= Self::SIZE, "buffer too small for NodeHeader");

        data[Self::OFFSET_NODE_TYPE] = self.node_type as u8;
        data[Self::OFFSET_IS_ROOT] = u8::from(self.is_root);
        write_u32(data, Self::OFFSET_PARENT, PageId::to_raw(self.parent));
        write_u32(data, Self::OFFSET_NEXT, PageId::to_raw(self.next));
        write_u32(data, Self::OFFSET_PREV, PageId::to_raw(self.prev));
    }
}

#[inline]
fn read_u32(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ])
}

#[inline]
fn write_u32(data: &mut [u8], offset: usize, value: u32) {
    data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

// ============================================================================
// TESTS
// ============================================================================
