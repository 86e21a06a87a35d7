//! Page identifier type.

use std::fmt;

/// Identifies a page in the database file.
///
/// Page 0 is the metadata page; tree nodes live on pages 1 and up.
///
/// On disk, "no page" (a missing parent or sibling) is written as
/// [`PageId::INVALID`]. In memory it is always `Option<PageId>`; use
/// [`PageId::from_raw`] and [`PageId::to_raw`] at the byte boundary.
///
/// # Example
/// ```
/// use stratadb::PageId;
///
/// let page_id = PageId::new(42);
/// assert!(page_id.is_valid());
/// assert_eq!(PageId::from_raw(42), Some(page_id));
/// assert_eq!(PageId::from_raw(u32::MAX), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId(pub u32);

impl PageId {
    /// Invalid/sentinel page ID, the on-disk encoding of "no page".
    pub const INVALID: PageId = PageId(u32::MAX);

    /// The metadata page.
    pub const META: PageId = PageId(0);

    /// Create a new PageId.
    #[inline]
    pub fn new(id: u32) -> Self {
        PageId(id)
    }

    /// Check if this page ID is valid (not the sentinel value).
    #[inline]
    pub fn is_valid(&self) -> bool {
        *self != Self::INVALID
    }

    /// Decode a raw on-disk page pointer.
    #[inline]
    pub fn from_raw(raw: u32) -> Option<PageId> {
        let id = PageId(raw);
        id.is_valid().then_some(id)
    }

    /// Encode an optional page pointer for disk.
    #[inline]
    pub fn to_raw(id: Option<PageId>) -> u32 {
        id.unwrap_or(Self::INVALID).0
    }

    /// Index of this page in slot-indexed storage.
    #[inline]
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::INVALID {
            write!(f, "Page(INVALID)")
        } else {
            write!(f, "Page({})", self.0)
        }
    }
}
