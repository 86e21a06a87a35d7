//! Page-0 metadata: root pointer, in-use bitmap and checksum.

use crate::common::config::PAGE_SIZE;
use crate::common::{Error, PageId, Result};
use crate::storage::page::Page;

/// Typed view over the metadata page.
///
/// # Layout
/// ```text
/// Offset          Size        Field
/// ------          ----        -----
/// 0               4           root page number (little-endian)
/// 4               max_pages   in-use bitmap, one byte per page (0 free, 1 used)
/// PAGE_SIZE-4     4           CRC32 of bytes [0, PAGE_SIZE-4)
/// ```
///
/// Byte 4 (page 0's own entry) is always set.
pub struct MetaPage {
    page: Page,
    max_pages: usize,
}

impl MetaPage {
    const OFFSET_ROOT: usize = 0;
    const OFFSET_BITMAP: usize = 4;
    const OFFSET_CHECKSUM: usize = PAGE_SIZE - 4;

    /// Metadata for an empty database: only page 0 in use, root at page 1.
    pub fn fresh(max_pages: usize) -> Self {
        let mut meta = Self {
            page: Page::new(),
            max_pages,
        };
        meta.set_root(PageId::new(1));
        meta.set_used(PageId::META, true);
        meta
    }

    /// Wrap a page read from disk, checking its checksum and root pointer.
    ///
    /// # Errors
    /// - `Error::MetaChecksumMismatch` if the stored CRC32 disagrees
    /// - `Error::InvalidRoot` if the root pointer is outside the bitmap
    /// - `Error::InvalidConfig` if pages beyond `max_pages` are marked in use
    pub fn load(page: Page, max_pages: usize) -> Result<Self> {
        let stored = page.read_u32(Self::OFFSET_CHECKSUM);
        if stored != checksum(&page) {
            return Err(Error::MetaChecksumMismatch);
        }

        let untracked = &page.as_slice()[Self::OFFSET_BITMAP + max_pages..Self::OFFSET_CHECKSUM];
        if untracked.iter().any(|&b| b != 0) {
            return Err(Error::InvalidConfig(format!(
                "database uses pages beyond max_pages {}",
                max_pages
            )));
        }

        let mut meta = Self { page, max_pages };
        let root = meta.root();
        if root == PageId::META || root.index() >= max_pages {
            return Err(Error::InvalidRoot(root.0));
        }
        meta.set_used(PageId::META, true);
        Ok(meta)
    }

    /// Stamp the checksum and expose the bytes for writing.
    pub fn seal(&mut self) -> &Page {
        let crc = checksum(&self.page);
        self.page.write_u32(Self::OFFSET_CHECKSUM, crc);
        &self.page
    }

    #[inline]
    pub fn root(&self) -> PageId {
        PageId::new(self.page.read_u32(Self::OFFSET_ROOT))
    }

    #[inline]
    pub fn set_root(&mut self, root: PageId) {
        self.page.write_u32(Self::OFFSET_ROOT, root.0);
    }

    /// Whether the bitmap marks `page_id` in use. Out-of-range pages are free.
    #[inline]
    pub fn is_used(&self, page_id: PageId) -> bool {
        page_id.index() < self.max_pages
            && self.page.as_slice()[Self::OFFSET_BITMAP + page_id.index()] != 0
    }

    /// Set or clear the in-use byte for `page_id`.
    ///
    /// # Panics
    /// Panics if `page_id` is outside the tracked range.
    #[inline]
    pub fn set_used(&mut self, page_id: PageId, used: bool) {
        assert!(page_id.index() < self.max_pages, "page outside bitmap");
        self.page.as_mut_slice()[Self::OFFSET_BITMAP + page_id.index()] = u8::from(used);
    }

    /// Lowest-numbered free page, first-fit.
    pub fn first_free(&self) -> Option<PageId> {
        self.bitmap()
            .iter()
            .position(|&b| b == 0)
            .map(|i| PageId::new(i as u32))
    }

    /// Number of pages marked in use, page 0 included.
    pub fn used_count(&self) -> usize {
        self.bitmap().iter().filter(|&&b| b != 0).count()
    }

    #[inline]
    pub fn max_pages(&self) -> usize {
        self.max_pages
    }

    fn bitmap(&self) -> &[u8] {
        &self.page.as_slice()[Self::OFFSET_BITMAP..Self::OFFSET_BITMAP + self.max_pages]
    }
}

fn checksum(page: &Page) -> u32 {
    crc32fast::hash(&page.as_slice()[..MetaPage::OFFSET_CHECKSUM])
}
