//! Pager - the page store between the B+Tree and the database file.
//!
//! The [`Pager`] provides:
//! - A slot per page number, filled lazily from disk
//! - First-fit page allocation over the page-0 bitmap
//! - Freeing with sibling-chain unlinking
//! - Whole-session durability: every resident page is written at close

use std::path::Path;

use tracing::{debug, info, trace};

use crate::buffer::meta::MetaPage;
use crate::buffer::stats::PagerStats;
use crate::common::config::StoreConfig;
use crate::common::{Error, PageId, Result};
use crate::storage::page::Page;
use crate::storage::DiskManager;

/// Owns every in-memory page of one database file.
///
/// # Architecture
/// ```text
/// ┌─────────────────────────────────────────────────────────────┐
/// │                           Pager                             │
/// │  ┌──────────────┐  ┌───────────────────────────────────┐   │
/// │  │  MetaPage    │  │   slots: Vec<Option<Box<Page>>>   │   │
/// │  │ root+bitmap  │  │  [ - ] [P1] [ - ] [P3] ...        │   │
/// │  └──────────────┘  └───────────────────────────────────┘   │
/// │  ┌──────────────┐  ┌──────────────┐                        │
/// │  │ DiskManager  │  │ PagerStats   │                        │
/// │  └──────────────┘  └──────────────┘                        │
/// └─────────────────────────────────────────────────────────────┘
/// ```
///
/// Page 0 is held as a [`MetaPage`] and never appears in `slots`. Slots are
/// indexed by page number, so there is at most one in-memory copy of each
/// page and nothing is ever evicted.
///
/// # Usage
/// ```no_run
/// use stratadb::buffer::Pager;
/// use stratadb::common::config::StoreConfig;
///
/// let mut pager = Pager::open("my.db", StoreConfig::default())?;
/// let page_id = pager.allocate()?;
/// pager.get_mut(page_id)?.write_u32(100, 7);
/// pager.close()?;
/// # Ok::<(), stratadb::Error>(())
/// ```
pub struct Pager {
    disk: DiskManager,
    meta: MetaPage,
    slots: Vec<Option<Box<Page>>>,
    /// True if the file held no pages when opened.
    fresh: bool,
    stats: PagerStats,
}

impl Pager {
    /// Open or create a database file.
    ///
    /// # Errors
    /// - `Error::InvalidConfig` if `config` is rejected
    /// - `Error::CorruptFile` if the file length is not a whole number of
    ///   pages
    /// - `Error::InvalidRoot` if the root pointer is out of range
    /// - `Error::MetaChecksumMismatch` if page 0 fails its checksum
    pub fn open<P: AsRef<Path>>(path: P, config: StoreConfig) -> Result<Self> {
        config.validate()?;
        let path = path.as_ref();
        let mut disk = DiskManager::open_or_create(path)?;

        let fresh = disk.page_count() == 0;
        let meta = if fresh {
            MetaPage::fresh(config.max_pages)
        } else {
            let page = disk.read_page(PageId::META)?;
            MetaPage::load(page, config.max_pages)?
        };

        let mut slots = Vec::with_capacity(config.max_pages);
        slots.resize_with(config.max_pages, || None);

        info!(
            path = %path.display(),
            pages = disk.page_count(),
            root = meta.root().0,
            fresh,
            "opened database"
        );

        Ok(Self {
            disk,
            meta,
            slots,
            fresh,
            stats: PagerStats::new(),
        })
    }

    /// Get a page, loading it on first access.
    ///
    /// Pages the bitmap marks in use are read from the file; anything else
    /// starts zeroed.
    ///
    /// # Errors
    /// - `Error::InvalidPageId` for page 0 or the sentinel
    /// - `Error::PageOutOfBounds` if `page_id >= max_pages`
    pub fn get(&mut self, page_id: PageId) -> Result<&Page> {
        let idx = self.make_resident(page_id)?;
        self.slots[idx]
            .as_deref()
            .ok_or(Error::InvalidPageId(page_id.0))
    }

    /// Mutable access to a page, loading it on first access.
    ///
    /// # Errors
    /// Same as [`Pager::get`].
    pub fn get_mut(&mut self, page_id: PageId) -> Result<&mut Page> {
        let idx = self.make_resident(page_id)?;
        self.slots[idx]
            .as_deref_mut()
            .ok_or(Error::InvalidPageId(page_id.0))
    }

    /// Overwrite page `to` with the bytes of page `from`.
    pub fn copy_page(&mut self, from: PageId, to: PageId) -> Result<()> {
        let mut scratch = Box::new(Page::new());
        scratch.copy_from(self.get(from)?);
        self.get_mut(to)?.copy_from(&scratch);
        Ok(())
    }

    /// Mark the lowest-numbered free page in use and return it.
    ///
    /// The page's bytes are left as they are; callers initialize it.
    ///
    /// # Errors
    /// Returns `Error::StoreFull` if every page is in use.
    pub fn allocate(&mut self) -> Result<PageId> {
        let page_id = self.meta.first_free().ok_or(Error::StoreFull {
            max: self.meta.max_pages(),
        })?;
        self.meta.set_used(page_id, true);
        PagerStats::bump(&self.stats.pages_allocated);
        trace!(page = page_id.0, "allocated page");
        Ok(page_id)
    }

    /// Unlink a page from its sibling chain and mark it free.
    ///
    /// The neighbours are rewritten to point past the page. The page's own
    /// bytes are not touched.
    ///
    /// # Errors
    /// Returns `Error::InvalidPageId` if the page is not in use.
    pub fn free(&mut self, page_id: PageId) -> Result<()> {
        if !self.is_allocated(page_id) {
            return Err(Error::InvalidPageId(page_id.0));
        }

        let (prev, next) = {
            let page = self.get(page_id)?;
            (page.prev_sibling(), page.next_sibling())
        };
        if let Some(prev) = prev {
            self.get_mut(prev)?.set_next_sibling(next);
        }
        if let Some(next) = next {
            self.get_mut(next)?.set_prev_sibling(prev);
        }

        self.meta.set_used(page_id, false);
        PagerStats::bump(&self.stats.pages_freed);
        trace!(page = page_id.0, ?prev, ?next, "freed page");
        Ok(())
    }

    /// Write page 0 and every resident page to the file.
    pub fn flush_all(&mut self) -> Result<()> {
        self.disk.write_page(PageId::META, self.meta.seal())?;
        PagerStats::bump(&self.stats.pages_written);

        let mut written = 0usize;
        for (idx, slot) in self.slots.iter().enumerate() {
            if let Some(page) = slot {
                self.disk.write_page(PageId::new(idx as u32), page)?;
                PagerStats::bump(&self.stats.pages_written);
                written += 1;
            }
        }

        debug!(pages = written + 1, "flushed resident pages");
        Ok(())
    }

    /// Flush everything and sync the file. The session's only durability point.
    pub fn close(mut self) -> Result<()> {
        self.flush_all()?;
        self.disk.sync()?;
        info!(
            pages = self.disk.page_count(),
            root = self.meta.root().0,
            "closed database"
        );
        Ok(())
    }

    // ========================================================================
    // Metadata
    // ========================================================================

    /// The persisted root page.
    #[inline]
    pub fn root(&self) -> PageId {
        self.meta.root()
    }

    /// Change the persisted root page.
    #[inline]
    pub fn set_root(&mut self, root: PageId) {
        self.meta.set_root(root);
    }

    /// Whether the file was empty when opened.
    #[inline]
    pub fn is_fresh(&self) -> bool {
        self.fresh
    }

    /// Whether the bitmap marks `page_id` in use.
    #[inline]
    pub fn is_allocated(&self, page_id: PageId) -> bool {
        page_id != PageId::META && self.meta.is_used(page_id)
    }

    /// Number of pages in use, page 0 included.
    #[inline]
    pub fn allocated_count(&self) -> usize {
        self.meta.used_count()
    }

    /// Number of pages `allocate` can still hand out.
    #[inline]
    pub fn free_count(&self) -> usize {
        self.meta.max_pages() - self.meta.used_count()
    }

    #[inline]
    pub fn max_pages(&self) -> usize {
        self.meta.max_pages()
    }

    #[inline]
    pub fn stats(&self) -> &PagerStats {
        &self.stats
    }

    // ========================================================================
    // Internal helpers
    // ========================================================================

    fn check_id(&self, page_id: PageId) -> Result<usize> {
        if page_id == PageId::META || !page_id.is_valid() {
            return Err(Error::InvalidPageId(page_id.0));
        }
        if page_id.index() >= self.slots.len() {
            return Err(Error::PageOutOfBounds {
                page: page_id.0,
                max: self.slots.len(),
            });
        }
        Ok(page_id.index())
    }

    fn make_resident(&mut self, page_id: PageId) -> Result<usize> {
        let idx = self.check_id(page_id)?;
        if self.slots[idx].is_some() {
            PagerStats::bump(&self.stats.cache_hits);
            return Ok(idx);
        }

        PagerStats::bump(&self.stats.cache_misses);
        let page = if self.meta.is_used(page_id) && page_id.0 < self.disk.page_count() {
            PagerStats::bump(&self.stats.pages_read);
            trace!(page = page_id.0, "loading page from disk");
            self.disk.read_page(page_id)?
        } else {
            Page::new()
        };
        self.slots[idx] = Some(Box::new(page));
        Ok(idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::page::{NodeHeader, NodeType};
    use tempfile::tempdir;

    fn small_config() -> StoreConfig {
        StoreConfig::new(8)
    }

    #[test]
    fn test_fresh_open() {
        let dir = tempdir().unwrap();
        let pager = Pager::open(dir.path().join("test.db"), small_config()).unwrap();

        assert!(pager.is_fresh());
        assert_eq!(pager.root(), PageId::new(1));
        assert_eq!(pager.allocated_count(), 1);
        assert_eq!(pager.free_count(), 7);
    }

    #[test]
    fn test_allocate_first_fit() {
        let dir = tempdir().unwrap();
        let mut pager = Pager::open(dir.path().join("test.db"), small_config()).unwrap();

        let p1 = pager.allocate().unwrap();
        let p2 = pager.allocate().unwrap();
        let p3 = pager.allocate().unwrap();
        assert_eq!((p1.0, p2.0, p3.0), (1, 2, 3));

        pager.get_mut(p2).unwrap().set_header(&NodeHeader::new(NodeType::Leaf));
        pager.free(p2).unwrap();
        assert!(!pager.is_allocated(p2));
        assert_eq!(pager.allocate().unwrap(), p2);
    }

    #[test]
    fn test_store_full() {
        let dir = tempdir().unwrap();
        let mut pager = Pager::open(dir.path().join("test.db"), StoreConfig::new(3)).unwrap();

        pager.allocate().unwrap();
        pager.allocate().unwrap();
        assert!(matches!(pager.allocate(), Err(Error::StoreFull { max: 3 })));
    }

    #[test]
    fn test_page_bounds() {
        let dir = tempdir().unwrap();
        let mut pager = Pager::open(dir.path().join("test.db"), small_config()).unwrap();

        assert!(matches!(pager.get(PageId::META), Err(Error::InvalidPageId(0))));
        assert!(matches!(
            pager.get(PageId::INVALID),
            Err(Error::InvalidPageId(_))
        ));
        assert!(matches!(
            pager.get(PageId::new(8)),
            Err(Error::PageOutOfBounds { page: 8, max: 8 })
        ));
        assert!(pager.get(PageId::new(7)).is_ok());
    }

    #[test]
    fn test_free_unlinks_siblings() {
        let dir = tempdir().unwrap();
        let mut pager = Pager::open(dir.path().join("test.db"), small_config()).unwrap();

        let a = pager.allocate().unwrap();
        let b = pager.allocate().unwrap();
        let c = pager.allocate().unwrap();
        for id in [a, b, c] {
            pager.get_mut(id).unwrap().set_header(&NodeHeader::new(NodeType::Leaf));
        }
        pager.get_mut(a).unwrap().set_next_sibling(Some(b));
        pager.get_mut(b).unwrap().set_prev_sibling(Some(a));
        pager.get_mut(b).unwrap().set_next_sibling(Some(c));
        pager.get_mut(c).unwrap().set_prev_sibling(Some(b));

        pager.free(b).unwrap();

        assert_eq!(pager.get(a).unwrap().next_sibling(), Some(c));
        assert_eq!(pager.get(c).unwrap().prev_sibling(), Some(a));
        assert!(matches!(pager.free(b), Err(Error::InvalidPageId(_))));
    }

    #[test]
    fn test_close_and_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");

        {
            let mut pager = Pager::open(&path, small_config()).unwrap();
            let id = pager.allocate().unwrap();
            pager.get_mut(id).unwrap().write_u32(64, 0xCAFE);
            pager.set_root(id);
            pager.close().unwrap();
        }

        {
            let mut pager = Pager::open(&path, small_config()).unwrap();
            assert!(!pager.is_fresh());
            assert!(pager.is_allocated(PageId::new(1)));
            assert_eq!(pager.get(PageId::new(1)).unwrap().read_u32(64), 0xCAFE);
            assert_eq!(pager.stats().snapshot().pages_read, 1);

            pager.get(PageId::new(1)).unwrap();
            assert_eq!(pager.stats().snapshot().cache_hits, 1);
        }
    }

    #[test]
    fn test_unallocated_page_starts_zeroed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");

        {
            let mut pager = Pager::open(&path, small_config()).unwrap();
            let id = pager.allocate().unwrap();
            pager.get_mut(id).unwrap().set_header(&NodeHeader::new(NodeType::Leaf));
            pager.get_mut(id).unwrap().write_u32(64, 9);
            pager.free(id).unwrap();
            pager.close().unwrap();
        }

        let mut pager = Pager::open(&path, small_config()).unwrap();
        assert_eq!(pager.get(PageId::new(1)).unwrap().read_u32(64), 0);
        assert_eq!(pager.stats().snapshot().pages_read, 0);
    }

    #[test]
    fn test_copy_page() {
        let dir = tempdir().unwrap();
        let mut pager = Pager::open(dir.path().join("test.db"), small_config()).unwrap();

        let a = pager.allocate().unwrap();
        let b = pager.allocate().unwrap();
        pager.get_mut(a).unwrap().write_u32(200, 77);
        pager.copy_page(a, b).unwrap();
        assert_eq!(pager.get(b).unwrap().read_u32(200), 77);
    }

    #[test]
    fn test_corrupt_meta_checksum() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");

        Pager::open(&path, small_config()).unwrap().close().unwrap();

        let mut bytes = std::fs::read(&path).unwrap();
        bytes[0] ^= 0x01;
        std::fs::write(&path, bytes).unwrap();

        assert!(matches!(
            Pager::open(&path, small_config()),
            Err(Error::MetaChecksumMismatch)
        ));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            Pager::open(dir.path().join("test.db"), StoreConfig::new(1)),
            Err(Error::InvalidConfig(_))
        ));
    }
}
