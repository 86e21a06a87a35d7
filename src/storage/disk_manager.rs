//! Disk Manager - low-level file I/O for database pages.
//!
//! The [`DiskManager`] handles all direct file operations:
//! - Opening (or creating) the database file and validating its length
//! - Reading and writing whole pages
//! - Syncing the file at the end of a session

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use tracing::trace;

use crate::common::config::PAGE_SIZE;
use crate::common::{Error, PageId, Result};
use crate::storage::page::Page;

/// Manages disk I/O for a single database file.
///
/// # File Layout
/// The database is stored as a single file with pages laid out sequentially:
/// ```text
/// ┌─────────┬─────────┬─────────┬─────────┬─────────┐
/// │ Page 0  │ Page 1  │ Page 2  │  ...    │ Page N  │
/// │ (meta)  │ (node)  │ (node)  │         │ (node)  │
/// └─────────┴─────────┴─────────┴─────────┴─────────┘
/// Offset:  0      4096     8192    ...    N×4096
/// ```
///
/// Page N is located at file offset `N × PAGE_SIZE`. A file whose length
/// is not a multiple of `PAGE_SIZE` is rejected as corrupt.
///
/// # Durability
/// Writes are not synced individually. The pager writes every resident
/// page at close and then calls [`DiskManager::sync`] once.
pub struct DiskManager {
    file: File,
    /// Number of pages in the file.
    page_count: u32,
}

impl DiskManager {
    /// Open a database file, creating an empty one if it doesn't exist.
    ///
    /// # Errors
    /// - `Error::CorruptFile` if the file length is not a whole number of pages
    /// - I/O errors from opening the file
    pub fn open_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        let file_size = file.metadata()?.len();
        if file_size % PAGE_SIZE as u64 != 0 {
            return Err(Error::CorruptFile { len: file_size });
        }
        let page_count = (file_size / PAGE_SIZE as u64) as u32;

        Ok(Self { file, page_count })
    }

    /// Read a page from disk.
    ///
    /// # Errors
    /// Returns `Error::InvalidPageId` if the page is beyond the end of the file.
    pub fn read_page(&mut self, page_id: PageId) -> Result<Page> {
        if page_id.0 >= self.page_count {
            return Err(Error::InvalidPageId(page_id.0));
        }

        let offset = (page_id.0 as u64) * (PAGE_SIZE as u64);
        self.file.seek(SeekFrom::Start(offset))?;

        let mut page = Page::new();
        self.file.read_exact(page.as_mut_slice())?;
        trace!(page = page_id.0, "read page");

        Ok(page)
    }

    /// Write a page to disk, extending the file if needed.
    ///
    /// Writing past the current end leaves any gap zero-filled, so the file
    /// stays a whole number of pages.
    pub fn write_page(&mut self, page_id: PageId, page: &Page) -> Result<()> {
        let offset = (page_id.0 as u64) * (PAGE_SIZE as u64);
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(page.as_slice())?;

        self.page_count = self.page_count.max(page_id.0 + 1);
        Ok(())
    }

    /// Flush file contents and metadata to stable storage.
    pub fn sync(&mut self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }

    /// Get the number of pages in the database.
    #[inline]
    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    /// Get the total size of the database file in bytes.
    #[inline]
    pub fn file_size(&self) -> u64 {
        (self.page_count as u64) * (PAGE_SIZE as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_create_new_database() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");

        let dm = DiskManager::open_or_create(&path).unwrap();
        assert_eq!(dm.page_count(), 0);
        assert_eq!(dm.file_size(), 0);
        assert!(path.exists());
    }

    #[test]
    fn test_corrupt_length_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");
        std::fs::write(&path, vec![0u8; PAGE_SIZE + 1]).unwrap();

        match DiskManager::open_or_create(&path) {
            Err(Error::CorruptFile { len }) => assert_eq!(len, PAGE_SIZE as u64 + 1),
            other => panic!("expected CorruptFile, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_write_and_read_page() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");

        let mut dm = DiskManager::open_or_create(&path).unwrap();

        let mut page = Page::new();
        page.as_mut_slice()[0] = 0xAB;
        page.as_mut_slice()[4095] = 0xEF;
        dm.write_page(PageId::new(0), &page).unwrap();
        assert_eq!(dm.page_count(), 1);

        let read_page = dm.read_page(PageId::new(0)).unwrap();
        assert_eq!(read_page.as_slice()[0], 0xAB);
        assert_eq!(read_page.as_slice()[4095], 0xEF);
    }

    #[test]
    fn test_write_past_end_fills_gap() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");

        let mut dm = DiskManager::open_or_create(&path).unwrap();
        let mut page = Page::new();
        page.as_mut_slice()[0] = 5;
        dm.write_page(PageId::new(4), &page).unwrap();
        dm.sync().unwrap();

        assert_eq!(dm.page_count(), 5);
        assert_eq!(dm.file_size(), 5 * PAGE_SIZE as u64);
        assert_eq!(dm.read_page(PageId::new(2)).unwrap().as_slice()[0], 0);
        assert_eq!(dm.read_page(PageId::new(4)).unwrap().as_slice()[0], 5);
    }

    #[test]
    fn test_persistence() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");

        {
            let mut dm = DiskManager::open_or_create(&path).unwrap();
            let mut page = Page::new();
            page.as_mut_slice()[0] = 0x42;
            dm.write_page(PageId::new(1), &page).unwrap();
            dm.sync().unwrap();
        }

        {
            let mut dm = DiskManager::open_or_create(&path).unwrap();
            assert_eq!(dm.page_count(), 2);

            let page = dm.read_page(PageId::new(1)).unwrap();
            assert_eq!(page.as_slice()[0], 0x42);
        }
    }

    #[test]
    fn test_read_invalid_page() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");

        let mut dm = DiskManager::open_or_create(&path).unwrap();
        dm.write_page(PageId::new(0), &Page::new()).unwrap();

        assert!(dm.read_page(PageId::new(1)).is_err());
    }
}
