//! Configuration constants for StrataDB.
//!
//! Layout constants are compile-time (they define the on-disk format).
//! [`StoreConfig`] carries the few knobs that may differ per open.

use crate::common::{Error, Result};

/// Size of a page in bytes (4KB).
///
/// Every page in the database file, including the metadata page 0, is
/// exactly this size. Page N lives at file offset `N × PAGE_SIZE`.
pub const PAGE_SIZE: usize = 4096;

/// Default ceiling on the number of pages a database may hold.
///
/// The page cache has one slot per page number, and page 0 keeps one
/// in-use byte per page number, so this bounds both memory and file size.
pub const TABLE_MAX_PAGES: usize = 400;

/// Largest `max_pages` the page-0 layout can track.
///
/// Page 0 holds a 4-byte root pointer, one bitmap byte per page and a
/// trailing 4-byte CRC32.
pub const MAX_TRACKED_PAGES: usize = PAGE_SIZE - 8;

/// Maximum cells in a leaf node. Kept tiny so splits happen constantly.
pub const LEAF_NODE_MAX_CELLS: usize = 3;

/// Minimum cells in a non-root leaf.
pub const LEAF_NODE_MIN_CELLS: usize = (LEAF_NODE_MAX_CELLS + 1) / 2;

/// Maximum keys in an internal node (it then has `keys + 1` children).
pub const INTERNAL_NODE_MAX_KEYS: usize = 3;

/// Minimum keys in a non-root internal node.
pub const INTERNAL_NODE_MIN_KEYS: usize = INTERNAL_NODE_MAX_KEYS / 2;

/// Maximum username length in bytes.
pub const COLUMN_USERNAME_SIZE: usize = 32;

/// Maximum email length in bytes.
pub const COLUMN_EMAIL_SIZE: usize = 255;

/// Per-open settings for the page store.
///
/// # Example
/// ```
/// use stratadb::common::config::StoreConfig;
///
/// let config = StoreConfig::default().with_max_pages(64);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreConfig {
    /// Number of page slots (page 0 included).
    pub max_pages: usize,
}

impl StoreConfig {
    /// Create a config with the given page ceiling.
    pub fn new(max_pages: usize) -> Self {
        Self { max_pages }
    }

    /// Builder-style override of the page ceiling.
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Check the config against the page-0 layout.
    ///
    /// # Errors
    /// Returns `Error::InvalidConfig` if `max_pages` is below 2 (metadata
    /// plus a root) or above [`MAX_TRACKED_PAGES`].
    pub fn validate(&self) -> Result<()> {
        if self.max_pages < 2 {
            return Err(Error::InvalidConfig(format!(
                "max_pages must be at least 2, got {}",
                self.max_pages
            )));
        }
        if self.max_pages > MAX_TRACKED_PAGES {
            return Err(Error::InvalidConfig(format!(
                "max_pages {} exceeds the {} pages page 0 can track",
                self.max_pages, MAX_TRACKED_PAGES
            )));
        }
        Ok(())
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::new(TABLE_MAX_PAGES)
    }
}
