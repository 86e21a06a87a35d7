//! Pager statistics tracking.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Statistics tracked by the pager.
///
/// Counters are atomic so they can be bumped through `&self` and read
/// without borrowing the pager mutably.
///
/// # Memory Ordering
/// All operations use `Ordering::Relaxed`: counters are independent and
/// only need atomicity.
///
/// # Example
/// ```
/// use stratadb::buffer::PagerStats;
/// use std::sync::atomic::Ordering;
///
/// let stats = PagerStats::new();
/// stats.cache_hits.fetch_add(1, Ordering::Relaxed);
/// assert_eq!(stats.cache_hits.load(Ordering::Relaxed), 1);
/// ```
#[derive(Debug)]
pub struct PagerStats {
    /// Number of times a requested page was already resident.
    pub cache_hits: AtomicU64,

    /// Number of times a page slot had to be filled (from disk or zeroed).
    pub cache_misses: AtomicU64,

    /// Number of pages read from the file.
    pub pages_read: AtomicU64,

    /// Number of pages written to the file.
    pub pages_written: AtomicU64,

    /// Number of pages handed out by `allocate`.
    pub pages_allocated: AtomicU64,

    /// Number of pages returned by `free`.
    pub pages_freed: AtomicU64,
}

impl PagerStats {
    /// Create a new stats tracker with all counters at zero.
    pub fn new() -> Self {
        Self {
            cache_hits: AtomicU64::new(0),
            cache_misses: AtomicU64::new(0),
            pages_read: AtomicU64::new(0),
            pages_written: AtomicU64::new(0),
            pages_allocated: AtomicU64::new(0),
            pages_freed: AtomicU64::new(0),
        }
    }

    #[inline]
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Calculate cache hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        self.snapshot().hit_rate()
    }

    /// Get a non-atomic copy for display/logging.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            pages_read: self.pages_read.load(Ordering::Relaxed),
            pages_written: self.pages_written.load(Ordering::Relaxed),
            pages_allocated: self.pages_allocated.load(Ordering::Relaxed),
            pages_freed: self.pages_freed.load(Ordering::Relaxed),
        }
    }

}

impl Default for PagerStats {
    fn default() -> Self {
        Self::new()
    }
}

/// A point-in-time snapshot of pager statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub pages_read: u64,
    pub pages_written: u64,
    pub pages_allocated: u64,
    pub pages_freed: u64,
}

impl StatsSnapshot {
    /// Calculate cache hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 {
            0.0
        } else {
            self.cache_hits as f64 / total as f64
        }
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Stats {{ hits: {}, misses: {}, hit_rate: {:.2}%, read: {}, written: {}, allocated: {}, freed: {} }}",
            self.cache_hits,
            self.cache_misses,
            self.hit_rate() * 100.0,
            self.pages_read,
            self.pages_written,
            self.pages_allocated,
            self.pages_freed
        )
    }
}
