//! Error types for StrataDB.

use thiserror::Error;

use crate::common::PageId;

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// All possible errors in StrataDB.
///
/// Variants fall into three groups:
/// - validation errors from command parsing (nothing was touched),
/// - logical errors from the tree (nothing was touched),
/// - structural errors (I/O, corruption, capacity, configuration).
///
/// [`Error::is_fatal`] decides whether the session can go on. Every
/// validation and logical error is recoverable. So are `StoreFull` and
/// `InvalidConfig`, which are raised before any page changes. The other
/// structural errors are fatal.
#[derive(Debug, Error)]
pub enum Error {
    // ------------------------------------------------------------------
    // Validation
    // ------------------------------------------------------------------
    /// A row id was negative.
    #[error("ID must be positive.")]
    NegativeId,

    /// A string column exceeded its fixed capacity.
    #[error("String is too long: {field} holds at most {max} bytes.")]
    StringTooLong { field: &'static str, max: usize },

    /// A statement had missing, extra or malformed arguments.
    #[error("Syntax error: {0}")]
    Syntax(String),

    /// The statement keyword was not recognized.
    #[error("Unrecognized keyword at start of '{0}'.")]
    UnrecognizedStatement(String),

    /// The meta-command was not recognized.
    #[error("Unrecognized command '{0}'.")]
    UnrecognizedMetaCommand(String),

    // ------------------------------------------------------------------
    // Logical
    // ------------------------------------------------------------------
    /// Insert of a key that is already present.
    #[error("Duplicate key {0}.")]
    DuplicateKey(u32),

    /// Delete/select/update of a key that is not present.
    #[error("Key {0} not found.")]
    KeyNotFound(u32),

    /// A cursor was read after it ran off the end of the table.
    #[error("Cursor is past the end of the table")]
    EndOfTable,

    // ------------------------------------------------------------------
    // Structural
    // ------------------------------------------------------------------
    /// I/O error from disk operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Database file length is not a whole number of pages.
    #[error("Db file is not a whole number of pages ({len} bytes). Corrupt file.")]
    CorruptFile { len: u64 },

    /// The persisted root pointer does not name an allocated page.
    #[error("Root pointer {0} does not name an allocated page. Corrupt file.")]
    InvalidRoot(u32),

    /// The persisted metadata page failed its checksum.
    #[error("Metadata page checksum mismatch. Corrupt file.")]
    MetaChecksumMismatch,

    /// Page bytes could not be interpreted as a node.
    #[error("Corrupt node on {page}: {reason}")]
    CorruptNode { page: PageId, reason: String },

    /// The page number is reserved (page 0) or the invalid sentinel.
    #[error("Invalid page ID: {0}")]
    InvalidPageId(u32),

    /// The page number is beyond the configured page ceiling.
    #[error("Tried to fetch page number out of bounds. {page} >= {max}")]
    PageOutOfBounds { page: u32, max: usize },

    /// Every trackable page is in use.
    #[error("Page store is full ({max} pages)")]
    StoreFull { max: usize },

    /// Rebalancing found no neighbour sharing the underflowing node's parent.
    #[error("No same-parent sibling to rebalance {page} with")]
    NoRebalanceSibling { page: PageId },

    /// A configuration value was rejected.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A structural check of the tree failed.
    #[error("Tree invariant violated: {0}")]
    InvariantViolation(String),
}

impl Error {
    /// Whether the session should be abandoned after this error.
    ///
    /// Validation and logical errors leave the database untouched; every
    /// other error may leave in-memory pages inconsistent or unflushable.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Error::NegativeId
                | Error::StringTooLong { .. }
                | Error::Syntax(_)
                | Error::UnrecognizedStatement(_)
                | Error::UnrecognizedMetaCommand(_)
                | Error::DuplicateKey(_)
                | Error::KeyNotFound(_)
                | Error::EndOfTable
                | Error::StoreFull { .. }
                | Error::InvalidConfig(_)
        )
    }

    pub(crate) fn corrupt_node(page: PageId, reason: impl Into<String>) -> Self {
        Error::CorruptNode {
            page,
            reason: reason.into(),
        }
    }
}
