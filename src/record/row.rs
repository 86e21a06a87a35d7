//! Fixed-width row codec.

use std::fmt;

use crate::common::config::{COLUMN_EMAIL_SIZE, COLUMN_USERNAME_SIZE};
use crate::common::{Error, Result};

/// Serialized width of the id column.
pub const ID_SIZE: usize = 4;
/// Serialized width of the username column (capacity plus NUL terminator).
pub const USERNAME_SIZE: usize = COLUMN_USERNAME_SIZE + 1;
/// Serialized width of the email column (capacity plus NUL terminator).
pub const EMAIL_SIZE: usize = COLUMN_EMAIL_SIZE + 1;

pub const ID_OFFSET: usize = 0;
pub const USERNAME_OFFSET: usize = ID_OFFSET + ID_SIZE;
pub const EMAIL_OFFSET: usize = USERNAME_OFFSET + USERNAME_SIZE;

/// Serialized width of a row. Every leaf cell value is exactly this long.
pub const ROW_SIZE: usize = ID_SIZE + USERNAME_SIZE + EMAIL_SIZE;

/// One record: `(id, username, email)`.
///
/// # Layout (293 bytes)
/// ```text
/// Offset  Size  Field
/// ------  ----  -----
/// 0       4     id (little-endian)
/// 4       33    username, NUL-padded
/// 37      256   email, NUL-padded
/// ```
///
/// # Example
/// ```
/// use stratadb::record::Row;
///
/// let row = Row::new(1, "alice", "alice@example.com")?;
/// let bytes = row.serialize();
/// assert_eq!(Row::deserialize(&bytes), row);
/// # Ok::<(), stratadb::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub id: u32,
    pub username: String,
    pub email: String,
}

impl Row {
    /// Build a row, checking both strings fit their columns.
    ///
    /// # Errors
    /// Returns `Error::StringTooLong` if a field exceeds its byte capacity.
    pub fn new(id: u32, username: impl Into<String>, email: impl Into<String>) -> Result<Self> {
        let username = username.into();
        let email = email.into();
        if username.len() > COLUMN_USERNAME_SIZE {
            return Err(Error::StringTooLong {
                field: "username",
                max: COLUMN_USERNAME_SIZE,
            });
        }
        if email.len() > COLUMN_EMAIL_SIZE {
            return Err(Error::StringTooLong {
                field: "email",
                max: COLUMN_EMAIL_SIZE,
            });
        }
        Ok(Self {
            id,
            username,
            email,
        })
    }

    /// Encode into the fixed-width cell value.
    pub fn serialize(&self) -> [u8; ROW_SIZE] {
        let mut buf = [0u8; ROW_SIZE];
        self.serialize_into(&mut buf);
        buf
    }

    /// Encode into `dst`, which must be exactly [`ROW_SIZE`] bytes.
    ///
    /// # Panics
    /// Panics if `dst.len() != ROW_SIZE` or a string overflows its column;
    /// [`Row::new`] rules the latter out.
    pub fn serialize_into(&self, dst: &mut [u8]) {
        assert_eq!(dst.len(), ROW_SIZE, "row buffer has wrong size");
        dst.fill(0);
        dst[ID_OFFSET..ID_OFFSET + ID_SIZE].copy_from_slice(&self.id.to_le_bytes());
        write_column(&mut dst[USERNAME_OFFSET..USERNAME_OFFSET + USERNAME_SIZE], &self.username);
        write_column(&mut dst[EMAIL_OFFSET..EMAIL_OFFSET + EMAIL_SIZE], &self.email);
    }

    /// Decode a cell value.
    ///
    /// Strings end at the first NUL; invalid UTF-8 is replaced lossily.
    ///
    /// # Panics
    /// Panics if `src.len() < ROW_SIZE`.
    pub fn deserialize(src: &[u8]) -> Self {
        assert!(src.len() >= ROW_SIZE, "row buffer too small");
        let id = u32::from_le_bytes([
            src[ID_OFFSET],
            src[ID_OFFSET + 1],
            src[ID_OFFSET + 2],
            src[ID_OFFSET + 3],
        ]);
        Self {
            id,
            username: read_column(&src[USERNAME_OFFSET..USERNAME_OFFSET + USERNAME_SIZE]),
            email: read_column(&src[EMAIL_OFFSET..EMAIL_OFFSET + EMAIL_SIZE]),
        }
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.id, self.username, self.email)
    }
}

fn write_column(dst: &mut [u8], value: &str) {
    let bytes = value.as_bytes();
    // Last byte stays NUL.
    assert!(bytes.len() < dst.len(), "column overflow");
    dst[..bytes.len()].copy_from_slice(bytes);
}

fn read_column(src: &[u8]) -> String {
    let end = src.iter().position(|&b| b == 0).unwrap_or(src.len());
    String::from_utf8_lossy(&src[..end]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_size() {
        assert_eq!(ROW_SIZE, 293);
        assert_eq!(EMAIL_OFFSET, 37);
    }

    #[test]
    fn test_serialize_layout() {
        let row = Row::new(0x01020304, "bob", "b@x.io").unwrap();
        let bytes = row.serialize();

        assert_eq!(&bytes[0..4], &[4, 3, 2, 1]);
        assert_eq!(&bytes[4..7], b"bob");
        assert_eq!(bytes[7], 0);
        assert_eq!(&bytes[37..43], b"b@x.io");
        assert!(bytes[43..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_full_width_fields() {
        let username = "u".repeat(COLUMN_USERNAME_SIZE);
        let email = "e".repeat(COLUMN_EMAIL_SIZE);
        let row = Row::new(7, username.clone(), email.clone()).unwrap();

        let decoded = Row::deserialize(&row.serialize());
        assert_eq!(decoded.username, username);
        assert_eq!(decoded.email, email);
    }

    #[test]
    fn test_string_too_long() {
        let err = Row::new(1, "u".repeat(COLUMN_USERNAME_SIZE + 1), "e").unwrap_err();
        assert!(matches!(err, Error::StringTooLong { field: "username", max: 32 }));

        let err = Row::new(1, "u", "e".repeat(COLUMN_EMAIL_SIZE + 1)).unwrap_err();
        assert!(matches!(err, Error::StringTooLong { field: "email", max: 255 }));
    }

    #[test]
    fn test_reserialize_clears_old_bytes() {
        let mut buf = Row::new(1, "longer-name", "longer@example.com")
            .unwrap()
            .serialize();
        Row::new(2, "ab", "c@d").unwrap().serialize_into(&mut buf);

        let decoded = Row::deserialize(&buf);
        assert_eq!(decoded.username, "ab");
        assert_eq!(decoded.email, "c@d");
    }

    #[test]
    fn test_display() {
        let row = Row::new(1, "user1", "person1@example.com").unwrap();
        assert_eq!(row.to_string(), "(1, user1, person1@example.com)");
    }
}
