//! Record layer - the row schema and its fixed-width encoding.

mod row;

pub use row::{Row, EMAIL_SIZE, ID_SIZE, ROW_SIZE, USERNAME_SIZE};
