//! Store Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction.

use derive_more::{Display, Error};
use std::io::Error as IoError;
use std::path::PathBuf;

/// A store error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong
/// internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// No item exists with the given identifier.
    #[display("item not found: {_0}")]
    ItemNotFound(#[error(not(source))] String),
    /// The requested content version does not exist on the item.
    #[display("item {_0} has no version {_1}")]
    VersionNotFound(#[error(not(source))] String, #[error(not(source))] u32),
    /// The item exists but has been deleted; mutation is no longer allowed.
    #[display("item deleted: {_0}")]
    ItemDeleted(#[error(not(source))] String),
    /// An item with the same identifier already exists. Identifiers are
    /// never reused, even after deletion.
    #[display("item already exists: {_0}")]
    AlreadyExists(#[error(not(source))] String),
    /// The store root or a path inside it is not usable.
    #[display("invalid store path: {}", _0.display())]
    InvalidPath(#[error(not(source))] PathBuf),
    /// The on-disk record is unreadable or inconsistent.
    #[display("corrupt item record: {_0}")]
    CorruptRecord(#[error(not(source))] String),
    /// Underlying I/O error.
    #[display("I/O error: {_0}")]
    Io(IoError),
}
impl From<IoError> for ErrorKind {
    fn from(err: IoError) -> Self {
        Self::Io(err)
    }
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}
