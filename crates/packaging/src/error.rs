//! Packaging Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction.

use derive_more::{Display, Error};

/// A packaging error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for packaging operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The payload is corrupt or does not match its declared format.
    #[display("malformed package: {_0}")]
    Malformed(#[error(not(source))] String),
    /// Unpacked content exceeds the configured maximum size.
    #[display("package too large: {size} bytes exceeds limit of {limit}")]
    TooLarge { size: u64, limit: u64 },
    /// The reserved `error` packaging was requested; a synthesized error
    /// response is expected by the client. Used for conformance testing.
    #[display("error content explicitly requested")]
    ErrorContentRequested,
    /// No codec rule matches the (content type, packaging) pair.
    #[display("unsupported packaging: content type `{content_type}`, packaging `{packaging}`")]
    UnsupportedPackaging { content_type: String, packaging: String },
    /// A constituent file produced by a codec has an unusable name.
    #[display("invalid constituent file name: {_0}")]
    InvalidName(#[error(not(source))] String),
}

impl ErrorKind {
    /// Build the standard miss error for a failed registry lookup.
    pub(crate) fn unsupported(content_type: &str, packaging: Option<&str>) -> Self {
        Self::UnsupportedPackaging {
            content_type: content_type.to_string(),
            packaging: packaging.unwrap_or("(none)").to_string(),
        }
    }
}
