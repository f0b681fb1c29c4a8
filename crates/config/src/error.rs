//! Configuration Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction, following the same pattern as the other crates in this
//! workspace.

use derive_more::{Display, Error};

/// A configuration error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for configuration operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The configuration sources could not be read or merged.
    #[display("could not load configuration: {_0}")]
    Load(#[error(not(source))] String),
    /// A recognized option carries a value the engine cannot operate with.
    #[display("invalid configuration value for `{_0}`: {_1}")]
    Invalid(#[error(not(source))] &'static str, #[error(not(source))] String),
}
