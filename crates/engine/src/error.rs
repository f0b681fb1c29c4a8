//! Engine Error Types
//!
//! The full SWORD error taxonomy. Every kind maps to the protocol-defined
//! HTTP status code and SWORD error URI, and can render itself as a
//! `sword:error` document for the response body. Nothing is silently
//! swallowed: local failures abort the transaction with no partial state,
//! collaborator failures surface as receipt warnings instead.

use derive_more::{Display, Error};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use scabbard_packaging::error::{Error as PackagingError, ErrorKind as PackagingErrorKind};
use scabbard_store::error::{Error as StoreError, ErrorKind as StoreErrorKind};

/// An engine error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

const ERROR_BAD_REQUEST: &str = "http://purl.org/net/sword/error/ErrorBadRequest";
const ERROR_CONTENT: &str = "http://purl.org/net/sword/error/ErrorContent";
const ERROR_CHECKSUM: &str = "http://purl.org/net/sword/error/ErrorChecksumMismatch";
const ERROR_MEDIATION: &str = "http://purl.org/net/sword/error/MediationNotAllowed";
const ERROR_TARGET_OWNER: &str = "http://purl.org/net/sword/error/TargetOwnerUnknown";
const ERROR_METHOD: &str = "http://purl.org/net/sword/error/MethodNotAllowed";
const ERROR_MAX_UPLOAD: &str = "http://purl.org/net/sword/error/MaxUploadSizeExceeded";

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The identity/secret pair does not match any configured user.
    #[display("invalid credentials")]
    InvalidCredentials,
    /// The operation demands a verified identity, but the authentication
    /// subsystem is administratively switched off. Ordinary requests pass
    /// through unauthenticated; this fires only where pass-through would be
    /// meaningless, such as validating a mediation target against the
    /// directory.
    #[display("authentication subsystem is disabled")]
    AuthDisabled,
    /// An On-Behalf-Of header arrived while mediation is disabled.
    #[display("mediated deposit is not permitted")]
    MediationNotPermitted,
    /// The On-Behalf-Of target is not a recognized identity.
    #[display("unknown on-behalf-of target: {_0}")]
    UnknownOboTarget(#[error(not(source))] String),

    /// No acceptable representation intersects the client's Accept header.
    /// Carries the supported types for the diagnostic response.
    #[display("not acceptable; supported: {}", _0.join(", "))]
    NotAcceptable(#[error(not(source))] Vec<String>),
    /// No codec rule matches the declared (content type, packaging) pair,
    /// or the target collection does not accept the packaging.
    #[display("unsupported packaging: content type `{content_type}`, packaging `{packaging}`")]
    UnsupportedPackaging { content_type: String, packaging: String },

    /// The payload is corrupt or does not match its declared format.
    #[display("malformed deposit: {_0}")]
    Malformed(#[error(not(source))] String),
    /// The stored checksum no longer matches the content on disk.
    #[display("checksum mismatch on stored content")]
    ChecksumMismatch,
    /// Unpacked content exceeded the configured limit mid-ingest.
    #[display("ingested content too large: {size} bytes exceeds limit of {limit}")]
    ContentTooLarge { size: u64, limit: u64 },
    /// The reserved `error` packaging was declared; synthesize an error
    /// response unconditionally. Used for client conformance testing.
    #[display("error content explicitly requested")]
    ErrorContentRequested,
    /// The declared payload exceeds the effective upload limit.
    #[display("payload too large: {size} bytes exceeds limit of {limit}")]
    PayloadTooLarge { size: u64, limit: u64 },
    /// The server configuration rejects every deposit (`accept_nothing`).
    #[display("deposit rejected by server policy")]
    DepositRejected,

    /// The operation is disabled by configuration (`allow_update` /
    /// `allow_delete`). Carries the operation name for the error document.
    #[display("method not allowed: {_0}")]
    MethodNotAllowed(#[error(not(source))] &'static str),
    /// The identifier has never existed.
    #[display("no such resource: {_0}")]
    NotFound(#[error(not(source))] String),
    /// The item existed but has been deleted. Protocol-significant as
    /// distinct from [`NotFound`](Self::NotFound).
    #[display("resource deleted: {_0}")]
    Gone(#[error(not(source))] String),

    /// A collaborator (the downstream notification target) failed. Never
    /// fatal to the local deposit.
    #[display("remote collaborator error: {_0}")]
    Remote(#[error(not(source))] String),
    /// Store-level failure that maps to no protocol condition.
    #[display("internal storage error: {_0}")]
    Internal(#[error(not(source))] String),
}

impl ErrorKind {
    /// The HTTP status code this error surfaces as.
    pub fn status(&self) -> u16 {
        match self {
            Self::InvalidCredentials => 401,
            Self::AuthDisabled | Self::UnknownOboTarget(_) => 403,
            Self::MediationNotPermitted => 412,
            Self::NotAcceptable(_) => 406,
            Self::UnsupportedPackaging { .. } => 415,
            Self::Malformed(_) | Self::ErrorContentRequested | Self::DepositRejected => 400,
            Self::ChecksumMismatch => 412,
            Self::ContentTooLarge { .. } | Self::PayloadTooLarge { .. } => 413,
            Self::MethodNotAllowed(_) => 405,
            Self::NotFound(_) => 404,
            Self::Gone(_) => 410,
            Self::Remote(_) => 502,
            Self::Internal(_) => 500,
        }
    }

    /// The SWORD error URI identifying this condition in error documents.
    pub fn error_uri(&self) -> &'static str {
        match self {
            Self::MediationNotPermitted => ERROR_MEDIATION,
            Self::UnknownOboTarget(_) => ERROR_TARGET_OWNER,
            Self::NotAcceptable(_) | Self::UnsupportedPackaging { .. } | Self::ErrorContentRequested => ERROR_CONTENT,
            Self::ChecksumMismatch => ERROR_CHECKSUM,
            Self::ContentTooLarge { .. } | Self::PayloadTooLarge { .. } => ERROR_MAX_UPLOAD,
            Self::MethodNotAllowed(_) => ERROR_METHOD,
            _ => ERROR_BAD_REQUEST,
        }
    }

    /// Render the `sword:error` document for the response body.
    pub fn to_error_document(&self) -> Vec<u8> {
        // Writing to a Vec cannot fail; unwrap-free by matching the
        // infallible arms away would just obscure that, so map to a
        // best-effort empty document instead.
        self.try_error_document().unwrap_or_default()
    }

    fn try_error_document(&self) -> Option<Vec<u8>> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None))).ok()?;
        let mut root = BytesStart::new("sword:error");
        root.push_attribute(("xmlns:sword", "http://purl.org/net/sword/terms/"));
        root.push_attribute(("xmlns:atom", "http://www.w3.org/2005/Atom"));
        root.push_attribute(("href", self.error_uri()));
        writer.write_event(Event::Start(root)).ok()?;
        for (name, text) in [
            ("atom:title", "ERROR".to_string()),
            ("atom:summary", self.to_string()),
            ("sword:treatment", "processing failed".to_string()),
        ] {
            writer.write_event(Event::Start(BytesStart::new(name))).ok()?;
            writer.write_event(Event::Text(BytesText::new(&text))).ok()?;
            writer.write_event(Event::End(BytesEnd::new(name))).ok()?;
        }
        writer.write_event(Event::End(BytesEnd::new("sword:error"))).ok()?;
        Some(writer.into_inner())
    }

    /// Wrap a store error, preserving its `Exn` frame as a child in the
    /// error tree. Protocol-significant store conditions keep their
    /// meaning; the rest become internal errors.
    #[track_caller]
    pub fn store(err: StoreError) -> Error {
        let kind = match &*err {
            StoreErrorKind::ItemNotFound(id) => Self::NotFound(id.clone()),
            StoreErrorKind::ItemDeleted(id) => Self::Gone(id.clone()),
            other => Self::Internal(other.to_string()),
        };
        err.raise(kind)
    }

    /// Wrap a packaging error, preserving its `Exn` frame.
    #[track_caller]
    pub fn packaging(err: PackagingError) -> Error {
        let kind = match &*err {
            PackagingErrorKind::Malformed(msg) => Self::Malformed(msg.clone()),
            PackagingErrorKind::TooLarge { size, limit } => Self::ContentTooLarge { size: *size, limit: *limit },
            PackagingErrorKind::ErrorContentRequested => Self::ErrorContentRequested,
            PackagingErrorKind::UnsupportedPackaging { content_type, packaging } => Self::UnsupportedPackaging {
                content_type: content_type.clone(),
                packaging: packaging.clone(),
            },
            PackagingErrorKind::InvalidName(name) => Self::Malformed(format!("invalid file name `{name}`")),
        };
        err.raise(kind)
    }
}
