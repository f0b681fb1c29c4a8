//! The scabbard deposit engine.
//!
//! Ties the configuration, store and packaging crates together into the
//! SWORD v2 protocol semantics: authentication and mediation, content
//! negotiation, the deposit state machine, Deposit Receipt projection,
//! service documents and the collaborator notification seam. This crate is
//! transport-agnostic; an HTTP layer maps requests onto [`DepositEngine`]
//! operations and [`error::ErrorKind`] values onto status codes and
//! `sword:error` bodies.

mod atom;
pub mod auth;
mod deposit;
pub mod error;
mod negotiate;
mod notify;
mod receipt;
mod servicedoc;

pub use crate::auth::{AuthHandle, Authenticator, ConfigAuthenticator, Credentials, Principal};
pub use crate::deposit::{DepositEngine, DepositRequest};
pub use crate::negotiate::ContentNegotiator;
pub use crate::notify::{NoopNotifier, Notifier, NotifierHandle};
pub use crate::receipt::DepositReceipt;
pub use crate::servicedoc::ServiceDocumentBuilder;

#[cfg(test)]
pub(crate) mod test_support {
    use scabbard_config::{
        CodecId, CodecRule, CollectionConfig, DEFAULT_COPY_CHUNK_SIZE, DEFAULT_ERROR_CONTENT_PACKAGE, FormatSpec,
        Generator, PurgePolicy, SecurityPolicy, SwordConfig, UserConfig,
    };

    const SIMPLE_ZIP: &str = "http://purl.org/net/sword/package/SimpleZip";
    const BINARY: &str = "http://purl.org/net/sword/package/Binary";

    fn rule(content_type: Option<&str>, packaging: Option<&str>, codec: CodecId) -> CodecRule {
        CodecRule {
            content_type: content_type.map(String::from),
            packaging: packaging.map(String::from),
            codec,
        }
    }

    /// A fully populated configuration for engine tests.
    pub(crate) fn config() -> SwordConfig {
        SwordConfig {
            base_url: "http://localhost:5025/".into(),
            sword_version: "2.0".into(),
            generator: Generator { uri: "http://example.org/scabbard".into(), version: "2.0".into() },
            max_upload_size: Some(16 * 1024 * 1024),
            allow_update: true,
            allow_delete: true,
            return_deposit_receipt: true,
            app_accept: vec!["*/*".into()],
            multipart_accept: vec![],
            sword_accept_package: vec![SIMPLE_ZIP.into(), BINARY.into()],
            sword_disseminate_package: vec![SIMPLE_ZIP.into()],
            media_resource_formats: vec![
                FormatSpec::with_packaging("application/zip", SIMPLE_ZIP),
                FormatSpec::new("application/zip"),
                FormatSpec::new("application/atom+xml;type=feed"),
            ],
            media_resource_default: FormatSpec::new("application/zip"),
            container_formats: vec![FormatSpec::new("application/atom+xml;type=entry")],
            container_format_default: FormatSpec::new("application/atom+xml;type=entry"),
            num_collections: 10,
            collections: vec![CollectionConfig {
                id: "col1".into(),
                label: "Collection One".into(),
                accept_packaging: vec![SIMPLE_ZIP.into(), BINARY.into()],
                max_upload_size: None,
            }],
            copy_chunk_size: DEFAULT_COPY_CHUNK_SIZE,
            accept_nothing: false,
            use_sub: false,
            security: SecurityPolicy::default(),
            users: vec![UserConfig { username: "sword".into(), password: "sword".into() }],
            obo_targets: vec!["obo".into()],
            purge_policy: PurgePolicy::Retain,
            package_ingesters: vec![
                rule(Some("application/zip"), Some(SIMPLE_ZIP), CodecId::SimpleZip),
                rule(None, Some(BINARY), CodecId::Binary),
                rule(Some("application/zip"), None, CodecId::SimpleZip),
                rule(None, None, CodecId::Binary),
            ],
            package_disseminators: vec![
                rule(Some("application/atom+xml;type=feed"), None, CodecId::Feed),
                rule(None, None, CodecId::DefaultZip),
            ],
            entry_ingester: CodecId::EntryIngest,
            error_content_package: DEFAULT_ERROR_CONTENT_PACKAGE.into(),
            store_dir: "/tmp/scabbard-store".into(),
        }
    }
}
