//! Configuration for the scabbard SWORD v2 deposit engine.
//!
//! All options are read once at process start into an immutable
//! [`SwordConfig`] which is then passed by reference into each component.
//! There is no runtime-mutable global state.
//!
//! Loading is layered through figment: built-in defaults, then an optional
//! TOML file, then `SCABBARD_`-prefixed environment variables. The merged
//! result is validated before being handed out, so components can trust the
//! values they receive.

pub mod error;
mod formats;
mod policy;

pub use crate::formats::{CodecId, CodecRule, FormatSpec};
pub use crate::policy::{OboValidation, PurgePolicy, SecurityPolicy};

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// The default chunk size for copying payload streams, in bytes.
pub const DEFAULT_COPY_CHUNK_SIZE: usize = 8096;

/// The packaging URI reserved for requesting a synthesized error response.
pub const DEFAULT_ERROR_CONTENT_PACKAGE: &str = "http://purl.org/net/sword/package/error";

/// A collection that deposits may be made into.
///
/// Collections are created administratively and are immutable for the
/// lifetime of the process; in particular the acceptance list never changes
/// during a request, so negotiation is snapshot-consistent by construction.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CollectionConfig {
    /// Identifier used in deposit URLs.
    pub id: String,
    /// Human-readable label for the service document.
    pub label: String,
    /// Packaging URIs this collection accepts on deposit.
    pub accept_packaging: Vec<String>,
    /// Per-collection upload cap, overriding the global one when present.
    #[serde(default)]
    pub max_upload_size: Option<u64>,
}

/// Software generator advertised in produced Atom documents.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Generator {
    pub uri: String,
    pub version: String,
}

/// The full configuration surface consumed by the deposit engine.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SwordConfig {
    /// Base URL the service is deployed under; all IRIs are derived from it.
    pub base_url: String,
    /// Advertised protocol version.
    pub sword_version: String,
    pub generator: Generator,

    /// Maximum upload size in bytes. Absent means unlimited.
    pub max_upload_size: Option<u64>,
    pub allow_update: bool,
    pub allow_delete: bool,
    /// Deposit receipts may be suppressed, which the protocol permits. The
    /// engine always computes the receipt, since the Location header and
    /// Edit-IRI derive from it; when this is `false` the transport layer
    /// omits the receipt body and responds with the headers alone.
    pub return_deposit_receipt: bool,

    /// Media ranges advertised in the service document `app:accept` element.
    pub app_accept: Vec<String>,
    /// Media ranges accepted for multipart deposit.
    pub multipart_accept: Vec<String>,
    /// Packaging formats accepted on deposit.
    pub sword_accept_package: Vec<String>,
    /// Packaging formats available when retrieving the media resource.
    pub sword_disseminate_package: Vec<String>,

    /// Representations offered during content negotiation on the Media-IRI,
    /// in server preference order.
    pub media_resource_formats: Vec<FormatSpec>,
    /// Representation used when the client sends no Accept header.
    pub media_resource_default: FormatSpec,
    /// Representations offered during content negotiation on the Edit-IRI.
    pub container_formats: Vec<FormatSpec>,
    pub container_format_default: FormatSpec,

    /// Number of collections advertised when none are configured explicitly.
    pub num_collections: usize,
    pub collections: Vec<CollectionConfig>,

    /// Chunk size for copying payload streams into and out of the store.
    pub copy_chunk_size: usize,
    /// Refuse every deposit regardless of payload validity. Exists to test
    /// client error-handling paths.
    pub accept_nothing: bool,
    /// Advertise sub-service URLs in the service document.
    pub use_sub: bool,

    pub security: SecurityPolicy,
    /// Known user credentials (identity, secret). The original deployment
    /// configured a single pair; a list costs nothing extra.
    pub users: Vec<UserConfig>,
    /// Identities that may be the target of an On-Behalf-Of deposit when
    /// `security.obo_validation` is `KnownTargets`.
    pub obo_targets: Vec<String>,

    pub purge_policy: PurgePolicy,

    /// Ingester resolution table, most-specific-first.
    pub package_ingesters: Vec<CodecRule>,
    /// Disseminator resolution table, most-specific-first.
    pub package_disseminators: Vec<CodecRule>,
    /// Codec used for Atom entry deposits against the Edit-IRI.
    pub entry_ingester: CodecId,
    /// Supplying this URI in the Packaging header generates an error
    /// response unconditionally, for protocol-conformance testing.
    pub error_content_package: String,

    /// Directory deposited content is persisted under. In-flight payloads
    /// are staged inside it so the final rename never crosses a filesystem.
    pub store_dir: PathBuf,
}

/// A configured identity/secret pair for HTTP Basic authentication.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct UserConfig {
    pub username: String,
    pub password: String,
}

/// Built-in defaults, mirroring the reference deployment.
#[derive(Serialize)]
struct Defaults {
    sword_version: &'static str,
    allow_update: bool,
    allow_delete: bool,
    return_deposit_receipt: bool,
    app_accept: Vec<&'static str>,
    multipart_accept: Vec<&'static str>,
    num_collections: usize,
    collections: Vec<CollectionConfig>,
    copy_chunk_size: usize,
    accept_nothing: bool,
    use_sub: bool,
    users: Vec<UserConfig>,
    obo_targets: Vec<&'static str>,
    error_content_package: &'static str,
}
impl Default for Defaults {
    fn default() -> Self {
        Self {
            sword_version: "2.0",
            allow_update: true,
            allow_delete: true,
            return_deposit_receipt: true,
            app_accept: vec!["*/*"],
            multipart_accept: vec![],
            num_collections: 10,
            collections: vec![],
            copy_chunk_size: DEFAULT_COPY_CHUNK_SIZE,
            accept_nothing: false,
            use_sub: false,
            users: vec![],
            obo_targets: vec![],
            error_content_package: DEFAULT_ERROR_CONTENT_PACKAGE,
        }
    }
}

impl SwordConfig {
    /// Load configuration from an optional TOML file plus `SCABBARD_`
    /// environment overrides, layered over the built-in defaults.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Defaults::default()));
        if let Some(path) = file {
            figment = figment.merge(Toml::file(path));
        }
        let config: Self = figment
            .merge(Env::prefixed("SCABBARD_").split("__"))
            .extract()
            .map_err(|e| ErrorKind::Load(e.to_string()))?;
        config.validate()?;
        tracing::debug!(
            collections = config.collections.len(),
            max_upload_size = ?config.max_upload_size,
            "configuration loaded"
        );
        Ok(config)
    }

    /// Check cross-field constraints figment cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.base_url.is_empty() {
            exn::bail!(ErrorKind::Invalid("base_url", "must not be empty".into()));
        }
        if self.copy_chunk_size == 0 {
            exn::bail!(ErrorKind::Invalid("copy_chunk_size", "must be non-zero".into()));
        }
        let mut seen = HashSet::new();
        for collection in &self.collections {
            if !seen.insert(collection.id.as_str()) {
                exn::bail!(ErrorKind::Invalid(
                    "collections",
                    format!("duplicate collection id `{}`", collection.id),
                ));
            }
        }
        if !self.store_dir.is_absolute() {
            exn::bail!(ErrorKind::Invalid("store_dir", "must be an absolute path".into()));
        }
        Ok(())
    }

    /// The upload cap effective for a given collection: the collection
    /// override when present, otherwise the global limit.
    pub fn effective_max_upload(&self, collection: &CollectionConfig) -> Option<u64> {
        collection.max_upload_size.or(self.max_upload_size)
    }

    /// The collections the service actually serves: the configured list, or
    /// a generated `col-1..col-N` sequence when the deployment did not
    /// define any explicitly. The service document and the deposit paths
    /// both resolve against this, so every advertised collection accepts
    /// deposits.
    pub fn effective_collections(&self) -> Vec<CollectionConfig> {
        if !self.collections.is_empty() {
            return self.collections.clone();
        }
        (1..=self.num_collections)
            .map(|n| CollectionConfig {
                id: format!("col-{n}"),
                label: format!("Collection {n}"),
                accept_packaging: self.sword_accept_package.clone(),
                max_upload_size: None,
            })
            .collect()
    }

    /// Look up a collection by identifier, including generated ones.
    pub fn collection(&self, id: &str) -> Option<CollectionConfig> {
        self.effective_collections().into_iter().find(|c| c.id == id)
    }

    /// Base URL guaranteed to end with a single trailing slash, for IRI
    /// construction.
    pub fn base_url_slashed(&self) -> String {
        let mut url = self.base_url.trim_end_matches('/').to_string();
        url.push('/');
        url
    }
}

/// Hand-construct a configuration for tests and embedded use, bypassing the
/// file/env layering but not validation.
impl SwordConfig {
    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: Self = figment.extract().map_err(|e| ErrorKind::Load(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::providers::{Format, Toml};
    use std::io::Write;

    fn minimal_toml() -> String {
        r#"
            base_url = "http://localhost:5025/"
            store_dir = "/tmp/scabbard-store"
            max_upload_size = 16777216
            sword_accept_package = ["http://purl.org/net/sword/package/SimpleZip"]
            sword_disseminate_package = ["http://purl.org/net/sword/package/SimpleZip"]
            media_resource_formats = [
                { content_type = "application/zip", packaging = "http://purl.org/net/sword/package/SimpleZip" },
                { content_type = "application/zip" },
            ]
            media_resource_default = { content_type = "application/zip" }
            container_formats = [{ content_type = "application/atom+xml;type=entry" }]
            container_format_default = { content_type = "application/atom+xml;type=entry" }
            purge_policy = "retain"
            entry_ingester = "entry-ingest"
            generator = { uri = "http://example.org/scabbard", version = "2.0" }

            [security]
            authenticate = true
            mediation = true

            [[collections]]
            id = "col1"
            label = "Collection One"
            accept_packaging = ["http://purl.org/net/sword/package/SimpleZip"]

            [[package_ingesters]]
            packaging = "http://purl.org/net/sword/package/SimpleZip"
            codec = "simple-zip"

            [[package_disseminators]]
            content_type = "application/zip"
            codec = "default-zip"
        "#
        .to_string()
    }

    fn load_from_str(toml: &str) -> Result<SwordConfig> {
        let figment = Figment::from(Serialized::defaults(Defaults::default())).merge(Toml::string(toml));
        SwordConfig::from_figment(figment)
    }

    #[test]
    fn load_minimal() {
        let config = load_from_str(&minimal_toml()).unwrap();
        assert_eq!(config.sword_version, "2.0");
        assert_eq!(config.copy_chunk_size, DEFAULT_COPY_CHUNK_SIZE);
        assert_eq!(config.max_upload_size, Some(16777216));
        assert!(config.allow_update);
        assert_eq!(config.collections.len(), 1);
        assert_eq!(config.error_content_package, DEFAULT_ERROR_CONTENT_PACKAGE);
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scabbard.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(minimal_toml().as_bytes()).unwrap();
        let config = SwordConfig::load(Some(&path)).unwrap();
        assert_eq!(config.base_url, "http://localhost:5025/");
    }

    #[test]
    fn reject_empty_base_url() {
        let toml = minimal_toml().replace("http://localhost:5025/", "");
        let err = load_from_str(&toml).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Invalid("base_url", _)));
    }

    #[test]
    fn reject_duplicate_collections() {
        let mut toml = minimal_toml();
        toml.push_str(
            r#"
            [[collections]]
            id = "col1"
            label = "Duplicate"
            accept_packaging = []
        "#,
        );
        let err = load_from_str(&toml).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Invalid("collections", _)));
    }

    #[test]
    fn reject_relative_store_dir() {
        let toml = minimal_toml().replace("/tmp/scabbard-store", "relative/store");
        let err = load_from_str(&toml).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Invalid("store_dir", _)));
    }

    #[test]
    fn collection_override_wins_for_upload_cap() {
        let mut config = load_from_str(&minimal_toml()).unwrap();
        config.collections[0].max_upload_size = Some(1024);
        let collection = config.collection("col1").unwrap();
        assert_eq!(config.effective_max_upload(&collection), Some(1024));
        config.collections[0].max_upload_size = None;
        let collection = config.collection("col1").unwrap();
        assert_eq!(config.effective_max_upload(&collection), Some(16777216));
    }

    #[test]
    fn generated_collections_resolve_by_id() {
        let mut config = load_from_str(&minimal_toml()).unwrap();
        config.collections.clear();
        config.num_collections = 3;
        let generated = config.effective_collections();
        assert_eq!(generated.len(), 3);
        let collection = config.collection("col-2").unwrap();
        assert_eq!(collection.label, "Collection 2");
        assert_eq!(collection.accept_packaging, config.sword_accept_package);
        assert!(config.collection("col-4").is_none());
    }

    #[test]
    fn reject_removed_scratch_dir_option() {
        let mut toml = minimal_toml();
        toml.push_str("\ntmp_dir = \"/tmp/scabbard-tmp\"\n");
        let err = load_from_str(&toml).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Load(_)));
    }

    #[test]
    fn base_url_slashed_normalizes() {
        let config = load_from_str(&minimal_toml()).unwrap();
        assert_eq!(config.base_url_slashed(), "http://localhost:5025/");
        let toml = minimal_toml().replace("http://localhost:5025/", "http://localhost:5025");
        let config = load_from_str(&toml).unwrap();
        assert_eq!(config.base_url_slashed(), "http://localhost:5025/");
    }
}
