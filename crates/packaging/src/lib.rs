//! Package format codecs for the scabbard deposit engine.
//!
//! A deposit arrives as a single payload in some declared package format and
//! must be unpacked into constituent files before storage; retrieval goes
//! the other way. This crate defines the two capability traits,
//! [`Ingester`] and [`Disseminator`], the built-in codecs implementing
//! them, and the [`Registry`] that resolves a (content type, packaging URI)
//! pair to a codec through an ordered rule table.
//!
//! The original deployment selected codec classes by name out of a settings
//! dictionary. Here the configuration names a closed
//! [`CodecId`](scabbard_config::CodecId) and the registry maps it to a
//! concrete implementation at construction time; there is no runtime
//! reflection.

pub mod error;
mod ingest;
mod disseminate;
mod registry;

pub use crate::disseminate::{FeedDisseminator, ZipDisseminator};
pub use crate::ingest::{BinaryIngester, EntryIngester, MetsIngester, SimpleZipIngester};
pub use crate::registry::Registry;

use crate::error::Result;
use scabbard_store::{ContentVersion, EntryMetadata, StoredFile};

/// One constituent file produced by an ingester, with any metadata the
/// package format carried for it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PackagedFile {
    pub name: String,
    pub data: Vec<u8>,
    pub metadata: Option<EntryMetadata>,
}
impl PackagedFile {
    pub fn new(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self { name: name.into(), data: data.into(), metadata: None }
    }

    pub fn into_stored(self) -> StoredFile {
        StoredFile { name: self.name, data: self.data }
    }
}

/// A stored content version together with its constituent files, as handed
/// to a disseminator.
#[derive(Clone, Debug)]
pub struct VersionContent {
    pub version: ContentVersion,
    pub files: Vec<StoredFile>,
}

/// A response payload produced by a disseminator.
#[derive(Clone, Debug)]
pub struct Package {
    pub data: Vec<u8>,
    pub content_type: String,
}

/// Unpacks a single uploaded payload into zero or more constituent files.
pub trait Ingester: Send + Sync + std::fmt::Debug {
    /// Codec name, used for logging only.
    fn name(&self) -> &'static str;

    fn ingest(&self, payload: &[u8], declared_type: &str) -> Result<Vec<PackagedFile>>;
}

/// Produces a single response payload from one or more stored content
/// versions. Pure function of its inputs.
pub trait Disseminator: Send + Sync {
    /// Codec name, used for logging only.
    fn name(&self) -> &'static str;

    fn package(&self, versions: &[VersionContent]) -> Result<Package>;
}
