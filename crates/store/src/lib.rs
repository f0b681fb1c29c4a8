//! Resource store for the scabbard deposit engine.
//!
//! Persists item records and the constituent files of each content version.
//! Append-only per item: versions are immutable once committed and are
//! numbered gap-free from 1 under per-item serialization.

pub mod error;
pub mod models;
mod path;
pub mod store;

pub use crate::models::{ContentVersion, EntryMetadata, ItemRecord, ItemState, StoredFile, VersionSeed};
pub use crate::path::validate_name;
pub use crate::store::{ItemStream, LocalStore, ResourceStore, StoreHandle};
#[cfg(feature = "mock")]
pub use crate::store::MemoryStore;
