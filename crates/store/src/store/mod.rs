//! Resource store trait and implementations.
//!
//! The store persists item records and the constituent files of each
//! content version. It is the only component allowed to assign version
//! numbers, and it does so under per-item mutual exclusion so that
//! concurrent updates to the same item can never produce duplicate numbers
//! or gaps.

mod local;
#[cfg(feature = "mock")]
mod memory;

pub use self::local::LocalStore;
#[cfg(feature = "mock")]
pub use self::memory::MemoryStore;
use crate::error::Result;
use crate::models::{EntryMetadata, ItemRecord, StoredFile, VersionSeed};
use async_trait::async_trait;
use futures::Stream;
use scabbard_config::PurgePolicy;
use std::pin::Pin;
use std::sync::Arc;

pub type ItemStream<'a> = Pin<Box<dyn Stream<Item = Result<ItemRecord>> + Send + 'a>>;

/// Shared handle to a store, passed around by the deposit engine.
pub type StoreHandle = Arc<dyn ResourceStore + Send + Sync>;

/// Unified interface for resource stores.
///
/// All mutating operations commit atomically: a reader never observes a
/// partially written version, even when the writing request is cancelled
/// mid-flight. Implementations achieve this by staging writes in temporary
/// locations and renaming into place.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Name of the configured store (used for logging only).
    fn name(&self) -> &str;

    /// Create a new item in a collection with its first content version.
    ///
    /// The store allocates the item identifier and assigns version number 1.
    async fn create_item(
        &self,
        collection: &str,
        metadata: EntryMetadata,
        seed: VersionSeed,
        files: Vec<StoredFile>,
    ) -> Result<ItemRecord>;

    /// Append the next content version to an existing active item.
    ///
    /// The version number is assigned under the item's lock; two concurrent
    /// calls serialize and receive consecutive numbers. Returns
    /// [`ItemNotFound`](crate::error::ErrorKind::ItemNotFound) for unknown
    /// identifiers and [`ItemDeleted`](crate::error::ErrorKind::ItemDeleted)
    /// for deleted ones.
    async fn append_version(&self, item: &str, seed: VersionSeed, files: Vec<StoredFile>) -> Result<ItemRecord>;

    /// Fetch an item record, including deleted items.
    ///
    /// `None` means the identifier has never existed; callers use the
    /// distinction to answer 404 versus 410.
    async fn get_item(&self, item: &str) -> Result<Option<ItemRecord>>;

    /// Read the constituent files of one content version.
    async fn read_version_files(&self, item: &str, number: u32) -> Result<Vec<StoredFile>>;

    /// Replace an item's metadata record, leaving its versions untouched.
    async fn replace_metadata(&self, item: &str, metadata: EntryMetadata) -> Result<ItemRecord>;

    /// Transition an item to the deleted state.
    ///
    /// The record survives regardless of policy; [`PurgePolicy::Purge`]
    /// additionally removes the stored payload files.
    async fn mark_deleted(&self, item: &str, purge: PurgePolicy) -> Result<ItemRecord>;

    /// Stream the records of all items in a collection, in unspecified
    /// order. Includes deleted items; callers filter by state as needed.
    fn list_items<'a>(&'a self, collection: &'a str) -> ItemStream<'a>;
}
