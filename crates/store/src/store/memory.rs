//! In-memory resource store for tests.
//!
//! Same semantics as [`LocalStore`](crate::store::LocalStore), including
//! per-item serialization, terminal deletion and identifier non-reuse,
//! without touching
//! the filesystem. Intended for other crates' dev dependencies via the
//! `mock` feature.

use crate::error::{ErrorKind, Result};
use crate::models::{EntryMetadata, ItemRecord, ItemState, StoredFile, VersionSeed, digest_files};
use crate::store::{ItemStream, ResourceStore};
use async_stream::stream;
use async_trait::async_trait;
use scabbard_config::PurgePolicy;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use time::UtcDateTime;
use tokio::sync::Mutex;

struct Entry {
    record: ItemRecord,
    /// Version number → constituent files. Cleared on purge.
    payloads: HashMap<u32, Vec<StoredFile>>,
}

/// HashMap-backed store with deterministic `item-{n}` identifiers.
#[derive(Default)]
pub struct MemoryStore {
    counter: AtomicU64,
    items: Mutex<HashMap<String, Entry>>,
}
impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn build_version(record: &ItemRecord, seed: VersionSeed, files: &[StoredFile]) -> crate::models::ContentVersion {
        let (hash, crc32) = digest_files(files);
        crate::models::ContentVersion {
            number: record.next_version_number(),
            content_type: seed.content_type,
            packaging: seed.packaging,
            size: seed.payload_size,
            hash,
            crc32,
            deposited_at: UtcDateTime::now(),
        }
    }
}

#[async_trait]
impl ResourceStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn create_item(
        &self,
        collection: &str,
        metadata: EntryMetadata,
        seed: VersionSeed,
        files: Vec<StoredFile>,
    ) -> Result<ItemRecord> {
        let id = format!("item-{}", self.counter.fetch_add(1, Ordering::Relaxed) + 1);
        let mut items = self.items.lock().await;
        let mut record = ItemRecord {
            id: id.clone(),
            collection: collection.to_string(),
            state: ItemState::Active,
            versions: Vec::new(),
            metadata,
            created_at: UtcDateTime::now(),
        };
        let version = Self::build_version(&record, seed, &files);
        let number = version.number;
        record.versions.push(version);
        let mut payloads = HashMap::new();
        payloads.insert(number, files);
        items.insert(id, Entry { record: record.clone(), payloads });
        Ok(record)
    }

    async fn append_version(&self, item: &str, seed: VersionSeed, files: Vec<StoredFile>) -> Result<ItemRecord> {
        // The single map lock doubles as the per-item lock; appends to the
        // same item serialize through it.
        let mut items = self.items.lock().await;
        let entry = match items.get_mut(item) {
            Some(entry) => entry,
            None => exn::bail!(ErrorKind::ItemNotFound(item.to_string())),
        };
        if entry.record.state == ItemState::Deleted {
            exn::bail!(ErrorKind::ItemDeleted(item.to_string()));
        }
        let version = Self::build_version(&entry.record, seed, &files);
        let number = version.number;
        entry.record.versions.push(version);
        entry.payloads.insert(number, files);
        Ok(entry.record.clone())
    }

    async fn get_item(&self, item: &str) -> Result<Option<ItemRecord>> {
        let items = self.items.lock().await;
        Ok(items.get(item).map(|entry| entry.record.clone()))
    }

    async fn read_version_files(&self, item: &str, number: u32) -> Result<Vec<StoredFile>> {
        let items = self.items.lock().await;
        let entry = match items.get(item) {
            Some(entry) => entry,
            None => exn::bail!(ErrorKind::ItemNotFound(item.to_string())),
        };
        match entry.payloads.get(&number) {
            Some(files) => Ok(files.clone()),
            None => exn::bail!(ErrorKind::VersionNotFound(item.to_string(), number)),
        }
    }

    async fn replace_metadata(&self, item: &str, metadata: EntryMetadata) -> Result<ItemRecord> {
        let mut items = self.items.lock().await;
        let entry = match items.get_mut(item) {
            Some(entry) => entry,
            None => exn::bail!(ErrorKind::ItemNotFound(item.to_string())),
        };
        if entry.record.state == ItemState::Deleted {
            exn::bail!(ErrorKind::ItemDeleted(item.to_string()));
        }
        entry.record.metadata = metadata;
        Ok(entry.record.clone())
    }

    async fn mark_deleted(&self, item: &str, purge: PurgePolicy) -> Result<ItemRecord> {
        let mut items = self.items.lock().await;
        let entry = match items.get_mut(item) {
            Some(entry) => entry,
            None => exn::bail!(ErrorKind::ItemNotFound(item.to_string())),
        };
        if entry.record.state == ItemState::Deleted {
            exn::bail!(ErrorKind::ItemDeleted(item.to_string()));
        }
        entry.record.state = ItemState::Deleted;
        if purge == PurgePolicy::Purge {
            entry.payloads.clear();
        }
        Ok(entry.record.clone())
    }

    fn list_items<'a>(&'a self, collection: &'a str) -> ItemStream<'a> {
        Box::pin(stream! {
            let items = self.items.lock().await;
            let records: Vec<ItemRecord> = items
                .values()
                .filter(|entry| entry.record.collection == collection)
                .map(|entry| entry.record.clone())
                .collect();
            drop(items);
            for record in records {
                yield Ok(record);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;
    use std::sync::Arc;

    fn seed() -> VersionSeed {
        VersionSeed {
            content_type: "application/zip".into(),
            packaging: None,
            payload_size: 10,
        }
    }

    #[tokio::test]
    async fn identifiers_are_sequential_and_never_reused() {
        let store = MemoryStore::new();
        let one = store.create_item("col1", EntryMetadata::default(), seed(), vec![]).await.unwrap();
        store.mark_deleted(&one.id, PurgePolicy::Purge).await.unwrap();
        let two = store.create_item("col1", EntryMetadata::default(), seed(), vec![]).await.unwrap();
        assert_ne!(one.id, two.id);
    }

    #[tokio::test]
    async fn concurrent_appends_never_gap() {
        let store = Arc::new(MemoryStore::new());
        let record = store.create_item("col1", EntryMetadata::default(), seed(), vec![]).await.unwrap();
        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = store.clone();
            let id = record.id.clone();
            handles.push(tokio::spawn(async move {
                store.append_version(&id, seed(), vec![]).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        let record = store.get_item(&record.id).await.unwrap().unwrap();
        let numbers: Vec<u32> = record.versions.iter().map(|v| v.number).collect();
        assert_eq!(numbers, (1..=17).collect::<Vec<u32>>());
    }

    #[tokio::test]
    async fn list_items_snapshot() {
        let store = MemoryStore::new();
        store.create_item("col1", EntryMetadata::default(), seed(), vec![]).await.unwrap();
        store.create_item("col2", EntryMetadata::default(), seed(), vec![]).await.unwrap();
        let records: Vec<_> = store.list_items("col1").try_collect().await.unwrap();
        assert_eq!(records.len(), 1);
    }
}
