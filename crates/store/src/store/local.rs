//! Local filesystem resource store.
//!
//! Each item lives in its own directory under the store root:
//!
//! ```text
//! <root>/<item-id>/record.json      the serialized ItemRecord
//! <root>/<item-id>/v1/...           constituent files of version 1
//! <root>/<item-id>/v2/...           and so on
//! ```
//!
//! Every write is staged under a `.tmp` name and renamed into place, so a
//! cancelled request leaves at worst an orphaned staging directory that no
//! record references. Version payloads are committed before the record that
//! names them; a reader can therefore never observe a version the record
//! knows about whose files are missing or partial.

use crate::error::{ErrorKind, Result};
use crate::models::{EntryMetadata, ItemRecord, ItemState, StoredFile, VersionSeed, digest_files};
use crate::path::validate_name;
use crate::store::{ItemStream, ResourceStore};
use async_stream::stream;
use async_trait::async_trait;
use exn::ResultExt;
use scabbard_config::PurgePolicy;
use std::collections::HashMap;
use std::fs::create_dir_all as sync_create_dir;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use time::UtcDateTime;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

const RECORD_FILE: &str = "record.json";

/// Local filesystem store rooted at an absolute directory.
pub struct LocalStore {
    name: String,
    root: PathBuf,
    /// Chunk size for copying payload bytes to disk.
    chunk_size: usize,
    counter: AtomicU64,
    /// Per-item locks serializing version assignment. The map itself is
    /// only held long enough to clone out the item's own lock.
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}
impl LocalStore {
    /// Create a store rooted at `root`, which must be absolute. The
    /// directory is created if it does not exist.
    pub fn new(name: impl Into<String>, root: impl AsRef<Path>, chunk_size: usize) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_absolute() {
            exn::bail!(ErrorKind::InvalidPath(root));
        }
        if root.exists() {
            if !root.is_dir() {
                exn::bail!(ErrorKind::InvalidPath(root));
            }
        } else {
            // Non-async is fine here; this happens once at process start.
            sync_create_dir(&root).map_err(|e| Self::map_io_error(e, &root))?;
        }
        Ok(Self {
            name: name.into(),
            root,
            chunk_size: chunk_size.max(1),
            counter: AtomicU64::new(0),
            locks: Mutex::new(HashMap::new()),
        })
    }

    fn map_io_error(e: std::io::Error, path: &Path) -> ErrorKind {
        match e.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::InvalidPath(path.to_path_buf()),
            _ => ErrorKind::Io(e),
        }
    }

    /// Allocate a fresh item identifier. Identifiers are never reused:
    /// the timestamp makes them unique across restarts and the counter
    /// within the process.
    fn new_item_id(&self) -> String {
        let nanos = UtcDateTime::now().unix_timestamp_nanos();
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        format!("{nanos:x}-{n:x}")
    }

    async fn lock_for(&self, item: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        // Entries whose lock nobody else holds a clone of are dead weight;
        // drop them so the map stays proportional to in-flight items.
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        locks.entry(item.to_string()).or_default().clone()
    }

    #[cfg(test)]
    async fn lock_count(&self) -> usize {
        self.locks.lock().await.len()
    }

    fn item_dir(&self, item: &str) -> Result<PathBuf> {
        // Identifiers are store-generated, but anything arriving through the
        // trait is treated as hostile: a single normal path component only.
        let validated = validate_name(item)?;
        if validated.components().count() != 1 {
            exn::bail!(ErrorKind::InvalidPath(validated));
        }
        Ok(self.root.join(validated))
    }

    async fn read_record(&self, item: &str) -> Result<Option<ItemRecord>> {
        let path = self.item_dir(item)?.join(RECORD_FILE);
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(ErrorKind::Io(e).into()),
        };
        let record = serde_json::from_slice(&bytes)
            .or_raise(|| ErrorKind::CorruptRecord(format!("unparseable record for item {item}")))?;
        Ok(Some(record))
    }

    /// Commit a record atomically: write to a staging file, then rename
    /// over the old one.
    async fn write_record(&self, record: &ItemRecord) -> Result<()> {
        let dir = self.item_dir(&record.id)?;
        fs::create_dir_all(&dir).await.map_err(ErrorKind::Io)?;
        let staging = dir.join(format!("{RECORD_FILE}.tmp"));
        let bytes = serde_json::to_vec_pretty(record)
            .or_raise(|| ErrorKind::CorruptRecord(format!("unserializable record for item {}", record.id)))?;
        fs::write(&staging, &bytes).await.map_err(ErrorKind::Io)?;
        fs::rename(&staging, dir.join(RECORD_FILE)).await.map_err(ErrorKind::Io)?;
        Ok(())
    }

    /// Stage a version's constituent files under `v{n}.tmp`, then rename
    /// the whole directory to `v{n}`. The rename is the commit point.
    async fn write_version_files(&self, item: &str, number: u32, files: &[StoredFile]) -> Result<()> {
        let dir = self.item_dir(item)?;
        let staging = dir.join(format!("v{number}.tmp"));
        let target = dir.join(format!("v{number}"));
        // A previous cancelled attempt may have left a staging directory.
        if fs::try_exists(&staging).await.map_err(ErrorKind::Io)? {
            fs::remove_dir_all(&staging).await.map_err(ErrorKind::Io)?;
        }
        fs::create_dir_all(&staging).await.map_err(ErrorKind::Io)?;
        for file in files {
            let relative = validate_name(&file.name)?;
            let path = staging.join(relative);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).await.map_err(ErrorKind::Io)?;
            }
            let mut handle = fs::File::create(&path).await.map_err(|e| Self::map_io_error(e, &path))?;
            for chunk in file.data.chunks(self.chunk_size) {
                handle.write_all(chunk).await.map_err(ErrorKind::Io)?;
            }
            handle.flush().await.map_err(ErrorKind::Io)?;
        }
        fs::rename(&staging, &target).await.map_err(ErrorKind::Io)?;
        Ok(())
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

    /// Recursively collect the files under a version directory, with names
    /// relative to it.
    async fn collect_files(&self, version_dir: &Path) -> Result<Vec<StoredFile>> {
        let mut files = Vec::new();
        let mut stack = vec![version_dir.to_path_buf()];
        while let Some(current) = stack.pop() {
            let mut entries = fs::read_dir(&current).await.map_err(ErrorKind::Io)?;
            while let Some(entry) = entries.next_entry().await.map_err(ErrorKind::Io)? {
                let path = entry.path();
                let metadata = entry.metadata().await.map_err(ErrorKind::Io)?;
                if metadata.is_dir() {
                    stack.push(path);
                } else if metadata.is_file() {
                    let name = path
                        .strip_prefix(version_dir)
                        .ok()
                        .and_then(|p| p.to_str())
                        .ok_or_else(|| ErrorKind::InvalidPath(path.clone()))?
                        .to_string();
                    let data = fs::read(&path).await.map_err(ErrorKind::Io)?;
                    files.push(StoredFile { name, data });
                }
            }
        }
        // Deterministic order regardless of directory iteration order.
        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }
}

#[async_trait]
impl ResourceStore for LocalStore {
    fn name(&self) -> &str {
        &self.name
    }

    #[tracing::instrument(skip_all, fields(store = %self.name, collection = %collection))]
    async fn create_item(
        &self,
        collection: &str,
        metadata: EntryMetadata,
        seed: VersionSeed,
        files: Vec<StoredFile>,
    ) -> Result<ItemRecord> {
        let id = self.new_item_id();
        let lock = self.lock_for(&id).await;
        let _guard = lock.lock().await;
        let mut record = ItemRecord {
            id: id.clone(),
            collection: collection.to_string(),
            state: ItemState::Active,
            versions: Vec::new(),
            metadata,
            created_at: UtcDateTime::now(),
        };
        let version = Self::build_version(&record, seed, &files);
        self.write_version_files(&id, version.number, &files).await?;
        record.versions.push(version);
        self.write_record(&record).await?;
        tracing::debug!(item = %record.id, "item created");
        Ok(record)
    }

    #[tracing::instrument(skip_all, fields(store = %self.name, item = %item))]
    async fn append_version(&self, item: &str, seed: VersionSeed, files: Vec<StoredFile>) -> Result<ItemRecord> {
        let lock = self.lock_for(item).await;
        let _guard = lock.lock().await;
        let mut record = match self.read_record(item).await? {
            Some(record) => record,
            None => exn::bail!(ErrorKind::ItemNotFound(item.to_string())),
        };
        if record.state == ItemState::Deleted {
            exn::bail!(ErrorKind::ItemDeleted(item.to_string()));
        }
        let version = Self::build_version(&record, seed, &files);
        let number = version.number;
        self.write_version_files(item, number, &files).await?;
        record.versions.push(version);
        self.write_record(&record).await?;
        tracing::debug!(item, version = number, "version appended");
        Ok(record)
    }

    async fn get_item(&self, item: &str) -> Result<Option<ItemRecord>> {
        self.read_record(item).await
    }

    async fn read_version_files(&self, item: &str, number: u32) -> Result<Vec<StoredFile>> {
        let record = match self.read_record(item).await? {
            Some(record) => record,
            None => exn::bail!(ErrorKind::ItemNotFound(item.to_string())),
        };
        if !record.versions.iter().any(|v| v.number == number) {
            exn::bail!(ErrorKind::VersionNotFound(item.to_string(), number));
        }
        let version_dir = self.item_dir(item)?.join(format!("v{number}"));
        self.collect_files(&version_dir).await
    }

    async fn replace_metadata(&self, item: &str, metadata: EntryMetadata) -> Result<ItemRecord> {
        let lock = self.lock_for(item).await;
        let _guard = lock.lock().await;
        let mut record = match self.read_record(item).await? {
            Some(record) => record,
            None => exn::bail!(ErrorKind::ItemNotFound(item.to_string())),
        };
        if record.state == ItemState::Deleted {
            exn::bail!(ErrorKind::ItemDeleted(item.to_string()));
        }
        record.metadata = metadata;
        self.write_record(&record).await?;
        Ok(record)
    }

    #[tracing::instrument(skip_all, fields(store = %self.name, item = %item, purge = ?purge))]
    async fn mark_deleted(&self, item: &str, purge: PurgePolicy) -> Result<ItemRecord> {
        let lock = self.lock_for(item).await;
        let _guard = lock.lock().await;
        let mut record = match self.read_record(item).await? {
            Some(record) => record,
            None => exn::bail!(ErrorKind::ItemNotFound(item.to_string())),
        };
        if record.state == ItemState::Deleted {
            exn::bail!(ErrorKind::ItemDeleted(item.to_string()));
        }
        record.state = ItemState::Deleted;
        // Record first: once the state flips, the payloads are unreachable
        // through the engine, so purging after is safe even if interrupted.
        self.write_record(&record).await?;
        if purge == PurgePolicy::Purge {
            let dir = self.item_dir(item)?;
            for version in &record.versions {
                let version_dir = dir.join(format!("v{}", version.number));
                if fs::try_exists(&version_dir).await.map_err(ErrorKind::Io)? {
                    fs::remove_dir_all(&version_dir).await.map_err(ErrorKind::Io)?;
                }
            }
        }
        tracing::debug!(item, "item deleted");
        Ok(record)
    }

    fn list_items<'a>(&'a self, collection: &'a str) -> ItemStream<'a> {
        Box::pin(stream! {
            let mut entries = match fs::read_dir(&self.root).await {
                Ok(entries) => entries,
                Err(e) => {
                    yield Err(exn::Exn::from(ErrorKind::Io(e)));
                    return;
                },
            };
            loop {
                let entry = match entries.next_entry().await {
                    Ok(Some(entry)) => entry,
                    Ok(None) => break,
                    Err(e) => {
                        yield Err(exn::Exn::from(ErrorKind::Io(e)));
                        continue;
                    },
                };
                let Ok(name) = entry.file_name().into_string() else { continue };
                match self.read_record(&name).await {
                    Ok(Some(record)) if record.collection == collection => yield Ok(record),
                    // Not every directory entry is an item (staging leftovers).
                    Ok(_) => {},
                    Err(e) => yield Err(e),
                }
            }
        })
    }
}
