//! Data model for deposited items and their content versions.

use serde::{Deserialize, Serialize};
use time::UtcDateTime;

/// Lifecycle state of a deposited item.
///
/// `nonexistent → active → deleted`, with `deleted` terminal. A deleted
/// item keeps its record (and identifier) forever so that readers can
/// distinguish "gone" from "never existed".
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemState {
    Active,
    Deleted,
}

/// One immutable content version of an item.
///
/// Version numbers are assigned by the store, strictly increasing from 1
/// with no gaps, under per-item serialization.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ContentVersion {
    pub number: u32,
    /// Content type declared on the deposit request.
    pub content_type: String,
    /// Packaging URI declared on the deposit request, if any.
    pub packaging: Option<String>,
    /// Size of the deposited payload in bytes (before unpacking).
    pub size: u64,
    /// blake3 hash over the unpacked constituent files.
    pub hash: String,
    /// crc32 checksum over the same bytes as `hash`.
    pub crc32: u32,
    pub deposited_at: UtcDateTime,
}

/// The declared facts about an incoming version; the store fills in the
/// number, integrity fields and timestamp when it commits.
#[derive(Clone, Debug)]
pub struct VersionSeed {
    pub content_type: String,
    pub packaging: Option<String>,
    /// Size of the original payload in bytes.
    pub payload_size: u64,
}

/// A constituent file of a content version, as produced by an ingester.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredFile {
    pub name: String,
    pub data: Vec<u8>,
}
impl StoredFile {
    pub fn new(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self { name: name.into(), data: data.into() }
    }
}

/// Atom-entry-like metadata attached to an item.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
pub struct EntryMetadata {
    pub title: Option<String>,
    pub authors: Vec<String>,
    pub summary: Option<String>,
    /// Free-form (name, value) pairs preserved verbatim from the entry.
    pub fields: Vec<(String, String)>,
}

/// The persisted record of a deposited item.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ItemRecord {
    pub id: String,
    /// Identifier of the owning collection.
    pub collection: String,
    pub state: ItemState,
    /// Ordered by version number; never empty once the item exists.
    pub versions: Vec<ContentVersion>,
    pub metadata: EntryMetadata,
    pub created_at: UtcDateTime,
}
impl ItemRecord {
    /// The most recent content version.
    pub fn current_version(&self) -> Option<&ContentVersion> {
        self.versions.last()
    }

    /// The number the next appended version must take.
    pub fn next_version_number(&self) -> u32 {
        self.versions.last().map_or(1, |v| v.number + 1)
    }

    pub fn is_active(&self) -> bool {
        self.state == ItemState::Active
    }
}

/// Compute the integrity fields for a set of constituent files.
///
/// Both digests cover each file's name and data in order, with a separator
/// byte between name and data so `("ab", "c")` and `("a", "bc")` differ.
pub(crate) fn digest_files(files: &[StoredFile]) -> (String, u32) {
    let mut hasher = blake3::Hasher::new();
    let mut crc = crc32fast::Hasher::new();
    for file in files {
        hasher.update(file.name.as_bytes());
        hasher.update(&[0]);
        hasher.update(&file.data);
        crc.update(file.name.as_bytes());
        crc.update(&[0]);
        crc.update(&file.data);
    }
    (hasher.finalize().to_hex().to_string(), crc.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_with_versions(numbers: &[u32]) -> ItemRecord {
        ItemRecord {
            id: "item-1".into(),
            collection: "col1".into(),
            state: ItemState::Active,
            versions: numbers
                .iter()
                .map(|&number| ContentVersion {
                    number,
                    content_type: "application/zip".into(),
                    packaging: None,
                    size: 0,
                    hash: String::new(),
                    crc32: 0,
                    deposited_at: UtcDateTime::now(),
                })
                .collect(),
            metadata: EntryMetadata::default(),
            created_at: UtcDateTime::now(),
        }
    }

    #[test]
    fn next_version_number_starts_at_one() {
        assert_eq!(record_with_versions(&[]).next_version_number(), 1);
        assert_eq!(record_with_versions(&[1, 2, 3]).next_version_number(), 4);
    }

    #[test]
    fn digest_separates_name_and_data() {
        let (a, _) = digest_files(&[StoredFile::new("ab", b"c".to_vec())]);
        let (b, _) = digest_files(&[StoredFile::new("a", b"bc".to_vec())]);
        assert_ne!(a, b);
    }

    #[test]
    fn digest_is_order_sensitive() {
        let one = StoredFile::new("one.txt", b"1".to_vec());
        let two = StoredFile::new("two.txt", b"2".to_vec());
        let (a, _) = digest_files(&[one.clone(), two.clone()]);
        let (b, _) = digest_files(&[two, one]);
        assert_ne!(a, b);
    }

    #[test]
    fn record_round_trips_through_json() {
        let record = record_with_versions(&[1]);
        let json = serde_json::to_string(&record).unwrap();
        let back: ItemRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, record.id);
        assert_eq!(back.versions.len(), 1);
        assert!(back.is_active());
    }
}
