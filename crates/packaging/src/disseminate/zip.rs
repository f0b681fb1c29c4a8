//! Zip disseminator: package stored files back into an archive.

use crate::error::{ErrorKind, Result};
use crate::{Disseminator, Package, VersionContent};
use exn::ResultExt;
use std::io::{Cursor, Write};
use tracing::instrument;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// Re-zips the constituent files of the most recent content version.
///
/// Round-trips with the SimpleZip ingester: unpacking the produced archive
/// yields the same set of (name, bytes) pairs that went in.
#[derive(Debug, Default)]
pub struct ZipDisseminator;

impl Disseminator for ZipDisseminator {
    fn name(&self) -> &'static str {
        "default-zip"
    }

    #[instrument(skip(self, versions), fields(codec = self.name(), versions = versions.len()))]
    fn package(&self, versions: &[VersionContent]) -> Result<Package> {
        let current = versions
            .last()
            .ok_or_else(|| ErrorKind::Malformed("no content versions to package".into()))?;
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for file in &current.files {
            writer
                .start_file(file.name.clone(), SimpleFileOptions::default())
                .or_raise(|| ErrorKind::InvalidName(file.name.clone()))?;
            writer
                .write_all(&file.data)
                .or_raise(|| ErrorKind::Malformed("zip write failed".into()))?;
        }
        let data = writer
            .finish()
            .or_raise(|| ErrorKind::Malformed("zip finalization failed".into()))?
            .into_inner();
        Ok(Package { data, content_type: "application/zip".to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::SimpleZipIngester;
    use crate::{Ingester, PackagedFile};
    use scabbard_store::{ContentVersion, StoredFile};
    use time::UtcDateTime;

    fn version(number: u32, files: Vec<StoredFile>) -> VersionContent {
        VersionContent {
            version: ContentVersion {
                number,
                content_type: "application/zip".into(),
                packaging: None,
                size: 0,
                hash: String::new(),
                crc32: 0,
                deposited_at: UtcDateTime::now(),
            },
            files,
        }
    }

    #[test]
    fn round_trips_with_zip_ingester() {
        let files = vec![
            StoredFile::new("paper.pdf", b"pdf bytes".to_vec()),
            StoredFile::new("data/table.csv", b"a,b\n".to_vec()),
        ];
        let package = ZipDisseminator.package(&[version(1, files.clone())]).unwrap();
        assert_eq!(package.content_type, "application/zip");
        let unpacked = SimpleZipIngester::new(None).ingest(&package.data, "application/zip").unwrap();
        let expected: Vec<PackagedFile> =
            files.into_iter().map(|f| PackagedFile::new(f.name, f.data)).collect();
        assert_eq!(unpacked, expected);
    }

    #[test]
    fn packages_only_the_latest_version() {
        let old = version(1, vec![StoredFile::new("old.txt", b"old".to_vec())]);
        let new = version(2, vec![StoredFile::new("new.txt", b"new".to_vec())]);
        let package = ZipDisseminator.package(&[old, new]).unwrap();
        let unpacked = SimpleZipIngester::new(None).ingest(&package.data, "application/zip").unwrap();
        assert_eq!(unpacked.len(), 1);
        assert_eq!(unpacked[0].name, "new.txt");
    }

    #[test]
    fn no_versions_is_an_error() {
        assert!(ZipDisseminator.package(&[]).is_err());
    }
}
