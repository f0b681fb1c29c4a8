//! SimpleZip ingester: extract the entries of a zip archive.

use crate::error::{ErrorKind, Result};
use crate::{Ingester, PackagedFile};
use exn::ResultExt;
use std::io::{Cursor, Read};
use tracing::instrument;
use zip::ZipArchive;

/// Extracts every file entry of a zip archive as a constituent file.
///
/// Directory entries are skipped; their presence is implied by the entry
/// names. The cumulative unpacked size is bounded by `max_unpacked` to keep
/// a small archive from expanding into something enormous.
#[derive(Debug)]
pub struct SimpleZipIngester {
    max_unpacked: Option<u64>,
}
impl SimpleZipIngester {
    pub fn new(max_unpacked: Option<u64>) -> Self {
        Self { max_unpacked }
    }
}

pub(crate) fn unpack(payload: &[u8], max_unpacked: Option<u64>) -> Result<Vec<PackagedFile>> {
    let mut archive =
        ZipArchive::new(Cursor::new(payload)).or_raise(|| ErrorKind::Malformed("not a zip archive".into()))?;
    let mut files = Vec::with_capacity(archive.len());
    let mut unpacked: u64 = 0;
    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .or_raise(|| ErrorKind::Malformed(format!("unreadable zip entry at index {index}")))?;
        if entry.is_dir() {
            continue;
        }
        unpacked = unpacked.saturating_add(entry.size());
        if let Some(limit) = max_unpacked
            && unpacked > limit
        {
            exn::bail!(ErrorKind::TooLarge { size: unpacked, limit });
        }
        let name = entry.name().to_string();
        let mut data = Vec::with_capacity(entry.size() as usize);
        entry
            .read_to_end(&mut data)
            .or_raise(|| ErrorKind::Malformed(format!("corrupt zip entry `{name}`")))?;
        files.push(PackagedFile::new(name, data));
    }
    Ok(files)
}

impl Ingester for SimpleZipIngester {
    fn name(&self) -> &'static str {
        "simple-zip"
    }

    #[instrument(skip(self, payload), fields(codec = self.name(), payload_size = payload.len()))]
    fn ingest(&self, payload: &[u8], _declared_type: &str) -> Result<Vec<PackagedFile>> {
        unpack(payload, self.max_unpacked)
    }
}

/// Build a zip archive in memory. Test helper shared by the codec tests.
#[cfg(test)]
pub(crate) fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
    use std::io::Write;
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in entries {
        writer.start_file(name.to_string(), zip::write::SimpleFileOptions::default()).unwrap();
        writer.write_all(data).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_entries() {
        let payload = build_zip(&[("paper.pdf", b"pdf"), ("data/table.csv", b"a,b")]);
        let files = SimpleZipIngester::new(None).ingest(&payload, "application/zip").unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].name, "paper.pdf");
        assert_eq!(files[1].name, "data/table.csv");
        assert_eq!(files[1].data, b"a,b");
    }

    #[test]
    fn corrupt_archive_is_malformed() {
        let err = SimpleZipIngester::new(None).ingest(b"definitely not a zip", "application/zip").unwrap_err();
        assert!(matches!(&*err, ErrorKind::Malformed(_)));
    }

    #[test]
    fn unpacked_size_limit_is_enforced() {
        let big = vec![0u8; 4096];
        let payload = build_zip(&[("big.bin", big.as_slice())]);
        let err = SimpleZipIngester::new(Some(1024)).ingest(&payload, "application/zip").unwrap_err();
        assert!(matches!(&*err, ErrorKind::TooLarge { limit: 1024, .. }));
    }

    #[test]
    fn empty_archive_yields_no_files() {
        let payload = build_zip(&[]);
        let files = SimpleZipIngester::new(None).ingest(&payload, "application/zip").unwrap();
        assert!(files.is_empty());
    }
}
