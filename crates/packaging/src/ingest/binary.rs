//! Pass-through ingester for opaque binary deposits.

use crate::error::Result;
use crate::{Ingester, PackagedFile};

/// Stores the payload unchanged as a single file.
///
/// The stored name carries an extension guessed from the declared content
/// type so that a later retrieval has something sensible to serve.
#[derive(Debug, Default)]
pub struct BinaryIngester;

fn extension_for(content_type: &str) -> &'static str {
    // Only the subtype matters; parameters like `;type=entry` do not.
    let essence = content_type.split(';').next().unwrap_or("").trim();
    match essence {
        "application/zip" => "zip",
        "application/pdf" => "pdf",
        "application/xml" | "text/xml" | "application/atom+xml" => "xml",
        "text/plain" => "txt",
        _ => "bin",
    }
}

impl Ingester for BinaryIngester {
    fn name(&self) -> &'static str {
        "binary"
    }

    fn ingest(&self, payload: &[u8], declared_type: &str) -> Result<Vec<PackagedFile>> {
        let name = format!("content.{}", extension_for(declared_type));
        Ok(vec![PackagedFile::new(name, payload.to_vec())])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_payload_through_unchanged() {
        let files = BinaryIngester.ingest(b"raw bytes", "application/pdf").unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "content.pdf");
        assert_eq!(files[0].data, b"raw bytes");
        assert!(files[0].metadata.is_none());
    }

    #[test]
    fn unknown_type_gets_bin_extension() {
        let files = BinaryIngester.ingest(b"x", "application/x-obscure").unwrap();
        assert_eq!(files[0].name, "content.bin");
    }

    #[test]
    fn parameters_are_ignored_for_extension() {
        let files = BinaryIngester.ingest(b"x", "application/atom+xml;type=entry").unwrap();
        assert_eq!(files[0].name, "content.xml");
    }
}
