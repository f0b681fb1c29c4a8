//! Deposit Receipt projection.
//!
//! The receipt is derived from the stored item record on every read. It is
//! never cached or persisted, so it cannot drift from the record it
//! describes.

use crate::atom;
use crate::error::Result;
use quick_xml::Writer;
use scabbard_config::SwordConfig;
use scabbard_store::{EntryMetadata, ItemRecord};
use time::UtcDateTime;
use time::format_description::well_known::Rfc3339;

const DERIVED_RESOURCE_REL: &str = "http://purl.org/net/sword/terms/derivedResource";

/// The receipt returned for every successful deposit and for container
/// retrieval.
#[derive(Clone, Debug)]
pub struct DepositReceipt {
    pub item_id: String,
    /// IRI the container is updated and deleted through.
    pub edit_iri: String,
    /// IRI the media resource is retrieved through.
    pub media_iri: String,
    pub collection: String,
    /// Content type of the latest version.
    pub content_type: String,
    /// Packaging of the latest version, if one was declared.
    pub packaging: Option<String>,
    /// Number of the latest version.
    pub version: u32,
    /// Human-readable statement of what the server did with the deposit.
    pub treatment: String,
    /// Media IRIs of the prior content versions.
    pub derived_from: Vec<String>,
    /// Non-fatal problems encountered while processing, notably a failed
    /// collaborator notification.
    pub warnings: Vec<String>,
    pub metadata: EntryMetadata,
    pub last_deposited: UtcDateTime,
    /// blake3 hash of the latest version's constituent files.
    pub hash: String,
}

impl DepositReceipt {
    /// Project a receipt from a stored record.
    pub fn from_record(config: &SwordConfig, record: &ItemRecord) -> Self {
        let base = config.base_url_slashed();
        let media_iri = format!("{base}media/{}", record.id);
        let current = record.current_version();
        let derived_from = record
            .versions
            .iter()
            .rev()
            .skip(1)
            .rev()
            .map(|version| format!("{media_iri}/v{}", version.number))
            .collect();
        Self {
            item_id: record.id.clone(),
            edit_iri: format!("{base}edit/{}", record.id),
            media_iri,
            collection: record.collection.clone(),
            content_type: current.map(|v| v.content_type.clone()).unwrap_or_default(),
            packaging: current.and_then(|v| v.packaging.clone()),
            version: current.map_or(0, |v| v.number),
            treatment: "content stored and unpacked into constituent files".to_string(),
            derived_from,
            warnings: Vec::new(),
            metadata: record.metadata.clone(),
            last_deposited: current.map_or(record.created_at, |v| v.deposited_at),
            hash: current.map(|v| v.hash.clone()).unwrap_or_default(),
        }
    }

    /// Render the receipt as an Atom entry document.
    pub fn to_entry(&self, config: &SwordConfig) -> Result<Vec<u8>> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        atom::write_decl(&mut writer)?;
        atom::start_element(
            &mut writer,
            "entry",
            &[
                ("xmlns", atom::ATOM_NS),
                ("xmlns:sword", atom::SWORD_NS),
                ("xmlns:dcterms", atom::DCTERMS_NS),
            ],
        )?;

        atom::text_element(&mut writer, "id", &self.edit_iri)?;
        let title = self.metadata.title.as_deref().unwrap_or("Untitled deposit");
        atom::text_element(&mut writer, "title", title)?;
        let updated = self
            .last_deposited
            .format(&Rfc3339)
            .map_err(atom::wmap)?;
        atom::text_element(&mut writer, "updated", &updated)?;
        for author in &self.metadata.authors {
            atom::start_element(&mut writer, "author", &[])?;
            atom::text_element(&mut writer, "name", author)?;
            atom::end_element(&mut writer, "author")?;
        }
        if let Some(summary) = &self.metadata.summary {
            atom::text_element(&mut writer, "summary", summary)?;
        }

        atom::empty_element(
            &mut writer,
            "content",
            &[("type", self.content_type.as_str()), ("src", self.media_iri.as_str())],
        )?;
        atom::empty_element(&mut writer, "link", &[("rel", "edit"), ("href", self.edit_iri.as_str())])?;
        atom::empty_element(&mut writer, "link", &[("rel", "edit-media"), ("href", self.media_iri.as_str())])?;
        for prior in &self.derived_from {
            atom::empty_element(&mut writer, "link", &[("rel", DERIVED_RESOURCE_REL), ("href", prior.as_str())])?;
        }

        atom::start_element(
            &mut writer,
            "generator",
            &[("uri", config.generator.uri.as_str()), ("version", config.generator.version.as_str())],
        )?;
        atom::end_element(&mut writer, "generator")?;

        atom::text_element(&mut writer, "sword:treatment", &self.treatment)?;
        if let Some(packaging) = &self.packaging {
            atom::text_element(&mut writer, "sword:packaging", packaging)?;
        }
        if !self.warnings.is_empty() {
            atom::text_element(&mut writer, "sword:verboseDescription", &self.warnings.join("; "))?;
        }
        for (name, value) in &self.metadata.fields {
            // Free-form entry fields round-trip under their qualified name
            // when it is already dcterms, and are dropped otherwise.
            if name.starts_with("dcterms:") {
                atom::text_element(&mut writer, name, value)?;
            }
        }

        atom::end_element(&mut writer, "entry")?;
        Ok(writer.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scabbard_store::{ContentVersion, ItemState};

    fn config() -> SwordConfig {
        crate::test_support::config()
    }

    fn record(versions: u32) -> ItemRecord {
        ItemRecord {
            id: "item-1".into(),
            collection: "col1".into(),
            state: ItemState::Active,
            versions: (1..=versions)
                .map(|number| ContentVersion {
                    number,
                    content_type: "application/zip".into(),
                    packaging: Some("http://purl.org/net/sword/package/SimpleZip".into()),
                    size: 64,
                    hash: format!("hash-{number}"),
                    crc32: number,
                    deposited_at: UtcDateTime::now(),
                })
                .collect(),
            metadata: EntryMetadata {
                title: Some("A Study".into()),
                authors: vec!["A. Author".into()],
                summary: Some("Findings.".into()),
                fields: vec![("dcterms:issued".into(), "2026".into())],
            },
            created_at: UtcDateTime::now(),
        }
    }

    #[test]
    fn iris_derive_from_base_url() {
        let receipt = DepositReceipt::from_record(&config(), &record(1));
        assert_eq!(receipt.edit_iri, "http://localhost:5025/edit/item-1");
        assert_eq!(receipt.media_iri, "http://localhost:5025/media/item-1");
        assert_eq!(receipt.version, 1);
        assert!(receipt.derived_from.is_empty());
    }

    #[test]
    fn prior_versions_become_derived_from_links() {
        let receipt = DepositReceipt::from_record(&config(), &record(3));
        assert_eq!(receipt.version, 3);
        assert_eq!(
            receipt.derived_from,
            vec![
                "http://localhost:5025/media/item-1/v1".to_string(),
                "http://localhost:5025/media/item-1/v2".to_string(),
            ]
        );
    }

    #[test]
    fn entry_document_carries_metadata_and_links() {
        let config = config();
        let receipt = DepositReceipt::from_record(&config, &record(2));
        let xml = String::from_utf8(receipt.to_entry(&config).unwrap()).unwrap();
        assert!(xml.contains("<title>A Study</title>"));
        assert!(xml.contains("<name>A. Author</name>"));
        assert!(xml.contains("rel=\"edit-media\""));
        assert!(xml.contains(DERIVED_RESOURCE_REL));
        assert!(xml.contains("<sword:packaging>http://purl.org/net/sword/package/SimpleZip</sword:packaging>"));
        assert!(xml.contains("<dcterms:issued>2026</dcterms:issued>"));
    }

    #[test]
    fn warnings_render_as_verbose_description() {
        let config = config();
        let mut receipt = DepositReceipt::from_record(&config, &record(1));
        receipt.warnings.push("collaborator notification failed".into());
        let xml = String::from_utf8(receipt.to_entry(&config).unwrap()).unwrap();
        assert!(xml.contains("<sword:verboseDescription>collaborator notification failed"));
    }
}
