//! Representation formats and codec rule tables.

use serde::Deserialize;

/// A representation the server can produce or accept: a MIME content type
/// plus an optional packaging URI constraining it further.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct FormatSpec {
    pub content_type: String,
    #[serde(default)]
    pub packaging: Option<String>,
}
impl FormatSpec {
    pub fn new(content_type: impl Into<String>) -> Self {
        Self { content_type: content_type.into(), packaging: None }
    }

    pub fn with_packaging(content_type: impl Into<String>, packaging: impl Into<String>) -> Self {
        Self {
            content_type: content_type.into(),
            packaging: Some(packaging.into()),
        }
    }
}

/// Identifier for a built-in codec implementation.
///
/// The original server resolved codecs by loading dotted class paths out of
/// its settings dictionary at request time. That becomes a closed enum here:
/// configuration names one of these identifiers and the packaging registry
/// maps it to a concrete implementation at process start. No reflection.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum CodecId {
    /// Pass the payload through as a single file.
    Binary,
    /// Extract the entries of a zip archive.
    SimpleZip,
    /// Unpack a METS DSpace SIP: a zip with a `mets.xml` manifest declaring
    /// its constituent parts.
    MetsDspace,
    /// Parse an Atom entry document into item metadata.
    EntryIngest,
    /// Package stored files back into a zip archive.
    DefaultZip,
    /// Serialize an Atom feed listing an item's content versions.
    Feed,
}

/// One resolution rule in a codec table.
///
/// Rules are evaluated in declaration order and the first match wins, so
/// tables must be written most-specific-first. A rule that constrains
/// packaging only matches when the request's packaging is equal; a rule that
/// constrains neither field matches everything (useful as a trailing
/// default).
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CodecRule {
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub packaging: Option<String>,
    pub codec: CodecId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_spec_constructors() {
        let plain = FormatSpec::new("application/zip");
        assert_eq!(plain.packaging, None);
        let constrained =
            FormatSpec::with_packaging("application/zip", "http://purl.org/net/sword/package/SimpleZip");
        assert_eq!(constrained.packaging.as_deref(), Some("http://purl.org/net/sword/package/SimpleZip"));
    }

    #[test]
    fn codec_id_deserializes_kebab_case() {
        let id: CodecId = serde_json::from_str("\"simple-zip\"").unwrap();
        assert_eq!(id, CodecId::SimpleZip);
    }
}
