//! Codec resolution by ordered predicate rules.

use crate::disseminate::{FeedDisseminator, ZipDisseminator};
use crate::error::{ErrorKind, Result};
use crate::ingest::{BinaryIngester, EntryIngester, MetsIngester, SimpleZipIngester};
use crate::{Disseminator, Ingester};
use scabbard_config::{CodecId, CodecRule, SwordConfig};
use std::sync::Arc;

/// Resolves (content type, packaging URI) pairs to codecs.
///
/// Rules are consulted in declaration order and the first match wins, so the
/// tables must be declared most-specific-first. A rule constraining
/// packaging only matches a request that declares that exact packaging; a
/// rule constraining neither field acts as a catch-all.
///
/// Codecs are instantiated once at construction; resolution is a lookup,
/// never allocation.
pub struct Registry {
    ingest_rules: Vec<(CodecRule, Arc<dyn Ingester>)>,
    disseminate_rules: Vec<(CodecRule, Arc<dyn Disseminator>)>,
    entry_ingester: Arc<dyn Ingester>,
}

fn rule_matches(rule: &CodecRule, content_type: &str, packaging: Option<&str>) -> bool {
    if let Some(want) = &rule.content_type
        && want != content_type
    {
        return false;
    }
    if let Some(want) = &rule.packaging
        && packaging != Some(want.as_str())
    {
        return false;
    }
    true
}

fn make_ingester(id: CodecId, max_unpacked: Option<u64>) -> Arc<dyn Ingester> {
    match id {
        CodecId::Binary => Arc::new(BinaryIngester),
        CodecId::SimpleZip => Arc::new(SimpleZipIngester::new(max_unpacked)),
        CodecId::MetsDspace => Arc::new(MetsIngester::new(max_unpacked)),
        CodecId::EntryIngest => Arc::new(EntryIngester),
        // Disseminator ids in an ingest table are a configuration mistake;
        // fall back to pass-through rather than panicking at startup.
        CodecId::DefaultZip | CodecId::Feed => Arc::new(BinaryIngester),
    }
}

fn make_disseminator(id: CodecId) -> Arc<dyn Disseminator> {
    match id {
        CodecId::Feed => Arc::new(FeedDisseminator),
        _ => Arc::new(ZipDisseminator),
    }
}

impl Registry {
    /// Build the registry from configuration rule tables.
    ///
    /// `max_unpacked` bounds the cumulative unpacked size the archive
    /// ingesters will produce; it follows the global upload limit.
    pub fn from_rules(
        ingesters: &[CodecRule],
        disseminators: &[CodecRule],
        entry_ingester: CodecId,
        max_unpacked: Option<u64>,
    ) -> Self {
        Self {
            ingest_rules: ingesters
                .iter()
                .map(|rule| (rule.clone(), make_ingester(rule.codec, max_unpacked)))
                .collect(),
            disseminate_rules: disseminators
                .iter()
                .map(|rule| (rule.clone(), make_disseminator(rule.codec)))
                .collect(),
            entry_ingester: make_ingester(entry_ingester, max_unpacked),
        }
    }

    pub fn from_config(config: &SwordConfig) -> Self {
        Self::from_rules(
            &config.package_ingesters,
            &config.package_disseminators,
            config.entry_ingester,
            config.max_upload_size,
        )
    }

    pub fn resolve_ingester(&self, content_type: &str, packaging: Option<&str>) -> Result<Arc<dyn Ingester>> {
        for (rule, codec) in &self.ingest_rules {
            if rule_matches(rule, content_type, packaging) {
                tracing::debug!(codec = codec.name(), content_type, packaging, "resolved ingester");
                return Ok(codec.clone());
            }
        }
        exn::bail!(ErrorKind::unsupported(content_type, packaging))
    }

    pub fn resolve_disseminator(&self, content_type: &str, packaging: Option<&str>) -> Result<Arc<dyn Disseminator>> {
        for (rule, codec) in &self.disseminate_rules {
            if rule_matches(rule, content_type, packaging) {
                tracing::debug!(codec = codec.name(), content_type, packaging, "resolved disseminator");
                return Ok(codec.clone());
            }
        }
        exn::bail!(ErrorKind::unsupported(content_type, packaging))
    }

    /// The codec for Atom entry deposits against the Edit-IRI.
    pub fn entry_ingester(&self) -> Arc<dyn Ingester> {
        self.entry_ingester.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(content_type: Option<&str>, packaging: Option<&str>, codec: CodecId) -> CodecRule {
        CodecRule {
            content_type: content_type.map(String::from),
            packaging: packaging.map(String::from),
            codec,
        }
    }

    const SIMPLE_ZIP: &str = "http://purl.org/net/sword/package/SimpleZip";
    const BINARY: &str = "http://purl.org/net/sword/package/Binary";

    fn registry() -> Registry {
        Registry::from_rules(
            &[
                rule(Some("application/zip"), Some(SIMPLE_ZIP), CodecId::SimpleZip),
                rule(None, Some(BINARY), CodecId::Binary),
                rule(Some("application/zip"), None, CodecId::SimpleZip),
            ],
            &[
                rule(Some("application/atom+xml;type=feed"), None, CodecId::Feed),
                rule(Some("application/zip"), None, CodecId::DefaultZip),
            ],
            CodecId::EntryIngest,
            None,
        )
    }

    #[test]
    fn most_specific_rule_wins() {
        let registry = registry();
        let codec = registry.resolve_ingester("application/zip", Some(SIMPLE_ZIP)).unwrap();
        assert_eq!(codec.name(), "simple-zip");
        let codec = registry.resolve_ingester("application/pdf", Some(BINARY)).unwrap();
        assert_eq!(codec.name(), "binary");
    }

    #[test]
    fn packaging_constrained_rule_requires_packaging() {
        let registry = registry();
        // No packaging declared: the SimpleZip+packaging rule is skipped,
        // the trailing content-type-only rule matches.
        let codec = registry.resolve_ingester("application/zip", None).unwrap();
        assert_eq!(codec.name(), "simple-zip");
        // Unknown pairing resolves nothing.
        let err = registry.resolve_ingester("application/pdf", Some("urn:unregistered")).unwrap_err();
        assert!(matches!(&*err, ErrorKind::UnsupportedPackaging { .. }));
    }

    #[test]
    fn disseminators_resolve_independently() {
        let registry = registry();
        let codec = registry.resolve_disseminator("application/atom+xml;type=feed", None).unwrap();
        assert_eq!(codec.name(), "feed");
        let codec = registry.resolve_disseminator("application/zip", None).unwrap();
        assert_eq!(codec.name(), "default-zip");
        assert!(registry.resolve_disseminator("text/html", None).is_err());
    }

    #[test]
    fn entry_ingester_is_always_available() {
        assert_eq!(registry().entry_ingester().name(), "entry");
    }
}
