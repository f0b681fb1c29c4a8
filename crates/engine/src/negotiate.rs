//! Content negotiation over Accept media ranges.
//!
//! The server offers an ordered list of representations per resource kind
//! (container versus media resource). The client's Accept header is parsed
//! into weighted media ranges and intersected with that list: the offered
//! format with the highest client weight wins, ties broken by server list
//! order. The outcome is a pure function of header plus configuration.

use crate::error::{ErrorKind, Result};
use scabbard_config::FormatSpec;

/// One parsed media range from an Accept header.
#[derive(Clone, Debug)]
struct MediaRange {
    kind: String,
    subtype: String,
    quality: f32,
}

impl MediaRange {
    /// Whether this range covers the given content type essence, and how
    /// specifically. When several ranges cover the same offer, the most
    /// specific one decides the weight that applies to it; specificity
    /// never ranks one offer against another.
    fn specificity_for(&self, essence: &str) -> Option<u8> {
        let (kind, subtype) = essence.split_once('/')?;
        match (self.kind.as_str(), self.subtype.as_str()) {
            ("*", "*") => Some(0),
            (range_kind, "*") if range_kind == kind => Some(1),
            (range_kind, range_subtype) if range_kind == kind && range_subtype == subtype => Some(2),
            _ => None,
        }
    }
}

/// The content type with any parameters stripped, lowercased.
fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Parse an Accept header into media ranges. Malformed segments are skipped
/// rather than failing the whole header, matching common server behaviour.
fn parse_accept(header: &str) -> Vec<MediaRange> {
    let mut ranges = Vec::new();
    for segment in header.split(',') {
        let mut parts = segment.split(';');
        let Some(range) = parts.next() else { continue };
        let Some((kind, subtype)) = range.trim().split_once('/') else {
            continue;
        };
        if kind.is_empty() || subtype.is_empty() {
            continue;
        }
        let mut quality = 1.0f32;
        for param in parts {
            if let Some((name, value)) = param.split_once('=')
                && name.trim().eq_ignore_ascii_case("q")
                && let Ok(parsed) = value.trim().parse::<f32>()
            {
                quality = parsed.clamp(0.0, 1.0);
            }
        }
        ranges.push(MediaRange {
            kind: kind.trim().to_ascii_lowercase(),
            subtype: subtype.trim().to_ascii_lowercase(),
            quality,
        });
    }
    ranges
}

/// Negotiates a representation for one resource kind.
pub struct ContentNegotiator {
    formats: Vec<FormatSpec>,
    default: FormatSpec,
}

impl ContentNegotiator {
    /// `formats` is the server preference order; `default` is returned when
    /// the client expresses no preference.
    pub fn new(formats: Vec<FormatSpec>, default: FormatSpec) -> Self {
        Self { formats, default }
    }

    /// Pick the representation to produce for the given Accept header.
    pub fn negotiate(&self, accept: Option<&str>) -> Result<FormatSpec> {
        let Some(header) = accept else {
            return Ok(self.default.clone());
        };
        let ranges = parse_accept(header);
        if ranges.is_empty() {
            return Ok(self.default.clone());
        }

        let mut best: Option<(f32, &FormatSpec)> = None;
        for format in &self.formats {
            let format_essence = essence(&format.content_type);
            // The most specific matching range decides the weight that
            // applies to this offer, so an exact `q=0` is not overridden
            // by a permissive wildcard.
            let mut applicable: Option<(u8, f32)> = None;
            for range in &ranges {
                let Some(specificity) = range.specificity_for(&format_essence) else {
                    continue;
                };
                applicable = Some(match applicable {
                    None => (specificity, range.quality),
                    Some((spec, _)) if specificity > spec => (specificity, range.quality),
                    Some((spec, quality)) if specificity == spec => (spec, quality.max(range.quality)),
                    Some(kept) => kept,
                });
            }
            let Some((_, quality)) = applicable else { continue };
            if quality <= 0.0 {
                continue;
            }
            // Strict comparison keeps the earlier server entry on equal
            // weight.
            if best.is_none_or(|(held, _)| quality > held) {
                best = Some((quality, format));
            }
        }

        match best {
            Some((_, format)) => {
                tracing::debug!(content_type = %format.content_type, "negotiated representation");
                Ok(format.clone())
            }
            None => exn::bail!(ErrorKind::NotAcceptable(
                self.formats.iter().map(|f| f.content_type.clone()).collect(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const SIMPLE_ZIP: &str = "http://purl.org/net/sword/package/SimpleZip";

    fn negotiator() -> ContentNegotiator {
        ContentNegotiator::new(
            vec![
                FormatSpec::with_packaging("application/zip", SIMPLE_ZIP),
                FormatSpec::new("application/zip"),
                FormatSpec::new("application/atom+xml;type=feed"),
            ],
            FormatSpec::new("application/zip"),
        )
    }

    #[test]
    fn no_accept_header_yields_the_default() {
        let format = negotiator().negotiate(None).unwrap();
        assert_eq!(format, FormatSpec::new("application/zip"));
    }

    #[test]
    fn exact_match_respects_server_order() {
        // Both zip entries match; the earlier (packaged) one wins.
        let format = negotiator().negotiate(Some("application/zip")).unwrap();
        assert_eq!(format.packaging.as_deref(), Some(SIMPLE_ZIP));
    }

    #[test]
    fn quality_outranks_server_order() {
        let format = negotiator()
            .negotiate(Some("application/zip;q=0.4, application/atom+xml;q=0.9"))
            .unwrap();
        assert_eq!(format.content_type, "application/atom+xml;type=feed");
    }

    #[rstest]
    #[case("*/*")]
    #[case("application/*")]
    fn wildcards_match_the_first_offer(#[case] header: &str) {
        let format = negotiator().negotiate(Some(header)).unwrap();
        assert_eq!(format.packaging.as_deref(), Some(SIMPLE_ZIP));
    }

    #[test]
    fn equal_weight_ties_follow_server_order() {
        // Both ranges carry q=1; the exact feed match must not outrank the
        // earlier zip entries covered by the wildcard.
        let format = negotiator()
            .negotiate(Some("*/*, application/atom+xml"))
            .unwrap();
        assert_eq!(format.packaging.as_deref(), Some(SIMPLE_ZIP));
    }

    #[test]
    fn no_intersection_is_not_acceptable() {
        let err = negotiator().negotiate(Some("text/html")).unwrap_err();
        let ErrorKind::NotAcceptable(supported) = &*err else {
            panic!("expected NotAcceptable, got {err}");
        };
        assert!(supported.contains(&"application/zip".to_string()));
    }

    #[test]
    fn zero_quality_excludes_a_range() {
        let err = negotiator()
            .negotiate(Some("application/zip;q=0, application/atom+xml;q=0"))
            .unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotAcceptable(_)));
    }

    #[test]
    fn malformed_segments_are_skipped() {
        let format = negotiator().negotiate(Some("garbage, application/zip")).unwrap();
        assert_eq!(essence(&format.content_type), "application/zip");
    }

    #[test]
    fn negotiation_is_deterministic() {
        let header = Some("application/*;q=0.5, */*;q=0.1");
        let first = negotiator().negotiate(header).unwrap();
        let second = negotiator().negotiate(header).unwrap();
        assert_eq!(first, second);
    }
}
