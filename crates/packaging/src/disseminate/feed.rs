//! Atom feed disseminator: serialize an item's version history.

use crate::error::{ErrorKind, Result};
use crate::{Disseminator, Package, VersionContent};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use time::format_description::well_known::Rfc3339;

const ATOM_NS: &str = "http://www.w3.org/2005/Atom";
const FEED_TYPE: &str = "application/atom+xml;type=feed";

/// Produces an Atom feed with one entry per stored content version, newest
/// first. No payload bytes are included; the feed describes what exists.
#[derive(Debug, Default)]
pub struct FeedDisseminator;

/// Map whatever error type the XML writer surfaces into ours.
fn wmap<E: std::fmt::Display>(e: E) -> ErrorKind {
    ErrorKind::Malformed(format!("feed serialization failed: {e}"))
}

fn write_text_element(writer: &mut Writer<Vec<u8>>, name: &str, text: &str) -> Result<()> {
    let map = wmap;
    writer.write_event(Event::Start(BytesStart::new(name))).map_err(map)?;
    writer.write_event(Event::Text(BytesText::new(text))).map_err(map)?;
    writer.write_event(Event::End(BytesEnd::new(name))).map_err(map)?;
    Ok(())
}

impl Disseminator for FeedDisseminator {
    fn name(&self) -> &'static str {
        "feed"
    }

    fn package(&self, versions: &[VersionContent]) -> Result<Package> {
        let map = wmap;
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
            .map_err(map)?;

        let mut feed = BytesStart::new("feed");
        feed.push_attribute(("xmlns", ATOM_NS));
        writer.write_event(Event::Start(feed)).map_err(map)?;
        write_text_element(&mut writer, "title", "Content versions")?;
        if let Some(latest) = versions.last() {
            let updated = latest
                .version
                .deposited_at
                .format(&Rfc3339)
                .map_err(|e| ErrorKind::Malformed(format!("unformattable timestamp: {e}")))?;
            write_text_element(&mut writer, "updated", &updated)?;
        }

        for content in versions.iter().rev() {
            let version = &content.version;
            writer.write_event(Event::Start(BytesStart::new("entry"))).map_err(map)?;
            write_text_element(&mut writer, "id", &format!("urn:version:{}", version.number))?;
            write_text_element(&mut writer, "title", &format!("Version {}", version.number))?;
            let deposited = version
                .deposited_at
                .format(&Rfc3339)
                .map_err(|e| ErrorKind::Malformed(format!("unformattable timestamp: {e}")))?;
            write_text_element(&mut writer, "updated", &deposited)?;
            let mut content_el = BytesStart::new("content");
            content_el.push_attribute(("type", version.content_type.as_str()));
            if let Some(packaging) = &version.packaging {
                content_el.push_attribute(("src", packaging.as_str()));
            }
            writer.write_event(Event::Empty(content_el)).map_err(map)?;
            write_text_element(&mut writer, "summary", &format!("{} bytes, {} files", version.size, content.files.len()))?;
            writer.write_event(Event::End(BytesEnd::new("entry"))).map_err(map)?;
        }

        writer.write_event(Event::End(BytesEnd::new("feed"))).map_err(map)?;
        Ok(Package {
            data: writer.into_inner(),
            content_type: FEED_TYPE.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scabbard_store::{ContentVersion, StoredFile};
    use time::UtcDateTime;

    fn version(number: u32) -> VersionContent {
        VersionContent {
            version: ContentVersion {
                number,
                content_type: "application/zip".into(),
                packaging: Some("http://purl.org/net/sword/package/SimpleZip".into()),
                size: 128,
                hash: "abc".into(),
                crc32: 0,
                deposited_at: UtcDateTime::now(),
            },
            files: vec![StoredFile::new("paper.pdf", b"pdf".to_vec())],
        }
    }

    #[test]
    fn lists_every_version_newest_first() {
        let package = FeedDisseminator.package(&[version(1), version(2)]).unwrap();
        assert_eq!(package.content_type, FEED_TYPE);
        let xml = String::from_utf8(package.data).unwrap();
        let first = xml.find("urn:version:2").unwrap();
        let second = xml.find("urn:version:1").unwrap();
        assert!(first < second);
    }

    #[test]
    fn empty_history_is_still_a_feed() {
        let package = FeedDisseminator.package(&[]).unwrap();
        let xml = String::from_utf8(package.data).unwrap();
        assert!(xml.contains("<feed"));
        assert!(!xml.contains("<entry>"));
    }
}
