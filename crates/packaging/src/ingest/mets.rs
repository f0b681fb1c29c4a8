//! METS DSpace SIP ingester.
//!
//! A METS SIP is a zip archive whose `mets.xml` manifest declares the
//! constituent parts of the deposit (`FLocat` locators inside the file
//! section) plus descriptive metadata. Only the declared parts are kept;
//! undeclared archive entries are ignored, since the manifest is the
//! authority on what the package contains.

use crate::error::{ErrorKind, Result};
use crate::ingest::zip::unpack;
use crate::{Ingester, PackagedFile};
use quick_xml::Reader;
use quick_xml::events::Event;
use scabbard_store::EntryMetadata;
use tracing::instrument;

const MANIFEST: &str = "mets.xml";

#[derive(Debug)]
pub struct MetsIngester {
    max_unpacked: Option<u64>,
}
impl MetsIngester {
    pub fn new(max_unpacked: Option<u64>) -> Self {
        Self { max_unpacked }
    }
}

/// What the manifest declares: part locations and descriptive metadata.
struct Manifest {
    parts: Vec<String>,
    metadata: EntryMetadata,
}

/// Pull the `href` off a `FLocat` locator, if this element is one.
fn collect_flocat(e: &quick_xml::events::BytesStart<'_>, parts: &mut Vec<String>) -> Result<()> {
    if e.local_name().as_ref() != b"FLocat" {
        return Ok(());
    }
    for attr in e.attributes() {
        let attr = attr.map_err(|e| ErrorKind::Malformed(format!("invalid FLocat attribute: {e}")))?;
        if attr.key.local_name().as_ref() == b"href" {
            let href = attr
                .unescape_value()
                .map_err(|e| ErrorKind::Malformed(format!("invalid FLocat href: {e}")))?;
            parts.push(href.into_owned());
        }
    }
    Ok(())
}

fn parse_manifest(payload: &[u8]) -> Result<Manifest> {
    let mut reader = Reader::from_reader(payload);
    reader.config_mut().trim_text(true);

    let mut parts = Vec::new();
    let mut metadata = EntryMetadata::default();
    // Local names of currently open elements.
    let mut path: Vec<String> = Vec::new();

    loop {
        let event = match reader.read_event() {
            Ok(event) => event,
            Err(e) => exn::bail!(ErrorKind::Malformed(format!("invalid mets manifest: {e}"))),
        };
        match event {
            Event::Start(e) => {
                let local = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                collect_flocat(&e, &mut parts)?;
                path.push(local);
            },
            Event::Empty(e) => {
                collect_flocat(&e, &mut parts)?;
            },
            Event::End(_) => {
                path.pop();
            },
            Event::Text(t) => {
                let text = t
                    .unescape()
                    .map_err(|e| ErrorKind::Malformed(format!("invalid manifest text: {e}")))?
                    .into_owned();
                if text.is_empty() {
                    continue;
                }
                let in_dmd = path.iter().any(|name| name == "dmdSec");
                match path.last().map(String::as_str) {
                    Some("title") if in_dmd => metadata.title = Some(text),
                    Some("creator" | "name") if in_dmd => metadata.authors.push(text),
                    Some("abstract" | "description") if in_dmd => metadata.summary = Some(text),
                    _ => {},
                }
            },
            Event::Eof => break,
            _ => {},
        }
    }

    if parts.is_empty() {
        exn::bail!(ErrorKind::Malformed("manifest declares no constituent parts".into()));
    }
    Ok(Manifest { parts, metadata })
}

impl Ingester for MetsIngester {
    fn name(&self) -> &'static str {
        "mets-dspace"
    }

    #[instrument(skip(self, payload), fields(codec = self.name(), payload_size = payload.len()))]
    fn ingest(&self, payload: &[u8], _declared_type: &str) -> Result<Vec<PackagedFile>> {
        let entries = unpack(payload, self.max_unpacked)?;
        let manifest_entry = entries
            .iter()
            .find(|file| file.name.eq_ignore_ascii_case(MANIFEST))
            .ok_or_else(|| ErrorKind::Malformed(format!("archive contains no {MANIFEST}")))?;
        let manifest = parse_manifest(&manifest_entry.data)?;

        let mut files = Vec::with_capacity(manifest.parts.len() + 1);
        // The manifest itself is part of the stored record, with the
        // descriptive metadata attached to it.
        files.push(PackagedFile {
            name: manifest_entry.name.clone(),
            data: manifest_entry.data.clone(),
            metadata: Some(manifest.metadata),
        });
        for part in &manifest.parts {
            let found = entries
                .iter()
                .find(|file| &file.name == part)
                .ok_or_else(|| ErrorKind::Malformed(format!("manifest declares missing part `{part}`")))?;
            files.push(found.clone());
        }
        Ok(files)
    }
}
