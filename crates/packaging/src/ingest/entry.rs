//! Atom entry ingester.
//!
//! Deposits against the Edit-IRI carry an Atom entry document describing the
//! item rather than packaged content. This codec parses the entry into an
//! [`EntryMetadata`] record and keeps the original document as the stored
//! file, so nothing the client sent is lost.

use crate::error::{ErrorKind, Result};
use crate::{Ingester, PackagedFile};
use quick_xml::Reader;
use quick_xml::events::Event;
use scabbard_store::EntryMetadata;

/// File name the original entry document is stored under.
const ENTRY_FILE: &str = "entry.xml";

#[derive(Debug, Default)]
pub struct EntryIngester;

/// Parse an Atom entry document into metadata.
///
/// Recognized elements: `title`, `author/name`, `summary`. Every other
/// simple-text element directly under the entry (typically `dcterms:*`) is
/// preserved as a free-form field under its qualified name.
pub(crate) fn parse_entry(payload: &[u8]) -> Result<EntryMetadata> {
    let mut reader = Reader::from_reader(payload);
    reader.config_mut().trim_text(true);

    let mut metadata = EntryMetadata::default();
    // Qualified names of currently open elements, root first.
    let mut path: Vec<String> = Vec::new();
    let mut saw_entry_root = false;

    loop {
        let event = match reader.read_event() {
            Ok(event) => event,
            Err(e) => exn::bail!(ErrorKind::Malformed(format!("invalid entry document: {e}"))),
        };
        match event {
            Event::Start(e) => {
                let qname = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                if path.is_empty() {
                    let local = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                    if local != "entry" {
                        exn::bail!(ErrorKind::Malformed(format!("root element is `{qname}`, expected an atom entry")));
                    }
                    saw_entry_root = true;
                }
                path.push(qname);
            },
            Event::End(_) => {
                path.pop();
            },
            Event::Text(t) => {
                let text = t
                    .unescape()
                    .map_err(|e| ErrorKind::Malformed(format!("invalid entry text: {e}")))?
                    .into_owned();
                if text.is_empty() {
                    continue;
                }
                match path_locals(&path).as_slice() {
                    [_, "title"] => metadata.title = Some(text),
                    [_, "summary"] => metadata.summary = Some(text),
                    [_, "author", "name"] => metadata.authors.push(text),
                    [_, other] if !is_atom_structural(other) => {
                        // Keep the qualified name so dcterms:title and
                        // atom:title stay distinguishable.
                        metadata.fields.push((path[1].clone(), text));
                    },
                    _ => {},
                }
            },
            Event::Eof => break,
            _ => {},
        }
    }

    if !saw_entry_root {
        exn::bail!(ErrorKind::Malformed("no atom entry element found".into()));
    }
    Ok(metadata)
}

fn path_locals(path: &[String]) -> Vec<&str> {
    path.iter().map(|name| name.rsplit(':').next().unwrap_or(name)).collect()
}

/// Atom elements that are structure, not item description.
fn is_atom_structural(local: &str) -> bool {
    matches!(local, "title" | "summary" | "author" | "id" | "updated" | "link" | "content" | "generator")
}

impl Ingester for EntryIngester {
    fn name(&self) -> &'static str {
        "entry"
    }

    fn ingest(&self, payload: &[u8], _declared_type: &str) -> Result<Vec<PackagedFile>> {
        let metadata = parse_entry(payload)?;
        Ok(vec![PackagedFile {
            name: ENTRY_FILE.to_string(),
            data: payload.to_vec(),
            metadata: Some(metadata),
        }])
    }
}
