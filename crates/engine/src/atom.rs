//! Shared quick-xml helpers for the Atom documents the engine produces.

use crate::error::{ErrorKind, Result};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

pub(crate) const ATOM_NS: &str = "http://www.w3.org/2005/Atom";
pub(crate) const APP_NS: &str = "http://www.w3.org/2007/app";
pub(crate) const SWORD_NS: &str = "http://purl.org/net/sword/terms/";
pub(crate) const DCTERMS_NS: &str = "http://purl.org/dc/terms/";

/// Map whatever error type the XML writer surfaces into ours.
pub(crate) fn wmap<E: std::fmt::Display>(e: E) -> ErrorKind {
    ErrorKind::Internal(format!("atom serialization failed: {e}"))
}

pub(crate) fn write_decl(writer: &mut Writer<Vec<u8>>) -> Result<()> {
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
        .map_err(wmap)?;
    Ok(())
}

/// `<name>text</name>`
pub(crate) fn text_element(writer: &mut Writer<Vec<u8>>, name: &str, text: &str) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new(name))).map_err(wmap)?;
    writer.write_event(Event::Text(BytesText::new(text))).map_err(wmap)?;
    writer.write_event(Event::End(BytesEnd::new(name))).map_err(wmap)?;
    Ok(())
}

/// `<name attr=val .../>`
pub(crate) fn empty_element(writer: &mut Writer<Vec<u8>>, name: &str, attrs: &[(&str, &str)]) -> Result<()> {
    let mut element = BytesStart::new(name);
    for (key, value) in attrs {
        element.push_attribute((*key, *value));
    }
    writer.write_event(Event::Empty(element)).map_err(wmap)?;
    Ok(())
}

pub(crate) fn start_element(writer: &mut Writer<Vec<u8>>, name: &str, attrs: &[(&str, &str)]) -> Result<()> {
    let mut element = BytesStart::new(name);
    for (key, value) in attrs {
        element.push_attribute((*key, *value));
    }
    writer.write_event(Event::Start(element)).map_err(wmap)?;
    Ok(())
}

pub(crate) fn end_element(writer: &mut Writer<Vec<u8>>, name: &str) -> Result<()> {
    writer.write_event(Event::End(BytesEnd::new(name))).map_err(wmap)?;
    Ok(())
}
