//! XML utilities for the SpreadsheetML parts of an `.xlsx` package.
//! Provides a pull reader wrapper with helper traits for attributes and text, and a
//! small event writer used when producing workbooks.

use crate::error::SweeperError;
use quick_xml::escape::resolve_xml_entity;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::BytesDecl;
use quick_xml::events::BytesEnd;
use quick_xml::events::BytesRef;
use quick_xml::events::BytesStart;
use quick_xml::events::BytesText;
use quick_xml::events::Event;
use quick_xml::Reader;
use quick_xml::Writer;
use std::borrow::Cow;
use std::io::BufRead;
use thiserror::Error;

/// Errors specific to XML parsing operations
#[derive(Error, Debug)]
pub enum XmlError {
    #[error("Parse entity '{0}' failed")]
    ParseEntityError(String),
}

/// XML reader wrapper configured for worksheet parsing
pub(crate) struct XmlReader<R: BufRead> {
    reader: Reader<R>,
    buffer: Vec<u8>,
}

impl<R: BufRead> XmlReader<R> {
    /// Creates a new XML reader; empty elements are expanded so `<c/>` yields start and end events
    pub(crate) fn new(buf_reader: R) -> XmlReader<R> {
        let mut reader = Reader::from_reader(buf_reader);
        let config = reader.config_mut();
        config.check_comments = false;
        config.check_end_names = false;
        config.expand_empty_elements = true;
        config.trim_text(false);

        let buffer = Vec::with_capacity(1024);
        XmlReader { reader, buffer }
    }

    /// Reads the next XML event from the reader
    pub(crate) fn next(&'_ mut self) -> Result<Option<Event<'_>>, SweeperError> {
        self.buffer.clear();
        match self.reader.read_event_into(&mut self.buffer) {
            Ok(Event::Eof) => Ok(None),
            Ok(event) => Ok(Some(event)),
            Err(error) => Err(SweeperError::XmlError(error)),
        }
    }
}

/// Helper trait for XML attributes providing unescaped value extraction
pub(crate) trait XmlAttributeHelper<'a> {
    fn get_value(&self) -> Result<Cow<'a, str>, SweeperError>;
}

impl<'a> XmlAttributeHelper<'a> for Attribute<'a> {
    fn get_value(&self) -> Result<Cow<'a, str>, SweeperError> {
        Ok(self.unescape_value()?)
    }
}

/// Helper trait for XML nodes providing attribute access
pub(crate) trait XmlNodeHelper<'a> {
    /// Gets an attribute value by its qualified name
    fn get_attribute_value(&'a self, name: &str) -> Result<Option<Cow<'a, str>>, SweeperError>;
}

impl<'a> XmlNodeHelper<'a> for BytesStart<'a> {
    fn get_attribute_value(&'a self, name: &str) -> Result<Option<Cow<'a, str>>, SweeperError> {
        self.try_get_attribute(name)?
            .map(|attribute| attribute.get_value())
            .transpose()
    }
}

/// Helper trait for building text content from XML events
pub(crate) trait XmlTextContextHelper {
    /// Appends text content from BytesRef event (handles entities and character references)
    fn push_bytes_ref(&mut self, bytes: &BytesRef) -> Result<(), SweeperError>;
}

impl XmlTextContextHelper for String {
    fn push_bytes_ref(&mut self, bytes: &BytesRef) -> Result<(), SweeperError> {
        let raw = bytes.xml_content()?;
        if let Some(number) = raw.strip_prefix('#') {
            let code = if let Some(hex) = number.strip_prefix('x') {
                u32::from_str_radix(hex, 16)?
            } else {
                number.parse::<u32>()?
            };
            if let Some(character) = std::char::from_u32(code) {
                self.push(character);
            }
        } else if let Some(entity) = resolve_xml_entity(&raw) {
            self.push_str(entity);
        } else {
            Err(XmlError::ParseEntityError(raw.to_string()))?;
        }

        Ok(())
    }
}

#[macro_export]
macro_rules! match_xml_events {
    ($reader:expr => { $($arms:tt)* }) => {
        while let Some(result) = $reader.next()? {
            match result {
                Event::Eof => break,
                $($arms)*
                _ => (),
            }
        }
    };
}

/// Event writer producing an in-memory XML document
pub(crate) struct XmlWriter {
    writer: Writer<Vec<u8>>,
}

impl XmlWriter {
    /// Starts a standalone UTF-8 document
    pub(crate) fn new() -> Result<XmlWriter, SweeperError> {
        let mut writer = Writer::new(Vec::new());
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
        Ok(XmlWriter { writer })
    }

    pub(crate) fn start(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<(), SweeperError> {
        let element = BytesStart::new(name).with_attributes(attributes.iter().copied());
        self.writer.write_event(Event::Start(element))?;
        Ok(())
    }

    pub(crate) fn end(&mut self, name: &str) -> Result<(), SweeperError> {
        self.writer.write_event(Event::End(BytesEnd::new(name)))?;
        Ok(())
    }

    /// Writes a self-closing element
    pub(crate) fn empty(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<(), SweeperError> {
        let element = BytesStart::new(name).with_attributes(attributes.iter().copied());
        self.writer.write_event(Event::Empty(element))?;
        Ok(())
    }

    /// Writes `<name ...>text</name>`, escaping the text
    pub(crate) fn text_element(&mut self, name: &str, attributes: &[(&str, &str)], text: &str) -> Result<(), SweeperError> {
        self.start(name, attributes)?;
        self.writer.write_event(Event::Text(BytesText::new(text)))?;
        self.end(name)
    }

    pub(crate) fn finish(self) -> Vec<u8> {
        self.writer.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn reader_expands_empty_elements() -> Result<(), SweeperError> {
        let mut reader = XmlReader::new(Cursor::new(b"<c r=\"A1\"/>".as_slice()));
        let mut names = Vec::new();
        match_xml_events!(reader => {
            Event::Start(event) => names.push(format!("start:{}", String::from_utf8_lossy(event.name().as_ref()))),
            Event::End(event) => names.push(format!("end:{}", String::from_utf8_lossy(event.name().as_ref()))),
        });
        assert_eq!(names, vec!["start:c", "end:c"]);
        Ok(())
    }

    #[test]
    fn attribute_lookup() -> Result<(), SweeperError> {
        let mut reader = XmlReader::new(Cursor::new(b"<c r=\"B2\" t=\"s\"></c>".as_slice()));
        let mut found = None;
        match_xml_events!(reader => {
            Event::Start(event) => found = event.get_attribute_value("t")?.map(|t| t.to_string()),
        });
        assert_eq!(found.as_deref(), Some("s"));
        Ok(())
    }

    #[test]
    fn character_references() {
        let mut text = String::new();
        text.push_bytes_ref(&BytesRef::new("#65")).unwrap();
        text.push_bytes_ref(&BytesRef::new("#x42")).unwrap();
        text.push_bytes_ref(&BytesRef::new("amp")).unwrap();
        assert_eq!(text, "AB&");
        assert!(text.push_bytes_ref(&BytesRef::new("bogus")).is_err());
    }

    #[test]
    fn writer_escapes_text() {
        let mut writer = XmlWriter::new().unwrap();
        writer.start("row", &[("r", "1")]).unwrap();
        writer.text_element("t", &[], "a < b & c").unwrap();
        writer.empty("c", &[("r", "A1")]).unwrap();
        writer.end("row").unwrap();
        let xml = String::from_utf8(writer.finish()).unwrap();
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>"));
        assert!(xml.contains("<row r=\"1\"><t>a &lt; b &amp; c</t><c r=\"A1\"/></row>"));
    }
}
