//! Minimal XML helpers for SOAP payloads
//!
//! `SoapWriter` builds envelopes through quick-xml so text content is always
//! escaped. `XmlElement` is a small owned tree for reading responses; lookups
//! go by local name so namespace prefixes chosen by the server don't matter.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use super::traits::{CarrierError, CarrierResult};

// ============================================================================
// Writing
// ============================================================================

/// Streaming envelope writer with balanced open/close calls
pub struct SoapWriter {
    writer: Writer<Vec<u8>>,
}

impl SoapWriter {
    pub fn new() -> CarrierResult<Self> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(xml_error)?;
        Ok(SoapWriter { writer })
    }

    /// Open an element carrying namespace declarations
    pub fn open_with(&mut self, name: &str, attributes: &[(&str, &str)]) -> CarrierResult<()> {
        let start = BytesStart::new(name).with_attributes(attributes.iter().copied());
        self.writer.write_event(Event::Start(start)).map_err(xml_error)
    }

    pub fn open(&mut self, name: &str) -> CarrierResult<()> {
        self.writer
            .write_event(Event::Start(BytesStart::new(name)))
            .map_err(xml_error)
    }

    pub fn close(&mut self, name: &str) -> CarrierResult<()> {
        self.writer
            .write_event(Event::End(BytesEnd::new(name)))
            .map_err(xml_error)
    }

    /// `<name>value</name>` with `value` escaped; `<name/>` when empty
    pub fn leaf(&mut self, name: &str, value: &str) -> CarrierResult<()> {
        if value.is_empty() {
            return self
                .writer
                .write_event(Event::Empty(BytesStart::new(name)))
                .map_err(xml_error);
        }
        self.open(name)?;
        self.writer
            .write_event(Event::Text(BytesText::new(value)))
            .map_err(xml_error)?;
        self.close(name)
    }

    pub fn finish(self) -> CarrierResult<String> {
        String::from_utf8(self.writer.into_inner())
            .map_err(|e| CarrierError::Xml(e.to_string()))
    }
}

fn xml_error<E: std::fmt::Display>(e: E) -> CarrierError {
    CarrierError::Xml(e.to_string())
}

// ============================================================================
// Reading
// ============================================================================

/// Owned element tree keyed by local (unprefixed) names
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XmlElement {
    pub name: String,
    pub text: String,
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    fn named(name: String) -> Self {
        XmlElement {
            name,
            ..Default::default()
        }
    }

    /// Parse a document and return its root element
    pub fn parse(document: &str) -> CarrierResult<XmlElement> {
        let mut reader = Reader::from_str(document);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<XmlElement> = Vec::new();
        let mut root: Option<XmlElement> = None;

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => {
                    stack.push(XmlElement::named(local_name(e.local_name().as_ref())));
                }
                Ok(Event::Empty(e)) => {
                    let element = XmlElement::named(local_name(e.local_name().as_ref()));
                    attach(&mut stack, &mut root, element);
                }
                Ok(Event::Text(t)) => {
                    if let Some(current) = stack.last_mut() {
                        let text = t.unescape().map_err(|e| CarrierError::ParseError(e.to_string()))?;
                        current.text.push_str(&text);
                    }
                }
                Ok(Event::CData(c)) => {
                    if let Some(current) = stack.last_mut() {
                        current.text.push_str(&String::from_utf8_lossy(&c));
                    }
                }
                Ok(Event::End(_)) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| CarrierError::ParseError("unbalanced end tag".to_string()))?;
                    attach(&mut stack, &mut root, element);
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => {
                    return Err(CarrierError::ParseError(format!(
                        "error at position {}: {}",
                        reader.buffer_position(),
                        e
                    )))
                }
            }
        }

        if !stack.is_empty() {
            return Err(CarrierError::ParseError("document ended inside an element".to_string()));
        }
        root.ok_or_else(|| CarrierError::ParseError("no root element".to_string()))
    }

    /// First direct child with the given local name
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// First element with the given local name, depth-first, self included
    pub fn find(&self, name: &str) -> Option<&XmlElement> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(name))
    }

    /// Every element with the given local name, in document order
    pub fn find_all<'a>(&'a self, name: &str) -> Vec<&'a XmlElement> {
        let mut found = Vec::new();
        self.collect(name, &mut found);
        found
    }

    fn collect<'a>(&'a self, name: &str, found: &mut Vec<&'a XmlElement>) {
        if self.name == name {
            found.push(self);
        }
        for child in &self.children {
            child.collect(name, found);
        }
    }

    /// Trimmed text of a direct child, if present and non-empty
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name)
            .map(|c| c.text.trim())
            .filter(|t| !t.is_empty())
    }
}

fn local_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}

fn attach(stack: &mut [XmlElement], root: &mut Option<XmlElement>, element: XmlElement) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => {
            if root.is_none() {
                *root = Some(element);
            }
        }
    }
}
