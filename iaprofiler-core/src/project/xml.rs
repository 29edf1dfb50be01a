//! Thin helpers over quick-xml for the vendor payloads.
//!
//! Writing is event based and compact (no indentation). Reading builds a
//! small owned element tree keyed by local names, so `iaapi:Project` and
//! `Project` are matched the same way.

use crate::{Result, error::ProfilerError};
use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

/// Streaming writer producing a UTF-8 XML document.
pub(crate) struct XmlWriter {
    inner: Writer<Vec<u8>>,
}

impl XmlWriter {
    pub(crate) fn new() -> Self {
        Self {
            inner: Writer::new(Vec::new()),
        }
    }

    pub(crate) fn declaration(&mut self) -> Result<()> {
        self.inner
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(|e| ProfilerError::xml_failed("Failed to write XML declaration", e))
    }

    pub(crate) fn start(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<()> {
        let element = element(name, attributes);
        self.inner
            .write_event(Event::Start(element))
            .map_err(|e| ProfilerError::xml_failed(format!("Failed to open <{name}>"), e))
    }

    pub(crate) fn empty(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<()> {
        let element = element(name, attributes);
        self.inner
            .write_event(Event::Empty(element))
            .map_err(|e| ProfilerError::xml_failed(format!("Failed to write <{name}/>"), e))
    }

    pub(crate) fn end(&mut self, name: &str) -> Result<()> {
        self.inner
            .write_event(Event::End(BytesEnd::new(name)))
            .map_err(|e| ProfilerError::xml_failed(format!("Failed to close <{name}>"), e))
    }

    pub(crate) fn text(&mut self, text: &str) -> Result<()> {
        self.inner
            .write_event(Event::Text(BytesText::new(text)))
            .map_err(|e| ProfilerError::xml_failed("Failed to write XML text", e))
    }

    /// `<name attrs>text</name>`
    pub(crate) fn text_element(&mut self, name: &str, text: &str) -> Result<()> {
        self.start(name, &[])?;
        self.text(text)?;
        self.end(name)
    }

    pub(crate) fn finish(self) -> Result<String> {
        String::from_utf8(self.inner.into_inner())
            .map_err(|e| ProfilerError::xml_failed("Serialized XML is not valid UTF-8", e))
    }
}

fn element<'a>(name: &'a str, attributes: &[(&'a str, &'a str)]) -> BytesStart<'a> {
    let mut element = BytesStart::new(name);
    for attribute in attributes {
        element.push_attribute(*attribute);
    }
    element
}

/// An owned XML element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlElement {
    /// Local name, without namespace prefix
    pub name: String,
    /// Attributes in document order, keyed by local name
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlElement>,
    /// Concatenated text content, untrimmed
    pub text: String,
}

impl XmlElement {
    /// Parses a document and returns its root element.
    ///
    /// # Errors
    /// Returns an XML error for malformed input and an unexpected-response
    /// error if the document has no root element.
    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        let mut stack: Vec<Self> = Vec::new();
        let mut root = None;

        loop {
            let event = reader
                .read_event()
                .map_err(|e| ProfilerError::xml_failed("Failed to read catalog XML", e))?;
            match event {
                Event::Start(ref start) => stack.push(Self::from_start(start)?),
                Event::Empty(ref start) => {
                    let element = Self::from_start(start)?;
                    attach(&mut stack, &mut root, element);
                }
                Event::End(_) => {
                    if let Some(element) = stack.pop() {
                        attach(&mut stack, &mut root, element);
                    }
                }
                Event::Text(ref text) => {
                    if let Some(current) = stack.last_mut() {
                        let text = text
                            .unescape()
                            .map_err(|e| ProfilerError::xml_failed("Malformed XML text", e))?;
                        current.text.push_str(&text);
                    }
                }
                Event::CData(cdata) => {
                    if let Some(current) = stack.last_mut() {
                        current
                            .text
                            .push_str(&String::from_utf8_lossy(&cdata.into_inner()));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        root.ok_or_else(|| ProfilerError::unexpected("XML response has no root element"))
    }

    fn from_start(start: &BytesStart<'_>) -> Result<Self> {
        let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
        let mut attributes = Vec::new();
        for attribute in start.attributes() {
            let attribute = attribute
                .map_err(|e| ProfilerError::xml_failed(format!("Malformed attribute on <{name}>"), e))?;
            let key = String::from_utf8_lossy(attribute.key.local_name().as_ref()).into_owned();
            let value = attribute
                .unescape_value()
                .map_err(|e| ProfilerError::xml_failed(format!("Malformed attribute on <{name}>"), e))?
                .into_owned();
            attributes.push((key, value));
        }
        Ok(Self {
            name,
            attributes,
            ..Self::default()
        })
    }

    /// Value of an attribute.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Direct children with the given local name.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Self> + 'a {
        self.children.iter().filter(move |child| child.name == name)
    }

    /// First direct child with the given local name.
    pub fn child(&self, name: &str) -> Option<&Self> {
        self.children.iter().find(|child| child.name == name)
    }

    /// Every element below this one (and this one) with the given local
    /// name, in document order.
    pub fn descendants_named<'a>(&'a self, name: &str) -> Vec<&'a Self> {
        let mut found = Vec::new();
        self.collect_named(name, &mut found);
        found
    }

    fn collect_named<'a>(&'a self, name: &str, found: &mut Vec<&'a Self>) {
        if self.name == name {
            found.push(self);
        }
        for child in &self.children {
            child.collect_named(name, found);
        }
    }

    /// Text content with surrounding whitespace removed.
    pub fn trimmed_text(&self) -> &str {
        self.text.trim()
    }
}

fn attach(stack: &mut [XmlElement], root: &mut Option<XmlElement>, element: XmlElement) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(element);
    } else if root.is_none() {
        *root = Some(element);
    }
}
