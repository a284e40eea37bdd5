//! Minimal owned XML element tree
//!
//! Scene, prefab and level configuration files are small, so they are read
//! completely into an `XmlElement` tree before anything interprets them.
//! Text content is ignored; everything the engine stores lives in attributes.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};
use thiserror::Error;

/// Low-level document failure
#[derive(Debug, Error)]
pub enum DocumentError {
    /// Tokenizer or writer error
    #[error(transparent)]
    Xml(#[from] quick_xml::Error),

    /// Structural problem the tokenizer does not catch
    #[error("{0}")]
    Malformed(String),

    /// Output was not valid UTF-8
    #[error(transparent)]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// One element with its attributes and child elements
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XmlElement {
    /// Tag name
    pub name: String,
    /// Attributes in document order
    pub attributes: Vec<(String, String)>,
    /// Child elements in document order
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    /// Create an element without attributes or children
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Builder: append an attribute
    pub fn with_attr(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.set_attr(key, value);
        self
    }

    /// Builder: append a child element
    pub fn with_child(mut self, child: XmlElement) -> Self {
        self.children.push(child);
        self
    }

    /// Set an attribute, replacing an existing value
    pub fn set_attr(&mut self, key: impl Into<String>, value: impl ToString) {
        let key = key.into();
        let value = value.to_string();
        match self.attributes.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => self.attributes.push((key, value)),
        }
    }

    /// Attribute value by name
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// First child with the given tag
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|child| child.name == name)
    }

    /// All children with the given tag
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> + 'a {
        self.children.iter().filter(move |child| child.name == name)
    }

    /// Parse a document and return its root element
    pub fn parse(text: &str) -> Result<XmlElement, DocumentError> {
        let mut reader = Reader::from_str(text);
        reader.trim_text(true);

        let mut stack: Vec<XmlElement> = Vec::new();
        let mut root: Option<XmlElement> = None;

        loop {
            match reader.read_event()? {
                Event::Start(start) => stack.push(element_from(&start)?),
                Event::Empty(start) => {
                    let element = element_from(&start)?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::End(_) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| DocumentError::Malformed("unbalanced closing tag".into()))?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if let Some(open) = stack.last() {
            return Err(DocumentError::Malformed(format!("<{}> is never closed", open.name)));
        }
        root.ok_or_else(|| DocumentError::Malformed("document has no root element".into()))
    }

    /// Serialize this element as a complete document with an XML declaration
    pub fn to_xml_string(&self) -> Result<String, DocumentError> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        write_element(&mut writer, self)?;
        Ok(String::from_utf8(writer.into_inner())?)
    }
}

fn element_from(start: &BytesStart<'_>) -> Result<XmlElement, DocumentError> {
    let mut element = XmlElement::new(String::from_utf8_lossy(start.name().as_ref()).into_owned());
    for attr in start.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}

fn attach(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    element: XmlElement,
) -> Result<(), DocumentError> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_none() => *root = Some(element),
        None => {
            return Err(DocumentError::Malformed(format!(
                "second top-level element <{}>",
                element.name
            )))
        }
    }
    Ok(())
}

fn write_element(writer: &mut Writer<Vec<u8>>, element: &XmlElement) -> Result<(), DocumentError> {
    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in &element.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    if element.children.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }

    writer.write_event(Event::Start(start))?;
    for child in &element.children {
        write_element(writer, child)?;
    }
    writer.write_event(Event::End(BytesEnd::new(element.name.as_str())))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested_elements_and_attributes() {
        let doc = XmlElement::parse(
            r#"<?xml version="1.0"?>
            <Root first_room="Hall">
              <!-- comment -->
              <Room name="Hall" camera_type="Fixed">
                <Boundary left="-10" right="10" up="5" down="-5"/>
              </Room>
            </Root>"#,
        )
        .expect("valid document");

        assert_eq!(doc.name, "Root");
        assert_eq!(doc.attr("first_room"), Some("Hall"));
        let room = doc.child("Room").expect("room");
        assert_eq!(room.attr("camera_type"), Some("Fixed"));
        assert_eq!(room.child("Boundary").and_then(|b| b.attr("right")), Some("10"));
    }

    #[test]
    fn test_write_then_parse_preserves_escaped_values() {
        let element = XmlElement::new("Node")
            .with_attr("Name", "Fish & \"Chips\" <1>")
            .with_child(XmlElement::new("Position").with_attr("x", 1.5));

        let text = element.to_xml_string().expect("serialize");
        assert!(text.starts_with("<?xml"));
        assert_eq!(XmlElement::parse(&text).expect("parse"), element);
    }

    #[test]
    fn test_rejects_multiple_roots() {
        assert!(matches!(
            XmlElement::parse("<A/><B/>"),
            Err(DocumentError::Malformed(_))
        ));
    }

    #[test]
    fn test_rejects_unclosed_and_mismatched_tags() {
        assert!(XmlElement::parse("<A><B></A>").is_err());
        assert!(XmlElement::parse("<A><B/>").is_err());
        assert!(XmlElement::parse("").is_err());
    }

    #[test]
    fn test_set_attr_replaces_existing_value() {
        let mut element = XmlElement::new("Scene").with_attr("Num", 1);
        element.set_attr("Num", 2);
        assert_eq!(element.attributes, vec![("Num".to_string(), "2".to_string())]);
    }
}
