//! Owned XML element tree backing the markup store and the legacy importer.
//!
//! Parsing runs the `quick-xml` event reader into a stack of elements; writing
//! uses the `quick-xml` writer with two-space indentation. Leaves with no text
//! and no children are written as empty elements so that an empty string reads
//! back as an empty string instead of indentation whitespace.

use crate::core::error::{SettingsError, SettingsResult};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::{Reader, Writer};

fn xml_err<E: std::fmt::Display>(e: E) -> SettingsError {
    SettingsError::Xml(e.to_string())
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub text: String,
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_text(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn child_mut(&mut self, name: &str) -> Option<&mut XmlElement> {
        self.children.iter_mut().find(|c| c.name == name)
    }

    /// First child called `name`, appended if absent.
    pub fn child_or_insert(&mut self, name: &str) -> &mut XmlElement {
        let idx = match self.children.iter().position(|c| c.name == name) {
            Some(idx) => idx,
            None => {
                self.children.push(XmlElement::new(name));
                self.children.len() - 1
            }
        };
        &mut self.children[idx]
    }

    pub fn remove_child(&mut self, name: &str) -> Option<XmlElement> {
        let idx = self.children.iter().position(|c| c.name == name)?;
        Some(self.children.remove(idx))
    }

    /// Text of the child `name`, if that child exists.
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name).map(|c| c.text.as_str())
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// Depth-first search for the first element called `name`, self included.
    pub fn find(&self, name: &str) -> Option<&XmlElement> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(name))
    }

    pub fn parse(content: &str) -> SettingsResult<XmlElement> {
        let mut reader = Reader::from_str(content);
        let mut stack: Vec<XmlElement> = Vec::new();
        let mut root: Option<XmlElement> = None;

        loop {
            match reader.read_event().map_err(xml_err)? {
                Event::Start(ref e) => stack.push(element_from_start(e)?),
                Event::Empty(ref e) => {
                    let el = element_from_start(e)?;
                    attach(&mut stack, &mut root, el)?;
                }
                Event::End(_) => {
                    let mut el = stack
                        .pop()
                        .ok_or_else(|| SettingsError::Xml("unbalanced end tag".to_string()))?;
                    // Indentation between child elements is not content.
                    if el.has_children() && el.text.trim().is_empty() {
                        el.text.clear();
                    }
                    attach(&mut stack, &mut root, el)?;
                }
                Event::Text(ref t) => {
                    let text = t.decode().map_err(xml_err)?;
                    push_text(&mut stack, &text)?;
                }
                Event::CData(ref c) => {
                    let text = c.decode().map_err(xml_err)?;
                    push_text(&mut stack, &text)?;
                }
                Event::GeneralRef(ref r) => {
                    let resolved = match r.resolve_char_ref().map_err(xml_err)? {
                        Some(ch) => ch.to_string(),
                        None => {
                            let name = r.decode().map_err(xml_err)?;
                            resolve_predefined_entity(&name)
                                .ok_or_else(|| {
                                    SettingsError::Xml(format!("unknown entity &{name};"))
                                })?
                                .to_string()
                        }
                    };
                    push_text(&mut stack, &resolved)?;
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !stack.is_empty() {
            return Err(SettingsError::Xml(format!(
                "unclosed element <{}>",
                stack.last().map(|e| e.name.as_str()).unwrap_or_default()
            )));
        }
        root.ok_or_else(|| SettingsError::Xml("document has no root element".to_string()))
    }

    /// Serialize as a standalone document with an XML declaration.
    pub fn to_document(&self) -> SettingsResult<String> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(xml_err)?;
        write_element(&mut writer, self)?;
        let mut out = String::from_utf8(writer.into_inner()).map_err(xml_err)?;
        out.push('\n');
        Ok(out)
    }
}

fn element_from_start(start: &BytesStart<'_>) -> SettingsResult<XmlElement> {
    let mut el = XmlElement::new(String::from_utf8_lossy(start.name().as_ref()).into_owned());
    for attr in start.attributes() {
        let attr = attr.map_err(xml_err)?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value().map_err(xml_err)?.into_owned();
        el.attributes.push((key, value));
    }
    Ok(el)
}

fn attach(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    el: XmlElement,
) -> SettingsResult<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(el),
        None if root.is_none() => *root = Some(el),
        None => {
            return Err(SettingsError::Xml(
                "document has more than one root element".to_string(),
            ));
        }
    }
    Ok(())
}

fn push_text(stack: &mut [XmlElement], text: &str) -> SettingsResult<()> {
    match stack.last_mut() {
        Some(top) => top.text.push_str(text),
        None if text.trim().is_empty() => {}
        None => return Err(SettingsError::Xml("text outside the root element".to_string())),
    }
    Ok(())
}

fn write_element(writer: &mut Writer<Vec<u8>>, el: &XmlElement) -> SettingsResult<()> {
    let mut start = BytesStart::new(el.name.as_str());
    for (k, v) in &el.attributes {
        start.push_attribute((k.as_str(), v.as_str()));
    }

    if el.children.is_empty() && el.text.is_empty() {
        writer.write_event(Event::Empty(start)).map_err(xml_err)?;
        return Ok(());
    }

    writer.write_event(Event::Start(start)).map_err(xml_err)?;
    if el.children.is_empty() {
        writer
            .write_event(Event::Text(BytesText::new(&el.text)))
            .map_err(xml_err)?;
    } else {
        for child in &el.children {
            write_element(writer, child)?;
        }
    }
    writer
        .write_event(Event::End(BytesEnd::new(el.name.as_str())))
        .map_err(xml_err)?;
    Ok(())
}
