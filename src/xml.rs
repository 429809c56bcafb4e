//! Streaming XML reader for RRDP documents.
//!
//! RRDP documents are two levels deep: a root element whose children carry
//! attributes and (base64) text. The reader flattens a document into that
//! shape and rejects anything deeper. There is no node-count ceiling; a
//! snapshot is as large as its input.

use quick_xml::events::attributes::Attributes;
use quick_xml::events::Event;
use quick_xml::name::ResolveResult;
use quick_xml::NsReader;

use crate::error::{Result, RrdpError};

/// Namespace of every RRDP element.
pub const NS_RRDP: &str = "http://www.ripe.net/rpki/rrdp";

/// An element with its attributes and concatenated text content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RawElement {
    pub name: String,
    pub namespace: Option<String>,
    pub attributes: Vec<(String, String)>,
    pub text: String,
}

impl RawElement {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn in_rrdp_namespace(&self) -> bool {
        self.namespace.as_deref() == Some(NS_RRDP)
    }
}

/// A root element and its direct children, in document order.
#[derive(Debug, Clone)]
pub(crate) struct RawDocument {
    pub root: RawElement,
    pub children: Vec<RawElement>,
}

fn xml_error(e: impl std::fmt::Display) -> RrdpError {
    RrdpError::validation(format!("XML error: {e}"))
}

fn namespace_of(resolved: &ResolveResult<'_>) -> Option<String> {
    match resolved {
        ResolveResult::Bound(ns) => Some(String::from_utf8_lossy(ns.as_ref()).into_owned()),
        ResolveResult::Unbound | ResolveResult::Unknown(_) => None,
    }
}

fn collect_attributes(attributes: Attributes<'_>) -> Result<Vec<(String, String)>> {
    let mut out = Vec::new();
    for attr in attributes {
        let attr = attr.map_err(xml_error)?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        // Namespace declarations are consumed by the resolver.
        if key == "xmlns" || key.starts_with("xmlns:") {
            continue;
        }
        let value = attr.unescape_value().map_err(xml_error)?.into_owned();
        out.push((key, value));
    }
    Ok(out)
}

/// Read `bytes` into a [`RawDocument`].
///
/// Fails with a validation error on malformed XML, elements nested more than
/// two levels deep, text directly inside the root, or content after the root.
pub(crate) fn read_document(bytes: &[u8]) -> Result<RawDocument> {
    let mut reader = NsReader::from_reader(bytes);

    let mut root: Option<RawElement> = None;
    let mut root_closed = false;
    let mut current: Option<RawElement> = None;
    let mut children = Vec::new();

    loop {
        let (resolved, event) = reader.read_resolved_event().map_err(xml_error)?;
        match event {
            Event::Start(start) | Event::Empty(start) if root_closed => {
                return Err(RrdpError::validation(format!(
                    "unexpected element <{}> after document root",
                    String::from_utf8_lossy(start.local_name().as_ref())
                )));
            }
            Event::Start(start) => {
                let element = RawElement {
                    name: String::from_utf8_lossy(start.local_name().as_ref()).into_owned(),
                    namespace: namespace_of(&resolved),
                    attributes: collect_attributes(start.attributes())?,
                    text: String::new(),
                };
                if root.is_none() {
                    root = Some(element);
                } else if let Some(parent) = &current {
                    return Err(RrdpError::validation(format!(
                        "element <{}> is not allowed inside <{}>",
                        element.name, parent.name
                    )));
                } else {
                    current = Some(element);
                }
            }
            Event::Empty(start) => {
                let element = RawElement {
                    name: String::from_utf8_lossy(start.local_name().as_ref()).into_owned(),
                    namespace: namespace_of(&resolved),
                    attributes: collect_attributes(start.attributes())?,
                    text: String::new(),
                };
                if root.is_none() {
                    root = Some(element);
                    root_closed = true;
                } else if let Some(parent) = &current {
                    return Err(RrdpError::validation(format!(
                        "element <{}> is not allowed inside <{}>",
                        element.name, parent.name
                    )));
                } else {
                    children.push(element);
                }
            }
            Event::End(_) => {
                if let Some(child) = current.take() {
                    children.push(child);
                } else {
                    root_closed = true;
                }
            }
            Event::Text(text) => {
                let text = text.unescape().map_err(xml_error)?;
                if let Some(child) = current.as_mut() {
                    child.text.push_str(&text);
                } else if !text.trim().is_empty() {
                    return Err(RrdpError::validation(format!(
                        "unexpected text {:?} outside of a publish element",
                        text.trim()
                    )));
                }
            }
            Event::CData(data) => {
                let data = data.into_inner();
                let text = std::str::from_utf8(&data).map_err(xml_error)?;
                match current.as_mut() {
                    Some(child) => child.text.push_str(text),
                    None => {
                        return Err(RrdpError::validation(
                            "unexpected CDATA outside of a publish element",
                        ))
                    }
                }
            }
            Event::Eof => break,
            Event::Comment(_) | Event::Decl(_) | Event::PI(_) | Event::DocType(_) => {}
        }
    }

    match root {
        Some(root) if root_closed => Ok(RawDocument { root, children }),
        Some(root) => Err(RrdpError::validation(format!(
            "unexpected end of document inside <{}>",
            root.name
        ))),
        None => Err(RrdpError::validation("document has no root element")),
    }
}

/// Escape a string for use in an attribute value or text node.
pub(crate) fn escape(value: &str) -> std::borrow::Cow<'_, str> {
    quick_xml::escape::escape(value)
}
