//! Mutable XML element tree with a deterministic serializer.
//!
//! Parsing goes through `roxmltree`; serialization is in-crate because the
//! pipeline's contract is byte-stable output: 4-space indentation,
//! attributes sorted alphabetically, text-only elements kept inline, empty
//! elements self-closed. Comments and processing instructions are dropped,
//! and whitespace-only text nodes are treated as formatting.

use std::path::Path;

use crate::error::Error;

/// Child node of an element.
#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    Element(Element),
    Text(String),
}

/// A single XML element. Attribute order is insertion order; the
/// serializer sorts byte-wise by attribute name.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

impl Element {
    pub fn new(name: &str) -> Self {
        Element {
            name: name.to_string(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Element with a single text child, e.g. `<option name="max">10</option>`.
    pub fn with_text(name: &str, text: &str) -> Self {
        let mut el = Element::new(name);
        el.children.push(XmlNode::Text(text.to_string()));
        el
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Set an attribute, replacing any existing value.
    pub fn set_attr(&mut self, name: &str, value: &str) {
        if let Some(entry) = self.attributes.iter_mut().find(|(k, _)| k == name) {
            entry.1 = value.to_string();
        } else {
            self.attributes.push((name.to_string(), value.to_string()));
        }
    }

    pub fn push_child(&mut self, child: Element) {
        self.children.push(XmlNode::Element(child));
    }

    pub fn insert_child(&mut self, index: usize, child: Element) {
        let index = index.min(self.children.len());
        self.children.insert(index, XmlNode::Element(child));
    }

    pub fn find_child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find_map(|c| match c {
            XmlNode::Element(el) if el.name == name => Some(el),
            _ => None,
        })
    }

    pub fn find_child_mut(&mut self, name: &str) -> Option<&mut Element> {
        self.children.iter_mut().find_map(|c| match c {
            XmlNode::Element(el) if el.name == name => Some(el),
            _ => None,
        })
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children.iter().filter_map(move |c| match c {
            XmlNode::Element(el) if el.name == name => Some(el),
            _ => None,
        })
    }

    /// Number of element children.
    pub fn child_element_count(&self) -> usize {
        self.children
            .iter()
            .filter(|c| matches!(c, XmlNode::Element(_)))
            .count()
    }

    /// Concatenated text content of direct text children.
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|c| match c {
                XmlNode::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Visit this element and every descendant element, depth-first.
    pub fn for_each_element_mut<F: FnMut(&mut Element)>(&mut self, f: &mut F) {
        f(self);
        for child in &mut self.children {
            if let XmlNode::Element(el) = child {
                el.for_each_element_mut(f);
            }
        }
    }

    /// Parse an XML document into its root element.
    ///
    /// Namespace declarations in scope at the root are re-emitted as
    /// `xmlns`/`xmlns:prefix` attributes on the root element, and prefixed
    /// names are reconstructed, so serialization round-trips the documents
    /// this pipeline handles.
    pub fn parse(xml: &str) -> Result<Element, Error> {
        let doc = roxmltree::Document::parse(xml).map_err(|e| Error::MalformedXml { source: e })?;
        let root_node = doc.root_element();
        let mut root = convert_node(root_node);

        for ns in root_node.namespaces() {
            if ns.uri() == "http://www.w3.org/XML/1998/namespace" {
                continue;
            }
            let attr_name = match ns.name() {
                Some(prefix) => format!("xmlns:{}", prefix),
                None => "xmlns".to_string(),
            };
            root.set_attr(&attr_name, ns.uri());
        }
        Ok(root)
    }

    /// Parse a file's XML content, attaching the path to any parse error.
    pub fn parse_file(xml: &str, path: &Path) -> Result<Element, Error> {
        Element::parse(xml).map_err(|e| e.at_path(path))
    }

    /// Serialize the document: XML declaration plus the indented tree.
    pub fn to_xml(&self) -> String {
        let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        self.write_into(&mut out, 0);
        out
    }

    fn write_into(&self, out: &mut String, depth: usize) {
        let indent = "    ".repeat(depth);
        out.push_str(&indent);
        out.push('<');
        out.push_str(&self.name);

        let mut attrs: Vec<&(String, String)> = self.attributes.iter().collect();
        attrs.sort_by(|a, b| a.0.cmp(&b.0));
        for (name, value) in attrs {
            out.push(' ');
            out.push_str(name);
            out.push_str("=\"");
            out.push_str(&escape_attr(value));
            out.push('"');
        }

        if self.children.is_empty() {
            out.push_str("/>\n");
            return;
        }

        if let [XmlNode::Text(text)] = self.children.as_slice() {
            out.push('>');
            out.push_str(&escape_text(text));
            out.push_str("</");
            out.push_str(&self.name);
            out.push_str(">\n");
            return;
        }

        out.push_str(">\n");
        for child in &self.children {
            match child {
                XmlNode::Element(el) => el.write_into(out, depth + 1),
                XmlNode::Text(text) => {
                    out.push_str(&"    ".repeat(depth + 1));
                    out.push_str(&escape_text(text));
                    out.push('\n');
                }
            }
        }
        out.push_str(&indent);
        out.push_str("</");
        out.push_str(&self.name);
        out.push_str(">\n");
    }
}

fn convert_node(node: roxmltree::Node<'_, '_>) -> Element {
    let mut el = Element::new(&qualified_name(&node));

    for attr in node.attributes() {
        let name = match attr.namespace() {
            Some(uri) => match prefix_for(&node, uri) {
                Some(prefix) => format!("{}:{}", prefix, attr.name()),
                None => attr.name().to_string(),
            },
            None => attr.name().to_string(),
        };
        el.attributes.push((name, attr.value().to_string()));
    }

    for child in node.children() {
        if child.is_element() {
            el.children.push(XmlNode::Element(convert_node(child)));
        } else if child.is_text() {
            if let Some(text) = child.text() {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    el.children.push(XmlNode::Text(trimmed.to_string()));
                }
            }
        }
    }
    el
}

fn qualified_name(node: &roxmltree::Node<'_, '_>) -> String {
    let tag = node.tag_name();
    match tag.namespace() {
        Some(uri) => match prefix_for(node, uri) {
            Some(prefix) => format!("{}:{}", prefix, tag.name()),
            None => tag.name().to_string(),
        },
        None => tag.name().to_string(),
    }
}

fn prefix_for(node: &roxmltree::Node<'_, '_>, uri: &str) -> Option<String> {
    node.namespaces()
        .find(|ns| ns.uri() == uri)
        .and_then(|ns| ns.name().map(str::to_string))
}

/// Escape text content: `&`, `<`, `>`.
pub fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// Escape an attribute value: `&`, `<`, `>`, `"`.
pub fn escape_attr(s: &str) -> String {
    escape_text(s).replace('"', "&quot;")
}
