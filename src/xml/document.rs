use crate::domain::model::QName;
use crate::utils::error::{DeployError, Result};
use crate::xml::ns;
use quick_xml::escape::unescape;
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesPI, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

type Scope = Arc<BTreeMap<String, String>>;

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
    CData(String),
    Comment(String),
    /// Target and data, as in `<?target data?>`.
    ProcessingInstruction(String),
    /// Everything between `<!DOCTYPE ` and the closing `>`.
    DocType(String),
}

/// An element with its raw qualified name, attributes in document order and
/// the namespace bindings in scope where it appeared.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    name: String,
    namespace: Option<String>,
    attributes: Vec<(String, String)>,
    scope: Scope,
    children: Vec<Node>,
}

impl Element {
    /// Creates an element for a generated document. `name` may carry a prefix.
    pub fn new(name: impl Into<String>, namespace: Option<&str>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.map(str::to_string),
            attributes: Vec::new(),
            scope: Arc::new(BTreeMap::new()),
            children: Vec::new(),
        }
    }

    /// Declares `xmlns[:prefix]` on this element.
    pub fn with_namespace_decl(mut self, prefix: &str, uri: &str) -> Self {
        let key = if prefix.is_empty() {
            "xmlns".to_string()
        } else {
            format!("xmlns:{}", prefix)
        };
        self.set_attribute(&key, uri);
        Arc::make_mut(&mut self.scope).insert(prefix.to_string(), uri.to_string());
        self
    }

    pub fn with_attr(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_attribute(name, value);
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Node::Text(text.into()));
        self
    }

    pub fn push_child(&mut self, child: Element) {
        self.children.push(Node::Element(child));
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn local_name(&self) -> &str {
        self.name
            .split_once(':')
            .map(|(_, local)| local)
            .unwrap_or(&self.name)
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn is(&self, namespace: &str, local: &str) -> bool {
        self.namespace() == Some(namespace) && self.local_name() == local
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }

    /// Replaces the value in place, keeping the attribute's position.
    pub fn set_attribute(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| k == name) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name.to_string(), value)),
        }
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            _ => None,
        })
    }

    pub fn child_elements_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.children.iter_mut().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            _ => None,
        })
    }

    pub fn children_named<'a>(
        &'a self,
        namespace: &'a str,
        local: &'a str,
    ) -> impl Iterator<Item = &'a Element> + 'a {
        self.child_elements().filter(move |e| e.is(namespace, local))
    }

    pub fn first_child_named(&self, namespace: &str, local: &str) -> Option<&Element> {
        self.child_elements().find(|e| e.is(namespace, local))
    }

    /// Concatenated character data of the direct children.
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|n| match n {
                Node::Text(t) | Node::CData(t) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn namespace_for_prefix(&self, prefix: &str) -> Option<&str> {
        if prefix == "xml" {
            return Some(ns::XML);
        }
        self.scope
            .get(prefix)
            .map(String::as_str)
            .filter(|uri| !uri.is_empty())
    }

    /// Resolves a `prefix:local` value against the bindings in scope here.
    /// Unprefixed values take the default namespace, if any.
    pub fn resolve_qname(&self, raw: &str) -> Option<QName> {
        let raw = raw.trim();
        match raw.split_once(':') {
            Some((prefix, local)) => self
                .namespace_for_prefix(prefix)
                .map(|uri| QName::new(uri, local)),
            None => Some(QName::new(
                self.namespace_for_prefix("").unwrap_or_default(),
                raw,
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct XmlDocument {
    path: Option<PathBuf>,
    prolog: Vec<Node>,
    root: Element,
}

impl XmlDocument {
    pub fn new(root: Element) -> Self {
        Self {
            path: None,
            prolog: Vec::new(),
            root,
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            DeployError::IoError(std::io::Error::new(
                e.kind(),
                format!("Cannot read {}: {}", path.display(), e),
            ))
        })?;
        let mut doc = Self::parse_str(&text, path)?;
        doc.path = Some(path.to_path_buf());
        Ok(doc)
    }

    /// `origin` is only used in error messages.
    ///
    /// Processing instructions and the DOCTYPE are kept and written back out,
    /// but entities declared in an internal DTD subset are not expanded: a
    /// reference to one fails the parse.
    pub fn parse_str(text: &str, origin: &Path) -> Result<Self> {
        let mut reader = Reader::from_str(text);
        let mut stack: Vec<Element> = Vec::new();
        let mut prolog = Vec::new();
        let mut root = None;

        loop {
            let event = reader
                .read_event()
                .map_err(|e| DeployError::malformed(origin, e))?;
            match event {
                Event::Start(start) => {
                    let scope = parent_scope(&stack);
                    stack.push(open_element(&start, scope, origin)?);
                }
                Event::Empty(start) => {
                    let scope = parent_scope(&stack);
                    let element = open_element(&start, scope, origin)?;
                    attach(&mut stack, &mut root, &mut prolog, Node::Element(element), origin)?;
                }
                Event::End(_) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| DeployError::malformed(origin, "unbalanced end tag"))?;
                    attach(&mut stack, &mut root, &mut prolog, Node::Element(element), origin)?;
                }
                Event::Text(text) => {
                    if let Some(parent) = stack.last_mut() {
                        let raw = utf8(&text, origin)?;
                        let value = unescape(raw).map_err(|e| DeployError::malformed(origin, e))?;
                        parent.children.push(Node::Text(value.into_owned()));
                    }
                }
                Event::CData(data) => {
                    if let Some(parent) = stack.last_mut() {
                        let value = utf8(&data, origin)?.to_string();
                        parent.children.push(Node::CData(value));
                    }
                }
                Event::Comment(comment) => {
                    let value = utf8(&comment, origin)?.to_string();
                    attach(&mut stack, &mut root, &mut prolog, Node::Comment(value), origin)?;
                }
                Event::PI(pi) => {
                    let value = utf8(&pi, origin)?.to_string();
                    attach(
                        &mut stack,
                        &mut root,
                        &mut prolog,
                        Node::ProcessingInstruction(value),
                        origin,
                    )?;
                }
                Event::DocType(doctype) => {
                    let value = utf8(&doctype, origin)?.trim().to_string();
                    attach(&mut stack, &mut root, &mut prolog, Node::DocType(value), origin)?;
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !stack.is_empty() {
            return Err(DeployError::malformed(origin, "unexpected end of document"));
        }
        let root = root.ok_or_else(|| DeployError::malformed(origin, "no root element"))?;

        Ok(Self {
            path: None,
            prolog,
            root,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut Element {
        &mut self.root
    }

    /// Serializes without touching whitespace, for documents read from disk.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = Writer::new(Vec::new());
        self.write_to(&mut writer, true)?;
        Ok(writer.into_inner())
    }

    /// Serializes with two-space indentation, for generated documents.
    pub fn to_pretty_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        self.write_to(&mut writer, false)?;
        Ok(writer.into_inner())
    }

    pub fn write_file(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_bytes()?)?;
        Ok(())
    }

    fn write_to<W: Write>(&self, writer: &mut Writer<W>, newline_after_decl: bool) -> Result<()> {
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(write_error)?;
        if newline_after_decl {
            writer.get_mut().write_all(b"\n")?;
        }
        for node in &self.prolog {
            write_node(writer, node)?;
            if newline_after_decl {
                writer.get_mut().write_all(b"\n")?;
            }
        }
        write_element(writer, &self.root)
    }
}

fn parent_scope(stack: &[Element]) -> Scope {
    stack
        .last()
        .map(|e| Arc::clone(&e.scope))
        .unwrap_or_default()
}

fn utf8<'a>(bytes: &'a [u8], origin: &Path) -> Result<&'a str> {
    std::str::from_utf8(bytes).map_err(|e| DeployError::malformed(origin, e))
}

fn open_element(start: &BytesStart<'_>, mut scope: Scope, origin: &Path) -> Result<Element> {
    let name = utf8(start.name().as_ref(), origin)?.to_string();

    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| DeployError::malformed(origin, e))?;
        let key = utf8(attr.key.as_ref(), origin)?.to_string();
        let raw = utf8(&attr.value, origin)?;
        let value = unescape(raw)
            .map_err(|e| DeployError::malformed(origin, e))?
            .into_owned();

        if key == "xmlns" {
            Arc::make_mut(&mut scope).insert(String::new(), value.clone());
        } else if let Some(prefix) = key.strip_prefix("xmlns:") {
            Arc::make_mut(&mut scope).insert(prefix.to_string(), value.clone());
        }
        attributes.push((key, value));
    }

    let mut element = Element {
        name,
        namespace: None,
        attributes,
        scope,
        children: Vec::new(),
    };
    let prefix = element
        .name
        .split_once(':')
        .map(|(p, _)| p.to_string())
        .unwrap_or_default();
    element.namespace = match element.namespace_for_prefix(&prefix) {
        Some(uri) => Some(uri.to_string()),
        None if prefix.is_empty() => None,
        None => {
            return Err(DeployError::malformed(
                origin,
                format!("undeclared namespace prefix '{}' on <{}>", prefix, element.name),
            ))
        }
    };
    Ok(element)
}

fn attach(
    stack: &mut [Element],
    root: &mut Option<Element>,
    prolog: &mut Vec<Node>,
    node: Node,
    origin: &Path,
) -> Result<()> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
        return Ok(());
    }
    match node {
        Node::Element(element) => {
            if root.is_some() {
                return Err(DeployError::malformed(origin, "more than one root element"));
            }
            *root = Some(element);
        }
        // prolog nodes after the root element are dropped
        other if root.is_none() => prolog.push(other),
        _ => {}
    }
    Ok(())
}

fn write_error<E: std::fmt::Display>(e: E) -> DeployError {
    DeployError::IoError(std::io::Error::other(e.to_string()))
}

fn write_node<W: Write>(writer: &mut Writer<W>, node: &Node) -> Result<()> {
    match node {
        Node::Element(element) => write_element(writer, element),
        Node::Text(text) => writer
            .write_event(Event::Text(BytesText::new(text)))
            .map_err(write_error),
        Node::CData(text) => writer
            .write_event(Event::CData(BytesCData::new(text.as_str())))
            .map_err(write_error),
        Node::Comment(text) => writer
            .write_event(Event::Comment(BytesText::from_escaped(text.as_str())))
            .map_err(write_error),
        Node::ProcessingInstruction(content) => writer
            .write_event(Event::PI(BytesPI::new(content.as_str())))
            .map_err(write_error),
        Node::DocType(text) => writer
            .write_event(Event::DocType(BytesText::from_escaped(text.as_str())))
            .map_err(write_error),
    }
}

fn write_element<W: Write>(writer: &mut Writer<W>, element: &Element) -> Result<()> {
    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in &element.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    if element.children.is_empty() {
        return writer.write_event(Event::Empty(start)).map_err(write_error);
    }

    writer.write_event(Event::Start(start)).map_err(write_error)?;
    for child in &element.children {
        write_node(writer, child)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new(element.name.as_str())))
        .map_err(write_error)
}
