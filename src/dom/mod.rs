//
// dom/mod.rs
//
// paramatch: declarative data-matching and XML/XPath toolkit.
//

//!
//! In-memory XML DOM: an owning tree of polymorphic nodes (document,
//! fragment, element, text, CDATA, comment, declaration, doctype),
//! with namespace inheritance, mutation, parameter substitution, and
//! escaping-aware serialisation.
//!
//! Every node, regardless of kind, is reached through a `NodePtr`
//! (a cheap `Rc` handle). Parent pointers are weak: dropping the last
//! strong reference to a subtree drops it recursively, and detaching a
//! node clears its parent link while snapshotting the namespaces it
//! had inherited so that later namespace lookups on the detached
//! subtree remain stable.
//!

mod attrs;
mod builder;
mod namespace;
mod serialize;

pub use attrs::AttributeMap;
pub use builder::DomBuilder;
pub use serialize::{SerializeOptions};

use crate::error::XmlStatus;
use crate::sax::SaxParser;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

/// Discriminant of a DOM node's kind. Mirrors the variants of
/// `NodeKind` for introspection without borrowing the node's payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Document,
    Fragment,
    Element,
    Text,
    CData,
    Comment,
    Declaration,
    Doctype,
}

struct ElementData {
    tag: String,
    attributes: AttributeMap,
    children: Vec<NodePtr>,
    inherited_ns: Option<HashMap<String, String>>,
    completed: bool,
    empty: bool,
}

struct DocumentData {
    before_root: Vec<NodePtr>,
    root: Option<NodePtr>,
    after_root: Vec<NodePtr>,
    source_file: Option<String>,
    declaration: Option<NodePtr>,
}

enum NodeKind {
    Document(RefCell<DocumentData>),
    Fragment(RefCell<Vec<NodePtr>>),
    Element(RefCell<ElementData>),
    Text(RefCell<String>),
    CData(RefCell<String>),
    Comment(RefCell<String>),
    Declaration(RefCell<AttributeMap>),
    Doctype(RefCell<String>),
}

struct Node {
    kind: NodeKind,
    parent: RefCell<Weak<Node>>,
}

/// A handle to a DOM node. Cheap to clone (an `Rc` bump); two handles
/// obtained from the same construction compare equal by identity, not
/// by structural content (see `PartialEq`).
#[derive(Clone)]
pub struct NodePtr(Rc<Node>);

impl PartialEq for NodePtr {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}
impl Eq for NodePtr {}

impl fmt::Debug for NodePtr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.node_type() {
            NodeType::Element => write!(f, "<{}>", self.tag().unwrap_or_default()),
            NodeType::Text => write!(f, "{:?}", self.text_value().unwrap_or_default()),
            _ => write!(f, "{:?}", self.node_type()),
        }
    }
}

fn wrap(node: Node) -> NodePtr {
    NodePtr(Rc::new(node))
}

impl NodePtr {
    pub fn new_document() -> NodePtr {
        wrap(Node {
            kind: NodeKind::Document(RefCell::new(DocumentData {
                before_root: Vec::new(),
                root: None,
                after_root: Vec::new(),
                source_file: None,
                declaration: None,
            })),
            parent: RefCell::new(Weak::new()),
        })
    }

    pub fn new_fragment() -> NodePtr {
        wrap(Node {
            kind: NodeKind::Fragment(RefCell::new(Vec::new())),
            parent: RefCell::new(Weak::new()),
        })
    }

    pub fn new_element(tag: impl Into<String>) -> Result<NodePtr, XmlStatus> {
        let tag = tag.into();
        if tag.is_empty() || !crate::escape::is_valid_name(&tag) {
            return Err(XmlStatus::InvalidElementName);
        }
        Ok(wrap(Node {
            kind: NodeKind::Element(RefCell::new(ElementData {
                tag,
                attributes: AttributeMap::new(),
                children: Vec::new(),
                inherited_ns: None,
                completed: true,
                empty: true,
            })),
            parent: RefCell::new(Weak::new()),
        }))
    }

    pub fn new_text(value: impl Into<String>) -> NodePtr {
        wrap(Node {
            kind: NodeKind::Text(RefCell::new(value.into())),
            parent: RefCell::new(Weak::new()),
        })
    }

    pub fn new_cdata(value: impl Into<String>) -> NodePtr {
        wrap(Node {
            kind: NodeKind::CData(RefCell::new(value.into())),
            parent: RefCell::new(Weak::new()),
        })
    }

    pub fn new_comment(value: impl Into<String>) -> NodePtr {
        wrap(Node {
            kind: NodeKind::Comment(RefCell::new(value.into())),
            parent: RefCell::new(Weak::new()),
        })
    }

    pub fn new_declaration() -> NodePtr {
        wrap(Node {
            kind: NodeKind::Declaration(RefCell::new(AttributeMap::new())),
            parent: RefCell::new(Weak::new()),
        })
    }

    pub fn new_doctype(value: impl Into<String>) -> NodePtr {
        wrap(Node {
            kind: NodeKind::Doctype(RefCell::new(value.into())),
            parent: RefCell::new(Weak::new()),
        })
    }

    pub fn node_type(&self) -> NodeType {
        match &self.0.kind {
            NodeKind::Document(_) => NodeType::Document,
            NodeKind::Fragment(_) => NodeType::Fragment,
            NodeKind::Element(_) => NodeType::Element,
            NodeKind::Text(_) => NodeType::Text,
            NodeKind::CData(_) => NodeType::CData,
            NodeKind::Comment(_) => NodeType::Comment,
            NodeKind::Declaration(_) => NodeType::Declaration,
            NodeKind::Doctype(_) => NodeType::Doctype,
        }
    }

    pub fn parent(&self) -> Option<NodePtr> {
        self.0.parent.borrow().upgrade().map(NodePtr)
    }

    fn set_parent(&self, parent: &NodePtr) {
        *self.0.parent.borrow_mut() = Rc::downgrade(&parent.0);
    }

    /// Detaches this node from its parent (if any), snapshotting the
    /// namespaces it had inherited so subsequent namespace lookups
    /// remain stable even though the ancestor chain is now gone.
    pub fn detach(&self) {
        if let NodeType::Element = self.node_type() {
            let snapshot = namespace::collect_inherited(self);
            if let NodeKind::Element(data) = &self.0.kind {
                data.borrow_mut().inherited_ns = Some(snapshot);
            }
        }
        if let Some(parent) = self.parent() {
            parent.remove_child(self);
        }
        *self.0.parent.borrow_mut() = Weak::new();
    }

    // -----------------------------------------------------------------
    // Container capability, shared by Document, Fragment and Element.
    // -----------------------------------------------------------------

    /// Appends `child`, dispatching on this node's kind per the DOM
    /// `add_child` contract (§4.3 of the design). The caller destroys
    /// the rejected child (it was never linked in) on error.
    pub fn add_child(&self, child: NodePtr) -> Result<(), XmlStatus> {
        match &self.0.kind {
            NodeKind::Fragment(children) => {
                child.set_parent(self);
                children.borrow_mut().push(child);
                Ok(())
            }
            NodeKind::Document(doc) => self.document_add_child(doc, child),
            NodeKind::Element(data) => {
                // `completed` only gates the document-level root dispatch
                // (§4.3 invariant 5); the element API itself always
                // permits mutation.
                child.set_parent(self);
                data.borrow_mut().children.push(child);
                data.borrow_mut().empty = false;
                Ok(())
            }
            _ => Err(XmlStatus::NotWellFormed),
        }
    }

    fn document_add_child(&self, doc: &RefCell<DocumentData>, child: NodePtr) -> Result<(), XmlStatus> {
        match child.node_type() {
            NodeType::Element => {
                let mut doc = doc.borrow_mut();
                match &doc.root {
                    None => {
                        child.set_parent(self);
                        doc.root = Some(child);
                        Ok(())
                    }
                    Some(root) => {
                        if root.is_completed() {
                            Err(XmlStatus::NotWellFormed)
                        } else {
                            let root = root.clone();
                            drop(doc);
                            root.add_child(child)
                        }
                    }
                }
            }
            NodeType::Declaration => {
                let mut doc = doc.borrow_mut();
                if doc.declaration.is_some() {
                    return Err(XmlStatus::DeclarationParse);
                }
                child.set_parent(self);
                doc.declaration = Some(child.clone());
                doc.before_root.push(child);
                Ok(())
            }
            NodeType::Text => {
                let text = child.text_value().unwrap_or_default();
                if !text.chars().all(crate::escape::is_blank) {
                    return Err(XmlStatus::NotWellFormed);
                }
                let mut doc = doc.borrow_mut();
                child.set_parent(self);
                if doc.root.is_none() {
                    doc.before_root.push(child);
                } else {
                    doc.after_root.push(child);
                }
                Ok(())
            }
            NodeType::Comment => {
                let mut doc = doc.borrow_mut();
                child.set_parent(self);
                if doc.root.is_none() {
                    doc.before_root.push(child);
                } else {
                    doc.after_root.push(child);
                }
                Ok(())
            }
            NodeType::Doctype => {
                child.set_parent(self);
                doc.borrow_mut().before_root.push(child);
                Ok(())
            }
            _ => Err(XmlStatus::NotWellFormed),
        }
    }

    pub fn remove_child(&self, child: &NodePtr) -> bool {
        let removed = match &self.0.kind {
            NodeKind::Fragment(children) => {
                let mut children = children.borrow_mut();
                let before = children.len();
                children.retain(|c| c != child);
                before != children.len()
            }
            NodeKind::Element(data) => {
                let mut data = data.borrow_mut();
                let before = data.children.len();
                data.children.retain(|c| c != child);
                data.children.len() != before
            }
            NodeKind::Document(doc) => {
                let mut doc = doc.borrow_mut();
                if doc.root.as_ref() == Some(child) {
                    doc.root = None;
                    true
                } else {
                    let before_len = doc.before_root.len();
                    doc.before_root.retain(|c| c != child);
                    let after_len = doc.after_root.len();
                    doc.after_root.retain(|c| c != child);
                    doc.before_root.len() != before_len || doc.after_root.len() != after_len
                }
            }
            _ => false,
        };
        if removed {
            *child.0.parent.borrow_mut() = Weak::new();
        }
        removed
    }

    pub fn children(&self) -> Vec<NodePtr> {
        match &self.0.kind {
            NodeKind::Fragment(children) => children.borrow().clone(),
            NodeKind::Element(data) => data.borrow().children.clone(),
            NodeKind::Document(doc) => {
                let doc = doc.borrow();
                let mut all = doc.before_root.clone();
                if let Some(root) = &doc.root {
                    all.push(root.clone());
                }
                all.extend(doc.after_root.clone());
                all
            }
            _ => Vec::new(),
        }
    }

    pub fn clear_children(&self) {
        match &self.0.kind {
            NodeKind::Fragment(children) => children.borrow_mut().clear(),
            NodeKind::Element(data) => data.borrow_mut().children.clear(),
            NodeKind::Document(doc) => {
                let mut doc = doc.borrow_mut();
                doc.before_root.clear();
                doc.root = None;
                doc.after_root.clear();
                doc.declaration = None;
            }
            _ => {}
        }
    }

    // -----------------------------------------------------------------
    // Document accessors
    // -----------------------------------------------------------------

    pub fn root_element(&self) -> Option<NodePtr> {
        match &self.0.kind {
            NodeKind::Document(doc) => doc.borrow().root.clone(),
            _ => None,
        }
    }

    pub fn set_source_file(&self, path: impl Into<String>) {
        if let NodeKind::Document(doc) = &self.0.kind {
            doc.borrow_mut().source_file = Some(path.into());
        }
    }

    pub fn source_file(&self) -> Option<String> {
        match &self.0.kind {
            NodeKind::Document(doc) => doc.borrow().source_file.clone(),
            _ => None,
        }
    }

    // -----------------------------------------------------------------
    // Element accessors
    // -----------------------------------------------------------------

    pub fn tag(&self) -> Option<String> {
        match &self.0.kind {
            NodeKind::Element(data) => Some(data.borrow().tag.clone()),
            _ => None,
        }
    }

    /// Splits the tag into `(prefix, local_name)`; `prefix` is empty
    /// when the tag carries no namespace prefix.
    pub fn tag_parts(&self) -> Option<(String, String)> {
        self.tag().map(|tag| match tag.split_once(':') {
            Some((prefix, local)) => (prefix.to_string(), local.to_string()),
            None => (String::new(), tag),
        })
    }

    pub fn is_completed(&self) -> bool {
        match &self.0.kind {
            NodeKind::Element(data) => data.borrow().completed,
            _ => true,
        }
    }

    pub fn mark_completed(&self) {
        if let NodeKind::Element(data) = &self.0.kind {
            data.borrow_mut().completed = true;
        }
    }

    /// Marks an element as still open (no end tag seen yet); used by
    /// the SAX-driven builder while a start tag's matching end tag is
    /// still pending.
    pub fn mark_incomplete(&self) {
        if let NodeKind::Element(data) = &self.0.kind {
            data.borrow_mut().completed = false;
        }
    }

    pub fn is_empty_element(&self) -> bool {
        match &self.0.kind {
            NodeKind::Element(data) => data.borrow().empty,
            _ => false,
        }
    }

    pub fn attributes(&self) -> AttributeMap {
        match &self.0.kind {
            NodeKind::Element(data) => data.borrow().attributes.clone(),
            NodeKind::Declaration(attrs) => attrs.borrow().clone(),
            _ => AttributeMap::new(),
        }
    }

    pub fn attribute_value(&self, name: &str) -> Option<String> {
        match &self.0.kind {
            NodeKind::Element(data) => data.borrow().attributes.get(name).map(str::to_string),
            NodeKind::Declaration(attrs) => attrs.borrow().get(name).map(str::to_string),
            _ => None,
        }
    }

    pub fn set_attribute(&self, name: impl Into<String>, value: impl Into<String>) {
        match &self.0.kind {
            NodeKind::Element(data) => data.borrow_mut().attributes.set(name, value),
            NodeKind::Declaration(attrs) => attrs.borrow_mut().set(name, value),
            _ => {}
        }
    }

    pub fn delete_attribute(&self, name: &str) {
        match &self.0.kind {
            NodeKind::Element(data) => {
                data.borrow_mut().attributes.remove(name);
            }
            NodeKind::Declaration(attrs) => {
                attrs.borrow_mut().remove(name);
            }
            _ => {}
        }
    }

    // -----------------------------------------------------------------
    // Scalar (text-bearing) node value
    // -----------------------------------------------------------------

    pub fn text_value(&self) -> Option<String> {
        match &self.0.kind {
            NodeKind::Text(s) | NodeKind::CData(s) | NodeKind::Comment(s) | NodeKind::Doctype(s) => {
                Some(s.borrow().clone())
            }
            _ => None,
        }
    }

    pub fn set_text_value(&self, value: impl Into<String>) {
        match &self.0.kind {
            NodeKind::Text(s) | NodeKind::CData(s) | NodeKind::Comment(s) | NodeKind::Doctype(s) => {
                *s.borrow_mut() = value.into();
            }
            _ => {}
        }
    }

    // -----------------------------------------------------------------
    // Child search
    // -----------------------------------------------------------------

    /// First child element matching `tag` (`None` matches any tag).
    pub fn first_child(&self, tag: Option<&str>) -> Option<NodePtr> {
        self.children()
            .into_iter()
            .find(|c| c.node_type() == NodeType::Element && tag_matches(c, tag))
    }

    /// The next sibling element matching `tag`, scanning forward from
    /// this node within its parent's children.
    pub fn next_sibling(&self, tag: Option<&str>) -> Option<NodePtr> {
        let parent = self.parent()?;
        let siblings = parent.children();
        let pos = siblings.iter().position(|c| c == self)?;
        siblings[pos + 1..]
            .iter()
            .find(|c| c.node_type() == NodeType::Element && tag_matches(c, tag))
            .cloned()
    }

    pub fn child_elements(&self) -> Vec<NodePtr> {
        self.children().into_iter().filter(|c| c.node_type() == NodeType::Element).collect()
    }

    /// Text of the first text child, or empty string if there is none.
    pub fn text(&self) -> String {
        self.children()
            .into_iter()
            .find(|c| c.node_type() == NodeType::Text)
            .and_then(|c| c.text_value())
            .unwrap_or_default()
    }

    /// Replaces the first text child's value with `value`, creating
    /// one if none exists, or removing it when `value` is `None`.
    pub fn set_text(&self, value: Option<&str>) {
        let existing = self.children().into_iter().find(|c| c.node_type() == NodeType::Text);
        match (existing, value) {
            (Some(node), Some(v)) => node.set_text_value(v),
            (Some(node), None) => {
                self.remove_child(&node);
            }
            (None, Some(v)) => {
                self.add_child(NodePtr::new_text(v)).expect("element always accepts a text child");
            }
            (None, None) => {}
        }
    }

    /// Appends a new text child, regardless of any existing one.
    pub fn add_text(&self, value: impl Into<String>) {
        self.add_child(NodePtr::new_text(value)).expect("element always accepts a text child");
    }

    // -----------------------------------------------------------------
    // Namespace lookup
    // -----------------------------------------------------------------

    /// Resolves the namespace URI bound to `prefix` (empty for the
    /// default namespace) by walking this element's attributes, then
    /// its ancestors, then its captured `inherited_ns` snapshot.
    pub fn namespace_uri(&self, prefix: &str) -> Option<String> {
        namespace::lookup(self, prefix)
    }

    /// The namespace snapshot captured at `detach` time, if any (only
    /// ever set on a detached element; `None` for an attached one).
    fn inherited_ns_snapshot(&self) -> Option<HashMap<String, String>> {
        match &self.0.kind {
            NodeKind::Element(data) => data.borrow().inherited_ns.clone(),
            _ => None,
        }
    }

    /// Rebinds `prefix` to `uri` on this element, optionally also
    /// adding the declaring `xmlns`/`xmlns:prefix` attribute.
    pub fn set_namespace(&self, prefix: &str, uri: &str, add_attribute: bool) {
        if add_attribute {
            let attr_name = if prefix.is_empty() {
                "xmlns".to_string()
            } else {
                format!("xmlns:{}", prefix)
            };
            self.set_attribute(attr_name, uri);
        }
    }

    // -----------------------------------------------------------------
    // Parameter import/export, `${name}` substitution
    // -----------------------------------------------------------------

    /// Copies this element's attributes into `params`, each name
    /// optionally prefixed by `prefix`.
    pub fn export_params(&self, params: &mut crate::param::ParamMap, prefix: &str) {
        for (name, value) in self.attributes().iter() {
            let key = if prefix.is_empty() {
                name.to_string()
            } else {
                format!("{}{}", prefix, name)
            };
            params.add(key, value);
        }
    }

    /// Copies entries from `params` (stripping `prefix` from each
    /// name) into this element's attributes.
    pub fn import_params(&self, params: &crate::param::ParamMap, prefix: &str) {
        for p in params.iter() {
            if let Some(name) = p.name().strip_prefix(prefix) {
                self.set_attribute(name, p.value());
            }
        }
    }

    /// Scans attribute values, text and CDATA for `${name}` (with
    /// optional `${name$default}`) occurrences and replaces them from
    /// `params`; a name absent from `params` and with no `$default`
    /// clause is left untouched.
    pub fn replace_params(&self, params: &crate::param::ParamMap) {
        if let NodeKind::Element(data) = &self.0.kind {
            let mut data = data.borrow_mut();
            let resolved: Vec<(String, String)> = data
                .attributes
                .iter()
                .map(|(n, v)| (n.to_string(), substitute(v, params)))
                .collect();
            for (name, value) in resolved {
                data.attributes.set(name, value);
            }
        }
        match &self.0.kind {
            NodeKind::Text(s) | NodeKind::CData(s) => {
                let replaced = substitute(&s.borrow(), params);
                *s.borrow_mut() = replaced;
            }
            _ => {}
        }
        for child in self.children() {
            child.replace_params(params);
        }
    }

    // -----------------------------------------------------------------
    // Serialisation
    // -----------------------------------------------------------------

    pub fn to_string(&self) -> String {
        serialize::serialize(self, &SerializeOptions::compact())
    }

    pub fn to_pretty_string(&self) -> String {
        serialize::serialize(self, &SerializeOptions::pretty())
    }

    pub fn serialize(&self, options: &SerializeOptions) -> String {
        serialize::serialize(self, options)
    }

    // -----------------------------------------------------------------
    // Deep copy
    // -----------------------------------------------------------------

    pub fn deep_clone(&self) -> NodePtr {
        match &self.0.kind {
            NodeKind::Fragment(children) => {
                let copy = NodePtr::new_fragment();
                for c in children.borrow().iter() {
                    let _ = copy.add_child(c.deep_clone());
                }
                copy
            }
            NodeKind::Element(data) => {
                let data = data.borrow();
                let copy = NodePtr::new_element(&data.tag).expect("tag was already validated");
                if let NodeKind::Element(copy_data) = &copy.0.kind {
                    let mut copy_data = copy_data.borrow_mut();
                    copy_data.attributes = data.attributes.clone();
                    copy_data.completed = data.completed;
                    copy_data.empty = data.empty;
                    copy_data.inherited_ns = data.inherited_ns.clone();
                }
                for c in data.children.iter() {
                    let _ = copy.add_child(c.deep_clone());
                }
                copy
            }
            NodeKind::Text(s) => NodePtr::new_text(s.borrow().clone()),
            NodeKind::CData(s) => NodePtr::new_cdata(s.borrow().clone()),
            NodeKind::Comment(s) => NodePtr::new_comment(s.borrow().clone()),
            NodeKind::Doctype(s) => NodePtr::new_doctype(s.borrow().clone()),
            NodeKind::Declaration(attrs) => {
                let copy = NodePtr::new_declaration();
                if let NodeKind::Declaration(copy_attrs) = &copy.0.kind {
                    *copy_attrs.borrow_mut() = attrs.borrow().clone();
                }
                copy
            }
            NodeKind::Document(doc) => {
                let doc = doc.borrow();
                let copy = NodePtr::new_document();
                for c in doc.before_root.iter() {
                    let _ = copy.add_child(c.deep_clone());
                }
                if let Some(root) = &doc.root {
                    let _ = copy.add_child(root.deep_clone());
                }
                for c in doc.after_root.iter() {
                    let _ = copy.add_child(c.deep_clone());
                }
                copy
            }
        }
    }
}

fn tag_matches(node: &NodePtr, tag: Option<&str>) -> bool {
    match tag {
        None => true,
        Some(wanted) => node.tag().as_deref() == Some(wanted),
    }
}

fn substitute(input: &str, params: &crate::param::ParamMap) -> String {
    let mut out = String::with_capacity(input.len());
    let bytes = input.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'$' && bytes.get(i + 1) == Some(&b'{') {
            if let Some(end) = input[i + 2..].find('}') {
                let body = &input[i + 2..i + 2 + end];
                let (name, default) = match body.split_once('$') {
                    Some((name, default)) => (name, Some(default)),
                    None => (body, None),
                };
                match params.get(name).or(default) {
                    Some(value) => out.push_str(value),
                    None => out.push_str(&input[i..i + 2 + end + 1]),
                }
                i = i + 2 + end + 1;
                continue;
            }
        }
        let ch = input[i..].chars().next().unwrap();
        out.push(ch);
        i += ch.len_utf8();
    }
    out
}

/// Parses a complete XML document string into a `Document` node using
/// the resumable SAX parser in one shot.
pub fn new_document(xml: &str) -> Result<NodePtr, XmlStatus> {
    let mut parser = SaxParser::new(DomBuilder::new());
    let status = parser.feed(xml.as_bytes());
    if status != XmlStatus::NoError {
        return Err(status);
    }
    let status = parser.finish();
    if status != XmlStatus::NoError {
        return Err(status);
    }
    Ok(parser.handler().document())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespace_lookup_walks_ancestors_and_default_binding() {
        let doc = new_document(r#"<root xmlns="urn:default" xmlns:ns="urn:ns"><child><grand/></child></root>"#).unwrap();
        let root = doc.root_element().unwrap();
        let child = root.first_child(Some("child")).unwrap();
        let grand = child.first_child(Some("grand")).unwrap();
        assert_eq!(grand.namespace_uri("").as_deref(), Some("urn:default"));
        assert_eq!(grand.namespace_uri("ns").as_deref(), Some("urn:ns"));
        assert_eq!(grand.namespace_uri("missing"), None);
    }

    #[test]
    fn detached_element_keeps_resolving_namespaces_via_snapshot() {
        let doc = new_document(r#"<root xmlns:ns="urn:ns"><child><grand/></child></root>"#).unwrap();
        let root = doc.root_element().unwrap();
        let child = root.first_child(Some("child")).unwrap();
        let grand = child.first_child(Some("grand")).unwrap();

        child.detach();
        assert!(child.parent().is_none());
        // grand is still attached to child, which is now detached from root;
        // the namespace lookup must fall back to child's captured snapshot.
        assert_eq!(grand.namespace_uri("ns").as_deref(), Some("urn:ns"));

        grand.detach();
        assert_eq!(grand.namespace_uri("ns").as_deref(), Some("urn:ns"));
    }

    #[test]
    fn set_text_creates_replaces_and_removes() {
        let root = NodePtr::new_element("r").unwrap();
        assert_eq!(root.text(), "");
        root.set_text(Some("hello"));
        assert_eq!(root.text(), "hello");
        root.set_text(Some("world"));
        assert_eq!(root.text(), "world");
        root.set_text(None);
        assert_eq!(root.text(), "");
    }

    #[test]
    fn deep_clone_produces_independent_structurally_equal_tree() {
        let doc = new_document(r#"<root a="1"><child>text</child></root>"#).unwrap();
        let clone = doc.deep_clone();
        assert_eq!(clone.to_string(), doc.to_string());
        clone.root_element().unwrap().set_attribute("a", "2");
        assert_ne!(clone.to_string(), doc.to_string());
    }
}
