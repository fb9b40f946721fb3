//
// dom/builder.rs
//
// paramatch: declarative data-matching and XML/XPath toolkit.
//

//!
//! `DomBuilder`: a `SaxHandler` that assembles a `Document` tree from
//! the event stream, keeping a stack of still-open elements so text,
//! CDATA, comments and child elements land under the right parent.
//!

use super::NodePtr;
use crate::sax::SaxHandler;
use log::warn;

pub struct DomBuilder {
    document: NodePtr,
    open: Vec<NodePtr>,
}

impl DomBuilder {
    pub fn new() -> Self {
        DomBuilder {
            document: NodePtr::new_document(),
            open: Vec::new(),
        }
    }

    /// The document built so far. Meaningful once parsing has
    /// finished (or at any point, for a caller inspecting a partial
    /// parse after `feed` returned `Incomplete`).
    pub fn document(&self) -> NodePtr {
        self.document.clone()
    }

    fn current(&self) -> Option<&NodePtr> {
        self.open.last()
    }

    fn attach(&self, child: NodePtr) {
        let parent = self.current().unwrap_or(&self.document);
        if parent.add_child(child).is_err() {
            warn!("dropped a node that did not fit its parent during DOM construction");
        }
    }
}

impl Default for DomBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SaxHandler for DomBuilder {
    fn on_declaration(&mut self, attrs: &[(String, String)]) {
        let decl = NodePtr::new_declaration();
        for (name, value) in attrs {
            decl.set_attribute(name.clone(), value.clone());
        }
        self.attach(decl);
    }

    fn on_processing_instruction(&mut self, target: &str, data: &str) {
        // Processing instructions carry no DOM node kind in this
        // toolkit; they are observed and discarded.
        let _ = (target, data);
    }

    fn on_doctype(&mut self, text: &str) {
        self.attach(NodePtr::new_doctype(text));
    }

    fn on_element_start(&mut self, name: &str, attrs: &[(String, String)], empty: bool) {
        let element = match NodePtr::new_element(name) {
            Ok(element) => element,
            Err(_) => return,
        };
        for (attr_name, value) in attrs {
            element.set_attribute(attr_name.clone(), value.clone());
        }
        if !empty {
            element.mark_incomplete();
        }
        self.attach(element.clone());
        self.open.push(element);
    }

    fn on_element_end(&mut self, _name: &str) {
        if let Some(element) = self.open.pop() {
            element.mark_completed();
        }
    }

    fn on_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        self.attach(NodePtr::new_text(text));
    }

    fn on_cdata(&mut self, data: &str) {
        self.attach(NodePtr::new_cdata(data));
    }

    fn on_comment(&mut self, text: &str) {
        self.attach(NodePtr::new_comment(text));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::NodeType;
    use crate::sax::SaxParser;

    #[test]
    fn builds_a_tree_from_a_simple_document() {
        let mut parser = SaxParser::new(DomBuilder::new());
        parser.feed(br#"<?xml version="1.0"?><root a="1"><child>hi</child><!--c--></root>"#);
        parser.finish();
        let doc = parser.handler().document();
        let root = doc.root_element().expect("root element");
        assert_eq!(root.tag().as_deref(), Some("root"));
        assert_eq!(root.attribute_value("a").as_deref(), Some("1"));
        assert!(root.is_completed());

        let children = root.children();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].node_type(), NodeType::Element);
        assert_eq!(children[0].text(), "hi");
        assert_eq!(children[1].node_type(), NodeType::Comment);
        assert_eq!(children[1].text_value().as_deref(), Some("c"));
    }

    #[test]
    fn empty_element_is_immediately_completed() {
        let mut parser = SaxParser::new(DomBuilder::new());
        parser.feed(b"<root><leaf/></root>");
        parser.finish();
        let doc = parser.handler().document();
        let root = doc.root_element().unwrap();
        let leaf = root.first_child(Some("leaf")).unwrap();
        assert!(leaf.is_completed());
        assert!(leaf.is_empty_element());
    }
}
