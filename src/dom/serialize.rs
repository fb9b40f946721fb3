//
// dom/serialize.rs
//
// paramatch: declarative data-matching and XML/XPath toolkit.
//

//!
//! Serialises a `NodePtr` subtree back to XML text, with optional
//! pretty-printing and attribute-value auth-masking so that logging a
//! document never leaks a password/secret attribute's real value.
//!

use super::{NodeType, NodePtr};
use crate::escape;

/// Controls how `serialize` renders a node.
#[derive(Debug, Clone)]
pub struct SerializeOptions {
    /// When `Some(n)`, each nesting level is indented by `n` spaces and
    /// nodes are separated by newlines; `None` emits a single line.
    pub indent: Option<usize>,
    /// When true, an element with `completed == false` is rendered as
    /// an unterminated start tag instead of being skipped.
    pub include_incomplete: bool,
    /// Tag and attribute names whose value is replaced with `***`: an
    /// attribute is masked when its own name is listed; a text node is
    /// masked when its *parent element's* tag is listed. One list
    /// serves both roles, mirroring the original auth-list parameter.
    pub mask_names: Vec<String>,
}

impl SerializeOptions {
    pub fn compact() -> Self {
        SerializeOptions {
            indent: None,
            include_incomplete: true,
            mask_names: Vec::new(),
        }
    }

    pub fn pretty() -> Self {
        SerializeOptions {
            indent: Some(2),
            include_incomplete: true,
            mask_names: Vec::new(),
        }
    }

    /// Adds `name` to the auth-mask list used during serialisation, for
    /// rendering a document safely into a log line.
    pub fn mask(mut self, name: impl Into<String>) -> Self {
        self.mask_names.push(name.into());
        self
    }
}

pub fn serialize(node: &NodePtr, options: &SerializeOptions) -> String {
    let mut out = String::new();
    write_node(node, options, 0, None, &mut out);
    out
}

fn newline_indent(options: &SerializeOptions, depth: usize, out: &mut String) {
    if let Some(width) = options.indent {
        out.push('\n');
        out.push_str(&" ".repeat(width * depth));
    }
}

fn write_node(node: &NodePtr, options: &SerializeOptions, depth: usize, parent_tag: Option<&str>, out: &mut String) {
    match node.node_type() {
        NodeType::Document => {
            for (i, child) in node.children().into_iter().enumerate() {
                if i > 0 {
                    newline_indent(options, depth, out);
                }
                write_node(&child, options, depth, None, out);
            }
        }
        NodeType::Fragment => {
            for (i, child) in node.children().into_iter().enumerate() {
                if i > 0 {
                    newline_indent(options, depth, out);
                }
                write_node(&child, options, depth, parent_tag, out);
            }
        }
        NodeType::Declaration => {
            out.push_str("<?xml");
            for (name, value) in node.attributes().iter() {
                write_attribute(out, name, value, options);
            }
            out.push_str("?>");
        }
        NodeType::Doctype => {
            out.push_str("<!DOCTYPE ");
            out.push_str(&node.text_value().unwrap_or_default());
            out.push('>');
        }
        NodeType::Comment => {
            out.push_str("<!--");
            out.push_str(&node.text_value().unwrap_or_default());
            out.push_str("-->");
        }
        NodeType::CData => {
            out.push_str("<![CDATA[");
            out.push_str(&node.text_value().unwrap_or_default());
            out.push_str("]]>");
        }
        NodeType::Text => {
            let text = node.text_value().unwrap_or_default();
            if parent_tag.is_some_and(|tag| options.mask_names.iter().any(|m| m == tag)) {
                out.push_str("***");
            } else {
                let mut bytes = Vec::new();
                escape::escape(&mut bytes, text.as_bytes());
                out.push_str(&String::from_utf8_lossy(&bytes));
            }
        }
        NodeType::Element => write_element(node, options, depth, out),
    }
}

fn write_attribute(out: &mut String, name: &str, value: &str, options: &SerializeOptions) {
    out.push(' ');
    out.push_str(name);
    out.push_str("=\"");
    if options.mask_names.iter().any(|m| m == name) {
        out.push_str("***");
    } else {
        let mut bytes = Vec::new();
        escape::escape(&mut bytes, value.as_bytes());
        out.push_str(&String::from_utf8_lossy(&bytes));
    }
    out.push('"');
}

fn write_element(node: &NodePtr, options: &SerializeOptions, depth: usize, out: &mut String) {
    let tag = node.tag().unwrap_or_default();
    out.push('<');
    out.push_str(&tag);
    for (name, value) in node.attributes().iter() {
        write_attribute(out, name, value, options);
    }

    if !node.is_completed() && !options.include_incomplete {
        out.push('>');
        return;
    }
    if !node.is_completed() {
        out.push('>');
        return;
    }

    let children = node.children();
    if children.is_empty() {
        out.push_str("/>");
        return;
    }

    out.push('>');
    let only_text = children.len() == 1 && children[0].node_type() == NodeType::Text;
    if only_text {
        write_node(&children[0], options, depth + 1, Some(&tag), out);
    } else {
        for child in &children {
            newline_indent(options, depth + 1, out);
            write_node(child, options, depth + 1, Some(&tag), out);
        }
        newline_indent(options, depth, out);
    }
    out.push_str("</");
    out.push_str(&tag);
    out.push('>');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::new_document;

    #[test]
    fn compact_round_trip_matches_original_bytes() {
        let xml = r#"<?xml version="1.0"?><article>foo</article>"#;
        let doc = new_document(xml).unwrap();
        assert_eq!(doc.to_string(), xml);
    }

    #[test]
    fn masks_attribute_value_by_name() {
        let doc = new_document(r#"<user name="alice" password="hunter2"/>"#).unwrap();
        let out = doc.serialize(&SerializeOptions::compact().mask("password"));
        assert_eq!(out, r#"<user name="alice" password="***"/>"#);
    }

    #[test]
    fn masks_text_content_by_parent_tag() {
        let doc = new_document("<response><secret>swordfish</secret></response>").unwrap();
        let out = doc.serialize(&SerializeOptions::compact().mask("secret"));
        assert_eq!(out, "<response><secret>***</secret></response>");
    }

    #[test]
    fn pretty_print_indents_nested_elements() {
        let doc = new_document("<a><b><c/></b></a>").unwrap();
        let out = doc.to_pretty_string();
        assert_eq!(out, "<a>\n  <b>\n    <c/>\n  </b>\n</a>");
    }
}
