//
// lib.rs
//
// paramatch: declarative data-matching and XML/XPath toolkit.
//

//!
//! A resumable XML SAX parser and DOM, a constrained XPath dialect over
//! that DOM, and a composable matching-item predicate tree that filters
//! caller-supplied parameter maps. The three pieces are deliberately
//! coupled: a matching-item `xpath` leaf reuses the DOM and XPath
//! engines, and the load/dump layer that moves a tree to and from a
//! parameter map or XML fragment builds on the DOM.
//!
//! # Building and walking a DOM
//!
//! ```
//! use paramatch::dom;
//!
//! let xml = r#"<?xml version="1.0"?><article>foo</article>"#;
//! let doc = dom::new_document(xml).unwrap();
//! assert_eq!(doc.to_string(), xml);
//! ```
//!
//! # Selecting nodes with XPath
//!
//! ```
//! use paramatch::dom;
//! use paramatch::xpath;
//!
//! let doc = dom::new_document(r#"<root><a img="a1"/><a img="a2"/></root>"#).unwrap();
//! let root = doc.root_element().unwrap();
//! let mut imgs = String::new();
//! for value in xpath::select("/root/a/@img", &root).unwrap() {
//!     if let xpath::XPathValue::Attribute(_, v) = value {
//!         imgs += &v;
//!     }
//! }
//! assert_eq!(imgs, "a1a2");
//! ```
//!
//! # Matching a parameter map against a rule tree
//!
//! ```
//! use paramatch::matching::{load_from_xml_string, LoadFlags, MatchContext};
//! use paramatch::param::ParamMap;
//!
//! let rule = r#"
//!     <list>
//!         <string name="user">alice</string>
//!         <regexp name="ip">^10\.</regexp>
//!     </list>
//! "#;
//! let item = load_from_xml_string(rule, LoadFlags::default()).unwrap();
//!
//! let mut params = ParamMap::new();
//! params.add("user", "alice").add("ip", "10.0.0.1");
//! let ctx = MatchContext::new();
//! assert!(item.eval_match(&mut params, &ctx).is_some());
//! ```
//!
//! # Feeding a resumable SAX parser
//!
//! Input need not arrive in one piece: `SaxParser::feed` can be called
//! any number of times with arbitrary chunks and produces the same
//! event sequence as a single call, provided `finish` is called once no
//! more input is coming. See [`sax`] for the handler trait.
//!

pub mod dom;
pub mod error;
pub mod escape;
pub mod matching;
pub mod param;
pub mod sax;
pub mod xpath;
