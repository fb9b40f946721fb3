//
// dom/namespace.rs
//
// paramatch: declarative data-matching and XML/XPath toolkit.
//

//!
//! Namespace prefix resolution: walks an element's own `xmlns`/
//! `xmlns:prefix` attributes, then its ancestor chain, then (for a
//! detached element) the snapshot captured at detach time.
//!

use super::{NodePtr, NodeType};
use std::collections::HashMap;

fn attr_for_prefix(prefix: &str) -> String {
    if prefix.is_empty() {
        "xmlns".to_string()
    } else {
        format!("xmlns:{}", prefix)
    }
}

/// Resolves `prefix` starting at `node`, walking up through ancestors;
/// falls back to the inherited-namespace snapshot recorded at detach
/// time once the ancestor chain is exhausted.
pub fn lookup(node: &NodePtr, prefix: &str) -> Option<String> {
    let attr_name = attr_for_prefix(prefix);
    let mut current = Some(node.clone());
    while let Some(element) = current {
        if element.node_type() == NodeType::Element {
            if let Some(uri) = element.attribute_value(&attr_name) {
                return Some(uri);
            }
        }
        match element.parent() {
            Some(parent) => current = Some(parent),
            None => return element.inherited_ns_snapshot().and_then(|m| m.get(prefix).cloned()),
        }
    }
    None
}

/// Snapshots every namespace binding visible from `node` (its own and
/// its ancestors') into a flat `prefix -> uri` map, for stashing away
/// when the node is about to be detached from its tree. If the walk
/// reaches an already-detached ancestor, its own captured snapshot is
/// folded in rather than discarded, so repeated detaches compose.
pub fn collect_inherited(node: &NodePtr) -> HashMap<String, String> {
    let mut seen = HashMap::new();
    let mut current = Some(node.clone());
    while let Some(element) = current {
        if element.node_type() == NodeType::Element {
            for (name, value) in element.attributes().iter() {
                if name == "xmlns" {
                    seen.entry(String::new()).or_insert_with(|| value.to_string());
                } else if let Some(prefix) = name.strip_prefix("xmlns:") {
                    seen.entry(prefix.to_string()).or_insert_with(|| value.to_string());
                }
            }
        }
        match element.parent() {
            Some(parent) => current = Some(parent),
            None => {
                if let Some(inherited) = element.inherited_ns_snapshot() {
                    for (k, v) in inherited {
                        seen.entry(k).or_insert(v);
                    }
                }
                break;
            }
        }
    }
    seen
}
