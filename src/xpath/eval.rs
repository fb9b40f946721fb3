//
// xpath/eval.rs
//
// paramatch: declarative data-matching and XML/XPath toolkit.
//

//!
//! Walks a compiled `XPath` against a DOM starting element, collecting
//! elements, attribute (name, value) pairs, or text depending on the
//! path's terminal step kind.
//!

use super::ast::{CmpOp, Comparison, Predicate, Step, StepKind, XPath};
use crate::dom::{NodePtr, NodeType};
use crate::error::{XPathError, XPathStatus};
use regex::RegexBuilder;

/// One collected result. Which variant appears depends on the path's
/// last step: an `Element` step yields `Element`, an `Attribute` step
/// yields `Attribute`, `Text`/`ChildText` yield `Text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XPathValue {
    Element(NodePtr),
    Attribute(String, String),
    Text(String),
}

pub fn evaluate(path: &XPath, start: &NodePtr) -> Result<Vec<XPathValue>, XPathError> {
    let mut elements = vec![start.clone()];
    let last = path.steps.len() - 1;

    for (index, step) in path.steps.iter().enumerate() {
        let is_last = index == last;
        match &step.kind {
            StepKind::Element(tag) => {
                let candidates = if index == 0 && path.absolute {
                    elements.clone()
                } else {
                    elements.iter().flat_map(|e| e.child_elements()).collect()
                };
                let filtered: Vec<NodePtr> = candidates
                    .into_iter()
                    .filter(|c| tag.as_deref().map_or(true, |wanted| c.tag().as_deref() == Some(wanted)))
                    .collect();
                let survivors = apply_predicates(filtered, &step.predicates, index)?;
                if is_last {
                    return Ok(survivors.into_iter().map(XPathValue::Element).collect());
                }
                elements = survivors;
            }
            StepKind::Attribute(name) => {
                require_terminal(step, is_last, index)?;
                let mut out = Vec::new();
                for e in &elements {
                    for (n, v) in e.attributes().iter() {
                        if name.as_deref().map_or(true, |wanted| wanted == n) {
                            out.push(XPathValue::Attribute(n.to_string(), v.to_string()));
                        }
                    }
                }
                return Ok(out);
            }
            StepKind::Text => {
                require_terminal(step, is_last, index)?;
                let mut out = Vec::new();
                for e in &elements {
                    if e.children().iter().any(|c| c.node_type() == NodeType::Text) {
                        out.push(XPathValue::Text(e.text()));
                    }
                }
                return Ok(out);
            }
            StepKind::ChildText => {
                require_terminal(step, is_last, index)?;
                let mut out = Vec::new();
                for e in &elements {
                    for child in e.children() {
                        if child.node_type() == NodeType::Text {
                            out.push(XPathValue::Text(child.text_value().unwrap_or_default()));
                        }
                    }
                }
                return Ok(out);
            }
        }
    }
    Ok(elements.into_iter().map(XPathValue::Element).collect())
}

fn require_terminal(step: &Step, is_last: bool, index: usize) -> Result<(), XPathError> {
    if !is_last {
        return Err(XPathError::semantic(format!(
            "step {} selects a leaf value and cannot be followed by further steps",
            index
        )));
    }
    if !step.predicates.is_empty() {
        return Err(XPathError::semantic(format!(
            "step {} does not support predicates on this selector kind",
            index
        )));
    }
    Ok(())
}

/// Applies each predicate in order, re-numbering `Index` positions
/// against the list as narrowed by the preceding predicate — the
/// usual XPath predicate-chaining contract.
fn apply_predicates(candidates: Vec<NodePtr>, predicates: &[Predicate], step_index: usize) -> Result<Vec<NodePtr>, XPathError> {
    let mut survivors = candidates;
    for predicate in predicates {
        survivors = apply_one(survivors, predicate, step_index)?;
    }
    Ok(survivors)
}

fn apply_one(candidates: Vec<NodePtr>, predicate: &Predicate, step_index: usize) -> Result<Vec<NodePtr>, XPathError> {
    match predicate {
        Predicate::Index(n) => {
            let pos = *n as usize;
            Ok(candidates.into_iter().nth(pos.saturating_sub(1)).into_iter().collect())
        }
        Predicate::Attribute { name, test } => {
            let mut out = Vec::new();
            for e in candidates {
                let value = match name {
                    Some(n) => e.attribute_value(n),
                    None => e.attributes().iter().next().map(|(_, v)| v.to_string()),
                };
                if satisfies(value, test, step_index)? {
                    out.push(e);
                }
            }
            Ok(out)
        }
        Predicate::Child { name, test } => {
            let mut out = Vec::new();
            for e in candidates {
                let child = e.first_child(Some(name));
                let value = child.as_ref().map(|c| c.text());
                if satisfies(value, test, step_index)? {
                    out.push(e);
                }
            }
            Ok(out)
        }
        Predicate::Text(test) => {
            let mut out = Vec::new();
            for e in candidates {
                let value = Some(e.text());
                if satisfies(value, &Some(test.clone()), step_index)? {
                    out.push(e);
                }
            }
            Ok(out)
        }
    }
}

fn satisfies(value: Option<String>, test: &Option<Comparison>, step_index: usize) -> Result<bool, XPathError> {
    let test = match test {
        None => return Ok(value.is_some()),
        Some(t) => t,
    };
    match test.op {
        CmpOp::Eq => Ok(value.as_deref() == Some(test.literal.as_str())),
        CmpOp::Ne => Ok(value.as_deref() != Some(test.literal.as_str())),
        CmpOp::Matches => Ok(regex_matches(&value, test, step_index)?),
        CmpOp::NotMatches => Ok(!regex_matches(&value, test, step_index)?),
    }
}

fn regex_matches(value: &Option<String>, test: &Comparison, step_index: usize) -> Result<bool, XPathError> {
    let value = match value {
        Some(v) => v,
        None => return Ok(false),
    };
    // 'b' (basic POSIX) is accepted and ignored: this engine has only
    // one regex flavour. Unknown flag letters are likewise tolerated.
    let case_insensitive = test.flags.contains('i');
    let re = RegexBuilder::new(&test.literal)
        .case_insensitive(case_insensitive)
        .build()
        .map_err(|e| {
            XPathError::new(
                XPathStatus::ESemantic,
                Some(step_index),
                format!("invalid regex '{}': {}", test.literal, e),
            )
        })?;
    Ok(re.is_match(value))
}
