//
// xpath/mod.rs
//
// paramatch: declarative data-matching and XML/XPath toolkit.
//

//!
//! A parser and evaluator for a constrained dialect of XPath over the
//! DOM: steps may select elements, attributes, or text, and each step
//! carries up to `MAX_PREDICATES` predicates that test position,
//! attribute presence/value, child presence/text, or `text()`, with
//! equality, inequality, and regex match/not-match.
//!

mod ast;
mod eval;
mod lexer;
mod parser;

pub use ast::{CmpOp, Comparison, Predicate, Step, StepKind, MAX_PREDICATES};
pub use eval::XPathValue;

use crate::dom::NodePtr;
use crate::error::{XPathError, XPathStatus};

/// Construction-time behaviour switches for `XPath::compile_with_flags`.
///
/// - `late_parse`: build the `XPath` without parsing `path` yet; the
///   caller must call `parse` before `evaluate` (status stays
///   `NotParsed` until then).
/// - `strict_parse`: reject any whitespace outside a quoted literal —
///   the grammar never requires it, so under this flag its presence is
///   treated as a syntax error rather than silently skipped.
/// - `ignore_empty_result`: tolerate a step whose selector provably
///   yields a leaf value (attribute/text) being followed by further
///   steps, deferring the failure to evaluation time (`ESemantic`)
///   instead of rejecting it at parse time with `EEmptyResult`.
/// - `no_xml_name_check`: accepted for API parity with the original
///   dialect; every `Name` token the lexer can produce is already a
///   valid XML name by construction, so this flag changes nothing here.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParseFlags {
    pub late_parse: bool,
    pub strict_parse: bool,
    pub ignore_empty_result: bool,
    pub no_xml_name_check: bool,
}

/// An immutable, compiled path. Compilation happens once; the result
/// can be evaluated against any number of DOM trees.
#[derive(Debug, Clone)]
pub struct XPath {
    source: String,
    ast: Option<ast::XPath>,
    status: XPathStatus,
    flags: ParseFlags,
}

impl XPath {
    /// Parses `path` with default flags (eager parse, empty-result
    /// forms deferred to evaluation). On success `status()` is `NoError`.
    pub fn compile(path: &str) -> Result<XPath, XPathError> {
        Self::compile_with_flags(path, ParseFlags { ignore_empty_result: true, ..ParseFlags::default() })
    }

    /// Parses `path` honouring the given `ParseFlags`. With
    /// `late_parse` set, parsing is deferred: the returned `XPath` has
    /// `status() == NotParsed` and `evaluate` will fail until `parse`
    /// is called explicitly.
    pub fn compile_with_flags(path: &str, flags: ParseFlags) -> Result<XPath, XPathError> {
        let mut xpath = XPath { source: path.to_string(), ast: None, status: XPathStatus::NotParsed, flags };
        if !flags.late_parse {
            xpath.parse()?;
        }
        Ok(xpath)
    }

    /// Parses the stored source now (a no-op if already parsed).
    /// Required before `evaluate` when the path was built with
    /// `late_parse`.
    pub fn parse(&mut self) -> Result<(), XPathError> {
        if self.ast.is_some() {
            return Ok(());
        }
        if self.flags.strict_parse {
            reject_stray_whitespace(&self.source)?;
        }
        let ast = parser::parse(&self.source)?;
        if !self.flags.ignore_empty_result {
            check_no_provably_empty_steps(&ast)?;
        }
        self.ast = Some(ast);
        self.status = XPathStatus::NoError;
        Ok(())
    }

    pub fn status(&self) -> XPathStatus {
        self.status
    }

    pub fn is_absolute(&self) -> bool {
        self.ast.as_ref().map_or(false, |a| a.absolute)
    }

    pub fn steps(&self) -> &[Step] {
        self.ast.as_ref().map_or(&[], |a| a.steps.as_slice())
    }

    /// Evaluates the path against `start`, collecting elements,
    /// attribute pairs, or text depending on the terminal step. Fails
    /// with `XPathStatus::NotParsed` if built with `late_parse` and
    /// never explicitly `parse`d.
    pub fn evaluate(&self, start: &NodePtr) -> Result<Vec<XPathValue>, XPathError> {
        let ast = self
            .ast
            .as_ref()
            .ok_or_else(|| XPathError::new(XPathStatus::NotParsed, None, "path has not been parsed yet"))?;
        eval::evaluate(ast, start)
    }
}

/// A step selector kind that can never be followed by another step: it
/// only ever yields a leaf value, so any further step would provably
/// match nothing.
fn is_leaf_selector(kind: &StepKind) -> bool {
    matches!(kind, StepKind::Attribute(_) | StepKind::Text | StepKind::ChildText)
}

fn check_no_provably_empty_steps(ast: &ast::XPath) -> Result<(), XPathError> {
    let last = ast.steps.len().saturating_sub(1);
    for (index, step) in ast.steps.iter().enumerate() {
        if index != last && is_leaf_selector(&step.kind) {
            return Err(XPathError::empty_result(format!(
                "step {} selects a leaf value and cannot be followed by further steps",
                index
            )));
        }
    }
    Ok(())
}

/// Rejects a path containing whitespace outside a quoted string
/// literal: the grammar never requires it, so under `strict_parse` its
/// mere presence is a syntax error.
fn reject_stray_whitespace(path: &str) -> Result<(), XPathError> {
    let mut in_quote: Option<char> = None;
    for c in path.chars() {
        match in_quote {
            Some(q) if c == q => in_quote = None,
            Some(_) => {}
            None if c == '\'' || c == '"' => in_quote = Some(c),
            None if c.is_whitespace() => {
                return Err(XPathError::syntax("whitespace is not permitted under strict parsing"));
            }
            None => {}
        }
    }
    Ok(())
}

/// Convenience one-shot: compiles `path` and evaluates it against
/// `start`.
pub fn select(path: &str, start: &NodePtr) -> Result<Vec<XPathValue>, XPathError> {
    XPath::compile(path)?.evaluate(start)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom;

    #[test]
    fn scenario_s3_attribute_equality_and_positional_attribute() {
        let doc = dom::new_document(r#"<r><a x="1"/><a x="2"/><a x="3"/></r>"#).unwrap();
        let root = doc.root_element().unwrap();

        let matches = select(r#"/r/a[@x="2"]"#, &root).unwrap();
        assert_eq!(matches.len(), 1);
        match &matches[0] {
            XPathValue::Element(e) => assert_eq!(e.attribute_value("x").as_deref(), Some("2")),
            _ => panic!("expected an element"),
        }

        let attr = select(r#"/r/a[1]/@x"#, &root).unwrap();
        assert_eq!(attr, vec![XPathValue::Attribute("x".to_string(), "1".to_string())]);
    }

    #[test]
    fn scenario_s4_regex_match_on_text() {
        let doc = dom::new_document("<r><v>foo</v><v>bar</v><v>fog</v></r>").unwrap();
        let root = doc.root_element().unwrap();
        let matches = select(r#"/r/v[matches(text(),"^fo","")]"#, &root).unwrap();
        assert_eq!(matches.len(), 2);
    }

    #[test]
    fn scenario_s5_positional_predicate_exact_bounds() {
        let doc = dom::new_document("<a><b/><b/></a>").unwrap();
        let root = doc.root_element().unwrap();
        assert_eq!(select("/a/b[1]", &root).unwrap().len(), 1);
        assert_eq!(select("/a/b[2]", &root).unwrap().len(), 1);
        assert_eq!(select("/a/b[3]", &root).unwrap().len(), 0);
    }

    #[test]
    fn rejects_step_after_a_leaf_selector() {
        let err = XPath::compile("/a/@x/b");
        // Parses fine syntactically; the semantic rejection only
        // happens on evaluation, where the leaf-selector position is known.
        assert!(err.is_ok());
        let doc = dom::new_document("<a x=\"1\"><b/></a>").unwrap();
        let root = doc.root_element().unwrap();
        let compiled = XPath::compile("/a/@x/b").unwrap();
        let result = compiled.evaluate(&root);
        assert_eq!(result.unwrap_err().status, XPathStatus::ESemantic);
    }

    #[test]
    fn default_flags_reject_provably_empty_path_at_parse_time() {
        let err = XPath::compile_with_flags("/a/@x/b", ParseFlags::default()).unwrap_err();
        assert_eq!(err.status, XPathStatus::EEmptyResult);
    }

    #[test]
    fn late_parse_defers_until_explicit_parse_call() {
        let mut xpath = XPath::compile_with_flags(
            "/a/b",
            ParseFlags { late_parse: true, ..ParseFlags::default() },
        )
        .unwrap();
        assert_eq!(xpath.status(), XPathStatus::NotParsed);
        let doc = dom::new_document("<a><b/></a>").unwrap();
        let root = doc.root_element().unwrap();
        assert_eq!(xpath.evaluate(&root).unwrap_err().status, XPathStatus::NotParsed);
        xpath.parse().unwrap();
        assert_eq!(xpath.status(), XPathStatus::NoError);
        assert_eq!(xpath.evaluate(&root).unwrap().len(), 1);
    }

    #[test]
    fn strict_parse_rejects_stray_whitespace() {
        let err = XPath::compile_with_flags(
            "/a/ b",
            ParseFlags { strict_parse: true, ignore_empty_result: true, ..ParseFlags::default() },
        )
        .unwrap_err();
        assert_eq!(err.status, XPathStatus::ESyntax);
    }
}
