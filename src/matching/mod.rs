//
// matching/mod.rs
//
// paramatch: declarative data-matching and XML/XPath toolkit.
//

//!
//! A composable, serialisable predicate tree used as a runtime filter
//! over parameter maps. Leaf matchers are string equality, regex,
//! XPath (optionally applied to an XML-valued parameter), a
//! pseudo-random matcher, and user-registered custom matchers; an
//! internal node is an AND/OR list. Every node carries a `negated` bit
//! and a `missing_match` policy.
//!

mod context;
mod dump;
mod load;
mod optimize;
pub mod registry;

pub use context::MatchContext;
pub use dump::{dump_params, dump_text, dump_xml, DumpFlags, DumpOptions};
pub use load::{load_from_params, load_from_xml, load_from_xml_string, LoadFlags};
pub use optimize::optimize;

/// Failure raised while loading a matching-item tree; re-exported here
/// under the name callers of this module actually reach for.
pub use crate::error::LoadError as ItemLoadError;

use crate::dom::NodePtr;
use crate::error::LoadError;
use crate::param::ParamMap;
use once_cell::sync::OnceCell;
use rand::Rng;
use regex::Regex;
use std::rc::Rc;

/// Per-item policy for an absent named parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingMatch {
    /// Evaluate as if the parameter's value were the empty string.
    #[default]
    RunMatch,
    /// Short-circuit to "matched".
    Match,
    /// Short-circuit to "did not match".
    NoMatch,
}

/// A compiled regular expression, built lazily from its source text
/// the first time it is needed and then reused for the lifetime of
/// the tree.
#[derive(Debug, Default)]
pub struct LazyRegex {
    source: String,
    case_insensitive: bool,
    compiled: OnceCell<Regex>,
}

impl LazyRegex {
    pub fn new(source: impl Into<String>, case_insensitive: bool) -> Self {
        LazyRegex { source: source.into(), case_insensitive, compiled: OnceCell::new() }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    fn get(&self) -> Result<&Regex, regex::Error> {
        self.compiled.get_or_try_init(|| {
            regex::RegexBuilder::new(&self.source).case_insensitive(self.case_insensitive).build()
        })
    }

    pub fn is_match(&self, text: &str) -> bool {
        match self.get() {
            Ok(re) => re.is_match(text),
            Err(_) => false,
        }
    }
}

impl Clone for LazyRegex {
    fn clone(&self) -> Self {
        LazyRegex::new(self.source.clone(), self.case_insensitive)
    }
}
impl PartialEq for LazyRegex {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source && self.case_insensitive == other.case_insensitive
    }
}

/// A lazily-compiled XPath, analogous to `LazyRegex`.
#[derive(Debug, Default)]
pub struct LazyXPath {
    source: String,
    compiled: OnceCell<Option<crate::xpath::XPath>>,
}

impl LazyXPath {
    pub fn new(source: impl Into<String>) -> Self {
        LazyXPath { source: source.into(), compiled: OnceCell::new() }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    fn get(&self) -> Option<&crate::xpath::XPath> {
        self.compiled
            .get_or_init(|| crate::xpath::XPath::compile(&self.source).ok())
            .as_ref()
    }
}

impl Clone for LazyXPath {
    fn clone(&self) -> Self {
        LazyXPath::new(self.source.clone())
    }
}
impl PartialEq for LazyXPath {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

/// The variant payload of a matching-item node.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemKind {
    String { name: String, value: String, case_insensitive: bool },
    /// `basic` records whether the item was loaded with the
    /// basic-POSIX flag; this engine has only one regex flavour
    /// (`regex::Regex`), so the bit is carried through load/dump for
    /// round-tripping but never changes match behaviour.
    Regexp { name: String, regex: LazyRegex, basic: bool },
    XPath { name: String, path: LazyXPath, inner: Option<Box<MatchingItem>> },
    /// Matches iff `val > uniform(0, max-1)`; `val == 0` never
    /// matches, `val >= max` always matches. `name` is carried only so
    /// a `random` item round-trips through load/dump with the same
    /// `name=...` shape as every other leaf; matching never reads it.
    Random { name: String, val: u32, max: u32 },
    /// `match_all == true` is AND, `false` is OR. An empty list never
    /// matches either way. `name` is likewise round-trip-only.
    List { name: String, match_all: bool, items: Vec<MatchingItem> },
    Custom { type_tag: String, name: Option<String>, payload: String },
}

/// One node in a matching-item tree.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchingItem {
    pub id: Option<String>,
    pub negated: bool,
    pub missing_match: MissingMatch,
    pub kind: ItemKind,
}

impl MatchingItem {
    pub fn new(kind: ItemKind) -> Self {
        MatchingItem { id: None, negated: false, missing_match: MissingMatch::default(), kind }
    }

    pub fn negated(mut self, negated: bool) -> Self {
        self.negated = negated;
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_missing_match(mut self, policy: MissingMatch) -> Self {
        self.missing_match = policy;
        self
    }

    /// Evaluates this tree against `params`. Returns the matched node:
    /// itself for a matching leaf or AND-list, or the specific
    /// matched descendant for an OR-list — `None` if nothing matched.
    pub fn eval_match<'a>(&'a self, params: &mut ParamMap, ctx: &MatchContext) -> Option<&'a MatchingItem> {
        let (raw, matched) = self.raw_match(params, ctx);
        let public = raw ^ self.negated;
        ctx.trace(|| format!("matching-item {:?} (negated={}) -> {}", self.id, self.negated, public));
        if public {
            Some(matched.unwrap_or(self))
        } else {
            None
        }
    }

    /// Convenience for matching against a single scalar value instead
    /// of a full parameter map; builds a one-entry map internally.
    pub fn eval_match_string<'a>(&'a self, value: &str, ctx: &MatchContext) -> Option<&'a MatchingItem> {
        let name = self.lookup_name().unwrap_or("");
        let mut params = ParamMap::new();
        params.add(name, value);
        self.eval_match(&mut params, ctx)
    }

    /// As `eval_match_string`, but the value itself may be absent —
    /// goes through the `missing_match` policy rather than comparing
    /// against an empty-string stand-in directly.
    pub fn eval_match_string_opt<'a>(&'a self, value: Option<&str>, ctx: &MatchContext) -> Option<&'a MatchingItem> {
        let mut params = ParamMap::new();
        if let Some(v) = value {
            let name = self.lookup_name().unwrap_or("");
            params.add(name, v);
        }
        self.eval_match(&mut params, ctx)
    }

    fn lookup_name(&self) -> Option<&str> {
        match &self.kind {
            ItemKind::String { name, .. } => Some(name),
            ItemKind::Regexp { name, .. } => Some(name),
            ItemKind::XPath { name, .. } => Some(name),
            ItemKind::Custom { name, .. } => name.as_deref(),
            ItemKind::Random { .. } | ItemKind::List { .. } => None,
            // Random/List carry a `name` field for dump fidelity only;
            // neither is looked up by name during matching.
        }
    }

    /// Computes the pre-negation truth value, plus (for an OR-list)
    /// the specific child that matched.
    fn raw_match<'a>(&'a self, params: &mut ParamMap, ctx: &MatchContext) -> (bool, Option<&'a MatchingItem>) {
        match &self.kind {
            ItemKind::String { name, value, case_insensitive } => {
                let raw = with_param_value(params, name, self.missing_match, |v| {
                    if *case_insensitive {
                        v.eq_ignore_ascii_case(value)
                    } else {
                        v == value
                    }
                });
                (raw, None)
            }
            ItemKind::Regexp { name, regex, basic: _ } => {
                let raw = with_param_value(params, name, self.missing_match, |v| regex.is_match(v));
                (raw, None)
            }
            ItemKind::Random { val, max, .. } => (raw_random(*val, *max), None),
            ItemKind::XPath { name, path, inner } => {
                let raw = eval_xpath_item(name, path, inner.as_deref(), self.missing_match, params, ctx);
                (raw, None)
            }
            ItemKind::Custom { type_tag, name, payload } => {
                let raw = match registry::lookup(type_tag) {
                    Some(factory) => factory.match_params(payload, name.as_deref(), params),
                    None => false,
                };
                (raw, None)
            }
            ItemKind::List { match_all, items, .. } => eval_list(*match_all, items, params, ctx),
        }
    }
}

fn with_param_value(params: &ParamMap, name: &str, policy: MissingMatch, test: impl Fn(&str) -> bool) -> bool {
    match params.get(name) {
        Some(v) => test(v),
        None => match policy {
            MissingMatch::Match => true,
            MissingMatch::NoMatch => false,
            MissingMatch::RunMatch => test(""),
        },
    }
}

fn raw_random(val: u32, max: u32) -> bool {
    if val == 0 {
        return false;
    }
    if max == 0 || val >= max {
        return true;
    }
    // max >= 2 here (val == 0 and val >= max are already handled above),
    // so max - 1 >= 1 and the range below is non-empty.
    let draw = rand::rng().random_range(0..max - 1);
    val > draw
}

fn eval_xpath_item(
    name: &str,
    path: &LazyXPath,
    inner: Option<&MatchingItem>,
    policy: MissingMatch,
    params: &mut ParamMap,
    ctx: &MatchContext,
) -> bool {
    let xml = match params.get(name) {
        Some(v) => v.to_string(),
        None => {
            return match policy {
                MissingMatch::Match => true,
                MissingMatch::NoMatch => false,
                MissingMatch::RunMatch => false,
            };
        }
    };
    let doc = match cached_or_parsed_dom(params, name, &xml) {
        Some(doc) => doc,
        None => return false,
    };
    let compiled = match path.get() {
        Some(p) => p,
        None => return false,
    };
    let root = match doc.root_element() {
        Some(r) => r,
        None => return false,
    };
    let results = match compiled.evaluate(&root) {
        Ok(r) => r,
        Err(_) => return false,
    };
    match inner {
        None => !results.is_empty(),
        Some(inner) => {
            let text = results.iter().find_map(|v| match v {
                crate::xpath::XPathValue::Text(s) => Some(s.clone()),
                crate::xpath::XPathValue::Element(e) => Some(e.text()),
                crate::xpath::XPathValue::Attribute(_, v) => Some(v.clone()),
            });
            inner.eval_match_string_opt(text.as_deref(), ctx).is_some()
        }
    }
}

/// Parses `xml` into a DOM the first time a given parameter is read
/// by an XPath item in this pass, caching it on the parameter's
/// payload slot so sibling XPath items reading the same parameter
/// reuse the parse.
fn cached_or_parsed_dom(params: &mut ParamMap, name: &str, xml: &str) -> Option<NodePtr> {
    if let Some(param) = params.get_mut(name) {
        if let Some(cached) = param.payload().and_then(|p| p.downcast_ref::<Rc<NodePtr>>()) {
            return Some((**cached).clone());
        }
    }
    let doc = crate::dom::new_document(xml).ok()?;
    let doc = Rc::new(doc);
    if let Some(param) = params.get_mut(name) {
        param.set_payload(Box::new(doc.clone()));
    }
    Some((*doc).clone())
}

fn eval_list<'a>(match_all: bool, items: &'a [MatchingItem], params: &mut ParamMap, ctx: &MatchContext) -> (bool, Option<&'a MatchingItem>) {
    if items.is_empty() {
        return (false, None);
    }
    if match_all {
        for item in items {
            if item.eval_match(params, ctx).is_none() {
                return (false, None);
            }
        }
        (true, None)
    } else {
        for item in items {
            if let Some(matched) = item.eval_match(params, ctx) {
                return (true, Some(matched));
            }
        }
        (false, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_s5_list_match_all() {
        let list = MatchingItem::new(ItemKind::List {
            name: String::new(),
            match_all: true,
            items: vec![
                MatchingItem::new(ItemKind::String { name: "user".to_string(), value: "alice".to_string(), case_insensitive: false }),
                MatchingItem::new(ItemKind::Regexp { name: "ip".to_string(), regex: LazyRegex::new(r"^10\.", false), basic: false }),
            ],
        });
        let ctx = MatchContext::new();

        let mut ok = ParamMap::new();
        ok.add("user", "alice").add("ip", "10.0.0.1");
        assert!(list.eval_match(&mut ok, &ctx).is_some());

        let mut bad = ParamMap::new();
        bad.add("user", "alice").add("ip", "192.168.0.1");
        assert!(list.eval_match(&mut bad, &ctx).is_none());
    }

    #[test]
    fn scenario_s6_xpath_with_inner_regex() {
        let inner = MatchingItem::new(ItemKind::Regexp {
            name: String::new(),
            regex: LazyRegex::new("^support@", false),
            basic: false,
        });
        let item = MatchingItem::new(ItemKind::XPath {
            name: "body".to_string(),
            path: LazyXPath::new("/msg/to/text()"),
            inner: Some(Box::new(inner)),
        });
        let mut params = ParamMap::new();
        params.add("body", "<msg><to>support@x.example</to></msg>");
        let ctx = MatchContext::new();
        assert!(item.eval_match(&mut params, &ctx).is_some());
    }

    #[test]
    fn negation_flips_the_result() {
        let item = MatchingItem::new(ItemKind::String { name: "a".to_string(), value: "1".to_string(), case_insensitive: false });
        let negated = item.clone().negated(true);
        let ctx = MatchContext::new();

        let mut params = ParamMap::new();
        params.add("a", "1");
        assert!(item.eval_match(&mut params, &ctx).is_some());
        assert!(negated.eval_match(&mut params.clone(), &ctx).is_none());
    }

    #[test]
    fn missing_parameter_policy() {
        let ctx = MatchContext::new();
        let mut empty = ParamMap::new();

        let run_match = MatchingItem::new(ItemKind::String { name: "k".to_string(), value: String::new(), case_insensitive: false })
            .with_missing_match(MissingMatch::RunMatch);
        assert!(run_match.eval_match(&mut empty, &ctx).is_some());

        let always = MatchingItem::new(ItemKind::String { name: "k".to_string(), value: "x".to_string(), case_insensitive: false })
            .with_missing_match(MissingMatch::Match);
        assert!(always.eval_match(&mut empty, &ctx).is_some());

        let never = MatchingItem::new(ItemKind::String { name: "k".to_string(), value: "x".to_string(), case_insensitive: false })
            .with_missing_match(MissingMatch::NoMatch);
        assert!(never.eval_match(&mut empty, &ctx).is_none());
    }

    #[test]
    fn random_boundary_cases() {
        assert!(!raw_random(0, 10));
        assert!(raw_random(10, 10));
        assert!(raw_random(100, 10));
    }
}
