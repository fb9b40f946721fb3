//
// xpath/ast.rs
//
// paramatch: declarative data-matching and XML/XPath toolkit.
//

//!
//! The compiled form of a path: an ordered list of steps, each with a
//! selector and up to `MAX_PREDICATES` predicates.
//!

/// Hard cap on predicates per step, matching the constrained dialect's
/// "up to N predicates" contract.
pub const MAX_PREDICATES: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepKind {
    /// `Name` or `*`: select child elements, `None` is the wildcard.
    Element(Option<String>),
    /// `@Name` or `@*`.
    Attribute(Option<String>),
    /// `text()`: the step element's own first text child.
    Text,
    /// `child::text()`: iterate text children of each element child.
    ChildText,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Matches,
    NotMatches,
}

/// A bracketed filter on a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// `[n]`: 1-based positional filter.
    Index(u32),
    /// `[@Name]` or `[@Name op lit]` or `[@* ...]`.
    Attribute { name: Option<String>, test: Option<Comparison> },
    /// `[Name]` or `[Name op lit]`: child element presence or its
    /// first text child compared against `lit`.
    Child { name: String, test: Option<Comparison> },
    /// `[text() op lit]`.
    Text(Comparison),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comparison {
    pub op: CmpOp,
    /// The right-hand literal for `Eq`/`Ne`, or the regex source for
    /// `Matches`/`NotMatches`.
    pub literal: String,
    /// Regex flags (`i`, `b`), only meaningful for `Matches`/`NotMatches`.
    pub flags: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub kind: StepKind,
    pub predicates: Vec<Predicate>,
}

/// An immutable compiled path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XPath {
    pub absolute: bool,
    pub steps: Vec<Step>,
}
