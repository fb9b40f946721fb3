//
// error.rs
//
// paramatch: declarative data-matching and XML/XPath toolkit.
//

//!
//! Error taxonomies for the three layers of the crate: XML parsing/DOM,
//! the constrained XPath dialect, and matching-item loading.
//!
//! Each layer reports failures through an explicit enum rather than by
//! aborting; `XmlStatus::Incomplete` in particular is a normal, benign
//! return value from the resumable SAX parser, not an error in the
//! exceptional sense.
//!

use thiserror::Error;

/// Status/error code shared by the escape codec, the SAX parser, and
/// DOM mutation. Mirrors the taxonomy a telephony engine's XML layer
/// reports to callers, so that parser state machines and DOM
/// `add_child` calls can return the same vocabulary.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum XmlStatus {
    #[error("no error")]
    NoError,
    #[error("input not well formed")]
    NotWellFormed,
    #[error("unknown error")]
    Unknown,
    #[error("I/O error")]
    IoError,
    #[error("error parsing element")]
    ElementParse,
    #[error("error reading element name")]
    ReadElementName,
    #[error("invalid element name")]
    InvalidElementName,
    #[error("error reading attributes")]
    ReadingAttributes,
    #[error("error reading end tag")]
    ReadingEndTag,
    #[error("error parsing comment")]
    CommentParse,
    #[error("error parsing declaration")]
    DeclarationParse,
    #[error("error parsing DOCTYPE/definition")]
    DefinitionParse,
    #[error("error parsing CDATA section")]
    CDataParse,
    /// Benign: a production was partially seen. Feed more input and
    /// call `feed` again, or call `finish` if no more input is coming.
    #[error("incomplete input, feed more and retry")]
    Incomplete,
    #[error("invalid byte encoding")]
    InvalidEncoding,
    #[error("unsupported encoding")]
    UnsupportedEncoding,
    #[error("unsupported XML version")]
    UnsupportedVersion,
    #[error("requested parameter is absent")]
    ParamAbsent,
    #[error("requested parameter is empty")]
    ParamEmpty,
}

impl XmlStatus {
    /// True for codes that do not poison the parser: the caller can
    /// keep feeding input (`Incomplete`) or the document tree can keep
    /// being built (`NoError`).
    pub fn is_recoverable(&self) -> bool {
        matches!(self, XmlStatus::NoError | XmlStatus::Incomplete)
    }
}

/// Status code returned by the XPath parser/compiler.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum XPathStatus {
    #[error("no error")]
    NoError,
    #[error("empty path item")]
    EEmptyItem,
    #[error("syntax error")]
    ESyntax,
    #[error("semantic error")]
    ESemantic,
    #[error("value out of range")]
    ERange,
    #[error("path provably yields an empty result")]
    EEmptyResult,
    #[error("path has not been parsed yet")]
    NotParsed,
}

/// Error raised while compiling an XPath, carrying the offending step
/// index (0-based, `None` when the error precedes any step) alongside
/// a human-readable message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("xpath error at step {step:?}: {status} ({message})")]
pub struct XPathError {
    pub status: XPathStatus,
    pub step: Option<usize>,
    pub message: String,
}

impl XPathError {
    pub fn new(status: XPathStatus, step: Option<usize>, message: impl Into<String>) -> Self {
        XPathError {
            status,
            step,
            message: message.into(),
        }
    }

    pub fn syntax(message: impl Into<String>) -> Self {
        Self::new(XPathStatus::ESyntax, None, message)
    }

    pub fn semantic(message: impl Into<String>) -> Self {
        Self::new(XPathStatus::ESemantic, None, message)
    }

    pub fn range(message: impl Into<String>) -> Self {
        Self::new(XPathStatus::ERange, None, message)
    }

    pub fn empty_result(message: impl Into<String>) -> Self {
        Self::new(XPathStatus::EEmptyResult, None, message)
    }
}

/// Failure raised while loading a matching-item tree from a parameter
/// map or XML fragment. `fatal` distinguishes a hard failure (the
/// whole load aborts) from one that, under `LoadFlags::IGNORE_FAILED`,
/// only causes the offending sub-item to be skipped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct LoadError {
    pub message: String,
    pub fatal: bool,
}

impl LoadError {
    pub fn fatal(message: impl Into<String>) -> Self {
        LoadError {
            message: message.into(),
            fatal: true,
        }
    }

    pub fn recoverable(message: impl Into<String>) -> Self {
        LoadError {
            message: message.into(),
            fatal: false,
        }
    }
}

/// Result of `escape::unescape`: whether at least one entity/character
/// reference was replaced, paired with the error path.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EscapeError {
    #[error("unterminated entity reference")]
    Unterminated,
    #[error("nested '&' before terminating ';'")]
    NestedAmpersand,
    #[error("unknown entity reference '&{0};'")]
    UnknownEntity(String),
    #[error("numeric character reference out of range: {0}")]
    OutOfRange(String),
    #[error("invalid numeric character reference: {0}")]
    InvalidNumeric(String),
}
