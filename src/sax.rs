//
// sax.rs
//
// paramatch: declarative data-matching and XML/XPath toolkit.
//

//!
//! A resumable, pull-fed SAX tokeniser for a subset of XML 1.0.
//!
//! `SaxParser` is driven by repeated calls to `feed`, which appends
//! bytes to an internal buffer and consumes as many complete
//! productions from it as possible, invoking `SaxHandler` callbacks
//! for each. `feed` returns `XmlStatus::Incomplete` when a production
//! was only partially seen (the parser remembers where it was and
//! picks up on the next call) and `XmlStatus::NoError` when everything
//! buffered so far has been consumed up to a clean boundary. Any other
//! status is a hard error: the parser becomes unusable until `reset`.
//!
//! Because `feed` never commits to a lexical decision until its
//! terminator has actually been seen in the buffer, splitting an input
//! at an arbitrary byte offset and feeding the two halves in sequence
//! produces exactly the same event sequence as feeding it in one call
//! (followed by `finish`).
//!

use crate::error::XmlStatus;
use crate::escape;
use log::{debug, warn};

/// Event sink for a `SaxParser`. All methods have a no-op default so a
/// handler only needs to override what it cares about.
pub trait SaxHandler {
    fn on_declaration(&mut self, _attrs: &[(String, String)]) {}
    fn on_processing_instruction(&mut self, _target: &str, _data: &str) {}
    fn on_doctype(&mut self, _text: &str) {}
    fn on_element_start(&mut self, _name: &str, _attrs: &[(String, String)], _empty: bool) {}
    fn on_element_end(&mut self, _name: &str) {}
    fn on_text(&mut self, _text: &str) {}
    fn on_cdata(&mut self, _data: &str) {}
    fn on_comment(&mut self, _text: &str) {}
}

/// "Last unparsed kind": which sub-parser a resumed `feed` call must
/// dispatch to.
#[derive(Debug, Clone, PartialEq, Eq)]
enum SaxState {
    Text,
    AfterLt,
    ElementStart,
    ElementEnd,
    Comment,
    CData,
    Declaration,
    ProcessingInstruction { target: String },
    Doctype { depth: u32 },
    Error,
}

enum StepResult {
    Progress,
    NeedMore,
    Error(XmlStatus),
}

/// Row/column/offset position for error reporting, updated as bytes
/// are consumed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Position {
    pub offset: usize,
    pub row: usize,
    pub col: usize,
}

pub struct SaxParser<H: SaxHandler> {
    handler: H,
    byte_tail: Vec<u8>,
    text: String,
    pos: usize,
    state: SaxState,
    pending_text: String,
    declaration_seen: bool,
    element_stack: Vec<String>,
    position: Position,
    error: Option<XmlStatus>,
}

impl<H: SaxHandler> SaxParser<H> {
    pub fn new(handler: H) -> Self {
        SaxParser {
            handler,
            byte_tail: Vec::new(),
            text: String::new(),
            pos: 0,
            state: SaxState::Text,
            pending_text: String::new(),
            declaration_seen: false,
            element_stack: Vec::new(),
            position: Position::default(),
            error: None,
        }
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    pub fn position(&self) -> Position {
        self.position
    }

    /// Restores the parser to its initial state, as if newly
    /// constructed, including after a sticky hard error.
    pub fn reset(&mut self) {
        self.byte_tail.clear();
        self.text.clear();
        self.pos = 0;
        self.state = SaxState::Text;
        self.pending_text.clear();
        self.declaration_seen = false;
        self.element_stack.clear();
        self.position = Position::default();
        self.error = None;
    }

    /// Appends `bytes` to the internal buffer and consumes as many
    /// complete productions as possible.
    pub fn feed(&mut self, bytes: &[u8]) -> XmlStatus {
        if let Some(err) = self.error {
            return err;
        }
        self.byte_tail.extend_from_slice(bytes);
        if let Err(status) = self.drain_valid_utf8() {
            self.error = Some(status);
            self.state = SaxState::Error;
            return status;
        }

        loop {
            match self.step() {
                StepResult::Progress => continue,
                StepResult::NeedMore => break,
                StepResult::Error(status) => {
                    self.error = Some(status);
                    self.state = SaxState::Error;
                    return status;
                }
            }
        }
        self.compact();

        if self.state == SaxState::Text && self.pos >= self.text.len() {
            XmlStatus::NoError
        } else {
            XmlStatus::Incomplete
        }
    }

    /// Flushes a final pending text chunk (if the caller has no more
    /// input) and reports whether the document looks well-formed at
    /// the top level (no elements left open).
    pub fn finish(&mut self) -> XmlStatus {
        if let Some(err) = self.error {
            return err;
        }
        if self.state != SaxState::Text {
            let status = XmlStatus::NotWellFormed;
            self.error = Some(status);
            self.state = SaxState::Error;
            return status;
        }
        if let Err(status) = self.flush_pending_text() {
            self.error = Some(status);
            self.state = SaxState::Error;
            return status;
        }
        if !self.element_stack.is_empty() {
            let status = XmlStatus::NotWellFormed;
            self.error = Some(status);
            self.state = SaxState::Error;
            return status;
        }
        XmlStatus::NoError
    }

    fn drain_valid_utf8(&mut self) -> Result<(), XmlStatus> {
        if self.byte_tail.is_empty() {
            return Ok(());
        }
        match std::str::from_utf8(&self.byte_tail) {
            Ok(s) => {
                self.text.push_str(s);
                self.byte_tail.clear();
                Ok(())
            }
            Err(e) => {
                let valid_len = e.valid_up_to();
                if valid_len > 0 {
                    let s = std::str::from_utf8(&self.byte_tail[..valid_len]).unwrap().to_string();
                    self.text.push_str(&s);
                    self.byte_tail.drain(..valid_len);
                }
                match e.error_len() {
                    None => Ok(()), // incomplete trailing sequence: wait for more bytes
                    Some(_) => Err(XmlStatus::InvalidEncoding),
                }
            }
        }
    }

    fn compact(&mut self) {
        if self.pos > 0 && self.pos * 2 > self.text.len() {
            self.text.drain(..self.pos);
            self.pos = 0;
        }
    }

    /// Copy of the buffered-but-unconsumed input. Owned rather than
    /// borrowed so that callers can freely mutate `self` (advance the
    /// cursor, change state) while still holding slices into it.
    fn rest(&self) -> String {
        self.text[self.pos..].to_string()
    }

    fn advance_to(&mut self, new_pos: usize) {
        for c in self.text[self.pos..new_pos].chars() {
            if c == '\n' {
                self.position.row += 1;
                self.position.col = 0;
            } else {
                self.position.col += 1;
            }
        }
        self.position.offset += new_pos - self.pos;
        self.pos = new_pos;
    }

    /// Decodes and emits the raw text accumulated in `pending_text`.
    /// Decoding is deferred to this single point (rather than done
    /// incrementally per `feed` chunk) so that an entity reference
    /// split across two `feed` calls (e.g. `"&am"` then `"p;"`) is
    /// decoded whole instead of being mangled at the chunk boundary.
    fn flush_pending_text(&mut self) -> Result<(), XmlStatus> {
        if self.pending_text.is_empty() {
            return Ok(());
        }
        let raw = std::mem::take(&mut self.pending_text);
        let (decoded, _) = escape::unescape_str(&raw).map_err(|_| XmlStatus::NotWellFormed)?;
        self.handler.on_text(&decoded);
        Ok(())
    }

    fn step(&mut self) -> StepResult {
        match std::mem::replace(&mut self.state, SaxState::Text) {
            SaxState::Text => self.step_text(),
            SaxState::AfterLt => self.step_after_lt(),
            SaxState::ElementStart => self.step_element_start(),
            SaxState::ElementEnd => self.step_element_end(),
            SaxState::Comment => self.step_comment(),
            SaxState::CData => self.step_cdata(),
            SaxState::Declaration => self.step_declaration(),
            SaxState::ProcessingInstruction { target } => self.step_pi(target),
            SaxState::Doctype { depth } => self.step_doctype(depth),
            SaxState::Error => StepResult::Error(XmlStatus::Unknown),
        }
    }

    fn step_text(&mut self) -> StepResult {
        let rest = self.rest();
        match rest.find('<') {
            Some(k) => {
                let chunk_end = self.pos + k;
                let raw = &rest[..k];
                if raw.contains('>') {
                    self.state = SaxState::Text;
                    return StepResult::Error(XmlStatus::NotWellFormed);
                }
                self.pending_text.push_str(raw);
                self.advance_to(chunk_end);
                if let Err(status) = self.flush_pending_text() {
                    self.state = SaxState::Text;
                    return StepResult::Error(status);
                }
                self.advance_to(self.pos + 1); // consume '<'
                self.state = SaxState::AfterLt;
                StepResult::Progress
            }
            None => {
                if rest.contains('>') {
                    return StepResult::Error(XmlStatus::NotWellFormed);
                }
                let end = self.pos + rest.len();
                self.pending_text.push_str(&rest);
                self.advance_to(end);
                self.state = SaxState::Text;
                StepResult::NeedMore
            }
        }
    }

    fn step_after_lt(&mut self) -> StepResult {
        let rest = self.rest();
        let Some(first) = rest.chars().next() else {
            self.state = SaxState::AfterLt;
            return StepResult::NeedMore;
        };
        match first {
            '?' => {
                let after = &rest[1..];
                match read_name_prefix(after) {
                    NamePrefix::Complete(name, len) => {
                        self.advance_to(self.pos + 1 + len);
                        if name == "xml" {
                            self.state = SaxState::Declaration;
                        } else if name.len() >= 3 && name[..3].eq_ignore_ascii_case("xml") {
                            return StepResult::Error(XmlStatus::DeclarationParse);
                        } else {
                            self.state = SaxState::ProcessingInstruction { target: name };
                        }
                        StepResult::Progress
                    }
                    NamePrefix::NeedMore => {
                        self.state = SaxState::AfterLt;
                        StepResult::NeedMore
                    }
                    NamePrefix::Invalid => StepResult::Error(XmlStatus::InvalidElementName),
                }
            }
            '/' => {
                self.advance_to(self.pos + 1);
                self.state = SaxState::ElementEnd;
                StepResult::Progress
            }
            '!' => {
                if rest.len() < 2 {
                    self.state = SaxState::AfterLt;
                    return StepResult::NeedMore;
                }
                if rest.starts_with("!--") {
                    self.advance_to(self.pos + 3);
                    self.state = SaxState::Comment;
                    StepResult::Progress
                } else if rest.starts_with("![CDATA[") {
                    self.advance_to(self.pos + "![CDATA[".len());
                    self.state = SaxState::CData;
                    StepResult::Progress
                } else if "![CDATA[".starts_with(rest.as_str()) || "!--".starts_with(rest.as_str()) {
                    self.state = SaxState::AfterLt;
                    StepResult::NeedMore
                } else if rest.len() >= 9 && rest[1..].starts_with("DOCTYPE") {
                    self.advance_to(self.pos + 8);
                    self.state = SaxState::Doctype { depth: 0 };
                    StepResult::Progress
                } else if "!DOCTYPE".starts_with(&rest[..rest.len().min(8)]) {
                    self.state = SaxState::AfterLt;
                    StepResult::NeedMore
                } else {
                    StepResult::Error(XmlStatus::DefinitionParse)
                }
            }
            c if escape::is_name_start_char(c) => {
                self.state = SaxState::ElementStart;
                StepResult::Progress
            }
            _ => StepResult::Error(XmlStatus::ReadElementName),
        }
    }

    fn step_element_end(&mut self) -> StepResult {
        let rest = self.rest();
        let Some(end) = rest.find('>') else {
            self.state = SaxState::ElementEnd;
            return StepResult::NeedMore;
        };
        let raw = rest[..end].trim_end();
        if raw.is_empty() || !escape::is_valid_name(raw) {
            self.state = SaxState::Text;
            return StepResult::Error(XmlStatus::ReadingEndTag);
        }
        let name = raw.to_string();
        self.advance_to(self.pos + end + 1);
        match self.element_stack.pop() {
            Some(open) if open == name => {
                self.handler.on_element_end(&name);
                self.state = SaxState::Text;
                StepResult::Progress
            }
            Some(open) => {
                warn!("end tag </{}> does not match open element <{}>", name, open);
                StepResult::Error(XmlStatus::NotWellFormed)
            }
            None => StepResult::Error(XmlStatus::NotWellFormed),
        }
    }

    fn step_comment(&mut self) -> StepResult {
        let rest = self.rest();
        let Some(end) = rest.find("-->") else {
            if rest.contains('\u{0C}') {
                self.state = SaxState::Text;
                return StepResult::Error(XmlStatus::CommentParse);
            }
            self.state = SaxState::Comment;
            return StepResult::NeedMore;
        };
        let body = &rest[..end];
        if body.contains('\u{0C}') {
            self.state = SaxState::Text;
            return StepResult::Error(XmlStatus::CommentParse);
        }
        if body.ends_with('-') {
            debug!("comment body ends with a dash right before '--auto>'");
        }
        let text = body.to_string();
        self.advance_to(self.pos + end + 3);
        self.handler.on_comment(&text);
        self.state = SaxState::Text;
        StepResult::Progress
    }

    fn step_cdata(&mut self) -> StepResult {
        let rest = self.rest();
        let Some(end) = rest.find("]]>") else {
            self.state = SaxState::CData;
            return StepResult::NeedMore;
        };
        let data = rest[..end].to_string();
        self.advance_to(self.pos + end + 3);
        self.handler.on_cdata(&data);
        self.state = SaxState::Text;
        StepResult::Progress
    }

    fn step_declaration(&mut self) -> StepResult {
        let rest = self.rest();
        let Some(end) = rest.find("?>") else {
            self.state = SaxState::Declaration;
            return StepResult::NeedMore;
        };
        let body = rest[..end].trim();
        let attrs = match parse_attributes(body) {
            Ok(attrs) => attrs,
            Err(status) => {
                self.state = SaxState::Text;
                return StepResult::Error(status);
            }
        };
        if self.declaration_seen {
            self.state = SaxState::Text;
            return StepResult::Error(XmlStatus::DeclarationParse);
        }
        if let Some((_, version)) = attrs.iter().find(|(k, _)| k == "version") {
            if !version.starts_with("1.") {
                self.state = SaxState::Text;
                return StepResult::Error(XmlStatus::UnsupportedVersion);
            }
        }
        if let Some((_, encoding)) = attrs.iter().find(|(k, _)| k == "encoding") {
            if !encoding.eq_ignore_ascii_case("utf-8") {
                self.state = SaxState::Text;
                return StepResult::Error(XmlStatus::UnsupportedEncoding);
            }
        }
        self.advance_to(self.pos + end + 2);
        self.declaration_seen = true;
        self.handler.on_declaration(&attrs);
        self.state = SaxState::Text;
        StepResult::Progress
    }

    fn step_pi(&mut self, target: String) -> StepResult {
        let rest = self.rest();
        let Some(end) = rest.find("?>") else {
            self.state = SaxState::ProcessingInstruction { target };
            return StepResult::NeedMore;
        };
        let data = rest[..end].trim().to_string();
        self.advance_to(self.pos + end + 2);
        self.handler.on_processing_instruction(&target, &data);
        self.state = SaxState::Text;
        StepResult::Progress
    }

    fn step_doctype(&mut self, depth: u32) -> StepResult {
        // Opaque capture of `<!DOCTYPE ...>`, tracking bracket depth so
        // an internal subset `[...]` may itself contain `>`.
        let rest = self.rest();
        let mut depth = depth;
        let mut i = 0;
        let bytes = rest.as_bytes();
        while i < bytes.len() {
            match bytes[i] {
                b'[' => depth += 1,
                b']' => depth = depth.saturating_sub(1),
                b'>' if depth == 0 => {
                    let text = rest[..i].trim().to_string();
                    self.advance_to(self.pos + i + 1);
                    self.handler.on_doctype(&text);
                    self.state = SaxState::Text;
                    return StepResult::Progress;
                }
                _ => {}
            }
            i += 1;
        }
        self.state = SaxState::Doctype { depth };
        StepResult::NeedMore
    }

    fn step_element_start(&mut self) -> StepResult {
        let rest = self.rest();
        // Need the whole start tag (up to an unquoted '>' or "/>")
        // buffered before committing, since attribute values may embed
        // '>' inside their quotes.
        match find_tag_end(&rest) {
            TagEnd::NeedMore => {
                self.state = SaxState::ElementStart;
                StepResult::NeedMore
            }
            TagEnd::Invalid => StepResult::Error(XmlStatus::ElementParse),
            TagEnd::Found { body_end, empty, tag_len } => {
                let body = &rest[..body_end];
                let name_len = body
                    .find(|c: char| escape::is_blank(c))
                    .unwrap_or(body.len());
                let name = &body[..name_len];
                if name.is_empty() || !escape::is_valid_name(name) {
                    self.state = SaxState::Text;
                    return StepResult::Error(XmlStatus::InvalidElementName);
                }
                let attrs = match parse_attributes(body[name_len..].trim()) {
                    Ok(attrs) => attrs,
                    Err(status) => {
                        self.state = SaxState::Text;
                        return StepResult::Error(status);
                    }
                };
                let name = name.to_string();
                self.advance_to(self.pos + tag_len);
                self.handler.on_element_start(&name, &attrs, empty);
                if empty {
                    self.handler.on_element_end(&name);
                } else {
                    self.element_stack.push(name);
                }
                self.state = SaxState::Text;
                StepResult::Progress
            }
        }
    }
}

enum NamePrefix {
    Complete(String, usize),
    NeedMore,
    Invalid,
}

fn read_name_prefix(s: &str) -> NamePrefix {
    let mut end = 0;
    for (i, c) in s.char_indices() {
        if escape::is_name_char(c) {
            end = i + c.len_utf8();
        } else {
            break;
        }
    }
    if end == 0 {
        return NamePrefix::Invalid;
    }
    if end == s.len() {
        // might continue in the next feed() call
        return NamePrefix::NeedMore;
    }
    NamePrefix::Complete(s[..end].to_string(), end)
}

enum TagEnd {
    NeedMore,
    Invalid,
    Found { body_end: usize, empty: bool, tag_len: usize },
}

/// Scans a start tag's body (after `<Name`) to find the unquoted `>`
/// or `/>` that ends it, skipping over quoted attribute values so an
/// embedded `>` inside one doesn't terminate the scan early.
fn find_tag_end(rest: &str) -> TagEnd {
    let bytes = rest.as_bytes();
    let mut i = 0;
    let mut in_quote: Option<u8> = None;
    while i < bytes.len() {
        let b = bytes[i];
        match in_quote {
            Some(q) => {
                if b == q {
                    in_quote = None;
                }
            }
            None => match b {
                b'"' | b'\'' => in_quote = Some(b),
                b'>' => {
                    if i > 0 && bytes[i - 1] == b'/' {
                        return TagEnd::Found {
                            body_end: i - 1,
                            empty: true,
                            tag_len: i + 1,
                        };
                    }
                    return TagEnd::Found {
                        body_end: i,
                        empty: false,
                        tag_len: i + 1,
                    };
                }
                b'<' => return TagEnd::Invalid,
                _ => {}
            },
        }
        i += 1;
    }
    TagEnd::NeedMore
}

/// Parses a generic `Name="value"` / `Name='value'` attribute list
/// (used by both element start tags and the `<?xml ... ?>`
/// declaration), rejecting duplicate names.
fn parse_attributes(body: &str) -> Result<Vec<(String, String)>, XmlStatus> {
    let mut attrs = Vec::new();
    let bytes = body.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        while i < bytes.len() && escape::is_blank(bytes[i] as char) {
            i += 1;
        }
        if i >= bytes.len() {
            break;
        }
        let name_start = i;
        while i < bytes.len() && !escape::is_blank(bytes[i] as char) && bytes[i] != b'=' {
            i += 1;
        }
        let name = &body[name_start..i];
        if name.is_empty() || !escape::is_valid_name(name) {
            return Err(XmlStatus::ReadingAttributes);
        }
        while i < bytes.len() && escape::is_blank(bytes[i] as char) {
            i += 1;
        }
        if i >= bytes.len() || bytes[i] != b'=' {
            return Err(XmlStatus::ReadingAttributes);
        }
        i += 1;
        while i < bytes.len() && escape::is_blank(bytes[i] as char) {
            i += 1;
        }
        let quote = *bytes.get(i).ok_or(XmlStatus::ReadingAttributes)?;
        if quote != b'"' && quote != b'\'' {
            return Err(XmlStatus::ReadingAttributes);
        }
        i += 1;
        let value_start = i;
        while i < bytes.len() && bytes[i] != quote {
            i += 1;
        }
        if i >= bytes.len() {
            return Err(XmlStatus::ReadingAttributes);
        }
        let raw_value = &body[value_start..i];
        i += 1;
        let (value, _) = escape::unescape_str(raw_value).map_err(|_| XmlStatus::ReadingAttributes)?;
        if attrs.iter().any(|(n, _): &(String, String)| n == &name) {
            return Err(XmlStatus::ReadingAttributes);
        }
        attrs.push((name.to_string(), value));
    }
    Ok(attrs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingHandler {
        events: Vec<String>,
    }

    impl SaxHandler for RecordingHandler {
        fn on_declaration(&mut self, attrs: &[(String, String)]) {
            let version = attrs.iter().find(|(k, _)| k == "version").map(|(_, v)| v.clone());
            self.events.push(format!("decl{:?}", version));
        }
        fn on_element_start(&mut self, name: &str, attrs: &[(String, String)], empty: bool) {
            let attrs: Vec<String> = attrs.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
            self.events.push(format!("start({},{:?},empty={})", name, attrs, empty));
        }
        fn on_element_end(&mut self, name: &str) {
            self.events.push(format!("end({})", name));
        }
        fn on_text(&mut self, text: &str) {
            self.events.push(format!("text({:?})", text));
        }
        fn on_cdata(&mut self, data: &str) {
            self.events.push(format!("cdata({:?})", data));
        }
        fn on_comment(&mut self, text: &str) {
            self.events.push(format!("comment({:?})", text));
        }
    }

    fn run_one_shot(input: &str) -> Vec<String> {
        let mut parser = SaxParser::new(RecordingHandler::default());
        assert_eq!(parser.feed(input.as_bytes()), XmlStatus::NoError);
        assert_eq!(parser.finish(), XmlStatus::NoError);
        parser.handler().events.clone()
    }

    fn run_split(input: &str, at: usize) -> Vec<String> {
        let mut parser = SaxParser::new(RecordingHandler::default());
        let (a, b) = input.as_bytes().split_at(at);
        parser.feed(a);
        parser.feed(b);
        assert_eq!(parser.finish(), XmlStatus::NoError);
        parser.handler().events.clone()
    }

    #[test]
    fn scenario_s1_declaration_element_text() {
        let input = r#"<?xml version="1.0"?><r a="1"><b/>hi</r>"#;
        let events = run_one_shot(input);
        assert_eq!(
            events,
            vec![
                "decl(Some(\"1.0\"))".to_string(),
                "start(r,[\"a=1\"],empty=false)".to_string(),
                "start(b,[],empty=true)".to_string(),
                "end(b)".to_string(),
                "text(\"hi\")".to_string(),
                "end(r)".to_string(),
            ]
        );
    }

    #[test]
    fn resumability_matches_one_shot_at_every_split_point() {
        let input = r#"<?xml version="1.0"?><root a="1" b="two"><child>some &amp; text</child><!--c--></root>"#;
        let one_shot = run_one_shot(input);
        for at in 0..input.len() {
            if !input.is_char_boundary(at) {
                continue;
            }
            let split = run_split(input, at);
            assert_eq!(split, one_shot, "mismatch when splitting at byte {}", at);
        }
    }

    #[test]
    fn rejects_mismatched_end_tag() {
        let mut parser = SaxParser::new(RecordingHandler::default());
        let status = parser.feed(b"<a><b></a></b>");
        assert_eq!(status, XmlStatus::NotWellFormed);
    }

    #[test]
    fn sticky_error_until_reset() {
        let mut parser = SaxParser::new(RecordingHandler::default());
        assert_eq!(parser.feed(b"<a><b></a>"), XmlStatus::NotWellFormed);
        assert_eq!(parser.feed(b"<c/>"), XmlStatus::NotWellFormed);
        parser.reset();
        assert_eq!(parser.feed(b"<c/>"), XmlStatus::NoError);
    }

    #[test]
    fn cdata_section_round_trips_verbatim() {
        let events = run_one_shot("<r><![CDATA[<not a tag> & not an entity]]></r>");
        assert_eq!(
            events,
            vec![
                "start(r,[],empty=false)".to_string(),
                "cdata(\"<not a tag> & not an entity\")".to_string(),
                "end(r)".to_string(),
            ]
        );
    }
}
