//
// escape.rs
//
// paramatch: declarative data-matching and XML/XPath toolkit.
//

//!
//! Bidirectional XML entity codec and XML Name character classification.
//!
//! `escape` and `unescape` work at the byte level: `escape` has no
//! UTF-8 awareness (it only ever substitutes ASCII bytes that happen to
//! be one of the five markup characters), while `unescape` may emit an
//! arbitrary byte below 256 for a decimal character reference, or a
//! full UTF-8 sequence for a hex one. Callers that need a `String`
//! convert the decoded buffer with `String::from_utf8`, which gives the
//! `InvalidEncoding` diagnosis for free when a decimal reference
//! produced a byte that is not valid standalone UTF-8.
//!

use crate::error::EscapeError;

const ENTITIES: &[(&str, u8)] = &[
    ("lt", b'<'),
    ("gt", b'>'),
    ("amp", b'&'),
    ("quot", b'"'),
    ("apos", b'\''),
];

/// Appends `src` to `dst`, replacing any byte that is one of `< > & " '`
/// with its named entity. All other bytes pass through unchanged.
pub fn escape(dst: &mut Vec<u8>, src: &[u8]) {
    for &b in src {
        match b {
            b'<' => dst.extend_from_slice(b"&lt;"),
            b'>' => dst.extend_from_slice(b"&gt;"),
            b'&' => dst.extend_from_slice(b"&amp;"),
            b'"' => dst.extend_from_slice(b"&quot;"),
            b'\'' => dst.extend_from_slice(b"&apos;"),
            _ => dst.push(b),
        }
    }
}

/// Convenience wrapper over `escape` for `&str` callers; the result is
/// always valid UTF-8 since only ASCII bytes are ever substituted.
pub fn escape_str(src: &str) -> String {
    let mut dst = Vec::with_capacity(src.len());
    escape(&mut dst, src.as_bytes());
    // Safe: every substitution is ASCII-for-ASCII or ASCII-for-ASCII-entity.
    String::from_utf8(dst).expect("escape never produces invalid UTF-8 from valid UTF-8 input")
}

/// Scans `src` left to right, decoding named and numeric character
/// references into `dst`. Returns whether at least one replacement
/// occurred. `dst` may alias `src`'s backing storage in spirit (the
/// caller builds a fresh buffer and swaps it in); this function never
/// reads from `dst`.
pub fn unescape(dst: &mut Vec<u8>, src: &[u8]) -> Result<bool, EscapeError> {
    let mut replaced = false;
    let mut i = 0;
    while i < src.len() {
        if src[i] != b'&' {
            dst.push(src[i]);
            i += 1;
            continue;
        }
        let start = i;
        i += 1;
        let mut end = None;
        let mut j = i;
        while j < src.len() {
            match src[j] {
                b';' => {
                    end = Some(j);
                    break;
                }
                b'&' => return Err(EscapeError::NestedAmpersand),
                _ => j += 1,
            }
        }
        let end = end.ok_or(EscapeError::Unterminated)?;
        let body = &src[i..end];
        decode_reference(body, dst)?;
        replaced = true;
        i = end + 1;
        let _ = start;
    }
    Ok(replaced)
}

fn decode_reference(body: &[u8], dst: &mut Vec<u8>) -> Result<(), EscapeError> {
    if let Some(hex) = body.strip_prefix(b"#x").or_else(|| body.strip_prefix(b"#X")) {
        return decode_hex_ref(hex, dst);
    }
    if let Some(dec) = body.strip_prefix(b"#") {
        return decode_decimal_ref(dec, dst);
    }
    let name = std::str::from_utf8(body).map_err(|_| EscapeError::UnknownEntity(lossy(body)))?;
    for (entity_name, byte) in ENTITIES {
        if *entity_name == name {
            dst.push(*byte);
            return Ok(());
        }
    }
    Err(EscapeError::UnknownEntity(name.to_string()))
}

fn decode_decimal_ref(digits: &[u8], dst: &mut Vec<u8>) -> Result<(), EscapeError> {
    if digits.is_empty() || digits.len() > 4 || !digits.iter().all(u8::is_ascii_digit) {
        return Err(EscapeError::InvalidNumeric(lossy(digits)));
    }
    let text = std::str::from_utf8(digits).unwrap();
    let value: u32 = text
        .parse()
        .map_err(|_| EscapeError::InvalidNumeric(text.to_string()))?;
    if value == 0 || value >= 256 {
        return Err(EscapeError::OutOfRange(text.to_string()));
    }
    dst.push(value as u8);
    Ok(())
}

fn decode_hex_ref(digits: &[u8], dst: &mut Vec<u8>) -> Result<(), EscapeError> {
    if digits.is_empty() || digits.len() > 8 || !digits.iter().all(u8::is_ascii_hexdigit) {
        return Err(EscapeError::InvalidNumeric(lossy(digits)));
    }
    let text = std::str::from_utf8(digits).unwrap();
    let value = u32::from_str_radix(text, 16).map_err(|_| EscapeError::InvalidNumeric(text.to_string()))?;
    let ch = char::from_u32(value).ok_or_else(|| EscapeError::OutOfRange(text.to_string()))?;
    let mut buf = [0u8; 4];
    dst.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
    Ok(())
}

fn lossy(body: &[u8]) -> String {
    String::from_utf8_lossy(body).into_owned()
}

/// Unescapes a `&str` and decodes the result as UTF-8, mapping a
/// standalone invalid byte (e.g. a Latin-1 decimal reference with no
/// valid UTF-8 continuation) to `None`.
pub fn unescape_str(src: &str) -> Result<(String, bool), EscapeError> {
    let mut dst = Vec::with_capacity(src.len());
    let replaced = unescape(&mut dst, src.as_bytes())?;
    match String::from_utf8(dst) {
        Ok(s) => Ok((s, replaced)),
        Err(_) => Err(EscapeError::InvalidNumeric(
            "decoded reference is not valid UTF-8".to_string(),
        )),
    }
}

/// True for the first character of an XML Name: a Unicode letter,
/// `_`, `:`, or one of the name-start ranges from the XML 1.0 Name
/// production (approximated here with Rust's Unicode alphabetic class
/// plus the common combining classes used by the original grammar).
pub fn is_name_start_char(c: char) -> bool {
    c == '_' || c == ':' || c.is_alphabetic()
}

/// True for a non-initial XML Name character: anything accepted by
/// `is_name_start_char`, plus digits, `.`, `-`, and the middle dot
/// `\u{B7}`.
pub fn is_name_char(c: char) -> bool {
    is_name_start_char(c) || c.is_ascii_digit() || c == '.' || c == '-' || c == '\u{B7}'
}

/// True for an XML 1.0 whitespace character: space, tab, CR, LF.
pub fn is_blank(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

/// Validates that `name` is non-empty and matches the XML Name
/// production: an `is_name_start_char` followed by zero or more
/// `is_name_char`.
pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if is_name_start_char(c) => {}
        _ => return false,
    }
    chars.all(is_name_char)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_then_unescape_is_identity_for_plain_text() {
        let src = "plain text without markup chars 123";
        let escaped = escape_str(src);
        assert_eq!(escaped, src);
        let (decoded, replaced) = unescape_str(&escaped).unwrap();
        assert_eq!(decoded, src);
        assert!(!replaced);
    }

    #[test]
    fn escape_round_trip_for_markup_chars() {
        let src = "<a> & \"b\" 'c'";
        let escaped = escape_str(src);
        assert_eq!(escaped, "&lt;a&gt; &amp; &quot;b&quot; &apos;c&apos;");
        let (decoded, replaced) = unescape_str(&escaped).unwrap();
        assert_eq!(decoded, src);
        assert!(replaced);
    }

    #[test]
    fn decodes_decimal_and_hex_numeric_references() {
        let (decoded, _) = unescape_str("&lt;a&gt;&#65;&#x4A;").unwrap();
        assert_eq!(decoded, "<a>AJ");
    }

    #[test]
    fn rejects_nested_ampersand() {
        let err = unescape(&mut Vec::new(), b"&a&b;").unwrap_err();
        assert_eq!(err, EscapeError::NestedAmpersand);
    }

    #[test]
    fn rejects_decimal_reference_out_of_range() {
        let err = unescape(&mut Vec::new(), b"&#256;").unwrap_err();
        assert!(matches!(err, EscapeError::OutOfRange(_)));
    }

    #[test]
    fn name_char_predicates() {
        assert!(is_valid_name("foo"));
        assert!(is_valid_name("_foo.bar-1"));
        assert!(is_valid_name("ns:tag"));
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("1foo"));
    }
}
