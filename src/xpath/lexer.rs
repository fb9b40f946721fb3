//
// xpath/lexer.rs
//
// paramatch: declarative data-matching and XML/XPath toolkit.
//

//!
//! Tokeniser for the constrained XPath dialect's path syntax. Splits
//! on structural characters while keeping quoted string literals
//! (with doubled-quote escaping) intact as single tokens.
//!

use crate::error::XPathError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Slash,
    ColonColon,
    Star,
    At,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Comma,
    Eq,
    Ne,
    Int(u32),
    Name(String),
    StringLit(String),
}

pub fn tokenize(input: &str) -> Result<Vec<Token>, XPathError> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '@' => {
                tokens.push(Token::At);
                i += 1;
            }
            '[' => {
                tokens.push(Token::LBracket);
                i += 1;
            }
            ']' => {
                tokens.push(Token::RBracket);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            '=' => {
                tokens.push(Token::Eq);
                i += 1;
            }
            '!' if chars.get(i + 1) == Some(&'=') => {
                tokens.push(Token::Ne);
                i += 2;
            }
            ':' if chars.get(i + 1) == Some(&':') => {
                tokens.push(Token::ColonColon);
                i += 2;
            }
            '\'' | '"' => {
                let (literal, consumed) = read_quoted(&chars[i..], c)?;
                tokens.push(Token::StringLit(literal));
                i += consumed;
            }
            c if c.is_ascii_digit() => {
                let start = i;
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let value: u32 = text.parse().map_err(|_| XPathError::range(format!("integer out of range: {}", text)))?;
                tokens.push(Token::Int(value));
            }
            c if crate::escape::is_name_start_char(c) || c == '-' => {
                let start = i;
                while i < chars.len()
                    && (crate::escape::is_name_char(chars[i])
                        || chars[i] == '-'
                        || (chars[i] == ':' && chars.get(i + 1) != Some(&':')))
                {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                tokens.push(Token::Name(text));
            }
            other => {
                return Err(XPathError::syntax(format!("unexpected character '{}'", other)));
            }
        }
    }
    Ok(tokens)
}

/// Reads a quoted literal starting at `chars[0]` (the opening quote),
/// using `quote` doubled as the escape for an embedded quote. Returns
/// the decoded literal and the number of source characters consumed.
fn read_quoted(chars: &[char], quote: char) -> Result<(String, usize), XPathError> {
    let mut out = String::new();
    let mut i = 1;
    loop {
        if i >= chars.len() {
            return Err(XPathError::syntax("unterminated string literal"));
        }
        if chars[i] == quote {
            if chars.get(i + 1) == Some(&quote) {
                out.push(quote);
                i += 2;
                continue;
            }
            i += 1;
            break;
        }
        out.push(chars[i]);
        i += 1;
    }
    Ok((out, i))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizes_a_predicate_with_comparison() {
        let tokens = tokenize(r#"a[@x="2"]"#).unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Name("a".to_string()),
                Token::LBracket,
                Token::At,
                Token::Name("x".to_string()),
                Token::Eq,
                Token::StringLit("2".to_string()),
                Token::RBracket,
            ]
        );
    }

    #[test]
    fn doubled_quote_escapes_embedded_quote() {
        let tokens = tokenize(r#"'it''s'"#).unwrap();
        assert_eq!(tokens, vec![Token::StringLit("it's".to_string())]);
    }

    #[test]
    fn tokenizes_function_call_with_two_args() {
        let tokens = tokenize(r#"matches(text(),"^fo","")"#).unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Name("matches".to_string()),
                Token::LParen,
                Token::Name("text".to_string()),
                Token::LParen,
                Token::RParen,
                Token::Comma,
                Token::StringLit("^fo".to_string()),
                Token::Comma,
                Token::StringLit(String::new()),
                Token::RParen,
            ]
        );
    }
}
