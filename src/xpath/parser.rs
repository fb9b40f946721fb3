//
// xpath/parser.rs
//
// paramatch: declarative data-matching and XML/XPath toolkit.
//

//!
//! Recursive-descent parser turning a token stream into a compiled
//! `XPath`. Splits the token stream into steps on a top-level `/`
//! (bracket/paren depth zero), then parses each step's selector and
//! predicate list independently.
//!

use super::ast::{CmpOp, Comparison, Predicate, Step, StepKind, XPath, MAX_PREDICATES};
use super::lexer::{self, Token};
use crate::error::XPathError;

pub fn parse(path: &str) -> Result<XPath, XPathError> {
    if path.trim().is_empty() {
        return Err(XPathError::new(crate::error::XPathStatus::EEmptyItem, None, "empty path"));
    }
    let tokens = lexer::tokenize(path)?;
    let (absolute, rest) = match tokens.first() {
        Some(Token::Slash) => (true, &tokens[1..]),
        _ => (false, &tokens[..]),
    };

    let mut steps = Vec::new();
    for (index, chunk) in split_steps(rest).into_iter().enumerate() {
        if chunk.is_empty() {
            return Err(XPathError::new(
                crate::error::XPathStatus::ESyntax,
                Some(index),
                "empty step",
            ));
        }
        steps.push(parse_step(&chunk, index)?);
    }
    if steps.is_empty() {
        return Err(XPathError::new(crate::error::XPathStatus::EEmptyItem, None, "path has no steps"));
    }
    Ok(XPath { absolute, steps })
}

/// Splits `tokens` on `Slash` tokens that occur outside any bracket or
/// parenthesis nesting.
fn split_steps(tokens: &[Token]) -> Vec<Vec<Token>> {
    let mut steps = Vec::new();
    let mut current = Vec::new();
    let mut depth = 0i32;
    for token in tokens {
        match token {
            Token::LBracket | Token::LParen => {
                depth += 1;
                current.push(token.clone());
            }
            Token::RBracket | Token::RParen => {
                depth -= 1;
                current.push(token.clone());
            }
            Token::Slash if depth == 0 => {
                steps.push(std::mem::take(&mut current));
            }
            other => current.push(other.clone()),
        }
    }
    steps.push(current);
    steps
}

struct Cursor<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }
    fn next(&mut self) -> Option<&Token> {
        let t = self.tokens.get(self.pos);
        if t.is_some() {
            self.pos += 1;
        }
        t
    }
    fn expect(&mut self, want: &Token, step: usize) -> Result<(), XPathError> {
        match self.next() {
            Some(t) if t == want => Ok(()),
            other => Err(XPathError::new(
                crate::error::XPathStatus::ESyntax,
                Some(step),
                format!("expected {:?}, found {:?}", want, other),
            )),
        }
    }
    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }
}

fn parse_step(tokens: &[Token], step_index: usize) -> Result<Step, XPathError> {
    let mut cur = Cursor { tokens, pos: 0 };
    let kind = parse_selector(&mut cur, step_index)?;

    let mut predicates = Vec::new();
    while cur.peek() == Some(&Token::LBracket) {
        if predicates.len() >= MAX_PREDICATES {
            return Err(XPathError::new(
                crate::error::XPathStatus::ERange,
                Some(step_index),
                "too many predicates on one step",
            ));
        }
        cur.next();
        let predicate = parse_predicate(&mut cur, step_index)?;
        cur.expect(&Token::RBracket, step_index)?;
        predicates.push(predicate);
    }
    if !cur.at_end() {
        return Err(XPathError::new(
            crate::error::XPathStatus::ESyntax,
            Some(step_index),
            "trailing tokens in step",
        ));
    }
    Ok(Step { kind, predicates })
}

fn parse_selector(cur: &mut Cursor, step_index: usize) -> Result<StepKind, XPathError> {
    match cur.next() {
        Some(Token::Star) => Ok(StepKind::Element(None)),
        Some(Token::At) => match cur.next() {
            Some(Token::Star) => Ok(StepKind::Attribute(None)),
            Some(Token::Name(n)) => Ok(StepKind::Attribute(Some(n.clone()))),
            other => Err(XPathError::new(
                crate::error::XPathStatus::ESyntax,
                Some(step_index),
                format!("expected attribute name after '@', found {:?}", other),
            )),
        },
        Some(Token::Name(n)) if n == "text" && cur.peek() == Some(&Token::LParen) => {
            cur.next();
            cur.expect(&Token::RParen, step_index)?;
            Ok(StepKind::Text)
        }
        Some(Token::Name(n)) if n == "child" && cur.peek() == Some(&Token::ColonColon) => {
            cur.next();
            match cur.next() {
                Some(Token::Name(t)) if t == "text" => {
                    cur.expect(&Token::LParen, step_index)?;
                    cur.expect(&Token::RParen, step_index)?;
                    Ok(StepKind::ChildText)
                }
                other => Err(XPathError::new(
                    crate::error::XPathStatus::ESyntax,
                    Some(step_index),
                    format!("expected 'text()' after 'child::', found {:?}", other),
                )),
            }
        }
        Some(Token::Name(n)) => Ok(StepKind::Element(Some(n.clone()))),
        other => Err(XPathError::new(
            crate::error::XPathStatus::ESyntax,
            Some(step_index),
            format!("expected a step selector, found {:?}", other),
        )),
    }
}

/// An `xml_op` operand as named in the grammar: either `@Name`/`@*`
/// (attribute), a bare `Name` (child element), or `text()`.
enum Operand {
    Attribute(Option<String>),
    Child(String),
    Text,
}

fn parse_operand(cur: &mut Cursor, step_index: usize) -> Result<Operand, XPathError> {
    match cur.next() {
        Some(Token::At) => match cur.next() {
            Some(Token::Star) => Ok(Operand::Attribute(None)),
            Some(Token::Name(n)) => Ok(Operand::Attribute(Some(n.clone()))),
            other => Err(XPathError::new(
                crate::error::XPathStatus::ESyntax,
                Some(step_index),
                format!("expected attribute name, found {:?}", other),
            )),
        },
        Some(Token::Name(n)) if n == "text" && cur.peek() == Some(&Token::LParen) => {
            cur.next();
            cur.expect(&Token::RParen, step_index)?;
            Ok(Operand::Text)
        }
        Some(Token::Name(n)) => Ok(Operand::Child(n.clone())),
        other => Err(XPathError::new(
            crate::error::XPathStatus::ESyntax,
            Some(step_index),
            format!("expected a predicate operand, found {:?}", other),
        )),
    }
}

fn parse_predicate(cur: &mut Cursor, step_index: usize) -> Result<Predicate, XPathError> {
    if let Some(Token::Int(n)) = cur.peek() {
        let n = *n;
        cur.next();
        if n == 0 {
            return Err(XPathError::new(
                crate::error::XPathStatus::ERange,
                Some(step_index),
                "position index must be >= 1",
            ));
        }
        return Ok(Predicate::Index(n));
    }

    if let Some(Token::Name(n)) = cur.peek() {
        if n == "matches" || n == "notMatches" {
            let is_not = n == "notMatches";
            cur.next();
            cur.expect(&Token::LParen, step_index)?;
            let operand = parse_operand(cur, step_index)?;
            cur.expect(&Token::Comma, step_index)?;
            let regex = expect_string_lit(cur, step_index)?;
            let flags = if cur.peek() == Some(&Token::Comma) {
                cur.next();
                expect_string_lit(cur, step_index)?
            } else {
                String::new()
            };
            cur.expect(&Token::RParen, step_index)?;
            let op = if is_not { CmpOp::NotMatches } else { CmpOp::Matches };
            let test = Comparison { op, literal: regex, flags };
            return Ok(operand_to_predicate(operand, Some(test), step_index)?);
        }
    }

    let operand = parse_operand(cur, step_index)?;
    let test = match cur.peek() {
        Some(Token::Eq) | Some(Token::Ne) => {
            let op = if cur.next() == Some(&Token::Eq) { CmpOp::Eq } else { CmpOp::Ne };
            let literal = expect_string_lit(cur, step_index)?;
            Some(Comparison { op, literal, flags: String::new() })
        }
        _ => None,
    };
    operand_to_predicate(operand, test, step_index)
}

fn operand_to_predicate(operand: Operand, test: Option<Comparison>, step_index: usize) -> Result<Predicate, XPathError> {
    match operand {
        Operand::Attribute(name) => Ok(Predicate::Attribute { name, test }),
        Operand::Child(name) => Ok(Predicate::Child { name, test }),
        Operand::Text => match test {
            Some(test) => Ok(Predicate::Text(test)),
            None => Err(XPathError::new(
                crate::error::XPathStatus::ESyntax,
                Some(step_index),
                "text() predicate requires a comparison",
            )),
        },
    }
}

fn expect_string_lit(cur: &mut Cursor, step_index: usize) -> Result<String, XPathError> {
    match cur.next() {
        Some(Token::StringLit(s)) => Ok(s.clone()),
        other => Err(XPathError::new(
            crate::error::XPathStatus::ESyntax,
            Some(step_index),
            format!("expected a string literal, found {:?}", other),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_absolute_path_with_attribute_equality_predicate() {
        let xpath = parse(r#"/r/a[@x="2"]"#).unwrap();
        assert!(xpath.absolute);
        assert_eq!(xpath.steps.len(), 2);
        assert_eq!(xpath.steps[0].kind, StepKind::Element(Some("r".to_string())));
        assert_eq!(xpath.steps[1].kind, StepKind::Element(Some("a".to_string())));
        assert_eq!(
            xpath.steps[1].predicates,
            vec![Predicate::Attribute {
                name: Some("x".to_string()),
                test: Some(Comparison { op: CmpOp::Eq, literal: "2".to_string(), flags: String::new() }),
            }]
        );
    }

    #[test]
    fn parses_index_predicate() {
        let xpath = parse("/a/b[1]").unwrap();
        assert_eq!(xpath.steps[1].predicates, vec![Predicate::Index(1)]);
    }

    #[test]
    fn parses_attribute_step() {
        let xpath = parse("/r/a[1]/@x").unwrap();
        assert_eq!(xpath.steps[2].kind, StepKind::Attribute(Some("x".to_string())));
    }

    #[test]
    fn parses_matches_predicate_with_flags() {
        let xpath = parse(r#"/r/v[matches(text(),"^fo","")]"#).unwrap();
        assert_eq!(
            xpath.steps[1].predicates,
            vec![Predicate::Text(Comparison {
                op: CmpOp::Matches,
                literal: "^fo".to_string(),
                flags: String::new(),
            })]
        );
    }

    #[test]
    fn rejects_zero_index() {
        let err = parse("/a/b[0]").unwrap_err();
        assert_eq!(err.status, crate::error::XPathStatus::ERange);
    }
}
