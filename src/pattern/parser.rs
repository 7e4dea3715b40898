//! Lexer and recursive-descent parser for the pattern DSL.

use super::Pattern;
use crate::tree::SyntaxKind;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Tok {
    Ident(String),
    Quoted(String),
    Lt,
    Gt,
    LParen,
    RParen,
    Pipe,
    Eq,
}

impl Tok {
    fn describe(&self) -> String {
        match self {
            Tok::Ident(name) => format!("'{name}'"),
            Tok::Quoted(text) => format!("literal {text:?}"),
            Tok::Lt => "'<'".to_string(),
            Tok::Gt => "'>'".to_string(),
            Tok::LParen => "'('".to_string(),
            Tok::RParen => "')'".to_string(),
            Tok::Pipe => "'|'".to_string(),
            Tok::Eq => "'='".to_string(),
        }
    }
}

/// Splits a pattern spec into tokens paired with their character offsets.
fn lex(spec: &str) -> Result<Vec<(Tok, usize)>, String> {
    let mut tokens = Vec::new();
    let mut chars = spec.char_indices().peekable();

    while let Some((offset, c)) = chars.next() {
        let tok = match c {
            c if c.is_whitespace() => continue,
            '<' => Tok::Lt,
            '>' => Tok::Gt,
            '(' => Tok::LParen,
            ')' => Tok::RParen,
            '|' => Tok::Pipe,
            '=' => Tok::Eq,
            '\'' | '"' => {
                let mut text = String::new();
                let mut closed = false;
                while let Some((_, ch)) = chars.next() {
                    match ch {
                        '\\' => match chars.next() {
                            Some((_, escaped)) => text.push(escaped),
                            None => break,
                        },
                        ch if ch == c => {
                            closed = true;
                            break;
                        }
                        ch => text.push(ch),
                    }
                }
                if !closed {
                    return Err(format!("unterminated literal starting at offset {offset}"));
                }
                Tok::Quoted(text)
            }
            c if c == '_' || c.is_ascii_alphabetic() => {
                let mut name = c.to_string();
                while let Some((_, ch)) = chars.peek() {
                    if *ch == '_' || ch.is_ascii_alphanumeric() {
                        name.push(*ch);
                        chars.next();
                    } else {
                        break;
                    }
                }
                Tok::Ident(name)
            }
            other => return Err(format!("unexpected character {other:?} at offset {offset}")),
        };
        tokens.push((tok, offset));
    }
    Ok(tokens)
}

/// Parses a pattern spec into its syntax tree.
pub(super) fn parse(spec: &str) -> Result<Pattern, String> {
    let tokens = lex(spec)?;
    let mut parser = SpecParser { tokens, pos: 0 };
    let pattern = parser.alternatives()?;
    if let Some((tok, offset)) = parser.tokens.get(parser.pos) {
        return Err(match tok {
            Tok::Gt | Tok::RParen => format!("unbalanced {} at offset {offset}", tok.describe()),
            other => format!("unexpected {} at offset {offset}", other.describe()),
        });
    }
    Ok(pattern)
}

struct SpecParser {
    tokens: Vec<(Tok, usize)>,
    pos: usize,
}

impl SpecParser {
    fn peek(&self) -> Option<&Tok> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|(_, o)| *o)
            .unwrap_or_else(|| self.tokens.last().map(|(_, o)| o + 1).unwrap_or(0))
    }

    fn bump(&mut self) -> Option<Tok> {
        let tok = self.tokens.get(self.pos).map(|(t, _)| t.clone());
        self.pos += 1;
        tok
    }

    fn alternatives(&mut self) -> Result<Pattern, String> {
        let mut branches = vec![self.alternative()?];
        while self.peek() == Some(&Tok::Pipe) {
            self.bump();
            branches.push(self.alternative()?);
        }
        Ok(if branches.len() == 1 {
            branches.remove(0)
        } else {
            Pattern::Alternation(branches)
        })
    }

    fn alternative(&mut self) -> Result<Pattern, String> {
        let mut units = Vec::new();
        while matches!(
            self.peek(),
            Some(Tok::Ident(_) | Tok::Quoted(_) | Tok::LParen)
        ) {
            units.push(self.unit()?);
        }
        match units.len() {
            0 => Err(match self.peek() {
                Some(tok) => format!(
                    "expected a pattern but found {} at offset {}",
                    tok.describe(),
                    self.offset()
                ),
                None => "expected a pattern but the spec ended".to_string(),
            }),
            1 => Ok(units.remove(0)),
            _ => Ok(Pattern::Sequence(units)),
        }
    }

    fn unit(&mut self) -> Result<Pattern, String> {
        let name = match (self.peek(), self.tokens.get(self.pos + 1)) {
            (Some(Tok::Ident(name)), Some((Tok::Eq, _))) => name.clone(),
            _ => return self.atom(),
        };
        self.pos += 2;
        if name == "any" {
            return Err(format!("'any' cannot be used as a capture name at offset {}", self.offset()));
        }
        let inner = self.atom()?;
        Ok(match inner {
            Pattern::Wildcard(None) => Pattern::Wildcard(Some(name)),
            inner => Pattern::Capture {
                name,
                pattern: Box::new(inner),
            },
        })
    }

    fn atom(&mut self) -> Result<Pattern, String> {
        let offset = self.offset();
        match self.bump() {
            Some(Tok::Quoted(text)) => Ok(Pattern::Literal(text)),
            Some(Tok::Ident(name)) if name == "any" => Ok(Pattern::Wildcard(None)),
            Some(Tok::Ident(name)) => {
                let kind = SyntaxKind::from_name(&name)
                    .ok_or_else(|| format!("unknown node kind '{name}' at offset {offset}"))?;
                if self.peek() != Some(&Tok::Lt) {
                    return Ok(Pattern::Kind {
                        kind,
                        children: None,
                    });
                }
                if kind.is_token() {
                    return Err(format!(
                        "token kind '{name}' cannot have children (offset {offset})"
                    ));
                }
                let open = self.offset();
                self.bump();
                let children = self.alternatives()?;
                if self.bump() != Some(Tok::Gt) {
                    return Err(format!("unbalanced '<' at offset {open}"));
                }
                Ok(Pattern::Kind {
                    kind,
                    children: Some(Box::new(children)),
                })
            }
            Some(Tok::LParen) => {
                let inner = self.alternatives()?;
                if self.bump() != Some(Tok::RParen) {
                    return Err(format!("unbalanced '(' at offset {offset}"));
                }
                Ok(inner)
            }
            Some(other) => Err(format!("unexpected {} at offset {offset}", other.describe())),
            None => Err("expected a pattern but the spec ended".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lex_escaped_literal() {
        let tokens = lex(r#"'Can\'t' "a\"b""#).unwrap();
        assert_eq!(tokens[0].0, Tok::Quoted("Can't".to_string()));
        assert_eq!(tokens[1].0, Tok::Quoted("a\"b".to_string()));
    }

    #[test]
    fn test_parse_capture_forms() {
        assert_eq!(
            parse("name=any").unwrap(),
            Pattern::Wildcard(Some("name".to_string()))
        );
        assert_eq!(
            parse("head='opts'").unwrap(),
            Pattern::Capture {
                name: "head".to_string(),
                pattern: Box::new(Pattern::Literal("opts".to_string())),
            }
        );
    }

    #[test]
    fn test_parse_nested_kinds() {
        let pattern = parse("power< 'opts' trailer< '.' any > >").unwrap();
        assert_eq!(
            pattern,
            Pattern::Kind {
                kind: SyntaxKind::Power,
                children: Some(Box::new(Pattern::Sequence(vec![
                    Pattern::Literal("opts".to_string()),
                    Pattern::Kind {
                        kind: SyntaxKind::Trailer,
                        children: Some(Box::new(Pattern::Sequence(vec![
                            Pattern::Literal(".".to_string()),
                            Pattern::Wildcard(None),
                        ]))),
                    },
                ]))),
            }
        );
    }

    #[test]
    fn test_group_alternation() {
        let pattern = parse("x=('a' | 'b')").unwrap();
        assert_eq!(
            pattern,
            Pattern::Capture {
                name: "x".to_string(),
                pattern: Box::new(Pattern::Alternation(vec![
                    Pattern::Literal("a".to_string()),
                    Pattern::Literal("b".to_string()),
                ])),
            }
        );
    }

    #[test]
    fn test_unbalanced() {
        assert!(parse("power< 'a'").unwrap_err().contains("unbalanced '<'"));
        assert!(parse("('a'").unwrap_err().contains("unbalanced '('"));
        assert!(parse("'a' )").unwrap_err().contains("unbalanced ')'"));
        assert!(parse("power< 'a' > >").unwrap_err().contains("unbalanced '>'"));
    }

    #[test]
    fn test_unknown_kind() {
        let err = parse("funcdef< any >").unwrap_err();
        assert!(err.contains("unknown node kind 'funcdef'"));
    }

    #[test]
    fn test_token_kind_with_children() {
        assert!(parse("NAME< 'x' >").unwrap_err().contains("cannot have children"));
    }

    #[test]
    fn test_empty_and_dangling() {
        assert!(parse("").is_err());
        assert!(parse("'a' |").is_err());
        assert!(parse("x=").is_err());
        assert!(parse("'abc").unwrap_err().contains("unterminated"));
    }
}
