//! Lossless tokenizer.
//!
//! Every byte of the input ends up either in a token's text or in the prefix
//! of the token that follows it, so concatenating `prefix + text` over all
//! tokens reproduces the source.

use super::{Location, SyntaxKind};
use crate::error::{FixerError, Result};

/// A token with its leading trivia.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawToken {
    pub kind: SyntaxKind,
    pub text: String,
    pub prefix: String,
    pub location: Location,
}

const OPERATORS_3: &[&str] = &["**=", "//=", ">>=", "<<=", "..."];
const OPERATORS_2: &[&str] = &[
    "**", "//", "<<", ">>", "<=", ">=", "==", "!=", "<>", "->", "+=", "-=", "*=", "/=", "%=",
    "&=", "|=", "^=", "@=", ":=",
];
const OPERATORS_1: &str = "+-*/%@&|^~<>()[]{},:;.=`";

struct Cursor<'a> {
    src: &'a str,
    pos: usize,
    line: usize,
    column: usize,
}

impl<'a> Cursor<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_nth(&self, n: usize) -> Option<char> {
        self.rest().chars().nth(n)
    }

    fn location(&self) -> Location {
        Location::new(self.line, self.column)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        match c {
            '\n' => {
                self.line += 1;
                self.column = 1;
            }
            // A lone carriage return ends a line; in "\r\n" the '\n' does.
            '\r' if self.peek() != Some('\n') => {
                self.line += 1;
                self.column = 1;
            }
            _ => self.column += 1,
        }
        Some(c)
    }

    fn bump_n(&mut self, n: usize) {
        for _ in 0..n {
            self.bump();
        }
    }

    fn eat_while(&mut self, pred: impl Fn(char) -> bool) {
        while self.peek().is_some_and(&pred) {
            self.bump();
        }
    }

    /// Length in bytes of a line break at the cursor, if any.
    fn newline_len(&self) -> Option<usize> {
        let rest = self.rest();
        if rest.starts_with("\r\n") {
            Some(2)
        } else if rest.starts_with('\n') || rest.starts_with('\r') {
            Some(1)
        } else {
            None
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c == '_' || c.is_alphabetic()
}

fn is_ident_continue(c: char) -> bool {
    c == '_' || c.is_alphanumeric()
}

fn is_string_prefix(word: &str) -> bool {
    matches!(
        word.to_ascii_lowercase().as_str(),
        "r" | "u" | "b" | "f" | "br" | "rb" | "ur" | "fr" | "rf"
    )
}

/// Returns true if `text` would lex as a single `NAME` token.
pub fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    chars.next().is_some_and(is_ident_start) && chars.all(is_ident_continue)
}

/// Returns true if `text` is exactly one operator or delimiter token.
pub fn is_operator(text: &str) -> bool {
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => OPERATORS_1.contains(c),
        _ => OPERATORS_3.iter().chain(OPERATORS_2).any(|op| *op == text),
    }
}

/// Splits source text into tokens, attaching trivia to the following token.
pub fn tokenize(source: &str) -> Result<Vec<RawToken>> {
    Tokenizer::new(source).run()
}

struct Tokenizer<'a> {
    cursor: Cursor<'a>,
    tokens: Vec<RawToken>,
    brackets: Vec<(char, Location)>,
    trivia_start: usize,
    line_has_tokens: bool,
}

impl<'a> Tokenizer<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            cursor: Cursor::new(source),
            tokens: Vec::new(),
            brackets: Vec::new(),
            trivia_start: 0,
            line_has_tokens: false,
        }
    }

    fn run(mut self) -> Result<Vec<RawToken>> {
        // A byte order mark stays in the first token's prefix.
        if self.cursor.peek() == Some('\u{feff}') {
            self.cursor.bump();
            self.cursor.column = 1;
        }
        while let Some(c) = self.cursor.peek() {
            match c {
                ' ' | '\t' | '\x0c' => {
                    self.cursor.bump();
                }
                '#' => self.cursor.eat_while(|c| c != '\n' && c != '\r'),
                '\\' => self.continuation()?,
                '\n' | '\r' => self.newline(),
                _ => self.token()?,
            }
        }

        if let Some((open, location)) = self.brackets.pop() {
            return Err(FixerError::parse(
                location,
                format!("'{open}' was never closed"),
            ));
        }

        let location = self.cursor.location();
        self.emit_span(SyntaxKind::EndMarker, self.cursor.pos, location);
        Ok(self.tokens)
    }

    fn continuation(&mut self) -> Result<()> {
        let location = self.cursor.location();
        self.cursor.bump();
        match self.cursor.newline_len() {
            Some(n) => {
                self.cursor.bump_n(n);
                Ok(())
            }
            None => Err(FixerError::parse(
                location,
                "unexpected character after line continuation",
            )),
        }
    }

    fn newline(&mut self) {
        let start = self.cursor.pos;
        let location = self.cursor.location();
        let len = self.cursor.newline_len().unwrap_or(1);
        self.cursor.bump_n(len);

        // Blank lines and breaks inside brackets are trivia.
        if self.brackets.is_empty() && self.line_has_tokens {
            self.emit_span(SyntaxKind::Newline, start, location);
            self.line_has_tokens = false;
        }
    }

    fn token(&mut self) -> Result<()> {
        let start = self.cursor.pos;
        let location = self.cursor.location();
        let c = self.cursor.peek().unwrap_or_default();

        let kind = if is_ident_start(c) {
            self.cursor.eat_while(is_ident_continue);
            let word = &self.cursor.src[start..self.cursor.pos];
            if is_string_prefix(word) && matches!(self.cursor.peek(), Some('\'' | '"')) {
                self.string(location)?;
                SyntaxKind::String
            } else {
                SyntaxKind::Name
            }
        } else if c.is_ascii_digit()
            || (c == '.' && self.cursor.peek_nth(1).is_some_and(|d| d.is_ascii_digit()))
        {
            self.number();
            SyntaxKind::Number
        } else if c == '\'' || c == '"' {
            self.string(location)?;
            SyntaxKind::String
        } else {
            self.operator(location)?;
            SyntaxKind::Op
        };

        self.emit_span(kind, start, location);
        self.line_has_tokens = true;
        Ok(())
    }

    fn number(&mut self) {
        let rest = self.cursor.rest();
        let radix = rest.len() > 1
            && rest.starts_with('0')
            && matches!(rest.as_bytes()[1], b'x' | b'X' | b'o' | b'O' | b'b' | b'B');
        if radix {
            self.cursor.bump_n(2);
            self.cursor.eat_while(|c| c.is_ascii_hexdigit() || c == '_');
        } else {
            self.cursor.eat_while(|c| c.is_ascii_digit() || c == '_');
            if self.cursor.peek() == Some('.') {
                self.cursor.bump();
                self.cursor.eat_while(|c| c.is_ascii_digit() || c == '_');
            }
            if matches!(self.cursor.peek(), Some('e' | 'E')) {
                let signed = matches!(self.cursor.peek_nth(1), Some('+' | '-'));
                let digit_at = if signed { 2 } else { 1 };
                if self
                    .cursor
                    .peek_nth(digit_at)
                    .is_some_and(|c| c.is_ascii_digit())
                {
                    self.cursor.bump_n(digit_at);
                    self.cursor.eat_while(|c| c.is_ascii_digit() || c == '_');
                }
            }
        }
        if matches!(self.cursor.peek(), Some('j' | 'J' | 'l' | 'L')) {
            self.cursor.bump();
        }
    }

    /// Consumes a quoted string body; the cursor sits on the opening quote.
    fn string(&mut self, start: Location) -> Result<()> {
        let quote = self.cursor.peek().unwrap_or('"');
        let triple = self.cursor.rest().starts_with(&quote.to_string().repeat(3));
        let delimiter = if triple { 3 } else { 1 };
        self.cursor.bump_n(delimiter);

        loop {
            let Some(c) = self.cursor.peek() else {
                return Err(FixerError::parse(start, "unterminated string literal"));
            };
            if c == '\\' {
                self.cursor.bump();
                match self.cursor.newline_len() {
                    Some(n) => self.cursor.bump_n(n),
                    None => {
                        self.cursor.bump();
                    }
                }
                continue;
            }
            if c == quote {
                if !triple {
                    self.cursor.bump();
                    return Ok(());
                }
                if self.cursor.rest().starts_with(&quote.to_string().repeat(3)) {
                    self.cursor.bump_n(3);
                    return Ok(());
                }
            }
            if !triple && (c == '\n' || c == '\r') {
                return Err(FixerError::parse(start, "unterminated string literal"));
            }
            self.cursor.bump();
        }
    }

    fn operator(&mut self, location: Location) -> Result<()> {
        let rest = self.cursor.rest();
        if let Some(op) = OPERATORS_3
            .iter()
            .chain(OPERATORS_2)
            .find(|op| rest.starts_with(**op))
        {
            self.cursor.bump_n(op.chars().count());
            return Ok(());
        }

        let c = self.cursor.peek().unwrap_or_default();
        if !OPERATORS_1.contains(c) {
            return Err(FixerError::parse(
                location,
                format!("unexpected character {c:?}"),
            ));
        }

        match c {
            '(' | '[' | '{' => self.brackets.push((c, location)),
            ')' | ']' | '}' => {
                let expected = match c {
                    ')' => '(',
                    ']' => '[',
                    _ => '{',
                };
                match self.brackets.pop() {
                    Some((open, _)) if open == expected => {}
                    Some((open, opened_at)) => {
                        return Err(FixerError::parse(
                            location,
                            format!("closing '{c}' does not match '{open}' opened at {opened_at}"),
                        ));
                    }
                    None => {
                        return Err(FixerError::parse(location, format!("unmatched '{c}'")));
                    }
                }
            }
            _ => {}
        }
        self.cursor.bump();
        Ok(())
    }

    fn emit_span(&mut self, kind: SyntaxKind, start: usize, location: Location) {
        let prefix = self.cursor.src[self.trivia_start..start].to_string();
        let text = self.cursor.src[start..self.cursor.pos].to_string();
        self.tokens.push(RawToken {
            kind,
            text,
            prefix,
            location,
        });
        self.trivia_start = self.cursor.pos;
    }
}
