//! Builds a concrete syntax tree from tokens.
//!
//! Statements are kept as logical lines (`simple_stmt`) whose items are
//! either expressions or bare tokens such as keywords, `=` and `:`. Inside a
//! line, expressions get their full structure: atoms with trailers,
//! operators by precedence, bracket contents and call arguments. Levels with
//! a single child collapse away, so `opts.input_fp` is
//! `power< NAME trailer< '.' NAME > >` wherever it appears.
//!
//! Bracket balance and lexical validity are checked by the tokenizer; every
//! token sequence it accepts has a tree.

use super::token::{RawToken, tokenize};
use super::{NodeId, SyntaxKind, Tree};
use crate::error::Result;

const KEYWORDS: &[&str] = &[
    "and", "as", "assert", "async", "await", "break", "class", "continue", "def", "del", "elif",
    "else", "except", "finally", "for", "from", "global", "if", "import", "in", "is", "lambda",
    "nonlocal", "not", "or", "pass", "raise", "return", "try", "while", "with", "yield",
];

/// Binary operator levels, loosest first.
const BINARY_LEVELS: &[(SyntaxKind, &[&str])] = &[
    (SyntaxKind::Expr, &["|"]),
    (SyntaxKind::XorExpr, &["^"]),
    (SyntaxKind::AndExpr, &["&"]),
    (SyntaxKind::ShiftExpr, &["<<", ">>"]),
    (SyntaxKind::ArithExpr, &["+", "-"]),
    (SyntaxKind::Term, &["*", "/", "%", "//", "@"]),
];

const COMPARISON_OPS: &[&str] = &["<", ">", "==", ">=", "<=", "!=", "<>"];

/// Parses source text into a lossless syntax tree.
pub fn parse(source: &str) -> Result<Tree> {
    let tokens = tokenize(source)?;
    Ok(Parser::new(tokens).parse_file())
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Context {
    Statement,
    Brackets,
}

struct Parser {
    tokens: Vec<RawToken>,
    pos: usize,
    tree: Tree,
}

impl Parser {
    fn new(tokens: Vec<RawToken>) -> Self {
        Self {
            tokens,
            pos: 0,
            tree: Tree::empty(),
        }
    }

    fn parse_file(mut self) -> Tree {
        let mut children = Vec::new();
        while self.peek_kind() != Some(SyntaxKind::EndMarker) && self.peek().is_some() {
            children.push(self.parse_stmt());
        }
        if self.peek().is_some() {
            children.push(self.bump());
        }
        let root = self.tree.alloc_composite(SyntaxKind::FileInput, children);
        self.tree.set_root(root);
        self.tree
    }

    fn peek(&self) -> Option<&RawToken> {
        self.tokens.get(self.pos)
    }

    fn peek_nth(&self, n: usize) -> Option<&RawToken> {
        self.tokens.get(self.pos + n)
    }

    fn peek_kind(&self) -> Option<SyntaxKind> {
        self.peek().map(|t| t.kind)
    }

    fn at_op(&self, ops: &[&str]) -> bool {
        self.peek()
            .is_some_and(|t| t.kind == SyntaxKind::Op && ops.contains(&t.text.as_str()))
    }

    fn at_keyword(&self, keyword: &str) -> bool {
        self.peek()
            .is_some_and(|t| t.kind == SyntaxKind::Name && t.text == keyword)
    }

    fn bump(&mut self) -> NodeId {
        let token = &self.tokens[self.pos];
        self.pos += 1;
        self.tree.alloc_token(
            token.kind,
            token.text.clone(),
            token.prefix.clone(),
            token.location,
        )
    }

    fn can_start_expr_at(&self, n: usize) -> bool {
        let Some(token) = self.peek_nth(n) else {
            return false;
        };
        match token.kind {
            SyntaxKind::Name => token.text == "not" || !KEYWORDS.contains(&token.text.as_str()),
            SyntaxKind::Number | SyntaxKind::String => true,
            SyntaxKind::Op => matches!(token.text.as_str(), "(" | "[" | "{" | "-" | "+" | "~"),
            _ => false,
        }
    }

    fn can_start_expr(&self) -> bool {
        self.can_start_expr_at(0)
    }

    fn at_line_end(&self) -> bool {
        matches!(
            self.peek_kind(),
            None | Some(SyntaxKind::Newline) | Some(SyntaxKind::EndMarker)
        )
    }

    fn at_closing_bracket(&self) -> bool {
        self.at_op(&[")", "]", "}"])
    }

    fn parse_stmt(&mut self) -> NodeId {
        let mut children = self.parse_items(Context::Statement);
        if self.peek_kind() == Some(SyntaxKind::Newline) {
            children.push(self.bump());
        }
        self.tree.alloc_composite(SyntaxKind::SimpleStmt, children)
    }

    /// Parses a run of expressions and bare tokens up to the end of the
    /// logical line or the closing bracket.
    fn parse_items(&mut self, context: Context) -> Vec<NodeId> {
        let mut items = Vec::new();
        let mut item_start = true;
        let mut after_for = false;

        loop {
            let done = match context {
                Context::Statement => self.at_line_end(),
                Context::Brackets => self.at_closing_bracket() || self.peek().is_none(),
            };
            if done {
                break;
            }

            // A `for` target stops before `in`.
            if after_for && self.can_start_expr() {
                items.push(self.parse_binary(0));
                after_for = false;
                item_start = false;
                continue;
            }
            after_for = false;

            if context == Context::Brackets && item_start {
                if let Some(argument) = self.parse_argument() {
                    items.push(argument);
                    item_start = false;
                    continue;
                }
            }

            if self.can_start_expr() {
                items.push(self.parse_test());
                item_start = false;
                continue;
            }

            after_for = self.at_keyword("for");
            item_start = self.at_op(&[","]);
            items.push(self.bump());
        }
        items
    }

    /// Parses `name=value`, `*value` or `**value` at the start of an item.
    fn parse_argument(&mut self) -> Option<NodeId> {
        let keyword = self.peek_kind() == Some(SyntaxKind::Name)
            && self.can_start_expr()
            && self
                .peek_nth(1)
                .is_some_and(|t| t.kind == SyntaxKind::Op && t.text == "=")
            && self.can_start_expr_at(2);
        if keyword {
            let name = self.bump();
            let equals = self.bump();
            let value = self.parse_test();
            return Some(
                self.tree
                    .alloc_composite(SyntaxKind::Argument, vec![name, equals, value]),
            );
        }

        if self.at_op(&["*", "**"]) && self.can_start_expr_at(1) {
            let star = self.bump();
            let value = self.parse_test();
            return Some(
                self.tree
                    .alloc_composite(SyntaxKind::Argument, vec![star, value]),
            );
        }
        None
    }

    fn parse_test(&mut self) -> NodeId {
        self.parse_boolean(SyntaxKind::OrTest, "or", Self::parse_and_test)
    }

    fn parse_and_test(&mut self) -> NodeId {
        self.parse_boolean(SyntaxKind::AndTest, "and", Self::parse_not_test)
    }

    fn parse_boolean(
        &mut self,
        kind: SyntaxKind,
        keyword: &str,
        operand: fn(&mut Self) -> NodeId,
    ) -> NodeId {
        let first = operand(self);
        let mut children = vec![first];
        while self.at_keyword(keyword) && self.can_start_expr_at(1) {
            children.push(self.bump());
            children.push(operand(self));
        }
        self.collapse(kind, children)
    }

    fn parse_not_test(&mut self) -> NodeId {
        if self.at_keyword("not") && self.can_start_expr_at(1) {
            let not = self.bump();
            let operand = self.parse_not_test();
            return self
                .tree
                .alloc_composite(SyntaxKind::NotTest, vec![not, operand]);
        }
        self.parse_comparison()
    }

    fn comparison_op_len(&self) -> usize {
        let Some(token) = self.peek() else {
            return 0;
        };
        let operand_at = |n: usize| if self.can_start_expr_at(n) { n } else { 0 };
        match (token.kind, token.text.as_str()) {
            (SyntaxKind::Op, op) if COMPARISON_OPS.contains(&op) => operand_at(1),
            (SyntaxKind::Name, "in") => operand_at(1),
            (SyntaxKind::Name, "not")
                if self.peek_nth(1).is_some_and(|t| t.text == "in") =>
            {
                operand_at(2)
            }
            (SyntaxKind::Name, "is") => {
                if self.peek_nth(1).is_some_and(|t| t.text == "not") && self.can_start_expr_at(2)
                {
                    2
                } else {
                    operand_at(1)
                }
            }
            _ => 0,
        }
    }

    fn parse_comparison(&mut self) -> NodeId {
        let first = self.parse_binary(0);
        let mut children = vec![first];
        loop {
            let op_len = self.comparison_op_len();
            if op_len == 0 {
                break;
            }
            for _ in 0..op_len {
                children.push(self.bump());
            }
            children.push(self.parse_binary(0));
        }
        self.collapse(SyntaxKind::Comparison, children)
    }

    fn parse_binary(&mut self, level: usize) -> NodeId {
        let Some((kind, ops)) = BINARY_LEVELS.get(level) else {
            return self.parse_factor();
        };
        let first = self.parse_binary(level + 1);
        let mut children = vec![first];
        while self.at_op(ops) && self.can_start_expr_at(1) {
            children.push(self.bump());
            children.push(self.parse_binary(level + 1));
        }
        self.collapse(*kind, children)
    }

    fn parse_factor(&mut self) -> NodeId {
        if self.at_op(&["+", "-", "~"]) && self.can_start_expr_at(1) {
            let op = self.bump();
            let operand = self.parse_factor();
            return self
                .tree
                .alloc_composite(SyntaxKind::Factor, vec![op, operand]);
        }
        self.parse_power()
    }

    fn parse_power(&mut self) -> NodeId {
        let atom = self.parse_atom();
        let mut children = vec![atom];
        loop {
            if self.at_op(&["(", "["]) {
                children.push(self.parse_bracketed(SyntaxKind::Trailer));
            } else if self.at_op(&["."])
                && self
                    .peek_nth(1)
                    .is_some_and(|t| t.kind == SyntaxKind::Name)
            {
                let dot = self.bump();
                let name = self.bump();
                children.push(
                    self.tree
                        .alloc_composite(SyntaxKind::Trailer, vec![dot, name]),
                );
            } else {
                break;
            }
        }
        if self.at_op(&["**"]) && self.can_start_expr_at(1) {
            children.push(self.bump());
            children.push(self.parse_factor());
        }
        self.collapse(SyntaxKind::Power, children)
    }

    fn parse_atom(&mut self) -> NodeId {
        match self.peek_kind() {
            Some(SyntaxKind::String) => {
                let mut strings = vec![self.bump()];
                while self.peek_kind() == Some(SyntaxKind::String) {
                    strings.push(self.bump());
                }
                self.collapse(SyntaxKind::Atom, strings)
            }
            Some(SyntaxKind::Op) if self.at_op(&["(", "[", "{"]) => {
                self.parse_bracketed(SyntaxKind::Atom)
            }
            _ => self.bump(),
        }
    }

    /// Parses an opening bracket, its contents and the matching close.
    fn parse_bracketed(&mut self, kind: SyntaxKind) -> NodeId {
        let call = kind == SyntaxKind::Trailer && self.at_op(&["("]);
        let open = self.bump();
        let mut inner = self.parse_items(Context::Brackets);
        let mut children = vec![open];
        match inner.len() {
            0 => {}
            1 => children.append(&mut inner),
            _ => {
                let list_kind = if call {
                    SyntaxKind::ArgList
                } else {
                    SyntaxKind::Items
                };
                children.push(self.tree.alloc_composite(list_kind, inner));
            }
        }
        if self.at_closing_bracket() {
            children.push(self.bump());
        }
        self.tree.alloc_composite(kind, children)
    }

    fn collapse(&mut self, kind: SyntaxKind, mut children: Vec<NodeId>) -> NodeId {
        if children.len() == 1 {
            return children.remove(0);
        }
        self.tree.alloc_composite(kind, children)
    }
}
