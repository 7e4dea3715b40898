//! Node kinds for tokens and composite constructs.

use serde::Serialize;
use std::fmt;

/// The kind of a syntax node.
///
/// Token kinds are spelled in upper case in the pattern DSL, composite kinds
/// in lower case (`NAME`, `STRING`, `power`, `trailer`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SyntaxKind {
    // Tokens
    Name,
    Number,
    String,
    Op,
    Newline,
    EndMarker,

    // Composites
    FileInput,
    SimpleStmt,
    Power,
    Trailer,
    Factor,
    Term,
    ArithExpr,
    ShiftExpr,
    AndExpr,
    XorExpr,
    Expr,
    Comparison,
    NotTest,
    AndTest,
    OrTest,
    Atom,
    ArgList,
    Items,
    Argument,
}

impl SyntaxKind {
    pub const ALL: [SyntaxKind; 25] = [
        SyntaxKind::Name,
        SyntaxKind::Number,
        SyntaxKind::String,
        SyntaxKind::Op,
        SyntaxKind::Newline,
        SyntaxKind::EndMarker,
        SyntaxKind::FileInput,
        SyntaxKind::SimpleStmt,
        SyntaxKind::Power,
        SyntaxKind::Trailer,
        SyntaxKind::Factor,
        SyntaxKind::Term,
        SyntaxKind::ArithExpr,
        SyntaxKind::ShiftExpr,
        SyntaxKind::AndExpr,
        SyntaxKind::XorExpr,
        SyntaxKind::Expr,
        SyntaxKind::Comparison,
        SyntaxKind::NotTest,
        SyntaxKind::AndTest,
        SyntaxKind::OrTest,
        SyntaxKind::Atom,
        SyntaxKind::ArgList,
        SyntaxKind::Items,
        SyntaxKind::Argument,
    ];

    /// Returns true for leaf kinds.
    pub fn is_token(self) -> bool {
        matches!(
            self,
            SyntaxKind::Name
                | SyntaxKind::Number
                | SyntaxKind::String
                | SyntaxKind::Op
                | SyntaxKind::Newline
                | SyntaxKind::EndMarker
        )
    }

    /// The name used for this kind in patterns and tree dumps.
    pub fn name(self) -> &'static str {
        match self {
            SyntaxKind::Name => "NAME",
            SyntaxKind::Number => "NUMBER",
            SyntaxKind::String => "STRING",
            SyntaxKind::Op => "OP",
            SyntaxKind::Newline => "NEWLINE",
            SyntaxKind::EndMarker => "ENDMARKER",
            SyntaxKind::FileInput => "file_input",
            SyntaxKind::SimpleStmt => "simple_stmt",
            SyntaxKind::Power => "power",
            SyntaxKind::Trailer => "trailer",
            SyntaxKind::Factor => "factor",
            SyntaxKind::Term => "term",
            SyntaxKind::ArithExpr => "arith_expr",
            SyntaxKind::ShiftExpr => "shift_expr",
            SyntaxKind::AndExpr => "and_expr",
            SyntaxKind::XorExpr => "xor_expr",
            SyntaxKind::Expr => "expr",
            SyntaxKind::Comparison => "comparison",
            SyntaxKind::NotTest => "not_test",
            SyntaxKind::AndTest => "and_test",
            SyntaxKind::OrTest => "or_test",
            SyntaxKind::Atom => "atom",
            SyntaxKind::ArgList => "arglist",
            SyntaxKind::Items => "items",
            SyntaxKind::Argument => "argument",
        }
    }

    /// Looks up a kind by its pattern name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }
}

impl fmt::Display for SyntaxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
