//! Declarative tree patterns.
//!
//! Patterns describe the shape of a subtree in a small DSL:
//!
//! - `'text'` matches a token whose text is exactly `text`
//! - `any` matches exactly one node of any kind
//! - `power`, `NAME`, ... match a node of that kind; `power< ... >` also
//!   requires its children to line up with the inner sequence
//! - `name=pattern` binds the matched node to `name`
//! - `a | b` tries `a` first, then `b`; `( ... )` groups
//!
//! ```rust
//! use fixer_dsl::pattern::CompiledPattern;
//!
//! let pattern = CompiledPattern::compile(
//!     "options_object",
//!     "power< head=('opts' | 'options') trailer< '.' name=any > >",
//! )?;
//! assert_eq!(pattern.capture_names(), ["head", "name"]);
//! # Ok::<(), fixer_dsl::error::FixerError>(())
//! ```

mod parser;

use crate::error::{FixerError, Result};
use crate::tree::SyntaxKind;
use std::collections::BTreeSet;
use std::fmt;

/// A parsed pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pattern {
    /// A token with exactly this text.
    Literal(String),
    /// Any single node, optionally bound to a capture name.
    Wildcard(Option<String>),
    /// A node of the given kind, optionally constraining its children.
    Kind {
        kind: SyntaxKind,
        children: Option<Box<Pattern>>,
    },
    /// Consecutive siblings, each matched by one sub-pattern.
    Sequence(Vec<Pattern>),
    /// The first branch that matches wins.
    Alternation(Vec<Pattern>),
    /// Binds the node matched by the inner pattern.
    Capture { name: String, pattern: Box<Pattern> },
}

impl Pattern {
    /// Returns true if the pattern always covers exactly one node.
    fn is_single_node(&self) -> bool {
        match self {
            Pattern::Literal(_) | Pattern::Wildcard(_) | Pattern::Kind { .. } => true,
            Pattern::Capture { pattern, .. } => pattern.is_single_node(),
            Pattern::Sequence(items) => items.len() == 1 && items[0].is_single_node(),
            Pattern::Alternation(branches) => branches.iter().all(Pattern::is_single_node),
        }
    }

    /// Kinds a node must have to match, or `None` if any kind may match.
    fn root_kinds(&self) -> Option<BTreeSet<&'static str>> {
        match self {
            Pattern::Kind { kind, .. } => Some(BTreeSet::from([kind.name()])),
            Pattern::Capture { pattern, .. } => pattern.root_kinds(),
            Pattern::Sequence(items) if items.len() == 1 => items[0].root_kinds(),
            Pattern::Alternation(branches) => {
                let mut kinds = BTreeSet::new();
                for branch in branches {
                    kinds.extend(branch.root_kinds()?);
                }
                Some(kinds)
            }
            _ => None,
        }
    }

    fn collect_names(&self, names: &mut BTreeSet<String>) -> std::result::Result<(), String> {
        let bind = |name: &str, names: &mut BTreeSet<String>| {
            if names.insert(name.to_string()) {
                Ok(())
            } else {
                Err(format!("duplicate capture name '{name}'"))
            }
        };
        match self {
            Pattern::Literal(_) | Pattern::Wildcard(None) | Pattern::Kind { children: None, .. } => {
                Ok(())
            }
            Pattern::Wildcard(Some(name)) => bind(name, names),
            Pattern::Capture { name, pattern } => {
                if !pattern.is_single_node() {
                    return Err(format!("capture '{name}' must bind exactly one node"));
                }
                bind(name, names)?;
                pattern.collect_names(names)
            }
            Pattern::Kind {
                children: Some(children),
                ..
            } => children.collect_names(names),
            Pattern::Sequence(items) => items.iter().try_for_each(|p| p.collect_names(names)),
            Pattern::Alternation(branches) => {
                // Branches are exclusive, so each may reuse the same names.
                let mut union = names.clone();
                for branch in branches {
                    let mut scope = names.clone();
                    branch.collect_names(&mut scope)?;
                    union.extend(scope);
                }
                *names = union;
                Ok(())
            }
        }
    }

    fn write(&self, f: &mut fmt::Formatter<'_>, nested: bool) -> fmt::Result {
        match self {
            Pattern::Literal(text) => {
                let escaped = text.replace('\\', "\\\\").replace('\'', "\\'");
                write!(f, "'{escaped}'")
            }
            Pattern::Wildcard(None) => f.write_str("any"),
            Pattern::Wildcard(Some(name)) => write!(f, "{name}=any"),
            Pattern::Kind {
                kind,
                children: None,
            } => f.write_str(kind.name()),
            Pattern::Kind {
                kind,
                children: Some(children),
            } => {
                write!(f, "{}< ", kind.name())?;
                children.write(f, false)?;
                f.write_str(" >")
            }
            Pattern::Sequence(items) => {
                if nested {
                    f.write_str("(")?;
                }
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    item.write(f, true)?;
                }
                if nested {
                    f.write_str(")")?;
                }
                Ok(())
            }
            Pattern::Alternation(branches) => {
                if nested {
                    f.write_str("(")?;
                }
                for (i, branch) in branches.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" | ")?;
                    }
                    branch.write(f, false)?;
                }
                if nested {
                    f.write_str(")")?;
                }
                Ok(())
            }
            Pattern::Capture { name, pattern } => {
                write!(f, "{name}=")?;
                pattern.write(f, true)
            }
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write(f, false)
    }
}

/// A validated pattern ready for matching.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    rule: String,
    pattern: Pattern,
    capture_names: Vec<String>,
    root_kinds: Option<BTreeSet<&'static str>>,
}

impl CompiledPattern {
    /// Compiles a pattern spec on behalf of the named rule.
    ///
    /// Fails on unbalanced groups, unknown node kinds, duplicate capture
    /// names and patterns whose top level spans more than one node.
    pub fn compile(rule: &str, spec: &str) -> Result<Self> {
        let pattern = parser::parse(spec).map_err(|message| FixerError::pattern(rule, message))?;
        Self::from_pattern(rule, pattern)
    }

    /// Validates an already-built pattern.
    pub fn from_pattern(rule: &str, pattern: Pattern) -> Result<Self> {
        if !pattern.is_single_node() {
            return Err(FixerError::pattern(
                rule,
                "top-level pattern must match a single node",
            ));
        }
        let mut names = BTreeSet::new();
        pattern
            .collect_names(&mut names)
            .map_err(|message| FixerError::pattern(rule, message))?;

        Ok(Self {
            rule: rule.to_string(),
            root_kinds: pattern.root_kinds(),
            capture_names: names.into_iter().collect(),
            pattern,
        })
    }

    pub fn rule(&self) -> &str {
        &self.rule
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    /// All capture names the pattern can bind, sorted.
    pub fn capture_names(&self) -> &[String] {
        &self.capture_names
    }

    /// Cheap pre-check on the root node kind before structural matching.
    pub fn accepts_kind(&self, kind: SyntaxKind) -> bool {
        self.root_kinds
            .as_ref()
            .is_none_or(|kinds| kinds.contains(kind.name()))
    }
}

impl fmt::Display for CompiledPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.pattern.fmt(f)
    }
}

/// Compiles a pattern that is not tied to a named rule.
pub fn compile(spec: &str) -> Result<CompiledPattern> {
    CompiledPattern::compile("<pattern>", spec)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_names_across_branches() {
        let pattern = CompiledPattern::compile(
            "options_object",
            "power< head='opts' trailer< '.' name=any > > | power< head='options' trailer< '.' name=any > >",
        )
        .unwrap();
        assert_eq!(pattern.capture_names(), ["head", "name"]);
    }

    #[test]
    fn test_duplicate_capture_is_rejected() {
        let err = CompiledPattern::compile("dup", "power< x=any trailer< '.' x=any > >").unwrap_err();
        match err {
            FixerError::PatternSyntax { rule, message } => {
                assert_eq!(rule, "dup");
                assert!(message.contains("duplicate capture name 'x'"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_duplicate_against_outer_scope() {
        let err = compile("power< x=any (x=any | 'a') >").unwrap_err();
        assert!(err.to_string().contains("duplicate capture name 'x'"));
    }

    #[test]
    fn test_top_level_must_be_single_node() {
        assert!(compile("'a' 'b'").is_err());
        assert!(compile("('a' 'b') | 'c'").is_err());
    }

    #[test]
    fn test_capture_of_sequence_is_rejected() {
        let err = compile("power< x=('a' 'b') >").unwrap_err();
        assert!(err.to_string().contains("exactly one node"));
    }

    #[test]
    fn test_unknown_kind_reports_rule() {
        let err = CompiledPattern::compile("broken", "lambdef< any >").unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("broken"));
    }

    #[test]
    fn test_accepts_kind() {
        let pattern = compile("power< any any > | trailer").unwrap();
        assert!(pattern.accepts_kind(SyntaxKind::Power));
        assert!(pattern.accepts_kind(SyntaxKind::Trailer));
        assert!(!pattern.accepts_kind(SyntaxKind::Name));

        let literal = compile("'opts'").unwrap();
        assert!(literal.accepts_kind(SyntaxKind::Name));
    }

    #[test]
    fn test_display_normalizes() {
        let pattern = compile("power<head=('opts'|'options') trailer<'.' name=any>>").unwrap();
        assert_eq!(
            pattern.to_string(),
            "power< head=('opts' | 'options') trailer< '.' name=any > >"
        );
        let reparsed = compile(&pattern.to_string()).unwrap();
        assert_eq!(reparsed.pattern(), pattern.pattern());
    }

    #[test]
    fn test_display_escapes_quotes() {
        let pattern = compile(r#""Can't""#).unwrap();
        assert_eq!(pattern.to_string(), r"'Can\'t'");
    }
}
