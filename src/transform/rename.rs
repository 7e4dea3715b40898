//! Context-free identifier rename.

use super::{Rewrite, Rule};
use crate::error::{FixerError, Result};
use crate::matcher::Captures;
use crate::pattern::{CompiledPattern, Pattern};
use crate::tree::{is_identifier, NodeId, SyntaxKind, Tree};

/// Renames every `NAME` token spelled `from` to `to`.
///
/// Strings and comments are separate token kinds or trivia, so they never
/// match.
pub struct TokenRename {
    pattern: CompiledPattern,
    to: String,
}

impl TokenRename {
    pub const NAME: &'static str = "replace_opts";

    pub fn new(from: &str, to: &str) -> Result<Self> {
        for name in [from, to] {
            if !is_identifier(name) {
                return Err(FixerError::InvalidConfig(format!(
                    "{} can only rename identifiers, got {name:?}",
                    Self::NAME
                )));
            }
        }
        let pattern = CompiledPattern::from_pattern(Self::NAME, Pattern::Literal(from.to_string()))?;
        Ok(Self {
            pattern,
            to: to.to_string(),
        })
    }
}

impl Rule for TokenRename {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn pattern(&self) -> &CompiledPattern {
        &self.pattern
    }

    fn rewrite(&self, tree: &Tree, node: NodeId, _captures: &Captures) -> Result<Rewrite> {
        if tree.kind(node) != SyntaxKind::Name {
            return Err(FixerError::TransformInvariant {
                rule: Self::NAME.to_string(),
                node: format!("{} at {}", tree.kind(node), tree.location(node)),
            });
        }
        Ok(Rewrite::SetText {
            node,
            text: self.to.clone(),
        })
    }
}
