//! Rules declared in configuration.

use super::{subscript, Rewrite, Rule};
use crate::config::{CustomFixerSpec, QuoteStyle, RuleAction};
use crate::error::{FixerError, Result};
use crate::matcher::Captures;
use crate::pattern::CompiledPattern;
use crate::tree::{NodeId, Tree};

/// A pattern plus a fixed action, built from a [`CustomFixerSpec`].
pub struct CustomRule {
    name: String,
    pattern: CompiledPattern,
    action: RuleAction,
    quote: QuoteStyle,
}

impl CustomRule {
    /// Compiles the pattern and checks that the action's captures exist.
    pub fn from_spec(spec: &CustomFixerSpec, quote: QuoteStyle) -> Result<Self> {
        let pattern = CompiledPattern::compile(&spec.name, &spec.pattern)?;
        let needed: Vec<&String> = match &spec.action {
            RuleAction::SetText { capture, .. } => vec![capture],
            RuleAction::Subscript { head, key } => vec![head, key],
        };
        for capture in needed {
            if !pattern.capture_names().contains(capture) {
                return Err(FixerError::InvalidConfig(format!(
                    "fixer '{}' uses capture '{capture}', which its pattern never binds",
                    spec.name
                )));
            }
        }
        Ok(Self {
            name: spec.name.clone(),
            pattern,
            action: spec.action.clone(),
            quote,
        })
    }

    fn capture(&self, tree: &Tree, node: NodeId, captures: &Captures, name: &str) -> Result<NodeId> {
        // Captures from an alternation branch that did not win are absent.
        captures
            .get(name)
            .copied()
            .ok_or_else(|| FixerError::TransformInvariant {
                rule: self.name.clone(),
                node: format!("{} at {}", tree.kind(node), tree.location(node)),
            })
    }
}

impl Rule for CustomRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn pattern(&self) -> &CompiledPattern {
        &self.pattern
    }

    fn rewrite(&self, tree: &Tree, node: NodeId, captures: &Captures) -> Result<Rewrite> {
        match &self.action {
            RuleAction::SetText { capture, text } => Ok(Rewrite::SetText {
                node: self.capture(tree, node, captures, capture)?,
                text: text.clone(),
            }),
            RuleAction::Subscript { head, key } => {
                let head = self.capture(tree, node, captures, head)?;
                let key = self.capture(tree, node, captures, key)?;
                Ok(Rewrite::Replace {
                    node,
                    with: subscript(head, self.quote.quote(&tree.text(key))),
                })
            }
        }
    }
}
