//! Attribute access to subscript: `opts.input_fp` becomes `opts['input_fp']`.

use super::{subscript, Rewrite, Rule};
use crate::config::QuoteStyle;
use crate::error::{FixerError, Result};
use crate::matcher::Captures;
use crate::pattern::CompiledPattern;
use crate::tree::{NodeId, Tree};

/// Rewrites single attribute lookups on the configured heads into subscripts.
///
/// Only a head followed by exactly one `.name` trailer matches; calls and
/// longer chains such as `opts.a.b` or `opts.a()` are left alone.
pub struct AttributeToSubscript {
    pattern: CompiledPattern,
    quote: QuoteStyle,
}

impl AttributeToSubscript {
    pub const NAME: &'static str = "options_object";

    pub fn new<S: AsRef<str>>(heads: &[S], quote: QuoteStyle) -> Result<Self> {
        let heads: Vec<String> = heads
            .iter()
            .map(|h| format!("'{}'", h.as_ref()))
            .collect();
        if heads.is_empty() {
            return Err(FixerError::InvalidConfig(format!(
                "{} needs at least one attribute head",
                Self::NAME
            )));
        }
        let spec = format!(
            "power< head=({}) trailer< '.' name=any > >",
            heads.join(" | ")
        );
        Ok(Self {
            pattern: CompiledPattern::compile(Self::NAME, &spec)?,
            quote,
        })
    }
}

impl Rule for AttributeToSubscript {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn pattern(&self) -> &CompiledPattern {
        &self.pattern
    }

    fn rewrite(&self, tree: &Tree, node: NodeId, captures: &Captures) -> Result<Rewrite> {
        let (Some(head), Some(name)) = (captures.get("head"), captures.get("name")) else {
            return Err(FixerError::TransformInvariant {
                rule: Self::NAME.to_string(),
                node: format!("{} at {}", tree.kind(node), tree.location(node)),
            });
        };
        Ok(Rewrite::Replace {
            node,
            with: subscript(*head, self.quote.quote(&tree.text(*name))),
        })
    }
}
