//! Ordered multi-pass rewriting of one source unit.
//!
//! Every pass walks the whole tree, collects its matches, and only then
//! applies them, so a pass never sees its own edits. The next pass starts on
//! the result.

use serde::Serialize;
use tracing::{debug, error};

use crate::error::Result;
use crate::matcher::{match_node, TreeWalker};
use crate::registry::Fixer;
use crate::transform::{apply, Rule};
use crate::tree::{parse, Location, Tree};

/// One applied rewrite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchRecord {
    pub fixer: String,
    pub rule: String,
    pub location: Location,
    /// Source text of the matched node before the rewrite.
    pub matched: String,
}

/// Runs one pass made of `rules` over the tree.
///
/// Matches are applied in reverse pre-order so edits inside a subtree land
/// before an edit of the subtree itself; each is re-checked against the
/// current tree first and dropped if it no longer holds. Records come back
/// in pre-order.
pub fn run_rules(tree: &mut Tree, fixer: &str, rules: &[&dyn Rule]) -> Result<Vec<MatchRecord>> {
    let matches = TreeWalker::new(rules.iter().map(|r| r.pattern())).find_matches(tree);
    let mut records = Vec::with_capacity(matches.len());

    for found in matches.into_iter().rev() {
        let rule = rules[found.pattern];
        if !tree.is_attached(found.node) {
            debug!(fixer, rule = rule.name(), "skipping match inside a replaced subtree");
            continue;
        }
        let Some(captures) = match_node(tree, found.node, rule.pattern()) else {
            debug!(fixer, rule = rule.name(), "match no longer holds after inner rewrite");
            continue;
        };

        let location = tree.location(found.node);
        let matched = tree.text(found.node);
        let rewrite = rule.rewrite(tree, found.node, &captures)?;
        if let Err(e) = apply(tree, rule.name(), rewrite) {
            error!(fixer, rule = rule.name(), %location, "{e}");
            return Err(e);
        }
        records.push(MatchRecord {
            fixer: fixer.to_string(),
            rule: rule.name().to_string(),
            location,
            matched,
        });
    }

    records.reverse();
    Ok(records)
}

/// Runs the passes in order over one tree.
pub fn run(tree: &mut Tree, passes: &[&Fixer]) -> Result<Vec<MatchRecord>> {
    let mut records = Vec::new();
    for fixer in passes {
        let rules: Vec<&dyn Rule> = fixer.rules().iter().map(|r| r.as_ref()).collect();
        let found = run_rules(tree, fixer.name(), &rules)?;
        debug!(fixer = fixer.name(), matches = found.len(), "pass complete");
        records.extend(found);
    }
    Ok(records)
}

/// Result of fixing one source text.
#[derive(Debug, Clone)]
pub struct FixOutput {
    /// The rewritten text, or `None` when nothing matched.
    pub text: Option<String>,
    pub records: Vec<MatchRecord>,
}

impl FixOutput {
    /// The text to keep: the rewrite if there was one, else `original`.
    pub fn text_or<'a>(&'a self, original: &'a str) -> &'a str {
        self.text.as_deref().unwrap_or(original)
    }

    /// Returns true if the output differs from `original`.
    pub fn is_modified(&self, original: &str) -> bool {
        self.text.as_deref().is_some_and(|text| text != original)
    }
}

/// Parses, fixes and serializes one source text.
///
/// When no pass matches, the original text is kept as is rather than
/// re-serialized.
pub fn fix_source(source: &str, passes: &[&Fixer]) -> Result<FixOutput> {
    let mut tree = parse(source)?;
    let records = run(&mut tree, passes)?;
    let text = (!records.is_empty()).then(|| tree.serialize());
    Ok(FixOutput { text, records })
}
