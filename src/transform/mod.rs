//! Transform rules and the in-place tree edits they produce.
//!
//! A [`Rule`] pairs a compiled pattern with a rewrite function. The rewrite
//! never touches the tree itself; it describes the edit as a [`Rewrite`],
//! which [`apply`] validates and then splices into the tree.

mod callee;
mod custom;
mod rename;
mod subscript;

pub use callee::CalleeRename;
pub use custom::CustomRule;
pub use rename::TokenRename;
pub use subscript::AttributeToSubscript;

use crate::error::{FixerError, Result};
use crate::matcher::Captures;
use crate::pattern::CompiledPattern;
use crate::tree::{is_operator, tokenize, Location, NodeId, SyntaxKind, Tree};
use std::collections::HashSet;

/// A structural rewrite rule that can be shared across worker threads.
pub trait Rule: Send + Sync {
    /// Name reported in match records and errors.
    fn name(&self) -> &str;

    fn pattern(&self) -> &CompiledPattern;

    /// Computes the edit for a match of [`Rule::pattern`] at `node`.
    fn rewrite(&self, tree: &Tree, node: NodeId, captures: &Captures) -> Result<Rewrite>;
}

/// An edit to apply to a tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rewrite {
    /// Change the text of a token, keeping its prefix.
    SetText { node: NodeId, text: String },
    /// Swap `node` for a new subtree, which inherits `node`'s prefix.
    Replace { node: NodeId, with: NewNode },
}

/// Blueprint of a replacement subtree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NewNode {
    Token { kind: SyntaxKind, text: String },
    Composite { kind: SyntaxKind, children: Vec<NewNode> },
    /// Moves an existing node, which must lie inside the replaced subtree.
    Existing(NodeId),
}

impl NewNode {
    pub fn token(kind: SyntaxKind, text: impl Into<String>) -> Self {
        NewNode::Token {
            kind,
            text: text.into(),
        }
    }

    pub fn composite(kind: SyntaxKind, children: impl IntoIterator<Item = NewNode>) -> Self {
        NewNode::Composite {
            kind,
            children: children.into_iter().collect(),
        }
    }

    fn token_count(&self, tree: &Tree) -> usize {
        match self {
            NewNode::Token { .. } => 1,
            NewNode::Composite { children, .. } => {
                children.iter().map(|child| child.token_count(tree)).sum()
            }
            NewNode::Existing(id) => tree.tokens(*id).len(),
        }
    }

    fn existing(&self, out: &mut Vec<NodeId>) {
        match self {
            NewNode::Existing(id) => out.push(*id),
            NewNode::Composite { children, .. } => {
                children.iter().for_each(|child| child.existing(out))
            }
            NewNode::Token { .. } => {}
        }
    }
}

/// Builds `head[key]` with `key` already rendered as a string literal.
pub fn subscript(head: NodeId, key_literal: String) -> NewNode {
    NewNode::composite(
        SyntaxKind::Power,
        [
            NewNode::Existing(head),
            NewNode::composite(
                SyntaxKind::Trailer,
                [
                    NewNode::token(SyntaxKind::Op, "["),
                    NewNode::token(SyntaxKind::String, key_literal),
                    NewNode::token(SyntaxKind::Op, "]"),
                ],
            ),
        ],
    )
}

/// Returns true if `text` tokenizes to exactly one token of `kind`.
///
/// Operators are checked against the operator table, so a lone bracket
/// counts even though it would not tokenize on its own.
pub fn lexes_as(kind: SyntaxKind, text: &str) -> bool {
    if kind == SyntaxKind::Op {
        return is_operator(text);
    }
    let Ok(tokens) = tokenize(text) else {
        return false;
    };
    match tokens.as_slice() {
        [token, end] => {
            token.kind == kind
                && token.prefix.is_empty()
                && token.text == text
                && end.kind == SyntaxKind::EndMarker
                && end.prefix.is_empty()
        }
        _ => false,
    }
}

fn invariant(rule: &str, tree: &Tree, node: NodeId) -> FixerError {
    FixerError::TransformInvariant {
        rule: rule.to_string(),
        node: format!("{} at {}", tree.kind(node), tree.location(node)),
    }
}

/// Checks a rewrite against the current tree without changing it.
pub fn validate(tree: &Tree, rule: &str, rewrite: &Rewrite) -> Result<()> {
    match rewrite {
        Rewrite::SetText { node, text } => {
            if !tree.is_attached(*node)
                || !tree.is_token(*node)
                || !lexes_as(tree.kind(*node), text)
            {
                return Err(invariant(rule, tree, *node));
            }
            Ok(())
        }
        Rewrite::Replace { node, with } => {
            if !tree.is_attached(*node) {
                return Err(invariant(rule, tree, *node));
            }
            validate_new(tree, rule, *node, with)?;

            let mut reused = Vec::new();
            with.existing(&mut reused);
            let mut seen = HashSet::new();
            for id in &reused {
                let inside = tree.is_ancestor_or_self(*node, *id) && tree.is_attached(*id);
                if !inside || !seen.insert(*id) {
                    return Err(invariant(rule, tree, *node));
                }
            }
            // A reused node may not also be moved as part of another reused node.
            for id in &reused {
                let nested = reused
                    .iter()
                    .any(|other| other != id && tree.is_ancestor_or_self(*other, *id));
                if nested {
                    return Err(invariant(rule, tree, *node));
                }
            }
            // Comments on dropped tokens move to the replacement's last token,
            // which must not be the one inheriting the old prefix.
            if !dropped_comments(tree, *node, &reused).is_empty() && with.token_count(tree) < 2 {
                return Err(invariant(rule, tree, *node));
            }
            Ok(())
        }
    }
}

fn validate_new(tree: &Tree, rule: &str, replaced: NodeId, new: &NewNode) -> Result<()> {
    match new {
        NewNode::Token { kind, text } => {
            if !kind.is_token() || !lexes_as(*kind, text) {
                return Err(invariant(rule, tree, replaced));
            }
            Ok(())
        }
        NewNode::Composite { kind, children } => {
            if kind.is_token() || children.is_empty() {
                return Err(invariant(rule, tree, replaced));
            }
            children
                .iter()
                .try_for_each(|child| validate_new(tree, rule, replaced, child))
        }
        NewNode::Existing(_) => Ok(()),
    }
}

/// Validates and applies a rewrite produced by `rule`.
///
/// On error the tree is left unchanged.
pub fn apply(tree: &mut Tree, rule: &str, rewrite: Rewrite) -> Result<()> {
    validate(tree, rule, &rewrite)?;
    match rewrite {
        Rewrite::SetText { node, text } => tree.set_token_text(node, text),
        Rewrite::Replace { node, with } => replace(tree, node, with),
    }
    Ok(())
}

/// Trivia of tokens under `old` that a replacement drops, if it holds a comment.
fn dropped_comments(tree: &Tree, old: NodeId, reused: &[NodeId]) -> String {
    let first = tree.first_token(old);
    tree.tokens(old)
        .into_iter()
        .filter(|token| Some(*token) != first)
        .filter(|token| !reused.iter().any(|id| tree.is_ancestor_or_self(*id, *token)))
        .map(|token| tree.prefix(token))
        .filter(|prefix| prefix.contains('#'))
        .collect()
}

fn replace(tree: &mut Tree, old: NodeId, with: NewNode) {
    if with == NewNode::Existing(old) {
        return;
    }
    let mut reused = Vec::new();
    with.existing(&mut reused);
    let carried = dropped_comments(tree, old, &reused);

    let prefix = tree.prefix(old).to_string();
    let location = tree.location(old);
    let was_root = tree.root() == old;
    let slot = tree.detach(old);
    for id in reused {
        tree.detach(id);
    }

    let new = build(tree, with, location);
    match slot {
        Some((parent, index)) => tree.attach(parent, index, new),
        None if was_root => tree.set_root(new),
        None => {}
    }
    tree.set_prefix(new, prefix);
    if !carried.is_empty()
        && let Some(last) = tree.last_token(new)
    {
        let prefix = format!("{carried}{}", tree.prefix(last));
        tree.set_prefix(last, prefix);
    }
}

fn build(tree: &mut Tree, node: NewNode, location: Location) -> NodeId {
    match node {
        NewNode::Token { kind, text } => tree.alloc_token(kind, text, "", location),
        NewNode::Composite { kind, children } => {
            let children = children
                .into_iter()
                .map(|child| build(tree, child, location))
                .collect();
            tree.alloc_composite(kind, children)
        }
        NewNode::Existing(id) => id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::parse;

    fn find(tree: &Tree, kind: SyntaxKind, text: &str) -> NodeId {
        tree.preorder()
            .into_iter()
            .find(|id| tree.kind(*id) == kind && tree.text(*id) == text)
            .unwrap()
    }

    #[test]
    fn test_lexes_as() {
        assert!(lexes_as(SyntaxKind::Name, "options"));
        assert!(lexes_as(SyntaxKind::String, "'input_fp'"));
        assert!(!lexes_as(SyntaxKind::Name, "a b"));
        assert!(!lexes_as(SyntaxKind::Name, " a"));
        assert!(!lexes_as(SyntaxKind::Name, "'a'"));
        assert!(!lexes_as(SyntaxKind::String, "'open"));
        assert!(!lexes_as(SyntaxKind::Op, ""));
        assert!(lexes_as(SyntaxKind::Op, "["));
        assert!(lexes_as(SyntaxKind::Op, "]"));
        assert!(lexes_as(SyntaxKind::Op, "."));
        assert!(!lexes_as(SyntaxKind::Op, "[ "));
        assert!(!lexes_as(SyntaxKind::Name, "["));
    }

    #[test]
    fn test_set_text_keeps_prefix() {
        let mut tree = parse("x =  opts\n").unwrap();
        let opts = find(&tree, SyntaxKind::Name, "opts");
        apply(
            &mut tree,
            "rename",
            Rewrite::SetText {
                node: opts,
                text: "options".to_string(),
            },
        )
        .unwrap();
        assert_eq!(tree.serialize(), "x =  options\n");
    }

    #[test]
    fn test_replace_reuses_head_and_inherits_prefix() {
        let mut tree = parse("y = opts.input_fp  # c\n").unwrap();
        let power = find(&tree, SyntaxKind::Power, "opts.input_fp");
        let head = tree.children(power)[0];
        apply(
            &mut tree,
            "subscript",
            Rewrite::Replace {
                node: power,
                with: subscript(head, "'input_fp'".to_string()),
            },
        )
        .unwrap();

        assert_eq!(tree.serialize(), "y = opts['input_fp']  # c\n");
        let new = tree.parent(head).unwrap();
        assert_eq!(tree.kind(new), SyntaxKind::Power);
        for id in tree.preorder() {
            for child in tree.children(id) {
                assert_eq!(tree.parent(*child), Some(id));
            }
        }
    }

    #[test]
    fn test_replace_keeps_comments_of_dropped_tokens() {
        let source = "f(opts  # keep this note\n  .input_fp)\n";
        let mut tree = parse(source).unwrap();
        let power = find(&tree, SyntaxKind::Power, "opts  # keep this note\n  .input_fp");
        let head = tree.children(power)[0];
        apply(
            &mut tree,
            "subscript",
            Rewrite::Replace {
                node: power,
                with: subscript(head, "'input_fp'".to_string()),
            },
        )
        .unwrap();
        assert_eq!(
            tree.serialize(),
            "f(opts['input_fp'  # keep this note\n  ])\n"
        );
    }

    #[test]
    fn test_single_token_replacement_cannot_drop_comments() {
        let source = "f(a  # note\n  .b)\n";
        let mut tree = parse(source).unwrap();
        let power = find(&tree, SyntaxKind::Power, "a  # note\n  .b");
        let err = apply(
            &mut tree,
            "collapse",
            Rewrite::Replace {
                node: power,
                with: NewNode::token(SyntaxKind::Name, "x"),
            },
        )
        .unwrap_err();
        assert!(matches!(err, FixerError::TransformInvariant { .. }));
        assert_eq!(tree.serialize(), source);
    }

    #[test]
    fn test_new_token_inherits_prefix() {
        let mut tree = parse("f( a)\n").unwrap();
        let a = find(&tree, SyntaxKind::Name, "a");
        apply(
            &mut tree,
            "swap",
            Rewrite::Replace {
                node: a,
                with: NewNode::token(SyntaxKind::Number, "1"),
            },
        )
        .unwrap();
        assert_eq!(tree.serialize(), "f( 1)\n");
    }

    #[test]
    fn test_empty_composite_is_rejected() {
        let mut tree = parse("a.b\n").unwrap();
        let power = find(&tree, SyntaxKind::Power, "a.b");
        let err = apply(
            &mut tree,
            "broken",
            Rewrite::Replace {
                node: power,
                with: NewNode::composite(SyntaxKind::Power, []),
            },
        )
        .unwrap_err();
        assert!(matches!(err, FixerError::TransformInvariant { ref rule, .. } if rule == "broken"));
        assert_eq!(tree.serialize(), "a.b\n");
    }

    #[test]
    fn test_reusing_ancestor_is_rejected() {
        let mut tree = parse("a.b\n").unwrap();
        let power = find(&tree, SyntaxKind::Power, "a.b");
        let trailer = tree.children(power)[1];
        let err = apply(
            &mut tree,
            "cycle",
            Rewrite::Replace {
                node: trailer,
                with: NewNode::composite(SyntaxKind::Trailer, [NewNode::Existing(power)]),
            },
        )
        .unwrap_err();
        assert!(matches!(err, FixerError::TransformInvariant { .. }));
        assert_eq!(tree.serialize(), "a.b\n");
    }

    #[test]
    fn test_reusing_detached_node_is_rejected() {
        let mut tree = parse("a.b\nc\n").unwrap();
        let b = find(&tree, SyntaxKind::Name, "b");
        let c = find(&tree, SyntaxKind::Name, "c");
        tree.detach(b);
        let err = apply(
            &mut tree,
            "detached",
            Rewrite::Replace {
                node: c,
                with: NewNode::Existing(b),
            },
        )
        .unwrap_err();
        assert!(matches!(err, FixerError::TransformInvariant { .. }));
    }

    #[test]
    fn test_invalid_token_text_is_rejected() {
        let mut tree = parse("opts\n").unwrap();
        let opts = find(&tree, SyntaxKind::Name, "opts");
        let err = apply(
            &mut tree,
            "bad_name",
            Rewrite::SetText {
                node: opts,
                text: "not a name".to_string(),
            },
        )
        .unwrap_err();
        assert!(err.to_string().contains("bad_name"));
        assert!(err.to_string().contains("NAME at 1:1"));
    }

    #[test]
    fn test_set_text_on_composite_is_rejected() {
        let mut tree = parse("a.b\n").unwrap();
        let power = find(&tree, SyntaxKind::Power, "a.b");
        let result = apply(
            &mut tree,
            "composite",
            Rewrite::SetText {
                node: power,
                text: "x".to_string(),
            },
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_replace_root() {
        let mut tree = parse("a\n").unwrap();
        let root = tree.root();
        let children: Vec<NewNode> = tree.children(root).iter().map(|c| NewNode::Existing(*c)).collect();
        apply(
            &mut tree,
            "root",
            Rewrite::Replace {
                node: root,
                with: NewNode::composite(SyntaxKind::FileInput, children),
            },
        )
        .unwrap();
        assert_ne!(tree.root(), root);
        assert_eq!(tree.serialize(), "a\n");
    }
}
