//! Structural matching of compiled patterns against syntax trees.

use crate::pattern::{CompiledPattern, Pattern};
use crate::tree::{NodeId, Tree};
use std::collections::BTreeMap;

/// Capture name to matched subtree.
pub type Captures = BTreeMap<String, NodeId>;

/// A successful match of one pattern at one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeMatch {
    pub node: NodeId,
    /// Index of the winning pattern in the walker's registration order.
    pub pattern: usize,
    pub captures: Captures,
}

/// Matches a compiled pattern against a single node.
pub fn match_node(tree: &Tree, node: NodeId, pattern: &CompiledPattern) -> Option<Captures> {
    if !pattern.accepts_kind(tree.kind(node)) {
        return None;
    }
    let mut captures = Captures::new();
    match_single(tree, node, pattern.pattern(), &mut captures).then_some(captures)
}

fn match_single(tree: &Tree, node: NodeId, pattern: &Pattern, captures: &mut Captures) -> bool {
    match pattern {
        Pattern::Literal(text) => tree.token_text(node) == Some(text.as_str()),
        Pattern::Wildcard(name) => {
            if let Some(name) = name {
                captures.insert(name.clone(), node);
            }
            true
        }
        Pattern::Kind { kind, children } => {
            if tree.kind(node) != *kind {
                return false;
            }
            match children {
                Some(children) => {
                    match_sequence(tree, &[children.as_ref()], tree.children(node), captures)
                }
                None => true,
            }
        }
        Pattern::Alternation(branches) => branches.iter().any(|branch| {
            let mut trial = captures.clone();
            let matched = match_single(tree, node, branch, &mut trial);
            if matched {
                *captures = trial;
            }
            matched
        }),
        Pattern::Capture { name, pattern } => {
            let matched = match_single(tree, node, pattern, captures);
            if matched {
                captures.insert(name.clone(), node);
            }
            matched
        }
        Pattern::Sequence(items) => {
            let items: Vec<&Pattern> = items.iter().collect();
            match_sequence(tree, &items, std::slice::from_ref(&node), captures)
        }
    }
}

/// Aligns `patterns` with `nodes`, consuming every node.
///
/// Nested sequences are spliced in place and alternation branches are tried
/// in order against the remainder, so a group like `('a' 'b' | 'c')` may
/// cover a different number of siblings per branch.
fn match_sequence(
    tree: &Tree,
    patterns: &[&Pattern],
    nodes: &[NodeId],
    captures: &mut Captures,
) -> bool {
    let Some((first, rest)) = patterns.split_first() else {
        return nodes.is_empty();
    };

    match first {
        Pattern::Sequence(items) => {
            let spliced: Vec<&Pattern> = items.iter().chain(rest.iter().copied()).collect();
            match_sequence(tree, &spliced, nodes, captures)
        }
        Pattern::Alternation(branches) => branches.iter().any(|branch| {
            let mut trial = captures.clone();
            let spliced: Vec<&Pattern> = std::iter::once(branch)
                .chain(rest.iter().copied())
                .collect();
            let matched = match_sequence(tree, &spliced, nodes, &mut trial);
            if matched {
                *captures = trial;
            }
            matched
        }),
        single => {
            let Some((node, remaining)) = nodes.split_first() else {
                return false;
            };
            let mut trial = captures.clone();
            let matched = match_single(tree, *node, single, &mut trial)
                && match_sequence(tree, rest, remaining, &mut trial);
            if matched {
                *captures = trial;
            }
            matched
        }
    }
}

/// Walks a tree in pre-order, trying patterns in registration order.
pub struct TreeWalker<'a> {
    patterns: Vec<&'a CompiledPattern>,
}

impl<'a> TreeWalker<'a> {
    pub fn new(patterns: impl IntoIterator<Item = &'a CompiledPattern>) -> Self {
        Self {
            patterns: patterns.into_iter().collect(),
        }
    }

    /// Collects every match in the tree without modifying it.
    ///
    /// Each node is visited once; the first matching pattern wins that node,
    /// and a match (or non-match) never stops descent into the children.
    pub fn find_matches(&self, tree: &Tree) -> Vec<TreeMatch> {
        let mut matches = Vec::new();
        for node in tree.preorder() {
            let hit = self
                .patterns
                .iter()
                .enumerate()
                .find_map(|(index, pattern)| {
                    match_node(tree, node, pattern).map(|captures| (index, captures))
                });
            if let Some((pattern, captures)) = hit {
                matches.push(TreeMatch {
                    node,
                    pattern,
                    captures,
                });
            }
        }
        matches
    }

    /// Returns true if any node matches.
    pub fn has_matches(&self, tree: &Tree) -> bool {
        tree.preorder().into_iter().any(|node| {
            self.patterns
                .iter()
                .any(|pattern| match_node(tree, node, pattern).is_some())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::compile;
    use crate::tree::parse;

    fn texts(tree: &Tree, matches: &[TreeMatch]) -> Vec<String> {
        matches.iter().map(|m| tree.text(m.node)).collect()
    }

    #[test]
    fn test_attribute_pattern_captures() {
        let tree = parse("x = opts.input_fp\n").unwrap();
        let pattern = compile("power< head=('opts' | 'options') trailer< '.' name=any > >").unwrap();
        let matches = TreeWalker::new([&pattern]).find_matches(&tree);

        assert_eq!(matches.len(), 1);
        let captures = &matches[0].captures;
        assert_eq!(tree.text(captures["head"]), "opts");
        assert_eq!(tree.text(captures["name"]), "input_fp");
    }

    #[test]
    fn test_sequence_must_cover_all_children() {
        let tree = parse("opts.a.b\nopts.a(1)\nopts.a\n").unwrap();
        let pattern = compile("power< 'opts' trailer< '.' any > >").unwrap();
        let matches = TreeWalker::new([&pattern]).find_matches(&tree);
        assert_eq!(texts(&tree, &matches), vec!["opts.a"]);
    }

    #[test]
    fn test_literal_matches_tokens_only() {
        let tree = parse("opts = 'opts'  # opts\nf(opts)\n").unwrap();
        let pattern = compile("'opts'").unwrap();
        let matches = TreeWalker::new([&pattern]).find_matches(&tree);
        assert_eq!(matches.len(), 2);
        assert!(matches.iter().all(|m| tree.is_token(m.node)));
    }

    #[test]
    fn test_matches_inside_matches_are_found() {
        let tree = parse("f(opts.a).g(opts.b)\n").unwrap();
        let pattern = compile("power< 'opts' trailer< '.' any > >").unwrap();
        let matches = TreeWalker::new([&pattern]).find_matches(&tree);
        assert_eq!(texts(&tree, &matches), vec!["opts.a", "opts.b"]);
    }

    #[test]
    fn test_first_pattern_wins_per_node() {
        let tree = parse("opts.a\n").unwrap();
        let specific = compile("power< 'opts' trailer< '.' 'a' > >").unwrap();
        let general = compile("power< any trailer< '.' any > >").unwrap();
        let matches = TreeWalker::new([&specific, &general]).find_matches(&tree);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].pattern, 0);

        let matches = TreeWalker::new([&general, &specific]).find_matches(&tree);
        assert_eq!(matches[0].pattern, 0);
    }

    #[test]
    fn test_alternation_surfaces_only_winning_branch_captures() {
        let tree = parse("opts.a\n").unwrap();
        let pattern =
            compile("power< (x='opts' trailer< '.' 'b' > | y=any z=trailer) >").unwrap();
        let matches = TreeWalker::new([&pattern]).find_matches(&tree);
        assert_eq!(matches.len(), 1);
        let captures = &matches[0].captures;
        assert!(!captures.contains_key("x"));
        assert_eq!(tree.text(captures["y"]), "opts");
        assert_eq!(tree.text(captures["z"]), ".a");
    }

    #[test]
    fn test_group_branches_of_different_width() {
        let tree = parse("f(a, b)\nf(c)\n").unwrap();
        let pattern =
            compile("trailer< '(' (arglist< 'a' ',' 'b' > | NAME) ')' >").unwrap();
        let matches = TreeWalker::new([&pattern]).find_matches(&tree);
        assert_eq!(texts(&tree, &matches), vec!["(a, b)", "(c)"]);

        let spliced = compile("trailer< ('(' NAME) ')' >").unwrap();
        let matches = TreeWalker::new([&spliced]).find_matches(&tree);
        assert_eq!(texts(&tree, &matches), vec!["(c)"]);
    }

    #[test]
    fn test_has_matches() {
        let tree = parse("x = 1\n").unwrap();
        let pattern = compile("'opts'").unwrap();
        assert!(!TreeWalker::new([&pattern]).has_matches(&tree));
    }
}
