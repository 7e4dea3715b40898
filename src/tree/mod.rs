//! Lossless concrete syntax trees.
//!
//! Source text is tokenized into leaves that carry their leading trivia
//! (whitespace, comments, line continuations) as a prefix, then grouped into
//! composite nodes. Serializing an untouched tree reproduces the input
//! byte-for-byte.
//!
//! Nodes live in an arena owned by [`Tree`] and are addressed by [`NodeId`].
//! Each node records its parent so a rewrite can splice a replacement into
//! the right slot; the parent link is only an index and owns nothing.
//!
//! ```rust
//! use fixer_dsl::tree::parse;
//!
//! let source = "x = opts.input_fp  # keep me\n";
//! let tree = parse(source)?;
//! assert_eq!(tree.serialize(), source);
//! # Ok::<(), fixer_dsl::error::FixerError>(())
//! ```

mod kind;
mod parser;
mod token;

pub use kind::SyntaxKind;
pub use parser::parse;
pub use token::{RawToken, is_identifier, is_operator, tokenize};

use serde::Serialize;
use std::fmt;

/// A 1-based line/column position in source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

impl Location {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl Default for Location {
    fn default() -> Self {
        Self::new(1, 1)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Index of a node inside its [`Tree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
enum NodeData {
    Token { text: String, prefix: String },
    Composite { children: Vec<NodeId> },
}

#[derive(Debug, Clone)]
struct Node {
    kind: SyntaxKind,
    parent: Option<NodeId>,
    location: Location,
    data: NodeData,
}

/// A concrete syntax tree for one source unit.
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Tree {
    fn empty() -> Self {
        Self {
            nodes: Vec::new(),
            root: NodeId(0),
        }
    }

    /// Returns the root node (always a `file_input` for parsed trees).
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Returns the number of nodes ever allocated, attached or not.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the arena holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn kind(&self, id: NodeId) -> SyntaxKind {
        self.node(id).kind
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn location(&self, id: NodeId) -> Location {
        self.node(id).location
    }

    pub fn is_token(&self, id: NodeId) -> bool {
        matches!(self.node(id).data, NodeData::Token { .. })
    }

    /// Children of a composite node; empty for tokens.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        match &self.node(id).data {
            NodeData::Composite { children } => children,
            NodeData::Token { .. } => &[],
        }
    }

    /// The literal text of a token, without its prefix.
    pub fn token_text(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).data {
            NodeData::Token { text, .. } => Some(text),
            NodeData::Composite { .. } => None,
        }
    }

    /// Returns the first token of a subtree, if it has any.
    pub fn first_token(&self, id: NodeId) -> Option<NodeId> {
        let mut current = id;
        loop {
            match &self.node(current).data {
                NodeData::Token { .. } => return Some(current),
                NodeData::Composite { children } => current = *children.first()?,
            }
        }
    }

    /// Returns the last token of a subtree, if it has any.
    pub fn last_token(&self, id: NodeId) -> Option<NodeId> {
        let mut current = id;
        loop {
            match &self.node(current).data {
                NodeData::Token { .. } => return Some(current),
                NodeData::Composite { children } => current = *children.last()?,
            }
        }
    }

    /// Tokens of a subtree in source order.
    pub fn tokens(&self, id: NodeId) -> Vec<NodeId> {
        let mut tokens = Vec::new();
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            match &self.node(node).data {
                NodeData::Token { .. } => tokens.push(node),
                NodeData::Composite { children } => stack.extend(children.iter().rev().copied()),
            }
        }
        tokens
    }

    /// The trivia preceding a subtree (the prefix of its first token).
    pub fn prefix(&self, id: NodeId) -> &str {
        match self.first_token(id).map(|t| &self.node(t).data) {
            Some(NodeData::Token { prefix, .. }) => prefix,
            _ => "",
        }
    }

    /// Source text of a subtree including its leading trivia.
    pub fn source(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_source(id, &mut out);
        out
    }

    /// Source text of a subtree without its leading trivia.
    pub fn text(&self, id: NodeId) -> String {
        let source = self.source(id);
        source[self.prefix(id).len()..].to_string()
    }

    fn write_source(&self, id: NodeId, out: &mut String) {
        match &self.node(id).data {
            NodeData::Token { text, prefix } => {
                out.push_str(prefix);
                out.push_str(text);
            }
            NodeData::Composite { children } => {
                for child in children {
                    self.write_source(*child, out);
                }
            }
        }
    }

    /// Serializes the whole tree back to source text.
    pub fn serialize(&self) -> String {
        self.source(self.root)
    }

    /// Node ids of the attached tree in pre-order.
    pub fn preorder(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.children(id).iter().rev().copied());
        }
        order
    }

    /// Returns true if `id` is reachable from the root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            if current == self.root {
                return true;
            }
            match self.parent(current) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    /// Returns true if `ancestor` is `id` itself or one of its ancestors.
    pub fn is_ancestor_or_self(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    pub(crate) fn alloc_token(
        &mut self,
        kind: SyntaxKind,
        text: impl Into<String>,
        prefix: impl Into<String>,
        location: Location,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            parent: None,
            location,
            data: NodeData::Token {
                text: text.into(),
                prefix: prefix.into(),
            },
        });
        id
    }

    /// Allocates a composite node adopting `children`, which must be detached.
    pub(crate) fn alloc_composite(&mut self, kind: SyntaxKind, children: Vec<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        let location = children
            .first()
            .map(|c| self.location(*c))
            .unwrap_or_default();
        for child in &children {
            self.node_mut(*child).parent = Some(id);
        }
        self.nodes.push(Node {
            kind,
            parent: None,
            location,
            data: NodeData::Composite { children },
        });
        id
    }

    /// Replaces the text of a token in place, keeping its prefix.
    pub(crate) fn set_token_text(&mut self, id: NodeId, value: impl Into<String>) {
        if let NodeData::Token { text, .. } = &mut self.node_mut(id).data {
            *text = value.into();
        }
    }

    /// Replaces the prefix of the first token of a subtree.
    pub(crate) fn set_prefix(&mut self, id: NodeId, value: impl Into<String>) {
        if let Some(token) = self.first_token(id)
            && let NodeData::Token { prefix, .. } = &mut self.node_mut(token).data
        {
            *prefix = value.into();
        }
    }

    /// Unlinks a node from its parent. Returns its former slot.
    pub(crate) fn detach(&mut self, id: NodeId) -> Option<(NodeId, usize)> {
        let parent = self.parent(id)?;
        let slot = match &mut self.node_mut(parent).data {
            NodeData::Composite { children } => {
                let index = children.iter().position(|c| *c == id)?;
                children.remove(index);
                index
            }
            NodeData::Token { .. } => return None,
        };
        self.node_mut(id).parent = None;
        Some((parent, slot))
    }

    /// Puts a detached node into `parent`'s children at `slot`.
    pub(crate) fn attach(&mut self, parent: NodeId, slot: usize, id: NodeId) {
        if let NodeData::Composite { children } = &mut self.node_mut(parent).data {
            let slot = slot.min(children.len());
            children.insert(slot, id);
        }
        self.node_mut(id).parent = Some(parent);
    }

    pub(crate) fn set_root(&mut self, id: NodeId) {
        self.node_mut(id).parent = None;
        self.root = id;
    }

    /// Renders an indented kind/text outline of the tree.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        self.dump_node(self.root, 0, &mut out);
        out
    }

    fn dump_node(&self, id: NodeId, depth: usize, out: &mut String) {
        use std::fmt::Write;

        let indent = "  ".repeat(depth);
        match &self.node(id).data {
            NodeData::Token { text, prefix } => {
                let _ = write!(out, "{indent}{} {text:?}", self.kind(id));
                if !prefix.is_empty() {
                    let _ = write!(out, " prefix={prefix:?}");
                }
                out.push('\n');
            }
            NodeData::Composite { children } => {
                let _ = writeln!(out, "{indent}{}", self.kind(id));
                for child in children {
                    self.dump_node(*child, depth + 1, out);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_preserves_trivia() {
        let source = "# header\n\nx = 1   # trailing\nif x:\n\tprint(x)\n\n";
        let tree = parse(source).unwrap();
        assert_eq!(tree.serialize(), source);
    }

    #[test]
    fn test_prefix_and_text() {
        let tree = parse("a =  b\n").unwrap();
        let b = tree
            .preorder()
            .into_iter()
            .find(|id| tree.token_text(*id) == Some("b"))
            .unwrap();
        assert_eq!(tree.prefix(b), "  ");
        assert_eq!(tree.text(b), "b");
        assert_eq!(tree.source(b), "  b");
    }

    #[test]
    fn test_tokens_of_subtree() {
        let tree = parse("f(a, b.c)\n").unwrap();
        let call = tree
            .preorder()
            .into_iter()
            .find(|id| tree.kind(*id) == SyntaxKind::Power)
            .unwrap();
        let texts: Vec<_> = tree
            .tokens(call)
            .into_iter()
            .filter_map(|t| tree.token_text(t))
            .collect();
        assert_eq!(texts, ["f", "(", "a", ",", "b", ".", "c", ")"]);
        assert_eq!(tree.token_text(tree.last_token(call).unwrap()), Some(")"));
    }

    #[test]
    fn test_parent_links() {
        let tree = parse("f(x)\n").unwrap();
        for id in tree.preorder() {
            for child in tree.children(id) {
                assert_eq!(tree.parent(*child), Some(id));
            }
        }
        assert_eq!(tree.parent(tree.root()), None);
    }

    #[test]
    fn test_detach_and_attach() {
        let mut tree = parse("a.b\n").unwrap();
        let name = tree
            .preorder()
            .into_iter()
            .find(|id| tree.token_text(*id) == Some("b"))
            .unwrap();
        let (parent, slot) = tree.detach(name).unwrap();
        assert!(!tree.is_attached(name));
        assert_eq!(tree.serialize(), "a.\n");

        tree.set_token_text(name, "c");
        tree.attach(parent, slot, name);
        assert!(tree.is_attached(name));
        assert_eq!(tree.serialize(), "a.c\n");
    }

    #[test]
    fn test_dump_shape() {
        let tree = parse("opts.x\n").unwrap();
        let dump = tree.dump();
        assert!(dump.starts_with("file_input\n  simple_stmt\n    power\n"));
        assert!(dump.contains("NAME \"opts\""));
        assert!(dump.contains("trailer"));
    }

    #[test]
    fn test_location_display() {
        assert_eq!(Location::new(4, 12).to_string(), "4:12");
    }
}
