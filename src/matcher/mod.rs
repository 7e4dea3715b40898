//! Matching: source files on disk and patterns inside syntax trees.

pub mod file;
pub mod tree;

pub use file::{FileMatcher, Resolved};
pub use tree::{match_node, Captures, TreeMatch, TreeWalker};
