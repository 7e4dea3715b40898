//! # Fixer DSL
//!
//! Structural source-to-source fixers for Python 2 era scripts.
//!
//! Source text is parsed into a lossless syntax tree, declarative patterns are
//! matched against it, and matched nodes are rewritten in place. Everything a
//! fixer does not touch, including whitespace and comments, comes back
//! byte-for-byte.
//!
//! This crate provides:
//! - A lossless tree builder ([`tree`])
//! - A small pattern language with captures and alternation ([`pattern`])
//! - Pre-order matching ([`matcher`]) and validated rewrites ([`transform`])
//! - An ordered multi-pass driver ([`driver`]) over named fixers ([`registry`])
//! - A parallel runner with dry-run diffs and atomic writes ([`runner`])
//!
//! ## Quick Start
//!
//! ```rust
//! use fixer_dsl::prelude::*;
//!
//! let registry = FixerRegistry::new()?;
//! let passes = registry.select(&[], &[])?;
//!
//! let output = fix_source("if opts.verbose:  # chatty\n    pass\n", &passes)?;
//! assert_eq!(
//!     output.text.as_deref(),
//!     Some("if options['verbose']:  # chatty\n    pass\n")
//! );
//! # Ok::<(), fixer_dsl::error::FixerError>(())
//! ```
//!
//! ## Patterns
//!
//! ```rust
//! use fixer_dsl::prelude::*;
//!
//! let tree = parse("f(opts.input_fp, opts.output_dir)\n")?;
//! let pattern = compile("power< 'opts' trailer< '.' name=any > >")?;
//!
//! let names: Vec<String> = TreeWalker::new([&pattern])
//!     .find_matches(&tree)
//!     .iter()
//!     .map(|m| tree.text(m.captures["name"]))
//!     .collect();
//! assert_eq!(names, ["input_fp", "output_dir"]);
//! # Ok::<(), fixer_dsl::error::FixerError>(())
//! ```
//!
//! ## Running over files
//!
//! ```rust,no_run
//! use fixer_dsl::prelude::*;
//!
//! let config = FixerConfig::from_yaml("fixers.yaml")?;
//! let registry = FixerRegistry::from_config(&config)?;
//! let report = FixRunner::from_config(&registry, &config)
//!     .path("scripts/")
//!     .skip("option_error")
//!     .run()?;
//!
//! println!("{report}");
//! # Ok::<(), fixer_dsl::error::FixerError>(())
//! ```

pub mod config;
pub mod diff;
pub mod driver;
pub mod error;
pub mod matcher;
pub mod pattern;
pub mod registry;
pub mod report;
pub mod runner;
pub mod transform;
pub mod tree;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::config::{CustomFixerSpec, FixerConfig, QuoteStyle, RuleAction};
    pub use crate::diff::{DiffSummary, colorize, unified_diff};
    pub use crate::driver::{FixOutput, MatchRecord, fix_source, run, run_rules};
    pub use crate::error::{FixerError, Result};
    pub use crate::matcher::{Captures, FileMatcher, Resolved, TreeMatch, TreeWalker, match_node};
    pub use crate::pattern::{CompiledPattern, Pattern, compile};
    pub use crate::registry::{Fixer, FixerRegistry};
    pub use crate::report::{FileReport, FileStatus, RunReport, RunSummary};
    pub use crate::runner::{FixRunner, write_atomic};
    pub use crate::transform::{
        AttributeToSubscript, CalleeRename, CustomRule, NewNode, Rewrite, Rule, TokenRename,
    };
    pub use crate::tree::{Location, NodeId, SyntaxKind, Tree, parse};
}

pub use prelude::*;
