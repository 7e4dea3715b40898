//! Error types for the fixer engine.

use crate::tree::Location;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for fixer operations.
#[derive(Error, Debug)]
pub enum FixerError {
    #[error("Parse error at {location}: {message}")]
    Parse { location: Location, message: String },

    #[error("Invalid pattern for fixer '{rule}': {message}")]
    PatternSyntax { rule: String, message: String },

    #[error("Fixer '{rule}' produced an invalid replacement for {node}")]
    TransformInvariant { rule: String, node: String },

    #[error("{}: {source}", path.display())]
    InFile {
        path: PathBuf,
        #[source]
        source: Box<FixerError>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("Glob pattern error: {0}")]
    Glob(#[from] globset::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown fixer: {0}")]
    UnknownFixer(String),

    #[error("No files matched the specified criteria")]
    NoFilesMatched,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl FixerError {
    /// Creates a parse error at the given location.
    pub fn parse(location: Location, message: impl Into<String>) -> Self {
        FixerError::Parse {
            location,
            message: message.into(),
        }
    }

    /// Creates a pattern syntax error for the named rule.
    pub fn pattern(rule: impl Into<String>, message: impl Into<String>) -> Self {
        FixerError::PatternSyntax {
            rule: rule.into(),
            message: message.into(),
        }
    }

    /// Attaches the path of the file being processed.
    pub fn in_file(self, path: impl Into<PathBuf>) -> Self {
        match self {
            already @ FixerError::InFile { .. } => already,
            other => FixerError::InFile {
                path: path.into(),
                source: Box::new(other),
            },
        }
    }

    /// Returns the underlying error when wrapped with a file path.
    pub fn root(&self) -> &FixerError {
        match self {
            FixerError::InFile { source, .. } => source.root(),
            other => other,
        }
    }

    /// Returns true if the error aborts the whole run rather than one file.
    ///
    /// Rule definitions are shared by every file, so a broken rule, an unknown
    /// fixer name or an invalid configuration stops the run before any file
    /// is touched.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.root(),
            FixerError::PatternSyntax { .. }
                | FixerError::UnknownFixer(_)
                | FixerError::InvalidConfig(_)
                | FixerError::NoFilesMatched
        )
    }
}

/// A specialized Result type for fixer operations.
pub type Result<T> = std::result::Result<T, FixerError>;
