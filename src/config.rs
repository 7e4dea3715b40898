//! Serializable configuration for fixer runs.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{FixerError, Result};
use crate::tree::is_identifier;

/// Quote character used for generated subscript keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuoteStyle {
    #[default]
    Single,
    Double,
}

impl QuoteStyle {
    pub fn quote_char(self) -> char {
        match self {
            QuoteStyle::Single => '\'',
            QuoteStyle::Double => '"',
        }
    }

    /// Renders `value` as a string literal, escaping backslashes and quotes.
    pub fn quote(self, value: &str) -> String {
        let q = self.quote_char();
        let mut out = String::with_capacity(value.len() + 2);
        out.push(q);
        for c in value.chars() {
            if c == '\\' || c == q {
                out.push('\\');
            }
            out.push(c);
        }
        out.push(q);
        out
    }
}

/// What a declarative fixer does with a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RuleAction {
    /// Replace the text of the captured token.
    #[serde(rename = "set_text")]
    SetText { capture: String, text: String },

    /// Rewrite the match to `head['key']`, using the key capture's text.
    #[serde(rename = "subscript")]
    Subscript { head: String, key: String },
}

/// A fixer defined in configuration rather than code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomFixerSpec {
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Pattern in the tree pattern DSL.
    pub pattern: String,

    pub action: RuleAction,
}

/// Settings shared by the registry, its rules and the runner.
///
/// # Example YAML
///
/// ```yaml
/// rename_from: opts
/// rename_to: options
/// quote_style: double
/// default_fixers: [option_error, replace_opts, options_object]
/// exclude:
///   - "build/**"
/// custom_fixers:
///   - name: args_to_options
///     pattern: "power< head='args' trailer< '.' key=any > >"
///     action:
///       type: subscript
///       head: head
///       key: key
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixerConfig {
    /// Identifier renamed by `replace_opts`.
    pub rename_from: String,

    pub rename_to: String,

    /// Heads whose attribute access `options_object` turns into subscripts.
    pub attribute_heads: Vec<String>,

    pub quote_style: QuoteStyle,

    /// Callee name `option_error` substitutes for `option_parser.error`.
    pub error_callee: String,

    /// Fixer order used when none are named explicitly.
    pub default_fixers: Vec<String>,

    /// File extensions searched in directories.
    pub extensions: Vec<String>,

    /// Glob patterns a file must match to be fixed, relative to each
    /// searched directory. Empty means all files.
    pub include: Vec<String>,

    /// Glob patterns to exclude, relative to each searched directory.
    pub exclude: Vec<String>,

    /// Worker threads; `None` uses the available parallelism.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jobs: Option<usize>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub custom_fixers: Vec<CustomFixerSpec>,
}

impl Default for FixerConfig {
    fn default() -> Self {
        Self {
            rename_from: "opts".to_string(),
            rename_to: "options".to_string(),
            attribute_heads: vec!["opts".to_string(), "options".to_string()],
            quote_style: QuoteStyle::Single,
            error_callee: "QiimeCommandError".to_string(),
            default_fixers: vec![
                "option_error".to_string(),
                "replace_opts".to_string(),
                "options_object".to_string(),
            ],
            extensions: vec!["py".to_string()],
            include: Vec::new(),
            exclude: Vec::new(),
            jobs: None,
            custom_fixers: Vec::new(),
        }
    }
}

impl FixerConfig {
    /// Loads config from a YAML file. Missing fields keep their defaults.
    pub fn from_yaml(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            FixerError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to read config file {}: {e}", path.display()),
            ))
        })?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content).map_err(|e| {
            FixerError::InvalidConfig(format!("Failed to parse YAML config: {e}"))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Serializes the config to YAML.
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Checks values that would otherwise only fail deep inside a rewrite.
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("rename_from", &self.rename_from),
            ("rename_to", &self.rename_to),
            ("error_callee", &self.error_callee),
        ] {
            if !is_identifier(value) {
                return Err(FixerError::InvalidConfig(format!(
                    "{field} must be an identifier, got {value:?}"
                )));
            }
        }
        if let Some(head) = self.attribute_heads.iter().find(|h| !is_identifier(h)) {
            return Err(FixerError::InvalidConfig(format!(
                "attribute_heads must be identifiers, got {head:?}"
            )));
        }
        if self.attribute_heads.is_empty() {
            return Err(FixerError::InvalidConfig(
                "attribute_heads must not be empty".to_string(),
            ));
        }
        if self.jobs == Some(0) {
            return Err(FixerError::InvalidConfig(
                "jobs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
