//! Named fixers and the order they run in.

use crate::config::FixerConfig;
use crate::error::{FixerError, Result};
use crate::transform::{AttributeToSubscript, CalleeRename, CustomRule, Rule, TokenRename};

/// A named pass: one or more rules applied in a single walk.
pub struct Fixer {
    name: String,
    description: String,
    rules: Vec<Box<dyn Rule>>,
}

impl Fixer {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            rules: Vec::new(),
        }
    }

    /// Adds a rule; earlier rules win when several match the same node.
    pub fn with_rule<R: Rule + 'static>(mut self, rule: R) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn rules(&self) -> &[Box<dyn Rule>] {
        &self.rules
    }
}

impl std::fmt::Debug for Fixer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fixer")
            .field("name", &self.name)
            .field("rules", &self.rules.iter().map(|r| r.name()).collect::<Vec<_>>())
            .finish()
    }
}

/// Registry of available fixers.
#[derive(Debug, Default)]
pub struct FixerRegistry {
    fixers: Vec<Fixer>,
    default_order: Vec<String>,
}

impl FixerRegistry {
    /// Creates a registry with the built-in fixers and their default settings.
    pub fn new() -> Result<Self> {
        Self::from_config(&FixerConfig::default())
    }

    /// Builds the built-in fixers plus any declared in `config`.
    ///
    /// Every pattern is compiled here, so a bad pattern fails before any
    /// file is touched.
    pub fn from_config(config: &FixerConfig) -> Result<Self> {
        let mut registry = Self::default();

        registry.register(
            Fixer::new(
                CalleeRename::NAME,
                format!(
                    "Replace the unreadable-parameters-file option_parser.error call with {}",
                    config.error_callee
                ),
            )
            .with_rule(CalleeRename::new(&config.error_callee)?),
        )?;
        registry.register(
            Fixer::new(
                TokenRename::NAME,
                format!(
                    "Rename every {} identifier to {}",
                    config.rename_from, config.rename_to
                ),
            )
            .with_rule(TokenRename::new(&config.rename_from, &config.rename_to)?),
        )?;
        registry.register(
            Fixer::new(
                AttributeToSubscript::NAME,
                format!(
                    "Turn attribute access on {} into subscripts",
                    config.attribute_heads.join("/")
                ),
            )
            .with_rule(AttributeToSubscript::new(
                &config.attribute_heads,
                config.quote_style,
            )?),
        )?;

        for spec in &config.custom_fixers {
            let description = if spec.description.is_empty() {
                format!("Custom fixer for {}", spec.pattern.trim())
            } else {
                spec.description.clone()
            };
            registry.register(
                Fixer::new(&spec.name, description)
                    .with_rule(CustomRule::from_spec(spec, config.quote_style)?),
            )?;
        }

        for name in &config.default_fixers {
            if registry.by_name(name).is_none() {
                return Err(FixerError::UnknownFixer(name.clone()));
            }
        }
        registry.default_order = config.default_fixers.clone();
        Ok(registry)
    }

    /// Registers a fixer. Names must be unique.
    pub fn register(&mut self, fixer: Fixer) -> Result<()> {
        if self.by_name(fixer.name()).is_some() {
            return Err(FixerError::InvalidConfig(format!(
                "fixer '{}' is registered twice",
                fixer.name()
            )));
        }
        self.fixers.push(fixer);
        Ok(())
    }

    pub fn by_name(&self, name: &str) -> Option<&Fixer> {
        self.fixers.iter().find(|f| f.name() == name)
    }

    /// All fixers in registration order.
    pub fn all(&self) -> &[Fixer] {
        &self.fixers
    }

    pub fn default_order(&self) -> &[String] {
        &self.default_order
    }

    /// Resolves the passes to run.
    ///
    /// An empty `names` means the default order. Fixers listed in `skip` are
    /// dropped; unknown names in either list are an error.
    pub fn select(&self, names: &[String], skip: &[String]) -> Result<Vec<&Fixer>> {
        if let Some(unknown) = skip.iter().find(|s| self.by_name(s).is_none()) {
            return Err(FixerError::UnknownFixer(unknown.clone()));
        }
        let order = if names.is_empty() {
            self.default_order.as_slice()
        } else {
            names
        };
        order
            .iter()
            .filter(|name| !skip.contains(*name))
            .map(|name| {
                self.by_name(name)
                    .ok_or_else(|| FixerError::UnknownFixer(name.clone()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CustomFixerSpec, RuleAction};

    fn names(fixers: &[&Fixer]) -> Vec<String> {
        fixers.iter().map(|f| f.name().to_string()).collect()
    }

    #[test]
    fn test_default_order() {
        let registry = FixerRegistry::new().unwrap();
        let selected = registry.select(&[], &[]).unwrap();
        assert_eq!(
            names(&selected),
            ["option_error", "replace_opts", "options_object"]
        );
    }

    #[test]
    fn test_explicit_order_and_skip() {
        let registry = FixerRegistry::new().unwrap();
        let order = vec!["options_object".to_string(), "replace_opts".to_string()];
        assert_eq!(
            names(&registry.select(&order, &[]).unwrap()),
            ["options_object", "replace_opts"]
        );
        let skip = vec!["option_error".to_string()];
        assert_eq!(
            names(&registry.select(&[], &skip).unwrap()),
            ["replace_opts", "options_object"]
        );
    }

    #[test]
    fn test_unknown_names() {
        let registry = FixerRegistry::new().unwrap();
        let err = registry.select(&["nope".to_string()], &[]).unwrap_err();
        assert!(matches!(err, FixerError::UnknownFixer(ref n) if n == "nope"));
        assert!(registry.select(&[], &["nope".to_string()]).is_err());

        let config = FixerConfig {
            default_fixers: vec!["missing".to_string()],
            ..Default::default()
        };
        assert!(matches!(
            FixerRegistry::from_config(&config),
            Err(FixerError::UnknownFixer(_))
        ));
    }

    #[test]
    fn test_custom_fixers_are_registered() {
        let config = FixerConfig {
            custom_fixers: vec![CustomFixerSpec {
                name: "args_object".to_string(),
                description: String::new(),
                pattern: "power< head='args' trailer< '.' key=any > >".to_string(),
                action: RuleAction::Subscript {
                    head: "head".to_string(),
                    key: "key".to_string(),
                },
            }],
            ..Default::default()
        };
        let registry = FixerRegistry::from_config(&config).unwrap();
        assert_eq!(registry.all().len(), 4);
        let custom = registry.by_name("args_object").unwrap();
        assert!(custom.description().contains("args"));
        assert!(!registry.default_order().contains(&"args_object".to_string()));
    }

    #[test]
    fn test_duplicate_name_is_rejected() {
        let config = FixerConfig {
            custom_fixers: vec![CustomFixerSpec {
                name: "replace_opts".to_string(),
                description: String::new(),
                pattern: "x='a'".to_string(),
                action: RuleAction::SetText {
                    capture: "x".to_string(),
                    text: "b".to_string(),
                },
            }],
            ..Default::default()
        };
        assert!(matches!(
            FixerRegistry::from_config(&config),
            Err(FixerError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_bad_custom_pattern_is_fatal() {
        let config = FixerConfig {
            custom_fixers: vec![CustomFixerSpec {
                name: "broken".to_string(),
                description: String::new(),
                pattern: "power< (".to_string(),
                action: RuleAction::SetText {
                    capture: "x".to_string(),
                    text: "b".to_string(),
                },
            }],
            ..Default::default()
        };
        let err = FixerRegistry::from_config(&config).unwrap_err();
        assert!(err.is_fatal());
    }
}
