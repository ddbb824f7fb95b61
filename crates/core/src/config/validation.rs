//! Configuration validation, run before any build step touches the filesystem

use crate::{
    config::Config,
    error::{Error, Result},
    types::Coordinate,
};

/// A single check over a loaded configuration
pub trait ValidationRule: Send + Sync {
    fn validate(&self, config: &Config) -> Result<()>;

    fn name(&self) -> &str;
}

struct TestGlobRule;

impl ValidationRule for TestGlobRule {
    fn validate(&self, config: &Config) -> Result<()> {
        glob::Pattern::new(&config.test_glob)
            .map(|_| ())
            .map_err(|e| Error::Config(format!("Invalid test_glob '{}': {e}", config.test_glob)))
    }

    fn name(&self) -> &str {
        "test-glob"
    }
}

struct TimeoutRule;

impl ValidationRule for TimeoutRule {
    fn validate(&self, config: &Config) -> Result<()> {
        if config.phpunit.timeout_secs == 0 {
            return Err(Error::Config(
                "phpunit.timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "timeout"
    }
}

struct NamespaceMapRule;

impl ValidationRule for NamespaceMapRule {
    fn validate(&self, config: &Config) -> Result<()> {
        for (key, namespace) in &config.namespace_map {
            // Keys are version-less coordinates
            if format!("{key}:0").parse::<Coordinate>().is_err() {
                return Err(Error::Config(format!(
                    "namespace_map key '{key}' must look like group:artifact"
                )));
            }
            if namespace.trim_matches(['\\', '/']).is_empty() {
                return Err(Error::Config(format!(
                    "namespace_map entry for '{key}' is empty"
                )));
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "namespace-map"
    }
}

struct DuplicateDependencyRule;

impl ValidationRule for DuplicateDependencyRule {
    fn validate(&self, config: &Config) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for dependency in &config.dependencies {
            if !seen.insert(dependency.coordinate.key()) {
                return Err(Error::Config(format!(
                    "Dependency {} is declared more than once",
                    dependency.coordinate.key()
                )));
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "duplicate-dependency"
    }
}

/// Runs every rule and reports the first failure
pub struct ConfigValidator {
    rules: Vec<Box<dyn ValidationRule>>,
}

impl Default for ConfigValidator {
    fn default() -> Self {
        Self {
            rules: vec![
                Box::new(TestGlobRule),
                Box::new(TimeoutRule),
                Box::new(NamespaceMapRule),
                Box::new(DuplicateDependencyRule),
            ],
        }
    }
}

impl ConfigValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn validate(&self, config: &Config) -> Result<()> {
        for rule in &self.rules {
            tracing::trace!("Validating config rule {}", rule.name());
            rule.validate(config)?;
        }
        Ok(())
    }
}
