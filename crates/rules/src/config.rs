//! Configuration types for the rules engine

use serde::Deserialize;

/// How many rules run per entity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationMode {
    /// Every rule runs; all failures are reported (default)
    #[default]
    All,
    /// An entity stops at its first failing rule
    FirstFailure,
}

/// Configuration for [`RulesEngine`](crate::RulesEngine)
///
/// Deserializes from any serde format; missing fields take their defaults.
///
/// ```rust
/// use nebula_rules::config::{EngineConfig, EvaluationMode};
///
/// let config = EngineConfig::default()
///     .with_discover(["my_app::rules"])
///     .with_evaluation(EvaluationMode::FirstFailure);
/// assert!(config.builtin_handlers);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Register the built-in handlers at construction
    pub builtin_handlers: bool,

    /// Extra module prefixes scanned for handlers at construction
    pub discover: Vec<String>,

    /// Per-entity evaluation strategy
    pub evaluation: EvaluationMode,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            builtin_handlers: true,
            discover: Vec::new(),
            evaluation: EvaluationMode::All,
        }
    }
}

impl EngineConfig {
    /// Enables or disables the built-in handlers.
    #[must_use]
    pub fn with_builtin_handlers(mut self, enabled: bool) -> Self {
        self.builtin_handlers = enabled;
        self
    }

    /// Adds module prefixes to discover at construction.
    #[must_use]
    pub fn with_discover<I, S>(mut self, modules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.discover.extend(modules.into_iter().map(Into::into));
        self
    }

    /// Sets the evaluation strategy.
    #[must_use]
    pub fn with_evaluation(mut self, evaluation: EvaluationMode) -> Self {
        self.evaluation = evaluation;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = EngineConfig::default();
        assert!(config.builtin_handlers);
        assert!(config.discover.is_empty());
        assert_eq!(config.evaluation, EvaluationMode::All);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{"discover": ["app::rules"]}"#).unwrap();
        assert!(config.builtin_handlers);
        assert_eq!(config.discover, ["app::rules"]);
        assert_eq!(config.evaluation, EvaluationMode::All);
    }

    #[test]
    fn evaluation_mode_is_snake_case() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"builtin_handlers": false, "evaluation": "first_failure"}"#)
                .unwrap();
        assert!(!config.builtin_handlers);
        assert_eq!(config.evaluation, EvaluationMode::FirstFailure);
    }

    #[test]
    fn builders_compose() {
        let config = EngineConfig::default()
            .with_builtin_handlers(false)
            .with_discover(["a"])
            .with_discover(vec![String::from("b")])
            .with_evaluation(EvaluationMode::FirstFailure);
        assert_eq!(config.discover, ["a", "b"]);
        assert!(!config.builtin_handlers);
    }
}
