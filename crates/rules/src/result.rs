//! Per-entity validation output.

use std::sync::Arc;

use serde::Serialize;

use crate::annotation::Severity;
use crate::value::Value;

/// A failed rule, as reported for one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    /// The rule's message template, verbatim.
    pub message: Arc<str>,
    /// The rule's severity.
    pub severity: Severity,
}

impl Failure {
    /// Creates a failure record.
    pub fn new(message: impl Into<Arc<str>>, severity: Severity) -> Self {
        Self {
            message: message.into(),
            severity,
        }
    }
}

/// The outcome of validating one entity.
///
/// Produced fresh for every entity on every run; an entity with no failures
/// still gets a result.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ValidationResult {
    /// The entity's key, when its metadata declares one and the value is
    /// not null.
    pub key: Option<Value>,
    /// Failed rules in declaration order.
    pub failures: Vec<Failure>,
}

impl ValidationResult {
    /// Creates an empty result for an entity with the given key.
    pub fn new(key: Option<Value>) -> Self {
        Self {
            key,
            failures: Vec::new(),
        }
    }

    /// Records a failed rule.
    pub fn add(&mut self, message: impl Into<Arc<str>>, severity: Severity) {
        self.failures.push(Failure::new(message, severity));
    }

    /// Returns `true` if no rule failed.
    pub fn is_valid(&self) -> bool {
        self.failures.is_empty()
    }

    /// Returns `true` if at least one `Error`-severity rule failed.
    pub fn has_errors(&self) -> bool {
        self.failures.iter().any(|f| f.severity == Severity::Error)
    }

    /// Failures with `Error` severity.
    pub fn errors(&self) -> impl Iterator<Item = &Failure> {
        self.failures
            .iter()
            .filter(|f| f.severity == Severity::Error)
    }

    /// Failures with `Warning` severity.
    pub fn warnings(&self) -> impl Iterator<Item = &Failure> {
        self.failures
            .iter()
            .filter(|f| f.severity == Severity::Warning)
    }
}
