//! Rule annotations: inert, declarative descriptions of one relational check.
//!
//! An annotation is attached to one property of a metadata definition (see
//! [`MetadataDefinition`](crate::metadata::MetadataDefinition)). That property
//! is the left-hand operand; the right-hand operand is either a sibling
//! property or a constant. The [`OperatorKind`] is an opaque key the engine
//! uses to find a [`Handler`](crate::handler::Handler); the engine never
//! interprets it itself.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::value::Value;

// ============================================================================
// OPERATOR KIND
// ============================================================================

/// Identifies the comparison semantics an annotation signals.
///
/// Open-ended: a new kind is just a new string plus a handler that claims it.
///
/// ```rust
/// use nebula_rules::annotation::OperatorKind;
///
/// let between = OperatorKind::new("between");
/// assert_eq!(between.as_str(), "between");
/// assert_ne!(between, OperatorKind::GREATER_THAN);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperatorKind(Cow<'static, str>);

impl OperatorKind {
    /// `left > right`
    pub const GREATER_THAN: Self = Self(Cow::Borrowed("greater_than"));
    /// `left >= right`
    pub const GREATER_THAN_OR_EQUAL: Self = Self(Cow::Borrowed("greater_than_or_equal"));
    /// `left < right`
    pub const LESS_THAN: Self = Self(Cow::Borrowed("less_than"));
    /// `left <= right`
    pub const LESS_THAN_OR_EQUAL: Self = Self(Cow::Borrowed("less_than_or_equal"));
    /// `left == right`
    pub const EQUAL: Self = Self(Cow::Borrowed("equal"));
    /// `left != right`
    pub const NOT_EQUAL: Self = Self(Cow::Borrowed("not_equal"));
    /// Text property matches a regular expression constant.
    pub const MATCHES: Self = Self(Cow::Borrowed("matches"));

    /// Creates a custom operator kind.
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    /// Creates a custom operator kind usable in `const` items, such as a
    /// handler's supported-kinds table.
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    /// The kind's name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OperatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// SEVERITY
// ============================================================================

/// How a failing rule is reported. Does not change whether the rule passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Must be fixed (default).
    #[default]
    Error,
    /// Should be looked at.
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => f.write_str("error"),
            Self::Warning => f.write_str("warning"),
        }
    }
}

// ============================================================================
// RULE ANNOTATION
// ============================================================================

/// A declarative rule attached to one metadata property.
///
/// At least one of `other_property` / `constant` must be supplied; when both
/// are, the constant is the operand. Missing operands are reported when the
/// owning entity type is first compiled.
///
/// # Examples
///
/// ```rust
/// use nebula_rules::annotation::{OperatorKind, RuleAnnotation, Severity};
///
/// // Against a sibling property
/// let adult = RuleAnnotation::greater_than_or_equal("min_age")
///     .message("Age must be at least MinAge");
///
/// // Against a constant, reported as a warning
/// let sane = RuleAnnotation::new(OperatorKind::LESS_THAN)
///     .constant(130)
///     .severity(Severity::Warning);
///
/// assert_eq!(adult.other_property(), Some("min_age"));
/// assert!(sane.constant_value().is_some());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RuleAnnotation {
    kind: OperatorKind,
    other_property: Option<Cow<'static, str>>,
    constant: Option<Value>,
    can_be_null: bool,
    severity: Severity,
    message: Option<Cow<'static, str>>,
}

impl RuleAnnotation {
    /// Creates an annotation of the given kind with no operand yet.
    pub fn new(kind: OperatorKind) -> Self {
        Self {
            kind,
            other_property: None,
            constant: None,
            can_be_null: false,
            severity: Severity::Error,
            message: None,
        }
    }

    /// `left > other`
    pub fn greater_than(other: impl Into<Cow<'static, str>>) -> Self {
        Self::new(OperatorKind::GREATER_THAN).other(other)
    }

    /// `left >= other`
    pub fn greater_than_or_equal(other: impl Into<Cow<'static, str>>) -> Self {
        Self::new(OperatorKind::GREATER_THAN_OR_EQUAL).other(other)
    }

    /// `left < other`
    pub fn less_than(other: impl Into<Cow<'static, str>>) -> Self {
        Self::new(OperatorKind::LESS_THAN).other(other)
    }

    /// `left <= other`
    pub fn less_than_or_equal(other: impl Into<Cow<'static, str>>) -> Self {
        Self::new(OperatorKind::LESS_THAN_OR_EQUAL).other(other)
    }

    /// `left == other`
    pub fn equal(other: impl Into<Cow<'static, str>>) -> Self {
        Self::new(OperatorKind::EQUAL).other(other)
    }

    /// `left != other`
    pub fn not_equal(other: impl Into<Cow<'static, str>>) -> Self {
        Self::new(OperatorKind::NOT_EQUAL).other(other)
    }

    /// Text property matches `pattern`.
    pub fn matches(pattern: impl Into<String>) -> Self {
        Self::new(OperatorKind::MATCHES).constant(pattern.into())
    }

    /// Compares against a sibling property.
    #[must_use = "builder methods must be chained or built"]
    pub fn other(mut self, property: impl Into<Cow<'static, str>>) -> Self {
        self.other_property = Some(property.into());
        self
    }

    /// Compares against a literal.
    #[must_use = "builder methods must be chained or built"]
    pub fn constant(mut self, value: impl Into<Value>) -> Self {
        self.constant = Some(value.into());
        self
    }

    /// Let a null operand pass instead of failing the comparison.
    #[must_use = "builder methods must be chained or built"]
    pub fn can_be_null(mut self, can_be_null: bool) -> Self {
        self.can_be_null = can_be_null;
        self
    }

    /// Sets the severity recorded on failure.
    #[must_use = "builder methods must be chained or built"]
    pub fn severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Sets the message returned verbatim on failure.
    #[must_use = "builder methods must be chained or built"]
    pub fn message(mut self, message: impl Into<Cow<'static, str>>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// The operator kind.
    #[must_use]
    pub fn kind(&self) -> &OperatorKind {
        &self.kind
    }

    /// Name of the sibling operand, if any.
    #[must_use]
    pub fn other_property(&self) -> Option<&str> {
        self.other_property.as_deref()
    }

    /// Constant operand, if any.
    #[must_use]
    pub fn constant_value(&self) -> Option<&Value> {
        self.constant.as_ref()
    }

    /// Whether null operands pass.
    #[must_use]
    pub fn allows_null(&self) -> bool {
        self.can_be_null
    }

    /// Severity recorded on failure.
    #[must_use]
    pub fn severity_level(&self) -> Severity {
        self.severity
    }

    /// Message template, if one was given.
    #[must_use]
    pub fn message_template(&self) -> Option<&str> {
        self.message.as_deref()
    }
}
