//! Error types.
//!
//! Every error here is a configuration mistake by the integrator. Rules that
//! evaluate to `false` are not errors; they show up as
//! [`Failure`](crate::result::Failure)s in a
//! [`ValidationResult`](crate::result::ValidationResult).

use crate::annotation::OperatorKind;
use crate::value::ValueKind;

/// Errors from binding metadata and compiling rule sets.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RuleError {
    /// The entity type already has a metadata binding.
    #[error("entity '{entity}' is already bound to metadata '{existing}' (attempted '{attempted}')")]
    DuplicateBinding {
        /// The entity type.
        entity: &'static str,
        /// Metadata type of the binding that stays in place.
        existing: &'static str,
        /// Metadata type of the rejected binding.
        attempted: &'static str,
    },

    /// No metadata was bound for the entity type being validated.
    #[error("unable to find rule metadata for entity '{entity}'; bind it with bind_metadata first")]
    MissingBinding {
        /// The entity type.
        entity: &'static str,
    },

    /// No registered handler supports the annotation's operator kind.
    #[error("no handler registered for operator '{kind}' on '{entity}.{property}'")]
    HandlerNotFound {
        /// The unsupported operator kind.
        kind: OperatorKind,
        /// The entity type.
        entity: &'static str,
        /// The annotated property.
        property: String,
    },

    /// The metadata names a property the entity type does not have.
    #[error("metadata '{metadata}' declares property '{property}' which does not exist on entity '{entity}'")]
    UnknownProperty {
        /// The entity type.
        entity: &'static str,
        /// The metadata type.
        metadata: &'static str,
        /// The missing property.
        property: String,
    },

    /// A handler could not bind an annotation to the entity type.
    #[error("cannot bind '{kind}' rule on '{entity}.{property}': {source}")]
    Binding {
        /// The entity type.
        entity: &'static str,
        /// The annotated property.
        property: String,
        /// The annotation's operator kind.
        kind: OperatorKind,
        /// What went wrong.
        #[source]
        source: BindError,
    },
}

/// Reasons a handler refuses to build a predicate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BindError {
    /// Neither a sibling property nor a constant was supplied.
    #[error("annotation has neither another property nor a constant to compare against")]
    MissingOperand,

    /// The named sibling property does not exist.
    #[error("sibling property '{0}' does not exist")]
    UnknownSibling(String),

    /// The operand's kind cannot be compared with the property's kind.
    #[error("cannot compare {property} with {operand}")]
    IncompatibleOperand {
        /// Kind of the annotated property.
        property: ValueKind,
        /// Kind of the operand.
        operand: ValueKind,
    },

    /// The handler does not support properties of this kind.
    #[error("{0} values are not supported by this operator")]
    UnsupportedKind(ValueKind),

    /// The handler does not accept this operand form.
    #[error("unsupported operand: {0}")]
    UnsupportedOperand(&'static str),

    /// The constant is malformed for this operator.
    #[error("invalid constant: {0}")]
    InvalidConstant(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_binding_display() {
        let err = RuleError::DuplicateBinding {
            entity: "Person",
            existing: "PersonMetadata",
            attempted: "OtherMetadata",
        };
        assert_eq!(
            err.to_string(),
            "entity 'Person' is already bound to metadata 'PersonMetadata' (attempted 'OtherMetadata')"
        );
    }

    #[test]
    fn handler_not_found_names_kind_and_property() {
        let err = RuleError::HandlerNotFound {
            kind: OperatorKind::new("between"),
            entity: "Person",
            property: "age".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("between"));
        assert!(msg.contains("Person.age"));
    }

    #[test]
    fn binding_error_exposes_source() {
        use std::error::Error as _;

        let err = RuleError::Binding {
            entity: "Person",
            property: "age".into(),
            kind: OperatorKind::GREATER_THAN,
            source: BindError::UnknownSibling("max_age".into()),
        };
        assert!(err.to_string().contains("max_age"));
        assert!(err.source().is_some());
    }

    #[test]
    fn incompatible_operand_display() {
        let err = BindError::IncompatibleOperand {
            property: ValueKind::Int,
            operand: ValueKind::Text,
        };
        assert_eq!(err.to_string(), "cannot compare int with text");
    }
}
