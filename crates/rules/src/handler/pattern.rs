//! Regular-expression matching on text properties.

use regex::Regex;

use super::{Handler, Operand, Predicate, RuleTarget};
use crate::annotation::OperatorKind;
use crate::entity::Entity;
use crate::error::BindError;
use crate::value::{Value, ValueKind};

/// Builds "text property matches pattern" predicates.
///
/// The pattern must be a text constant; it is compiled once when the rule is
/// bound. A null value passes only when the annotation allows nulls.
#[derive(Debug, Default, Clone, Copy)]
pub struct PatternHandler;

const KINDS: &[OperatorKind] = &[OperatorKind::MATCHES];

impl Handler for PatternHandler {
    fn supported_kinds(&self) -> &[OperatorKind] {
        KINDS
    }

    fn build(&self, target: &RuleTarget<'_>) -> Result<Predicate, BindError> {
        let left = target.property().clone();
        if left.kind() != ValueKind::Text {
            return Err(BindError::UnsupportedKind(left.kind()));
        }

        let pattern = match target.operand()? {
            Operand::Constant(Value::Text(pattern)) => pattern,
            Operand::Constant(other) => {
                return Err(BindError::InvalidConstant(format!(
                    "pattern must be text, got {other}"
                )));
            }
            Operand::Property(_) => {
                return Err(BindError::UnsupportedOperand(
                    "patterns must be constants",
                ));
            }
        };
        let regex = Regex::new(&pattern).map_err(|e| BindError::InvalidConstant(e.to_string()))?;

        let can_be_null = target.annotation().allows_null();
        Ok(Box::new(move |entity: &dyn Entity| match left.read(entity) {
            Value::Text(text) => regex.is_match(&text),
            _ => can_be_null,
        }))
    }

    fn default_message(&self, target: &RuleTarget<'_>) -> String {
        format!(
            "{} does not match the required format",
            target.property().name()
        )
    }
}

crate::rule_handler!(PATTERN_HANDLER => PatternHandler);
