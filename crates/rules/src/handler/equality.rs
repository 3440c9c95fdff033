//! Equality comparisons: `==`, `!=`.

use super::{Handler, Predicate, RuleTarget};
use crate::annotation::OperatorKind;
use crate::entity::Entity;
use crate::error::BindError;

/// Builds `left == right` / `left != right` predicates.
///
/// Any comparable kinds are accepted, including `Bool`. Without
/// `can_be_null`, `null == null` holds and `null == x` does not; with it, any
/// null operand passes.
#[derive(Debug, Default, Clone, Copy)]
pub struct EqualityHandler;

const KINDS: &[OperatorKind] = &[OperatorKind::EQUAL, OperatorKind::NOT_EQUAL];

impl Handler for EqualityHandler {
    fn supported_kinds(&self) -> &[OperatorKind] {
        KINDS
    }

    fn build(&self, target: &RuleTarget<'_>) -> Result<Predicate, BindError> {
        let annotation = target.annotation();
        let negate = if *annotation.kind() == OperatorKind::EQUAL {
            false
        } else if *annotation.kind() == OperatorKind::NOT_EQUAL {
            true
        } else {
            return Err(BindError::UnsupportedOperand("not an equality operator"));
        };

        let left = target.property().clone();
        let right = target.operand()?;
        // A null constant is comparable with anything.
        if let Some(right_kind) = right.kind()
            && !left.kind().is_comparable_with(right_kind)
        {
            return Err(BindError::IncompatibleOperand {
                property: left.kind(),
                operand: right_kind,
            });
        }

        let can_be_null = annotation.allows_null();
        Ok(Box::new(move |entity: &dyn Entity| {
            let l = left.read(entity);
            let r = right.read(entity);
            if can_be_null && (l.is_null() || r.is_null()) {
                return true;
            }
            l.loosely_equals(&r) != negate
        }))
    }

    fn default_message(&self, target: &RuleTarget<'_>) -> String {
        let verb = if *target.annotation().kind() == OperatorKind::NOT_EQUAL {
            "must not equal"
        } else {
            "must equal"
        };
        let operand = target
            .operand()
            .map_or_else(|_| "?".to_owned(), |o| o.describe());
        format!("{} {verb} {operand}", target.property().name())
    }
}

crate::rule_handler!(EQUALITY_HANDLER => EqualityHandler);
