//! Ordering comparisons: `>`, `>=`, `<`, `<=`.

use std::cmp::Ordering;

use super::{Handler, Operand, Predicate, RuleTarget};
use crate::annotation::OperatorKind;
use crate::entity::Entity;
use crate::error::BindError;

/// Builds `left <op> right` predicates for the ordering operators.
///
/// Both operands must be of comparable, ordered kinds (`Int`/`Float` mix
/// freely; `Bool` is rejected). A null operand passes when the annotation
/// allows nulls and fails otherwise; so does a NaN.
#[derive(Debug, Default, Clone, Copy)]
pub struct RelationalHandler;

const KINDS: &[OperatorKind] = &[
    OperatorKind::GREATER_THAN,
    OperatorKind::GREATER_THAN_OR_EQUAL,
    OperatorKind::LESS_THAN,
    OperatorKind::LESS_THAN_OR_EQUAL,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Gt,
    Ge,
    Lt,
    Le,
}

impl Op {
    fn of(kind: &OperatorKind) -> Option<Self> {
        if *kind == OperatorKind::GREATER_THAN {
            Some(Self::Gt)
        } else if *kind == OperatorKind::GREATER_THAN_OR_EQUAL {
            Some(Self::Ge)
        } else if *kind == OperatorKind::LESS_THAN {
            Some(Self::Lt)
        } else if *kind == OperatorKind::LESS_THAN_OR_EQUAL {
            Some(Self::Le)
        } else {
            None
        }
    }

    #[inline]
    fn holds(self, ord: Ordering) -> bool {
        match self {
            Self::Gt => ord == Ordering::Greater,
            Self::Ge => ord != Ordering::Less,
            Self::Lt => ord == Ordering::Less,
            Self::Le => ord != Ordering::Greater,
        }
    }

    fn phrase(self) -> &'static str {
        match self {
            Self::Gt => "greater than",
            Self::Ge => "greater than or equal to",
            Self::Lt => "less than",
            Self::Le => "less than or equal to",
        }
    }
}

impl Handler for RelationalHandler {
    fn supported_kinds(&self) -> &[OperatorKind] {
        KINDS
    }

    fn build(&self, target: &RuleTarget<'_>) -> Result<Predicate, BindError> {
        let annotation = target.annotation();
        let op = Op::of(annotation.kind())
            .ok_or(BindError::UnsupportedOperand("not an ordering operator"))?;

        let left = target.property().clone();
        if !left.kind().is_ordered() {
            return Err(BindError::UnsupportedKind(left.kind()));
        }

        let right = target.operand()?;
        let Some(right_kind) = right.kind() else {
            return Err(BindError::InvalidConstant(
                "null cannot be ordered against".into(),
            ));
        };
        if !left.kind().is_comparable_with(right_kind) {
            return Err(BindError::IncompatibleOperand {
                property: left.kind(),
                operand: right_kind,
            });
        }

        let can_be_null = annotation.allows_null();
        Ok(Box::new(move |entity: &dyn Entity| {
            let l = left.read(entity);
            let r = right.read(entity);
            if l.is_null() || r.is_null() {
                return can_be_null;
            }
            l.compare(&r).is_some_and(|ord| op.holds(ord))
        }))
    }

    fn default_message(&self, target: &RuleTarget<'_>) -> String {
        let phrase = Op::of(target.annotation().kind()).map_or("comparable to", Op::phrase);
        let operand = target
            .operand()
            .map_or_else(|_| "?".to_owned(), |o: Operand| o.describe());
        format!("{} must be {phrase} {operand}", target.property().name())
    }
}

crate::rule_handler!(RELATIONAL_HANDLER => RelationalHandler);
