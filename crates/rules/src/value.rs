//! Operand values read from entities and supplied as rule constants.
//!
//! Every property an entity exposes is read as a [`Value`]; every property
//! declares a [`ValueKind`] so handlers can reject incompatible operand
//! pairings at bind time instead of at evaluation time.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

// ============================================================================
// VALUE KIND
// ============================================================================

/// Static kind of a property or constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    /// `true` / `false`.
    Bool,
    /// Signed integer (all integer widths widen to `i64`).
    Int,
    /// Floating point.
    Float,
    /// UTF-8 text.
    Text,
    /// Calendar date without a time zone.
    Date,
    /// UTC timestamp.
    DateTime,
}

impl ValueKind {
    /// Returns `true` for `Int` and `Float`.
    #[must_use]
    pub const fn is_numeric(self) -> bool {
        matches!(self, Self::Int | Self::Float)
    }

    /// Returns `true` if values of this kind have a total-ish order
    /// usable by `<`, `<=`, `>`, `>=`.
    #[must_use]
    pub const fn is_ordered(self) -> bool {
        !matches!(self, Self::Bool)
    }

    /// Returns `true` if a value of `self` can be compared against a value
    /// of `other`. Numeric kinds compare with each other.
    #[must_use]
    pub fn is_comparable_with(self, other: Self) -> bool {
        self == other || (self.is_numeric() && other.is_numeric())
    }

    /// Lowercase name used in diagnostics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::Text => "text",
            Self::Date => "date",
            Self::DateTime => "datetime",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// VALUE
// ============================================================================

/// A property value or rule constant.
///
/// `Null` stands for an absent value (`None` in an `Option<T>` property).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// Absent value.
    Null,
    /// Boolean.
    Bool(bool),
    /// Integer.
    Int(i64),
    /// Float.
    Float(f64),
    /// Text.
    Text(String),
    /// Date.
    Date(NaiveDate),
    /// Timestamp.
    DateTime(DateTime<Utc>),
}

impl Value {
    /// Returns the kind of this value, or `None` for `Null`.
    #[must_use]
    pub const fn kind(&self) -> Option<ValueKind> {
        match self {
            Self::Null => None,
            Self::Bool(_) => Some(ValueKind::Bool),
            Self::Int(_) => Some(ValueKind::Int),
            Self::Float(_) => Some(ValueKind::Float),
            Self::Text(_) => Some(ValueKind::Text),
            Self::Date(_) => Some(ValueKind::Date),
            Self::DateTime(_) => Some(ValueKind::DateTime),
        }
    }

    /// Returns `true` for [`Value::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Borrows the text of a `Text` value.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Compares two non-null values of comparable kinds.
    ///
    /// Returns `None` when either side is `Null`, when the kinds are not
    /// comparable, or when a float comparison involves NaN.
    #[must_use]
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => Some(a.cmp(b)),
            (Self::Int(a), Self::Int(b)) => Some(a.cmp(b)),
            (Self::Float(a), Self::Float(b)) => a.partial_cmp(b),
            (Self::Int(a), Self::Float(b)) => compare_int_float(*a, *b),
            (Self::Float(a), Self::Int(b)) => compare_int_float(*b, *a).map(Ordering::reverse),
            (Self::Text(a), Self::Text(b)) => Some(a.cmp(b)),
            (Self::Date(a), Self::Date(b)) => Some(a.cmp(b)),
            (Self::DateTime(a), Self::DateTime(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Equality with numeric widening and `null == null`.
    #[must_use]
    pub fn loosely_equals(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Null, _) | (_, Self::Null) => false,
            _ => self.compare(other) == Some(Ordering::Equal),
        }
    }
}

/// Exact ordering of an integer against a float.
///
/// Widening the integer to `f64` rounds above 2^53, so the float is split
/// into its integral part and its fraction instead.
fn compare_int_float(int: i64, float: f64) -> Option<Ordering> {
    // 2^63, exactly representable.
    const BOUND: f64 = 9_223_372_036_854_775_808.0;
    if float.is_nan() {
        return None;
    }
    if float >= BOUND {
        return Some(Ordering::Less);
    }
    if float < -BOUND {
        return Some(Ordering::Greater);
    }
    let whole = float.trunc();
    let ordering = int.cmp(&(whole as i64));
    if ordering != Ordering::Equal {
        return Some(ordering);
    }
    let fraction = float - whole;
    Some(if fraction > 0.0 {
        Ordering::Less
    } else if fraction < 0.0 {
        Ordering::Greater
    } else {
        Ordering::Equal
    })
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Float(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
            Self::Date(d) => write!(f, "{d}"),
            Self::DateTime(t) => write!(f, "{}", t.to_rfc3339()),
        }
    }
}

macro_rules! impl_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Self::Int(i64::from(v))
                }
            }
        )*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32);

macro_rules! impl_from_wide_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                /// `Int` when the value fits in `i64`, otherwise the nearest
                /// `Float`.
                fn from(v: $t) -> Self {
                    i64::try_from(v).map_or_else(|_| Self::Float(v as f64), Self::Int)
                }
            }
        )*
    };
}

impl_from_wide_int!(u64, usize, isize, i128, u128);

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Self::Float(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Self::Date(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Self::DateTime(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_kinds_compare_across_widths() {
        assert_eq!(Value::Int(2).compare(&Value::Float(1.5)), Some(Ordering::Greater));
        assert_eq!(Value::Float(2.0).compare(&Value::Int(2)), Some(Ordering::Equal));
        assert!(ValueKind::Int.is_comparable_with(ValueKind::Float));
    }

    #[test]
    fn int_float_comparison_is_exact_above_f64_precision() {
        let big = Value::Int(9_007_199_254_740_993);
        let float = Value::Float(9_007_199_254_740_992.0);
        assert_eq!(big.compare(&float), Some(Ordering::Greater));
        assert_eq!(float.compare(&big), Some(Ordering::Less));
        assert!(!big.loosely_equals(&float));
        assert!(Value::Int(9_007_199_254_740_992).loosely_equals(&float));
    }

    #[test]
    fn int_float_comparison_uses_the_fraction() {
        assert_eq!(Value::Int(2).compare(&Value::Float(2.5)), Some(Ordering::Less));
        assert_eq!(Value::Int(-2).compare(&Value::Float(-2.5)), Some(Ordering::Greater));
        assert_eq!(Value::Int(0).compare(&Value::Float(-0.0)), Some(Ordering::Equal));
        assert_eq!(Value::Float(-0.5).compare(&Value::Int(0)), Some(Ordering::Less));
    }

    #[test]
    fn int_float_comparison_beyond_i64_range() {
        assert_eq!(Value::Int(i64::MAX).compare(&Value::Float(9.3e18)), Some(Ordering::Less));
        assert_eq!(Value::Int(i64::MAX).compare(&Value::Float(i64::MAX as f64)), Some(Ordering::Less));
        assert_eq!(Value::Int(i64::MIN).compare(&Value::Float(i64::MIN as f64)), Some(Ordering::Equal));
        assert_eq!(Value::Int(i64::MIN).compare(&Value::Float(f64::NEG_INFINITY)), Some(Ordering::Greater));
        assert_eq!(Value::Float(f64::INFINITY).compare(&Value::Int(0)), Some(Ordering::Greater));
        assert_eq!(Value::Int(0).compare(&Value::Float(f64::NAN)), None);
    }

    #[test]
    fn wide_integers_convert_without_wrapping() {
        assert_eq!(Value::from(42u64), Value::Int(42));
        assert_eq!(Value::from(7usize), Value::Int(7));
        assert_eq!(Value::from(-3i128), Value::Int(-3));
        assert_eq!(Value::from(u64::MAX), Value::Float(u64::MAX as f64));
        assert_eq!(Value::from(i128::MIN), Value::Float(i128::MIN as f64));
        assert_eq!(Value::from(Some(5u128)), Value::Int(5));
    }

    #[test]
    fn mismatched_kinds_are_incomparable() {
        assert_eq!(Value::Int(1).compare(&Value::Text("1".into())), None);
        assert!(!ValueKind::Text.is_comparable_with(ValueKind::Int));
    }

    #[test]
    fn null_never_orders() {
        assert_eq!(Value::Null.compare(&Value::Int(1)), None);
        assert_eq!(Value::Null.compare(&Value::Null), None);
    }

    #[test]
    fn nan_is_incomparable() {
        assert_eq!(Value::Float(f64::NAN).compare(&Value::Float(1.0)), None);
        assert!(!Value::Float(f64::NAN).loosely_equals(&Value::Float(f64::NAN)));
    }

    #[test]
    fn loose_equality_treats_nulls_as_equal() {
        assert!(Value::Null.loosely_equals(&Value::Null));
        assert!(!Value::Null.loosely_equals(&Value::Int(0)));
        assert!(Value::Int(3).loosely_equals(&Value::Float(3.0)));
    }

    #[test]
    fn option_converts_to_null() {
        assert_eq!(Value::from(None::<i32>), Value::Null);
        assert_eq!(Value::from(Some(4u8)), Value::Int(4));
    }

    #[test]
    fn bool_is_not_ordered() {
        assert!(!ValueKind::Bool.is_ordered());
        assert!(ValueKind::Date.is_ordered());
    }
}
