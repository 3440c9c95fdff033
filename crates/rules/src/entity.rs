//! Entity introspection.
//!
//! Rules are declared against property *names*; the engine needs to turn a
//! name into something it can read from an instance and type-check against.
//! An [`Entity`] describes its properties once through a [`Shape`] and reads
//! them by index through [`Entity::value`].
//!
//! Most entity types never implement the trait by hand; the
//! [`entity!`](crate::entity!) macro wraps a plain struct definition and
//! generates the impl from its fields.

use chrono::{DateTime, NaiveDate, Utc};

use crate::value::{Value, ValueKind};

// ============================================================================
// ENTITY TRAIT
// ============================================================================

/// A caller-owned data shape that rules can be evaluated against.
///
/// The engine only ever reads entities; it never mutates them.
///
/// # Examples
///
/// ```rust
/// use nebula_rules::entity::{Entity, PropertyDescriptor, Shape};
/// use nebula_rules::value::{Value, ValueKind};
///
/// struct Window {
///     opens: i64,
///     closes: i64,
/// }
///
/// impl Entity for Window {
///     fn shape() -> Shape {
///         Shape::new(
///             "Window",
///             vec![
///                 PropertyDescriptor::new("opens", 0, ValueKind::Int, false),
///                 PropertyDescriptor::new("closes", 1, ValueKind::Int, false),
///             ],
///         )
///     }
///
///     fn value(&self, index: usize) -> Value {
///         match index {
///             0 => Value::Int(self.opens),
///             1 => Value::Int(self.closes),
///             _ => Value::Null,
///         }
///     }
/// }
///
/// let shape = Window::shape();
/// assert_eq!(shape.property("closes").map(|p| p.index()), Some(1));
/// ```
pub trait Entity: Send + Sync + 'static {
    /// Describes the entity's properties in declaration order.
    fn shape() -> Shape
    where
        Self: Sized;

    /// Reads the property at `index` (as listed by [`Entity::shape`]).
    ///
    /// Out-of-range indexes read as [`Value::Null`].
    fn value(&self, index: usize) -> Value;
}

// ============================================================================
// SHAPE
// ============================================================================

/// One readable property of an entity type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyDescriptor {
    name: &'static str,
    index: usize,
    kind: ValueKind,
    nullable: bool,
}

impl PropertyDescriptor {
    /// Creates a descriptor.
    #[must_use]
    pub const fn new(name: &'static str, index: usize, kind: ValueKind, nullable: bool) -> Self {
        Self {
            name,
            index,
            kind,
            nullable,
        }
    }

    /// Property name as written in the struct.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Position passed to [`Entity::value`].
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Kind of the non-null values this property holds.
    #[must_use]
    pub const fn kind(&self) -> ValueKind {
        self.kind
    }

    /// Whether the property can read as [`Value::Null`].
    #[must_use]
    pub const fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Reads this property from an entity.
    #[inline]
    pub fn read(&self, entity: &dyn Entity) -> Value {
        entity.value(self.index)
    }
}

/// The reflected property list of an entity type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shape {
    type_name: &'static str,
    properties: Vec<PropertyDescriptor>,
}

impl Shape {
    /// Creates a shape from descriptors in declaration order.
    #[must_use]
    pub fn new(type_name: &'static str, properties: Vec<PropertyDescriptor>) -> Self {
        Self {
            type_name,
            properties,
        }
    }

    /// Short type name used in diagnostics.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Looks up a property by name.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// All properties in declaration order.
    #[must_use]
    pub fn properties(&self) -> &[PropertyDescriptor] {
        &self.properties
    }
}

// ============================================================================
// PROPERTY TRAIT
// ============================================================================

/// A field type that can back an entity property.
///
/// Implemented for every primitive integer, floats, `bool`, `String`,
/// `chrono` dates and UTC timestamps, and `Option<T>` of any of those (which
/// makes the property nullable).
///
/// Integer properties have kind [`ValueKind::Int`]. A `u64`, `usize`,
/// `isize`, `i128` or `u128` value outside the `i64` range reads as the
/// nearest [`Value::Float`], which still orders against other numbers.
pub trait Property {
    /// Kind of the non-null values.
    const KIND: ValueKind;

    /// Whether the property can be null.
    const NULLABLE: bool = false;

    /// Reads the field as a [`Value`].
    fn to_value(&self) -> Value;
}

macro_rules! impl_property {
    ($kind:ident => $($t:ty),*) => {
        $(
            impl Property for $t {
                const KIND: ValueKind = ValueKind::$kind;

                #[inline]
                fn to_value(&self) -> Value {
                    Value::from(self.clone())
                }
            }
        )*
    };
}

impl_property!(Int => i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);
impl_property!(Float => f32, f64);
impl_property!(Bool => bool);
impl_property!(Text => String);
impl_property!(Date => NaiveDate);
impl_property!(DateTime => DateTime<Utc>);

impl<T: Property> Property for Option<T> {
    const KIND: ValueKind = T::KIND;
    const NULLABLE: bool = true;

    #[inline]
    fn to_value(&self) -> Value {
        self.as_ref().map_or(Value::Null, Property::to_value)
    }
}
