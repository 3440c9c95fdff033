//! Macros for declaring entities and link-time handler registrations.
//!
//! # Available Macros
//!
//! - [`entity!`] - wrap a struct definition and implement [`Entity`](crate::entity::Entity) for it
//! - [`rule_handler!`] - register a [`Handler`](crate::handler::Handler) for discovery

// ============================================================================
// ENTITY MACRO
// ============================================================================

/// Defines a struct and implements [`Entity`](crate::entity::Entity) for it.
///
/// Every field type must implement [`Property`](crate::entity::Property).
/// Properties are exposed under their field names, in declaration order.
///
/// ```rust
/// use nebula_rules::entity;
/// use nebula_rules::entity::Entity;
///
/// entity! {
///     #[derive(Debug, Clone)]
///     pub struct Applicant {
///         pub id: u32,
///         pub age: i32,
///         pub min_age: Option<i32>,
///     }
/// }
///
/// let shape = Applicant::shape();
/// assert_eq!(shape.properties().len(), 3);
/// assert!(shape.property("min_age").unwrap().is_nullable());
/// ```
#[macro_export]
macro_rules! entity {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$fmeta:meta])*
                $fvis:vis $field:ident : $fty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $(
                $(#[$fmeta])*
                $fvis $field: $fty,
            )*
        }

        impl $crate::entity::Entity for $name {
            fn shape() -> $crate::entity::Shape {
                let fields: &[(&'static str, $crate::value::ValueKind, bool)] = &[
                    $((
                        stringify!($field),
                        <$fty as $crate::entity::Property>::KIND,
                        <$fty as $crate::entity::Property>::NULLABLE,
                    )),*
                ];
                $crate::entity::Shape::new(
                    stringify!($name),
                    fields
                        .iter()
                        .enumerate()
                        .map(|(index, &(name, kind, nullable))| {
                            $crate::entity::PropertyDescriptor::new(name, index, kind, nullable)
                        })
                        .collect(),
                )
            }

            fn value(&self, index: usize) -> $crate::value::Value {
                let readers: &[fn(&Self) -> $crate::value::Value] = &[
                    $(|entity: &Self| $crate::entity::Property::to_value(&entity.$field)),*
                ];
                readers
                    .get(index)
                    .map_or($crate::value::Value::Null, |read| read(self))
            }
        }
    };
}

// ============================================================================
// HANDLER REGISTRATION MACRO
// ============================================================================

/// Adds a handler type to the [`RULE_HANDLERS`](crate::handler::RULE_HANDLERS)
/// slice so [`discover_handlers`](crate::RulesEngine::discover_handlers) can
/// find it under the module this macro is invoked in.
///
/// The handler type must implement `Default`; discovery creates one instance
/// per engine. The generated static allows `unsafe_code`, since linkme
/// places it with `#[link_section]`.
///
/// ```rust,ignore
/// #[derive(Debug, Default)]
/// pub struct BetweenHandler;
///
/// impl Handler for BetweenHandler { /* ... */ }
///
/// nebula_rules::rule_handler!(BETWEEN_HANDLER => BetweenHandler);
/// ```
#[macro_export]
macro_rules! rule_handler {
    ($static_name:ident => $handler:ty) => {
        #[$crate::__private::linkme::distributed_slice($crate::handler::RULE_HANDLERS)]
        #[linkme(crate = $crate::__private::linkme)]
        #[allow(unsafe_code)]
        static $static_name: $crate::handler::HandlerEntry = $crate::handler::HandlerEntry {
            module: module_path!(),
            name: stringify!($handler),
            type_id: ::std::any::TypeId::of::<$handler>,
            factory: || ::std::sync::Arc::new(<$handler as ::std::default::Default>::default()),
        };
    };
}
