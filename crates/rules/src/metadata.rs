//! Metadata definitions and the entity-to-metadata registry.
//!
//! A metadata-definition type mirrors an entity type: it names the entity's
//! properties and attaches [`RuleAnnotation`]s to them. Names are matched
//! against the entity's [`Shape`](crate::entity::Shape) at compile time.
//!
//! ```rust
//! use nebula_rules::annotation::RuleAnnotation;
//! use nebula_rules::metadata::{Metadata, MetadataDefinition};
//!
//! struct ApplicantMetadata;
//!
//! impl Metadata for ApplicantMetadata {
//!     fn define(def: &mut MetadataDefinition) {
//!         def.key("id");
//!         def.property("age").rule(
//!             RuleAnnotation::greater_than_or_equal("min_age")
//!                 .message("Age must be at least MinAge"),
//!         );
//!     }
//! }
//!
//! let def = MetadataDefinition::of::<ApplicantMetadata>();
//! assert_eq!(def.entity_key(), Some("id"));
//! assert_eq!(def.rule_count(), 1);
//! ```

use std::any::{TypeId, type_name};
use std::borrow::Cow;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::annotation::RuleAnnotation;
use crate::entity::Entity;
use crate::error::RuleError;

// ============================================================================
// DEFINITIONS
// ============================================================================

/// A metadata-definition type.
pub trait Metadata: 'static {
    /// Declares properties, rules and the entity key, in order.
    fn define(def: &mut MetadataDefinition);
}

/// Rules declared for one property.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyRules {
    name: Cow<'static, str>,
    is_key: bool,
    rules: Vec<RuleAnnotation>,
}

impl PropertyRules {
    fn new(name: Cow<'static, str>) -> Self {
        Self {
            name,
            is_key: false,
            rules: Vec::new(),
        }
    }

    /// Attaches a rule. Rules on one property keep their declaration order.
    pub fn rule(&mut self, annotation: RuleAnnotation) -> &mut Self {
        self.rules.push(annotation);
        self
    }

    /// Marks this property as the entity key.
    pub fn key(&mut self) -> &mut Self {
        self.is_key = true;
        self
    }

    /// Property name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this property is marked as the entity key.
    pub fn is_key(&self) -> bool {
        self.is_key
    }

    /// Rules in declaration order.
    pub fn rules(&self) -> &[RuleAnnotation] {
        &self.rules
    }
}

/// The evaluated declaration of a [`Metadata`] type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataDefinition {
    properties: Vec<PropertyRules>,
}

impl MetadataDefinition {
    /// Runs `M::define` on an empty definition.
    pub fn of<M: Metadata>() -> Self {
        let mut def = Self::default();
        M::define(&mut def);
        def
    }

    /// Declares (or reopens) a property. Reopening keeps the property at its
    /// first declaration position.
    pub fn property(&mut self, name: impl Into<Cow<'static, str>>) -> &mut PropertyRules {
        let name = name.into();
        let slot = match self.properties.iter().position(|p| p.name == name) {
            Some(slot) => slot,
            None => {
                self.properties.push(PropertyRules::new(name));
                self.properties.len() - 1
            }
        };
        &mut self.properties[slot]
    }

    /// Declares a property and marks it as the entity key.
    pub fn key(&mut self, name: impl Into<Cow<'static, str>>) -> &mut PropertyRules {
        self.property(name).key()
    }

    /// Properties in declaration order.
    pub fn properties(&self) -> &[PropertyRules] {
        &self.properties
    }

    /// Name of the first property marked as key.
    pub fn entity_key(&self) -> Option<&str> {
        self.properties.iter().find(|p| p.is_key).map(PropertyRules::name)
    }

    /// Total number of rules across all properties.
    pub fn rule_count(&self) -> usize {
        self.properties.iter().map(|p| p.rules.len()).sum()
    }
}

// ============================================================================
// REGISTRY
// ============================================================================

/// A write-once entity-to-metadata binding.
#[derive(Debug, Clone, Copy)]
pub struct Binding {
    entity_name: &'static str,
    metadata: TypeId,
    metadata_name: &'static str,
    define: fn(&mut MetadataDefinition),
}

impl Binding {
    fn of<T: Entity, M: Metadata>() -> Self {
        Self {
            entity_name: type_name::<T>(),
            metadata: TypeId::of::<M>(),
            metadata_name: type_name::<M>(),
            define: M::define,
        }
    }

    /// Entity type name.
    pub fn entity_name(&self) -> &'static str {
        self.entity_name
    }

    /// Metadata type identity.
    pub fn metadata(&self) -> TypeId {
        self.metadata
    }

    /// Metadata type name.
    pub fn metadata_name(&self) -> &'static str {
        self.metadata_name
    }

    /// Evaluates the metadata type's declaration.
    pub fn definition(&self) -> MetadataDefinition {
        let mut def = MetadataDefinition::default();
        (self.define)(&mut def);
        def
    }
}

/// Maps entity types to metadata types, and metadata types to their key.
///
/// Safe to share: bindings and key lookups live in concurrent maps.
#[derive(Debug, Default)]
pub struct MetadataRegistry {
    bindings: DashMap<TypeId, Binding>,
    keys: DashMap<TypeId, Option<String>>,
}

impl MetadataRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds entity type `T` to metadata type `M`.
    ///
    /// Fails with [`RuleError::DuplicateBinding`] if `T` is already bound;
    /// the existing binding is left untouched.
    pub fn bind<T: Entity, M: Metadata>(&self) -> Result<(), RuleError> {
        let binding = Binding::of::<T, M>();
        match self.bindings.entry(TypeId::of::<T>()) {
            Entry::Occupied(existing) => Err(RuleError::DuplicateBinding {
                entity: binding.entity_name,
                existing: existing.get().metadata_name,
                attempted: binding.metadata_name,
            }),
            Entry::Vacant(slot) => {
                tracing::debug!(
                    entity = binding.entity_name,
                    metadata = binding.metadata_name,
                    "bound rule metadata"
                );
                slot.insert(binding);
                Ok(())
            }
        }
    }

    /// Returns the binding for `T`.
    pub fn lookup<T: Entity>(&self) -> Result<Binding, RuleError> {
        self.bindings
            .get(&TypeId::of::<T>())
            .map(|b| *b)
            .ok_or(RuleError::MissingBinding {
                entity: type_name::<T>(),
            })
    }

    /// Returns the entity-key property name declared by the binding's
    /// metadata type, scanning `definition` only the first time a metadata
    /// type is seen.
    pub fn resolve_entity_key(
        &self,
        binding: &Binding,
        definition: &MetadataDefinition,
    ) -> Option<String> {
        self.keys
            .entry(binding.metadata)
            .or_insert_with(|| definition.entity_key().map(str::to_owned))
            .clone()
    }

    /// Whether `T` is bound.
    pub fn is_bound<T: Entity>(&self) -> bool {
        self.bindings.contains_key(&TypeId::of::<T>())
    }

    /// Number of bound entity types.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Returns `true` if nothing is bound.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
