//! Rule compilation and the per-type rule-set cache.
//!
//! Compiling an entity type `T`:
//!
//! 1. look up `T`'s metadata binding;
//! 2. resolve the entity key (cached per metadata type);
//! 3. walk the metadata's properties and their annotations in declaration
//!    order, resolve a handler for each annotation and let it build a
//!    predicate against `T`'s shape.
//!
//! Any failure aborts the whole compilation; nothing is cached for `T` and
//! the next request starts over.

use std::any::{TypeId, type_name};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use parking_lot::Mutex;

use crate::annotation::{OperatorKind, Severity};
use crate::entity::{Entity, PropertyDescriptor};
use crate::error::RuleError;
use crate::handler::{HandlerRegistry, Predicate, RuleTarget};
use crate::metadata::MetadataRegistry;
use crate::value::Value;

// ============================================================================
// COMPILED RULES
// ============================================================================

/// One annotation, bound to one entity type.
pub struct CompiledRule {
    property: &'static str,
    kind: OperatorKind,
    predicate: Predicate,
    message: Arc<str>,
    severity: Severity,
}

impl CompiledRule {
    /// Runs the predicate. `true` means the rule holds.
    #[inline]
    pub fn evaluate(&self, entity: &dyn Entity) -> bool {
        (self.predicate)(entity)
    }

    /// The annotated property.
    pub fn property(&self) -> &'static str {
        self.property
    }

    /// The annotation's operator kind.
    pub fn kind(&self) -> &OperatorKind {
        &self.kind
    }

    /// Message reported on failure.
    pub fn message(&self) -> &Arc<str> {
        &self.message
    }

    /// Severity reported on failure.
    pub fn severity(&self) -> Severity {
        self.severity
    }
}

impl fmt::Debug for CompiledRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledRule")
            .field("property", &self.property)
            .field("kind", &self.kind)
            .field("message", &self.message)
            .field("severity", &self.severity)
            .field("predicate", &"<function>")
            .finish()
    }
}

/// The ordered rules of one entity type plus its key property.
#[derive(Debug)]
pub struct RuleSet {
    entity: &'static str,
    key: Option<PropertyDescriptor>,
    rules: Vec<CompiledRule>,
}

impl RuleSet {
    /// Entity type name.
    pub fn entity_name(&self) -> &'static str {
        self.entity
    }

    /// The entity-key property, if the metadata declares one.
    pub fn key(&self) -> Option<&PropertyDescriptor> {
        self.key.as_ref()
    }

    /// Reads the key of one entity. A null key reads as `None`.
    pub fn key_of(&self, entity: &dyn Entity) -> Option<Value> {
        self.key
            .as_ref()
            .map(|k| k.read(entity))
            .filter(|v| !v.is_null())
    }

    /// Rules in declaration order.
    pub fn rules(&self) -> &[CompiledRule] {
        &self.rules
    }

    /// Number of rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns `true` if the metadata declares no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Compiles the rule set of `T`.
pub fn compile<T: Entity>(
    metadata: &MetadataRegistry,
    handlers: &HandlerRegistry,
) -> Result<RuleSet, RuleError> {
    let entity = type_name::<T>();
    let binding = metadata.lookup::<T>()?;
    let definition = binding.definition();
    let shape = T::shape();

    let unknown = |property: &str| RuleError::UnknownProperty {
        entity,
        metadata: binding.metadata_name(),
        property: property.to_owned(),
    };

    let key = match metadata.resolve_entity_key(&binding, &definition) {
        Some(name) => Some(shape.property(&name).cloned().ok_or_else(|| unknown(&name))?),
        None => None,
    };

    let mut rules = Vec::with_capacity(definition.rule_count());
    for declared in definition.properties() {
        let property = shape
            .property(declared.name())
            .ok_or_else(|| unknown(declared.name()))?;

        for annotation in declared.rules() {
            let kind = annotation.kind();
            let handler = handlers
                .resolve(kind)
                .ok_or_else(|| RuleError::HandlerNotFound {
                    kind: kind.clone(),
                    entity,
                    property: property.name().to_owned(),
                })?;

            let target = RuleTarget::new(&shape, property, annotation);
            let predicate = handler
                .build(&target)
                .map_err(|source| RuleError::Binding {
                    entity,
                    property: property.name().to_owned(),
                    kind: kind.clone(),
                    source,
                })?;
            let message: Arc<str> = match annotation.message_template() {
                Some(template) => Arc::from(template),
                None => Arc::from(handler.default_message(&target)),
            };

            tracing::trace!(
                entity,
                property = property.name(),
                %kind,
                handler = handler.name(),
                "compiled rule"
            );
            rules.push(CompiledRule {
                property: property.name(),
                kind: kind.clone(),
                predicate,
                message,
                severity: annotation.severity_level(),
            });
        }
    }

    Ok(RuleSet { entity, key, rules })
}

// ============================================================================
// CACHE
// ============================================================================

/// Compiled rule sets keyed by entity type.
///
/// A type is compiled at most once. Each type owns a slot; the first caller
/// compiles under the slot's own lock while concurrent callers for the same
/// type wait on it and then read the stored set. No map shard is locked
/// while compiling, so a compilation may itself look up other types.
/// Failed compilations store nothing.
#[derive(Debug, Default)]
pub struct RuleCache {
    slots: DashMap<TypeId, Arc<Slot>>,
    compilations: AtomicU64,
}

#[derive(Debug, Default)]
struct Slot {
    set: OnceLock<Arc<RuleSet>>,
    init: Mutex<()>,
}

impl RuleCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached set for `T`, compiling it with `compile` on a miss.
    ///
    /// Compiling the same `T` again from inside `compile` deadlocks.
    pub fn get_or_compile<T, F>(&self, compile: F) -> Result<Arc<RuleSet>, RuleError>
    where
        T: Entity,
        F: FnOnce() -> Result<RuleSet, RuleError>,
    {
        if let Some(set) = self.get::<T>() {
            return Ok(set);
        }

        // The shard guard is dropped at the end of this statement.
        let slot = Arc::clone(self.slots.entry(TypeId::of::<T>()).or_default().value());

        let _init = slot.init.lock();
        if let Some(set) = slot.set.get() {
            return Ok(Arc::clone(set));
        }

        let set = Arc::new(compile()?);
        self.compilations.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(entity = set.entity_name(), rules = set.len(), "compiled rule set");
        Ok(Arc::clone(slot.set.get_or_init(|| set)))
    }

    /// Returns the cached set for `T` without compiling.
    pub fn get<T: Entity>(&self) -> Option<Arc<RuleSet>> {
        self.slots
            .get(&TypeId::of::<T>())
            .and_then(|slot| slot.set.get().cloned())
    }

    /// Number of successful compilations so far.
    pub fn compilations(&self) -> u64 {
        self.compilations.load(Ordering::Relaxed)
    }

    /// Number of cached entity types.
    pub fn len(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| slot.set.get().is_some())
            .count()
    }

    /// Returns `true` if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
