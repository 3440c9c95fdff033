//! The rules engine: registrations, compiled-rule cache and batch execution.
//!
//! ```text
//! bind_metadata::<T, M>() ──► MetadataRegistry ─┐
//! register_handler(h)     ──► HandlerRegistry ──┼─► compile::<T>() ──► RuleCache
//! discover_handlers(..)   ──► HandlerRegistry ──┘                         │
//!                                                                         ▼
//! validate(&[T]) ──────────────────────────────────────────► Validation (lazy)
//!                                                             └─► ValidationResult per entity
//! ```

use std::fmt;
use std::iter::FusedIterator;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::compile::{RuleCache, RuleSet, compile};
use crate::config::{EngineConfig, EvaluationMode};
use crate::entity::Entity;
use crate::error::RuleError;
use crate::handler::{BUILTIN_MODULE, Handler, HandlerRegistry};
use crate::metadata::{Metadata, MetadataRegistry};
use crate::result::ValidationResult;

/// Point-in-time counters for an engine instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Entity types bound to metadata.
    pub bound_types: usize,
    /// Registered handler implementations.
    pub handlers: usize,
    /// Entity types with a cached rule set.
    pub compiled_types: usize,
    /// Successful compilations since construction.
    pub compilations: u64,
}

/// Compiles declarative rules per entity type and validates entity batches.
///
/// All caches belong to the instance; dropping the engine drops them. The
/// engine is `Send + Sync` and may be shared across threads: registrations
/// are serialized, each entity type is compiled at most once, and cached
/// rule sets are read without locking the handler registry.
///
/// # Examples
///
/// ```rust
/// use nebula_rules::prelude::*;
///
/// entity! {
///     pub struct Applicant {
///         pub id: u32,
///         pub age: i32,
///         pub min_age: i32,
///     }
/// }
///
/// struct ApplicantMetadata;
///
/// impl Metadata for ApplicantMetadata {
///     fn define(def: &mut MetadataDefinition) {
///         def.key("id");
///         def.property("age").rule(
///             RuleAnnotation::greater_than_or_equal("min_age")
///                 .message("Age must be at least MinAge"),
///         );
///     }
/// }
///
/// # fn main() -> Result<(), RuleError> {
/// let engine = RulesEngine::new();
/// engine.bind_metadata::<Applicant, ApplicantMetadata>()?;
///
/// let batch = [Applicant { id: 1, age: 17, min_age: 18 }];
/// let results = engine.validate_all(&batch)?;
/// assert_eq!(&*results[0].failures[0].message, "Age must be at least MinAge");
/// # Ok(())
/// # }
/// ```
pub struct RulesEngine {
    config: EngineConfig,
    handlers: RwLock<HandlerRegistry>,
    metadata: MetadataRegistry,
    rules: RuleCache,
}

impl RulesEngine {
    /// Creates an engine with the built-in handlers registered.
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Creates an engine from `config`, running the discovery it asks for.
    pub fn with_config(config: EngineConfig) -> Self {
        let mut handlers = HandlerRegistry::new();
        if config.builtin_handlers {
            handlers.discover(&[BUILTIN_MODULE]);
        }
        if !config.discover.is_empty() {
            let modules: Vec<&str> = config.discover.iter().map(String::as_str).collect();
            handlers.discover(&modules);
        }

        Self {
            config,
            handlers: RwLock::new(handlers),
            metadata: MetadataRegistry::new(),
            rules: RuleCache::new(),
        }
    }

    /// The configuration this engine was built with.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ========================================================================
    // REGISTRATION
    // ========================================================================

    /// Binds entity type `T` to metadata type `M`.
    ///
    /// # Errors
    ///
    /// [`RuleError::DuplicateBinding`] if `T` is already bound; the existing
    /// binding stays in place.
    pub fn bind_metadata<T: Entity, M: Metadata>(&self) -> Result<&Self, RuleError> {
        self.metadata.bind::<T, M>()?;
        Ok(self)
    }

    /// Registers a custom handler. Registering a second instance of the same
    /// handler type is a no-op.
    ///
    /// Rule sets already compiled keep the handlers they were compiled with.
    pub fn register_handler<H: Handler>(&self, handler: H) -> &Self {
        self.handlers.write().register(handler);
        self
    }

    /// Registers every handler declared with
    /// [`rule_handler!`](crate::rule_handler!) in one of `modules` (or their
    /// submodules). Returns the number of newly registered handler types.
    pub fn discover_handlers(&self, modules: &[&str]) -> usize {
        self.handlers.write().discover(modules)
    }

    // ========================================================================
    // EXECUTION
    // ========================================================================

    /// Returns the compiled rule set of `T`, compiling it on first use.
    ///
    /// # Errors
    ///
    /// Any configuration error found while compiling: a missing binding, an
    /// operator kind without a handler, or an annotation its handler cannot
    /// bind. Nothing is cached on error.
    pub fn rule_set<T: Entity>(&self) -> Result<Arc<RuleSet>, RuleError> {
        if let Some(set) = self.rules.get::<T>() {
            return Ok(set);
        }
        // Handlers before the cache slot. A recursive read lets a handler's
        // `build` ask for another type's rules while a writer is queued.
        let handlers = self.handlers.read_recursive();
        self.rules
            .get_or_compile::<T, _>(|| compile::<T>(&self.metadata, &handlers))
    }

    /// Validates a batch of entities.
    ///
    /// The rule set is resolved up front, so configuration errors are
    /// returned here. The returned iterator evaluates lazily and yields one
    /// result per entity, in input order.
    ///
    /// # Errors
    ///
    /// See [`rule_set`](Self::rule_set).
    pub fn validate<'a, T, I>(&self, entities: I) -> Result<Validation<I::IntoIter>, RuleError>
    where
        T: Entity,
        I: IntoIterator<Item = &'a T>,
    {
        let rules = self.rule_set::<T>()?;
        tracing::trace!(entity = rules.entity_name(), rules = rules.len(), "validating batch");
        Ok(Validation {
            rules,
            mode: self.config.evaluation,
            entities: entities.into_iter(),
        })
    }

    /// Validates a batch and collects the results.
    ///
    /// # Errors
    ///
    /// See [`rule_set`](Self::rule_set).
    pub fn validate_all<'a, T, I>(&self, entities: I) -> Result<Vec<ValidationResult>, RuleError>
    where
        T: Entity,
        I: IntoIterator<Item = &'a T>,
    {
        Ok(self.validate(entities)?.collect())
    }

    /// Validates a single entity.
    ///
    /// # Errors
    ///
    /// See [`rule_set`](Self::rule_set).
    pub fn validate_one<T: Entity>(&self, entity: &T) -> Result<ValidationResult, RuleError> {
        let rules = self.rule_set::<T>()?;
        Ok(evaluate(&rules, self.config.evaluation, entity))
    }

    /// Current counters.
    pub fn stats(&self) -> EngineStats {
        let handlers = self.handlers.read().len();
        EngineStats {
            bound_types: self.metadata.len(),
            handlers,
            compiled_types: self.rules.len(),
            compilations: self.rules.compilations(),
        }
    }
}

impl Default for RulesEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RulesEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RulesEngine")
            .field("config", &self.config)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

fn evaluate(rules: &RuleSet, mode: EvaluationMode, entity: &dyn Entity) -> ValidationResult {
    let mut result = ValidationResult::new(rules.key_of(entity));
    for rule in rules.rules() {
        if rule.evaluate(entity) {
            continue;
        }
        result.add(Arc::clone(rule.message()), rule.severity());
        if mode == EvaluationMode::FirstFailure {
            break;
        }
    }
    result
}

// ============================================================================
// LAZY RESULTS
// ============================================================================

/// Lazily validates a batch; created by [`RulesEngine::validate`].
///
/// Holds its own handle on the compiled rule set, so it does not borrow the
/// engine.
pub struct Validation<I> {
    rules: Arc<RuleSet>,
    mode: EvaluationMode,
    entities: I,
}

impl<I> Validation<I> {
    /// The rule set being applied.
    pub fn rule_set(&self) -> &Arc<RuleSet> {
        &self.rules
    }
}

impl<'a, T, I> Iterator for Validation<I>
where
    T: Entity,
    I: Iterator<Item = &'a T>,
{
    type Item = ValidationResult;

    fn next(&mut self) -> Option<ValidationResult> {
        let entity = self.entities.next()?;
        Some(evaluate(&self.rules, self.mode, entity))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.entities.size_hint()
    }
}

impl<'a, T, I> ExactSizeIterator for Validation<I>
where
    T: Entity,
    I: ExactSizeIterator<Item = &'a T>,
{
}

impl<'a, T, I> FusedIterator for Validation<I>
where
    T: Entity,
    I: FusedIterator<Item = &'a T>,
{
}

impl<I> fmt::Debug for Validation<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validation")
            .field("entity", &self.rules.entity_name())
            .field("rules", &self.rules.len())
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}
