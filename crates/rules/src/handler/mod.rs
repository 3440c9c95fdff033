//! Handlers turn a declarative annotation into an executable predicate.
//!
//! A [`Handler`] claims one or more [`OperatorKind`]s. When an entity type is
//! compiled, every annotation is routed to the handler registered for its
//! kind, which receives a [`RuleTarget`] (the annotated property, the entity
//! shape and the annotation) and returns a [`Predicate`].
//!
//! # Registration
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │  1. Handler module:  rule_handler!(MY_HANDLER => MyHandler);  │
//! │  2. Linker collects: RULE_HANDLERS (linkme distributed slice) │
//! │  3. Engine calls:    discover_handlers(&["my_crate::rules"])  │
//! │                      -> one instance per handler type         │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! Handlers can also be registered directly with
//! [`HandlerRegistry::register`]; both paths are idempotent per handler type.

pub mod equality;
pub mod pattern;
pub mod relational;

use std::any::TypeId;
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::annotation::{OperatorKind, RuleAnnotation};
use crate::entity::{Entity, PropertyDescriptor, Shape};
use crate::error::BindError;
use crate::value::{Value, ValueKind};

pub use equality::EqualityHandler;
pub use pattern::PatternHandler;
pub use relational::RelationalHandler;

/// Module path under which the built-in handlers are registered.
pub const BUILTIN_MODULE: &str = module_path!();

/// Executable form of one annotation, bound to one entity type.
pub type Predicate = Box<dyn Fn(&dyn Entity) -> bool + Send + Sync>;

// ============================================================================
// HANDLER TRAIT
// ============================================================================

/// Builds predicates for the operator kinds it supports.
///
/// Handlers are stateless across calls: one instance per implementation is
/// created at registration and reused for every compilation.
pub trait Handler: Send + Sync + 'static {
    /// Operator kinds this handler builds predicates for.
    fn supported_kinds(&self) -> &[OperatorKind];

    /// Builds the predicate for `target`.
    ///
    /// Anything that can be checked statically (operand exists, kinds are
    /// compatible, constants are well-formed) must be checked here, not in
    /// the returned predicate.
    fn build(&self, target: &RuleTarget<'_>) -> Result<Predicate, BindError>;

    /// Message used when the annotation has no template of its own.
    fn default_message(&self, target: &RuleTarget<'_>) -> String {
        format!(
            "{} failed the '{}' rule",
            target.property().name(),
            target.annotation().kind()
        )
    }

    /// Name used in diagnostics.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

// ============================================================================
// RULE TARGET
// ============================================================================

/// Everything a handler sees when binding one annotation.
#[derive(Debug, Clone, Copy)]
pub struct RuleTarget<'a> {
    shape: &'a Shape,
    property: &'a PropertyDescriptor,
    annotation: &'a RuleAnnotation,
}

impl<'a> RuleTarget<'a> {
    /// Creates a target.
    pub fn new(
        shape: &'a Shape,
        property: &'a PropertyDescriptor,
        annotation: &'a RuleAnnotation,
    ) -> Self {
        Self {
            shape,
            property,
            annotation,
        }
    }

    /// Shape of the entity type being compiled.
    pub fn shape(&self) -> &'a Shape {
        self.shape
    }

    /// The annotated property (left-hand operand).
    pub fn property(&self) -> &'a PropertyDescriptor {
        self.property
    }

    /// The annotation being bound.
    pub fn annotation(&self) -> &'a RuleAnnotation {
        self.annotation
    }

    /// Resolves the right-hand operand. A constant takes precedence over a
    /// sibling property.
    pub fn operand(&self) -> Result<Operand, BindError> {
        if let Some(value) = self.annotation.constant_value() {
            return Ok(Operand::Constant(value.clone()));
        }
        let name = self
            .annotation
            .other_property()
            .ok_or(BindError::MissingOperand)?;
        self.shape
            .property(name)
            .cloned()
            .map(Operand::Property)
            .ok_or_else(|| BindError::UnknownSibling(name.to_owned()))
    }
}

/// The right-hand side of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// A sibling property on the same entity.
    Property(PropertyDescriptor),
    /// A literal.
    Constant(Value),
}

impl Operand {
    /// Static kind of the operand; `None` for a null constant.
    pub fn kind(&self) -> Option<ValueKind> {
        match self {
            Self::Property(p) => Some(p.kind()),
            Self::Constant(v) => v.kind(),
        }
    }

    /// Reads the operand for one entity.
    #[inline]
    pub fn read<'v>(&'v self, entity: &dyn Entity) -> Cow<'v, Value> {
        match self {
            Self::Property(p) => Cow::Owned(p.read(entity)),
            Self::Constant(v) => Cow::Borrowed(v),
        }
    }

    /// How the operand reads in a default message.
    pub fn describe(&self) -> String {
        match self {
            Self::Property(p) => p.name().to_owned(),
            Self::Constant(v) => v.to_string(),
        }
    }
}

// ============================================================================
// LINK-TIME REGISTRATION
// ============================================================================

/// A handler type registered with [`rule_handler!`](crate::rule_handler!).
pub struct HandlerEntry {
    /// `module_path!()` of the registration site.
    pub module: &'static str,
    /// Handler type name as written at the registration site.
    pub name: &'static str,
    /// Identity of the handler type.
    pub type_id: fn() -> TypeId,
    /// Creates the shared instance.
    pub factory: fn() -> Arc<dyn Handler>,
}

impl HandlerEntry {
    /// Whether this entry lives in `module` or one of its submodules.
    pub fn is_in(&self, module: &str) -> bool {
        match self.module.strip_prefix(module) {
            Some(rest) => rest.is_empty() || rest.starts_with("::"),
            None => false,
        }
    }
}

impl fmt::Debug for HandlerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerEntry")
            .field("module", &self.module)
            .field("name", &self.name)
            .finish()
    }
}

/// Every handler registered with [`rule_handler!`](crate::rule_handler!) in
/// the final binary.
#[linkme::distributed_slice]
pub static RULE_HANDLERS: [HandlerEntry] = [..];

// ============================================================================
// REGISTRY
// ============================================================================

struct Registered {
    type_id: TypeId,
    handler: Arc<dyn Handler>,
}

/// Maps operator kinds to handlers.
///
/// Each handler implementation is held once. When two implementations claim
/// the same kind, the one registered first resolves it.
///
/// Thread-safety is the caller's responsibility; the engine keeps it behind
/// a lock.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: Vec<Registered>,
    by_kind: HashMap<OperatorKind, usize>,
}

impl HandlerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler. Returns `false` if a handler of the same type is
    /// already registered (the new instance is dropped).
    pub fn register<H: Handler>(&mut self, handler: H) -> bool {
        self.insert(TypeId::of::<H>(), Arc::new(handler))
    }

    /// Registers every entry of [`RULE_HANDLERS`] that lives under one of
    /// `modules`. Returns how many handler types were newly registered.
    pub fn discover(&mut self, modules: &[&str]) -> usize {
        self.discover_in(&RULE_HANDLERS, modules)
    }

    /// Like [`discover`](Self::discover) over an explicit entry list.
    pub fn discover_in(&mut self, entries: &[HandlerEntry], modules: &[&str]) -> usize {
        let mut found: Vec<&HandlerEntry> = entries
            .iter()
            .filter(|entry| modules.iter().any(|m| entry.is_in(m)))
            .collect();
        found.sort_by(|a, b| (a.module, a.name).cmp(&(b.module, b.name)));

        let mut added = 0;
        for entry in found {
            let type_id = (entry.type_id)();
            if self.contains_type(type_id) {
                continue;
            }
            if self.insert(type_id, (entry.factory)()) {
                added += 1;
            }
        }
        tracing::debug!(?modules, added, total = self.handlers.len(), "discovered rule handlers");
        added
    }

    fn insert(&mut self, type_id: TypeId, handler: Arc<dyn Handler>) -> bool {
        if self.contains_type(type_id) {
            return false;
        }
        let slot = self.handlers.len();
        for kind in handler.supported_kinds() {
            if let Some(&owner) = self.by_kind.get(kind) {
                tracing::debug!(
                    %kind,
                    kept = self.handlers[owner].handler.name(),
                    ignored = handler.name(),
                    "operator kind already claimed"
                );
                continue;
            }
            self.by_kind.insert(kind.clone(), slot);
        }
        tracing::debug!(handler = handler.name(), "registered rule handler");
        self.handlers.push(Registered { type_id, handler });
        true
    }

    fn contains_type(&self, type_id: TypeId) -> bool {
        self.handlers.iter().any(|r| r.type_id == type_id)
    }

    /// Looks up the handler for `kind`.
    pub fn resolve(&self, kind: &OperatorKind) -> Option<&Arc<dyn Handler>> {
        self.by_kind.get(kind).map(|&slot| &self.handlers[slot].handler)
    }

    /// Whether a handler of type `H` is registered.
    pub fn contains<H: Handler>(&self) -> bool {
        self.contains_type(TypeId::of::<H>())
    }

    /// Whether some handler supports `kind`.
    pub fn supports(&self, kind: &OperatorKind) -> bool {
        self.by_kind.contains_key(kind)
    }

    /// All resolvable operator kinds, sorted.
    pub fn kinds(&self) -> Vec<&OperatorKind> {
        let mut kinds: Vec<_> = self.by_kind.keys().collect();
        kinds.sort();
        kinds
    }

    /// Number of registered handler implementations.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns `true` if no handlers are registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("count", &self.handlers.len())
            .field("kinds", &self.kinds())
            .finish()
    }
}
