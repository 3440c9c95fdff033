//! # nebula-rules
//!
//! Declarative relational rules for the Nebula workflow engine, compiled once
//! per entity type into cached predicates and run over entity batches.
//!
//! ## Quick Start
//!
//! ```rust
//! use nebula_rules::prelude::*;
//!
//! entity! {
//!     pub struct Applicant {
//!         pub id: u32,
//!         pub age: i32,
//!         pub min_age: i32,
//!     }
//! }
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
//! # fn main() -> Result<(), RuleError> {
//! let engine = RulesEngine::new();
//! engine.bind_metadata::<Applicant, ApplicantMetadata>()?;
//!
//! let batch = [
//!     Applicant { id: 1, age: 17, min_age: 18 },
//!     Applicant { id: 2, age: 18, min_age: 18 },
//! ];
//! let results = engine.validate_all(&batch)?;
//! assert!(results[0].has_errors());
//! assert!(results[1].is_valid());
//! # Ok(())
//! # }
//! ```
//!
//! ## Pieces
//!
//! - **Entities**: [`entity!`] implements [`Entity`](entity::Entity) for a struct
//! - **Metadata**: [`Metadata`](metadata::Metadata) types attach
//!   [`RuleAnnotation`](annotation::RuleAnnotation)s to property names
//! - **Handlers**: turn an annotation into a predicate; built-ins cover
//!   `>`, `>=`, `<`, `<=`, `==`, `!=` and regex matching. Custom handlers are
//!   registered directly or through [`rule_handler!`] and
//!   [`RulesEngine::discover_handlers`]
//! - **Engine**: [`RulesEngine`] owns the registries and the compiled-rule cache

// linkme places the handler registration statics with `#[link_section]`.
#![allow(unsafe_code)]

pub mod annotation;
pub mod compile;
pub mod config;
pub mod engine;
pub mod entity;
pub mod error;
pub mod handler;
mod macros;
pub mod metadata;
pub mod prelude;
pub mod result;
pub mod value;

pub use annotation::{OperatorKind, RuleAnnotation, Severity};
pub use config::{EngineConfig, EvaluationMode};
pub use engine::{EngineStats, RulesEngine, Validation};
pub use error::{BindError, RuleError};
pub use result::{Failure, ValidationResult};
pub use value::{Value, ValueKind};

#[doc(hidden)]
pub mod __private {
    pub use linkme;
}
