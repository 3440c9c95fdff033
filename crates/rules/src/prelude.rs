//! Prelude module for convenient imports.
//!
//! `use nebula_rules::prelude::*;` brings in the macros, traits and types
//! needed to declare entities and metadata and run the engine.

// ============================================================================
// DECLARATION: entities, metadata, annotations
// ============================================================================

pub use crate::annotation::{OperatorKind, RuleAnnotation, Severity};
pub use crate::entity::{Entity, Property};
pub use crate::metadata::{Metadata, MetadataDefinition};
pub use crate::{entity, rule_handler};

// ============================================================================
// HANDLERS
// ============================================================================

pub use crate::handler::{Handler, Operand, Predicate, RuleTarget};

// ============================================================================
// EXECUTION: engine, results, errors
// ============================================================================

pub use crate::config::{EngineConfig, EvaluationMode};
pub use crate::engine::RulesEngine;
pub use crate::error::{BindError, RuleError};
pub use crate::result::{Failure, ValidationResult};
pub use crate::value::{Value, ValueKind};
