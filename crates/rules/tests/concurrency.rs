//! Shared-engine behaviour: concurrent first use compiles once, and cached
//! rule sets serve any number of readers.

use std::sync::{Barrier, OnceLock};
use std::thread;

use nebula_rules::prelude::*;
use pretty_assertions::assert_eq;

const THREADS: usize = 8;

entity! {
    struct Shipment {
        id: u32,
        weight: f64,
        limit: f64,
    }
}

struct ShipmentMetadata;

impl Metadata for ShipmentMetadata {
    fn define(def: &mut MetadataDefinition) {
        def.key("id");
        def.property("weight")
            .rule(RuleAnnotation::less_than_or_equal("limit").message("overweight"))
            .rule(
                RuleAnnotation::new(OperatorKind::GREATER_THAN)
                    .constant(0)
                    .message("empty shipment")
                    .severity(Severity::Warning),
            );
    }
}

entity! {
    struct Invoice {
        number: String,
        total: i64,
        paid: i64,
    }
}

struct InvoiceMetadata;

impl Metadata for InvoiceMetadata {
    fn define(def: &mut MetadataDefinition) {
        def.key("number");
        def.property("paid")
            .rule(RuleAnnotation::less_than_or_equal("total").message("overpaid"));
    }
}

fn shipments() -> Vec<Shipment> {
    (0..64u32)
        .map(|i| Shipment {
            id: i,
            weight: (i % 5) as f64 * 10.0,
            limit: 25.0,
        })
        .collect()
}

#[test]
fn concurrent_first_use_compiles_once() {
    let engine = RulesEngine::new();
    engine
        .bind_metadata::<Shipment, ShipmentMetadata>()
        .unwrap();
    let batch = shipments();
    let barrier = Barrier::new(THREADS);

    let outputs: Vec<Vec<ValidationResult>> = thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                s.spawn(|| {
                    barrier.wait();
                    engine.validate_all(&batch).unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(engine.stats().compilations, 1);
    for output in &outputs[1..] {
        assert_eq!(output, &outputs[0]);
    }
    assert_eq!(outputs[0].len(), batch.len());
}

#[test]
fn distinct_types_compile_independently_under_contention() {
    let engine = RulesEngine::new();
    engine
        .bind_metadata::<Shipment, ShipmentMetadata>()
        .unwrap()
        .bind_metadata::<Invoice, InvoiceMetadata>()
        .unwrap();
    let shipments = shipments();
    let invoices: Vec<Invoice> = (0..16)
        .map(|i| Invoice {
            number: format!("INV-{i}"),
            total: 100,
            paid: i * 10,
        })
        .collect();
    let barrier = Barrier::new(THREADS);

    thread::scope(|s| {
        for n in 0..THREADS {
            let (engine, barrier, shipments, invoices) = (&engine, &barrier, &shipments, &invoices);
            s.spawn(move || {
                barrier.wait();
                if n % 2 == 0 {
                    assert_eq!(engine.validate(shipments).unwrap().len(), shipments.len());
                } else {
                    let overpaid = engine
                        .validate(invoices)
                        .unwrap()
                        .filter(ValidationResult::has_errors)
                        .count();
                    assert_eq!(overpaid, 5);
                }
            });
        }
    });

    let stats = engine.stats();
    assert_eq!(stats.compilations, 2);
    assert_eq!(stats.compiled_types, 2);
}

#[test]
fn registration_while_validating_is_safe() {
    let engine = RulesEngine::new();
    engine
        .bind_metadata::<Shipment, ShipmentMetadata>()
        .unwrap();
    let batch = shipments();

    thread::scope(|s| {
        s.spawn(|| {
            for _ in 0..32 {
                engine.validate_all(&batch).unwrap();
            }
        });
        s.spawn(|| {
            for _ in 0..32 {
                engine.discover_handlers(&[nebula_rules::handler::BUILTIN_MODULE]);
            }
        });
    });

    assert_eq!(engine.stats().handlers, 3);
    assert_eq!(engine.stats().compilations, 1);
}

entity! {
    struct Pallet {
        id: u64,
        load: f64,
        capacity: f64,
    }
}

struct PalletMetadata;

impl Metadata for PalletMetadata {
    fn define(def: &mut MetadataDefinition) {
        def.key("id");
        def.property("load")
            .rule(RuleAnnotation::less_than_or_equal("capacity"))
            .rule(RuleAnnotation::new(INVOICED));
    }
}

const INVOICED: OperatorKind = OperatorKind::from_static("invoiced");
const SPARE: OperatorKind = OperatorKind::from_static("spare");

/// Claims a kind nothing uses; registering it only takes the write lock.
#[derive(Debug, Default)]
struct SpareHandler;

impl Handler for SpareHandler {
    fn supported_kinds(&self) -> &[OperatorKind] {
        const KINDS: &[OperatorKind] = &[SPARE];
        KINDS
    }

    fn build(&self, _target: &RuleTarget<'_>) -> Result<Predicate, BindError> {
        Ok(Box::new(|_: &dyn Entity| true))
    }
}

static LINKED: OnceLock<RulesEngine> = OnceLock::new();

/// Holds when the invoice rules of the shared engine compile.
#[derive(Debug, Default)]
struct InvoicedHandler;

impl Handler for InvoicedHandler {
    fn supported_kinds(&self) -> &[OperatorKind] {
        const KINDS: &[OperatorKind] = &[INVOICED];
        KINDS
    }

    fn build(&self, _target: &RuleTarget<'_>) -> Result<Predicate, BindError> {
        let compiled = LINKED
            .get()
            .is_some_and(|engine| engine.rule_set::<Invoice>().is_ok());
        Ok(Box::new(move |_: &dyn Entity| compiled))
    }
}

fn pallets() -> Vec<Pallet> {
    (0..16u64)
        .map(|i| Pallet {
            id: u64::MAX - i,
            load: i as f64,
            capacity: 10.0,
        })
        .collect()
}

#[test]
fn stats_and_registration_interleave_with_first_use() {
    let engine = RulesEngine::new();
    engine.register_handler(InvoicedHandler);
    engine
        .bind_metadata::<Shipment, ShipmentMetadata>()
        .unwrap()
        .bind_metadata::<Invoice, InvoiceMetadata>()
        .unwrap()
        .bind_metadata::<Pallet, PalletMetadata>()
        .unwrap();
    let barrier = Barrier::new(THREADS);

    thread::scope(|s| {
        for n in 0..THREADS {
            let (engine, barrier) = (&engine, &barrier);
            s.spawn(move || {
                barrier.wait();
                for _ in 0..64 {
                    match n % 4 {
                        0 => {
                            let stats = engine.stats();
                            assert!(stats.compiled_types <= 3);
                        }
                        1 => {
                            engine.register_handler(SpareHandler);
                            engine.discover_handlers(&[nebula_rules::handler::BUILTIN_MODULE]);
                        }
                        2 => {
                            engine.rule_set::<Shipment>().unwrap();
                            engine.rule_set::<Pallet>().unwrap();
                        }
                        _ => {
                            engine.rule_set::<Invoice>().unwrap();
                            engine.rule_set::<Shipment>().unwrap();
                        }
                    }
                }
            });
        }
    });

    let stats = engine.stats();
    assert_eq!(stats.compilations, 3);
    assert_eq!(stats.compiled_types, 3);
    assert_eq!(stats.handlers, 5);
}

#[test]
fn handler_may_compile_another_type_while_binding() {
    let engine = LINKED.get_or_init(|| {
        let engine = RulesEngine::new();
        engine
            .register_handler(InvoicedHandler)
            .bind_metadata::<Pallet, PalletMetadata>()
            .unwrap()
            .bind_metadata::<Invoice, InvoiceMetadata>()
            .unwrap();
        engine
    });
    let batch = pallets();

    let results = thread::scope(|s| {
        s.spawn(|| {
            for _ in 0..64 {
                engine.register_handler(SpareHandler);
            }
        });
        s.spawn(|| engine.validate_all(&batch).unwrap())
            .join()
            .unwrap()
    });

    let overloaded = results.iter().filter(|r| r.has_errors()).count();
    assert_eq!(overloaded, 5);
    assert_eq!(results[0].key, Some(Value::Float(u64::MAX as f64)));
    assert_eq!(engine.stats().compilations, 2);
}
