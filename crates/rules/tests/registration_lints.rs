//! `rule_handler!` compiles in crates that deny `unsafe_code`.

use nebula_rules::prelude::*;
use pretty_assertions::assert_eq;

#[deny(unsafe_code)]
mod strict {
    use nebula_rules::prelude::*;

    pub const MODULE: &str = module_path!();

    pub const EVEN: OperatorKind = OperatorKind::from_static("even");

    #[derive(Debug, Default)]
    pub struct EvenHandler;

    impl Handler for EvenHandler {
        fn supported_kinds(&self) -> &[OperatorKind] {
            const KINDS: &[OperatorKind] = &[EVEN];
            KINDS
        }

        fn build(&self, target: &RuleTarget<'_>) -> Result<Predicate, BindError> {
            let property = target.property().clone();
            Ok(Box::new(move |entity: &dyn Entity| {
                matches!(property.read(entity), Value::Int(v) if v % 2 == 0)
            }))
        }
    }

    rule_handler!(EVEN_HANDLER => EvenHandler);
}

entity! {
    struct Pair {
        count: u64,
    }
}

struct PairMetadata;

impl Metadata for PairMetadata {
    fn define(def: &mut MetadataDefinition) {
        def.property("count")
            .rule(RuleAnnotation::new(strict::EVEN).message("count must be even"));
    }
}

#[test]
fn handler_registered_under_denied_unsafe_is_discovered() {
    let engine = RulesEngine::new();
    assert_eq!(engine.discover_handlers(&[strict::MODULE]), 1);
    engine.bind_metadata::<Pair, PairMetadata>().unwrap();

    let results = engine
        .validate_all(&[Pair { count: 4 }, Pair { count: 7 }])
        .unwrap();
    assert!(results[0].is_valid());
    assert_eq!(results[1].failures.len(), 1);
}
