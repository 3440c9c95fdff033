//! Basic usage of nebula-rules: declare an entity and its metadata, register a
//! custom handler, validate a batch and print the results as JSON.
//!
//! Run with: `cargo run -p nebula-rules --example basic_usage`

use nebula_rules::prelude::*;

entity! {
    #[derive(Debug)]
    pub struct Applicant {
        pub id: String,
        pub age: i32,
        pub min_age: i32,
        pub email: Option<String>,
        pub referral: Option<String>,
    }
}

struct ApplicantMetadata;

impl Metadata for ApplicantMetadata {
    fn define(def: &mut MetadataDefinition) {
        def.key("id");
        def.property("age")
            .rule(
                RuleAnnotation::greater_than_or_equal("min_age")
                    .message("Age must be at least MinAge"),
            )
            .rule(
                RuleAnnotation::new(OperatorKind::LESS_THAN)
                    .constant(120)
                    .severity(Severity::Warning)
                    .message("Age looks implausible"),
            );
        def.property("email")
            .rule(RuleAnnotation::matches(r"^[^@\s]+@[^@\s]+$").can_be_null(true));
        def.property("referral")
            .rule(RuleAnnotation::new(NOT_BLANK).can_be_null(true));
    }
}

const NOT_BLANK: OperatorKind = OperatorKind::from_static("not_blank");

/// Text must contain something other than whitespace.
#[derive(Debug, Default)]
struct NotBlankHandler;

impl Handler for NotBlankHandler {
    fn supported_kinds(&self) -> &[OperatorKind] {
        const KINDS: &[OperatorKind] = &[NOT_BLANK];
        KINDS
    }

    fn build(&self, target: &RuleTarget<'_>) -> Result<Predicate, BindError> {
        let property = target.property().clone();
        if property.kind() != ValueKind::Text {
            return Err(BindError::UnsupportedKind(property.kind()));
        }
        let can_be_null = target.annotation().allows_null();
        Ok(Box::new(move |entity: &dyn Entity| {
            match property.read(entity) {
                Value::Text(text) => !text.trim().is_empty(),
                _ => can_be_null,
            }
        }))
    }

    fn default_message(&self, target: &RuleTarget<'_>) -> String {
        format!("{} must not be blank", target.property().name())
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let engine = RulesEngine::new();
    engine
        .register_handler(NotBlankHandler)
        .bind_metadata::<Applicant, ApplicantMetadata>()?;

    let batch = vec![
        Applicant {
            id: "A-1".into(),
            age: 17,
            min_age: 18,
            email: Some("ann@example.com".into()),
            referral: None,
        },
        Applicant {
            id: "A-2".into(),
            age: 34,
            min_age: 18,
            email: Some("not an email".into()),
            referral: Some("   ".into()),
        },
        Applicant {
            id: "A-3".into(),
            age: 150,
            min_age: 21,
            email: None,
            referral: Some("B-7".into()),
        },
    ];

    for result in engine.validate(&batch)? {
        println!("{}", serde_json::to_string(&result)?);
    }

    println!("{:?}", engine.stats());
    Ok(())
}
