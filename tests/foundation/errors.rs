//! Integration tests for Error types
//!
//! Tests error categories, names, identifiers, and context display.

use ontoloom_foundation::{
    AttributeError, AttributeType, Error, ErrorContext, ErrorKind, IssueCode, ObjectId,
    ParseValueError, ReferenceError, ValidationIssue,
};

// =============================================================================
// Categories and names
// =============================================================================

#[test]
fn not_found_errors_share_a_category() {
    let class = Error::unknown_class("Nation");
    let object = Error::unknown_object(ObjectId::new("Region", "R9"));
    let attribute = Error::unknown_attribute("Region", "colour");
    for err in [&class, &object, &attribute] {
        assert_eq!(err.kind.category(), "NotFoundError");
    }
    assert_eq!(class.kind.name(), "UnknownClass");
    assert_eq!(object.kind.name(), "UnknownObject");
    assert_eq!(attribute.kind.name(), "UnknownAttribute");
}

#[test]
fn reference_errors_name_owner_and_slot() {
    let err: Error = ReferenceError::MultiplicityViolation {
        owner: ObjectId::new("Conduit", "C1"),
        reference: "origin".into(),
        found: 0,
    }
    .into();
    assert_eq!(err.kind.category(), "ReferenceError");
    assert_eq!(err.kind.name(), "MultiplicityViolation");
    assert_eq!(err.identifiers(), ["Conduit:C1", "origin"]);
}

#[test]
fn invalid_value_names_the_attribute() {
    let err: Error = AttributeError::InvalidValue {
        attribute: "population".into(),
        error: ParseValueError {
            expected: AttributeType::Int,
            raw: "many".into(),
        },
    }
    .into();
    assert_eq!(err.kind.name(), "InvalidValue");
    assert_eq!(err.identifiers(), ["population"]);
    assert!(err.to_string().contains("many"));
}

#[test]
fn only_unavailable_store_is_retryable() {
    assert!(Error::store_unavailable("connection reset").is_retryable());
    assert!(!Error::constraint_violation("duplicate key").is_retryable());
    assert!(!Error::syntax("bad").is_retryable());
    assert_eq!(Error::constraint_violation("x").kind.name(), "ConstraintViolation");
}

// =============================================================================
// Validation reports
// =============================================================================

#[test]
fn validation_identifiers_are_deduplicated() {
    let err = Error::validation(vec![
        ValidationIssue::new(IssueCode::DuplicateField, "twice").in_class("Region").on_field("name"),
        ValidationIssue::new(IssueCode::WrongKeyType, "again").in_class("Region").on_field("name"),
        ValidationIssue::new(IssueCode::MissingCollection, "none").in_class("Site"),
    ]);
    assert_eq!(err.identifiers(), ["Region.name", "Site"]);
    assert!(matches!(&err.kind, ErrorKind::Validation(issues) if issues.len() == 3));
}

#[test]
fn context_is_kept() {
    let err = Error::syntax("unterminated quote")
        .with_context(ErrorContext::new().with_source("batch.txt").with_position(3, 7));
    let context = err.context.unwrap();
    assert_eq!(context.line, Some(3));
    assert_eq!(context.column, Some(7));
}
