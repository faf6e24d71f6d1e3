//! Integration tests for Value parsing and ObjectId

use ontoloom_foundation::{AttributeType, ObjectId, Value};
use proptest::prelude::*;

#[test]
fn primitive_literals() {
    assert_eq!(Value::parse_primitive(&AttributeType::Int, " 42 "), Ok(Value::Int(42)));
    assert_eq!(
        Value::parse_primitive(&AttributeType::Text, "North Basin"),
        Ok(Value::Text("North Basin".into()))
    );
    assert_eq!(
        Value::parse_primitive(&AttributeType::Geo, "52.5,13.4"),
        Ok(Value::Geo { lat: 52.5, lon: 13.4 })
    );
    assert!(Value::parse_primitive(&AttributeType::Geo, "95,0").is_err());
    assert!(Value::parse_primitive(&AttributeType::Composite("Money".into()), "{}").is_err());
}

#[test]
fn dates_normalize_to_utc() {
    let date = Value::parse_primitive(&AttributeType::DateTime, "2024-03-01").unwrap();
    assert_eq!(date.to_string(), "2024-03-01T00:00:00Z");
    let offset = Value::parse_primitive(&AttributeType::DateTime, "2024-03-01T02:00:00+02:00").unwrap();
    assert_eq!(offset, date);
}

#[test]
fn composite_fields_split() {
    assert_eq!(
        Value::composite_fields("{amount=3.5; currency=EUR}"),
        Some(vec![("amount", "3.5"), ("currency", "EUR")])
    );
    assert_eq!(Value::composite_fields("{}"), Some(vec![]));
    assert_eq!(Value::composite_fields("amount=3.5"), None);
}

#[test]
fn fits_matches_declared_type() {
    assert!(Value::Int(1).fits(&AttributeType::Int));
    assert!(!Value::Int(1).fits(&AttributeType::Float));
    assert!(Value::Text("x".into()).fits(&AttributeType::Text));
}

#[test]
fn object_id_display_parses_back() {
    let id = ObjectId::new("Region", "R:1");
    assert_eq!(id.to_string(), "Region:R:1");
    assert_eq!(ObjectId::parse("Region:R:1"), Some(id));
    assert_eq!(ObjectId::parse(":R1"), None);
}

proptest! {
    #[test]
    fn ints_parse_as_written(n in any::<i64>()) {
        prop_assert_eq!(Value::parse_primitive(&AttributeType::Int, &n.to_string()), Ok(Value::Int(n)));
    }
}
