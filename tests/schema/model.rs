//! Compiled model tests

use ontoloom_foundation::{AttributeType, Value};
use ontoloom_schema::ObjectModel;

const SCHEMA: &str = r#"<Classes>
  <Class name="Asset" is_abstract="true">
    <Attribute type="text" is_key="true">code</Attribute>
    <Attribute type="Money" required="false">value</Attribute>
  </Class>
  <Class name="Pump" extends="Asset">
    <Collection>pumps</Collection>
    <Attribute type="int" required="false" indexed="true">rating</Attribute>
    <Reference type="Asset" multiplicity="multi" required="false">feeds</Reference>
  </Class>
  <Class name="Valve" extends="Asset">
    <Collection>valves</Collection>
  </Class>
  <Composite name="Money">
    <Attribute type="float" required="true">amount</Attribute>
    <Attribute type="text" required="false">currency</Attribute>
  </Composite>
</Classes>"#;

fn model() -> ObjectModel {
    ObjectModel::compile(SCHEMA).unwrap()
}

#[test]
fn only_concrete_classes_get_descriptors() {
    let model = model();
    assert_eq!(model.class_count(), 2);
    assert!(model.get("Asset").is_none());
    assert_eq!(model.descriptor("Asset").unwrap_err().kind.name(), "UnknownClass");
    assert_eq!(model.descriptor("Pump").unwrap().key().name, "code");
}

#[test]
fn abstract_targets_accept_any_descendant() {
    let model = model();
    assert!(model.is_assignable("Valve", "Asset"));
    assert!(model.is_assignable("Pump", "Asset"));
    assert!(model.sole_concrete("Asset").is_none());
    assert_eq!(model.sole_concrete("Valve").unwrap().name, "Valve");
}

#[test]
fn composite_literals_parse_against_their_fields() {
    let model = model();
    let money = AttributeType::Composite("Money".into());
    let Value::Composite(fields) = model.parse_value(&money, "{amount=12.5;currency=EUR}").unwrap() else {
        panic!("expected a composite");
    };
    assert_eq!(fields["amount"], Value::Float(12.5));
    assert_eq!(fields["currency"], Value::Text("EUR".into()));
    assert!(model.parse_value(&money, "{currency=EUR}").is_err());
    assert!(model.parse_value(&money, "{amount=1;colour=red}").is_err());
}

#[test]
fn indexes_cover_keys_and_indexed_attributes() {
    assert_eq!(
        model().indexes(),
        [
            ("Pump".to_string(), "code".to_string()),
            ("Pump".to_string(), "rating".to_string()),
            ("Valve".to_string(), "code".to_string()),
        ]
    );
}

#[test]
fn artifact_is_deterministic() {
    let artifact = model().artifact();
    assert!(artifact.starts_with("class Pump extends Asset"));
    assert_eq!(artifact, model().artifact());
    assert_eq!(model().fingerprint().len(), 16);
}
