//! Schema validation tests: every issue is reported, no model is produced.

use ontoloom_foundation::{ErrorKind, IssueCode};
use ontoloom_schema::ObjectModel;

fn codes(source: &str) -> Vec<IssueCode> {
    let err = ObjectModel::compile(source).unwrap_err();
    let ErrorKind::Validation(issues) = err.kind else {
        panic!("expected a validation error, got {err}");
    };
    issues.iter().map(|issue| issue.code).collect()
}

#[test]
fn malformed_xml_is_structural() {
    assert!(codes("<Classes><Class name=\"A\">").contains(&IssueCode::StructuralError));
}

#[test]
fn issues_from_every_class_are_collected() {
    let codes = codes(
        r#"<Classes>
  <Class name="Pump"><Collection>pumps</Collection>
    <Attribute type="text" is_key="true">id</Attribute>
    <Reference type="Valve" multiplicity="mono" required="true">outlet</Reference>
  </Class>
  <Class name="Tank">
    <Attribute type="text" is_key="true">id</Attribute>
    <Attribute type="colour" required="false">paint</Attribute>
  </Class>
</Classes>"#,
    );
    assert!(codes.contains(&IssueCode::DanglingReferenceTarget));
    assert!(codes.contains(&IssueCode::MissingCollection));
    assert!(codes.contains(&IssueCode::InvalidAttributeType));
}

#[test]
fn inheritance_cycle_is_reported() {
    let codes = codes(
        r#"<Classes>
  <Class name="A" extends="B"><Collection>as</Collection><Attribute type="text" is_key="true">id</Attribute></Class>
  <Class name="B" extends="A"><Collection>bs</Collection></Class>
</Classes>"#,
    );
    assert!(codes.contains(&IssueCode::InheritanceCycle));
}

#[test]
fn inverse_must_be_reciprocal() {
    let codes = codes(
        r#"<Classes>
  <Class name="Region"><Collection>regions</Collection>
    <Attribute type="text" is_key="true">name</Attribute>
    <Reference type="Region" multiplicity="multi" required="false" inverse="children">parents</Reference>
  </Class>
</Classes>"#,
    );
    assert_eq!(codes, [IssueCode::AsymmetricInverse]);
}
