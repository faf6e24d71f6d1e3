//! Inheritance resolution tests

use ontoloom_schema::{Hierarchy, SchemaDocument};

const DESCENDANTS_FIRST: &str = r#"<Classes>
  <Class name="Reservoir" extends="Facility">
    <Collection>reservoirs</Collection>
    <Attribute type="float" required="false">capacity</Attribute>
  </Class>
  <Class name="Facility" extends="Asset" is_abstract="true">
    <Attribute type="pos_geo" required="false">position</Attribute>
  </Class>
  <Class name="Asset" is_abstract="true">
    <Attribute type="text" is_key="true">code</Attribute>
  </Class>
</Classes>"#;

#[test]
fn ancestors_precede_descendants_regardless_of_declaration_order() {
    let (doc, issues) = SchemaDocument::read(DESCENDANTS_FIRST);
    assert!(issues.is_empty(), "{issues:?}");
    let (hierarchy, issues) = Hierarchy::resolve(&doc);
    assert!(issues.is_empty(), "{issues:?}");
    let position = |name: &str| hierarchy.order().iter().position(|c| c == name).unwrap();
    assert!(position("Asset") < position("Facility"));
    assert!(position("Facility") < position("Reservoir"));
    assert_eq!(hierarchy.lineage("Reservoir"), ["Reservoir", "Facility", "Asset"]);
}

#[test]
fn field_tables_flatten_ancestors_first() {
    let (doc, _) = SchemaDocument::read(DESCENDANTS_FIRST);
    let (hierarchy, _) = Hierarchy::resolve(&doc);
    let table = hierarchy.table("Reservoir").unwrap();
    let names: Vec<_> = table.attributes.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, ["code", "position", "capacity"]);
    assert!(table.attribute("code").unwrap().is_key);
}
