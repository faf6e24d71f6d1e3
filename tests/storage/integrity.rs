//! Link, unlink, and delete through a working set.

use std::sync::Arc;

use ontoloom_foundation::{ErrorKind, ObjectId, ReferenceError, Value};
use ontoloom_schema::ObjectModel;
use ontoloom_storage::{Change, Detached, ModelState, WorkingSet};

const SCHEMA: &str = r#"<Classes>
  <Class name="Region">
    <Collection>regions</Collection>
    <Attribute type="text" is_key="true">name</Attribute>
    <Attribute type="int" required="false">population</Attribute>
    <Reference type="Region" multiplicity="multi" required="false" inverse="parents">direct_constituents</Reference>
    <Reference type="Region" multiplicity="multi" required="false" inverse="direct_constituents">parents</Reference>
  </Class>
  <Class name="Conduit">
    <Collection>conduits</Collection>
    <Attribute type="text" is_key="true">id</Attribute>
    <Reference type="Region" multiplicity="mono" required="true">origin</Reference>
  </Class>
  <Class name="Worker">
    <Collection>workers</Collection>
    <Attribute type="text" is_key="true">name</Attribute>
    <Reference type="Desk" multiplicity="mono" required="false" inverse="owner">desk</Reference>
  </Class>
  <Class name="Desk">
    <Collection>desks</Collection>
    <Attribute type="text" is_key="true">id</Attribute>
    <Reference type="Worker" multiplicity="mono" required="true" inverse="desk">owner</Reference>
  </Class>
  <Class name="Person">
    <Collection>people</Collection>
    <Attribute type="text" is_key="true">name</Attribute>
    <Reference type="Person" multiplicity="mono" required="false" inverse="spouse">spouse</Reference>
  </Class>
</Classes>"#;

fn region(key: &str) -> ObjectId {
    ObjectId::new("Region", key)
}

fn empty() -> ModelState {
    ModelState::new(Arc::new(ObjectModel::compile(SCHEMA).unwrap()))
}

fn with_regions(keys: &[&str]) -> ModelState {
    let base = empty();
    let mut ws = WorkingSet::new(&base, &Detached);
    for key in keys {
        ws.create("Region", key, vec![]).unwrap();
    }
    ws.finish().unwrap().state
}

fn targets(state: &ModelState, id: &ObjectId, reference: &str) -> Vec<ObjectId> {
    state.get(id).unwrap().reference(reference).unwrap().targets().cloned().collect()
}

#[test]
fn one_link_updates_both_sides_and_records_one_change() {
    let base = with_regions(&["R1", "R2"]);
    let mut ws = WorkingSet::new(&base, &Detached);
    ws.link(&region("R1"), "direct_constituents", &region("R2")).unwrap();
    let delta = ws.finish().unwrap();

    assert_eq!(targets(&delta.state, &region("R2"), "parents"), [region("R1")]);
    assert_eq!(
        delta.changes,
        [Change::Link {
            owner: region("R1"),
            reference: "direct_constituents".into(),
            target: region("R2"),
        }]
    );
    assert_eq!(delta.affected, [region("R1"), region("R2")]);
    assert_eq!(delta.state.version(), base.version() + 1);
}

#[test]
fn linking_from_the_inverse_side_is_equivalent() {
    let base = with_regions(&["R1", "R2"]);
    let mut ws = WorkingSet::new(&base, &Detached);
    ws.link(&region("R2"), "parents", &region("R1")).unwrap();
    let state = ws.finish().unwrap().state;
    assert_eq!(targets(&state, &region("R1"), "direct_constituents"), [region("R2")]);
}

#[test]
fn delete_clears_every_pointer_without_cascading() {
    let base = with_regions(&["R1", "R2", "R3"]);
    let mut ws = WorkingSet::new(&base, &Detached);
    ws.link(&region("R1"), "direct_constituents", &region("R2")).unwrap();
    ws.link(&region("R1"), "direct_constituents", &region("R3")).unwrap();
    let linked = ws.finish().unwrap().state;

    let mut ws = WorkingSet::new(&linked, &Detached);
    ws.delete(&region("R1")).unwrap();
    let delta = ws.finish().unwrap();
    assert!(!delta.state.contains(&region("R1")));
    assert!(delta.state.contains(&region("R2")));
    assert!(targets(&delta.state, &region("R2"), "parents").is_empty());
    assert!(targets(&delta.state, &region("R3"), "parents").is_empty());
    assert!(delta.state.incoming(&region("R1")).is_empty());
    assert_eq!(delta.deleted, [region("R1")]);
    assert_eq!(delta.affected, [region("R2"), region("R3")]);
}

#[test]
fn conduit_without_origin_fails_at_finish() {
    let base = with_regions(&["R1"]);
    let mut ws = WorkingSet::new(&base, &Detached);
    ws.create("Conduit", "C1", vec![]).unwrap();
    let err = ws.finish().unwrap_err();
    assert!(matches!(
        err.kind,
        ErrorKind::Reference(ReferenceError::MultiplicityViolation { found: 0, .. })
    ));
    assert!(!base.contains(&ObjectId::new("Conduit", "C1")));
}

#[test]
fn deleting_the_origin_leaves_a_dangling_required_slot_allowed() {
    let base = with_regions(&["R1"]);
    let mut ws = WorkingSet::new(&base, &Detached);
    let conduit = ws.create("Conduit", "C1", vec![]).unwrap();
    ws.link(&conduit, "origin", &region("R1")).unwrap();
    let linked = ws.finish().unwrap().state;

    let mut ws = WorkingSet::new(&linked, &Detached);
    ws.delete(&region("R1")).unwrap();
    let delta = ws.finish().unwrap();
    assert!(targets(&delta.state, &conduit, "origin").is_empty());
    assert_eq!(delta.affected, [conduit]);
}

fn worker(key: &str) -> ObjectId {
    ObjectId::new("Worker", key)
}

fn desk(key: &str) -> ObjectId {
    ObjectId::new("Desk", key)
}

fn person(key: &str) -> ObjectId {
    ObjectId::new("Person", key)
}

/// Workers W1 and W2; desk D1 belongs to W1.
fn office() -> ModelState {
    let base = empty();
    let mut ws = WorkingSet::new(&base, &Detached);
    ws.create("Worker", "W1", vec![]).unwrap();
    ws.create("Worker", "W2", vec![]).unwrap();
    ws.create("Desk", "D1", vec![]).unwrap();
    ws.link(&desk("D1"), "owner", &worker("W1")).unwrap();
    ws.finish().unwrap().state
}

#[test]
fn displacing_a_required_partner_fails() {
    let base = office();
    let mut ws = WorkingSet::new(&base, &Detached);
    ws.create("Desk", "D2", vec![]).unwrap();
    ws.link(&desk("D2"), "owner", &worker("W1")).unwrap();
    let err = ws.finish().unwrap_err();
    assert!(matches!(
        &err.kind,
        ErrorKind::Reference(ReferenceError::MultiplicityViolation { owner, reference, found: 0 })
            if owner == &desk("D1") && reference == "owner"
    ));
    assert_eq!(targets(&base, &desk("D1"), "owner"), [worker("W1")]);
}

#[test]
fn reassigning_a_required_slot_is_allowed() {
    let base = office();
    let mut ws = WorkingSet::new(&base, &Detached);
    ws.link(&worker("W2"), "desk", &desk("D1")).unwrap();
    let delta = ws.finish().unwrap();
    assert_eq!(targets(&delta.state, &desk("D1"), "owner"), [worker("W2")]);
    assert!(targets(&delta.state, &worker("W1"), "desk").is_empty());
    assert_eq!(delta.affected, [desk("D1"), worker("W1"), worker("W2")]);
}

#[test]
fn displaced_mono_partner_is_reported_as_affected() {
    let base = empty();
    let mut ws = WorkingSet::new(&base, &Detached);
    for key in ["A", "B", "C"] {
        ws.create("Person", key, vec![]).unwrap();
    }
    ws.link(&person("A"), "spouse", &person("B")).unwrap();
    let married = ws.finish().unwrap().state;

    let mut ws = WorkingSet::new(&married, &Detached);
    ws.link(&person("A"), "spouse", &person("C")).unwrap();
    let delta = ws.finish().unwrap();
    assert!(targets(&delta.state, &person("B"), "spouse").is_empty());
    assert_eq!(delta.affected, [person("A"), person("B"), person("C")]);
}

#[test]
fn type_mismatch_is_rejected_before_any_change() {
    let base = with_regions(&["R1"]);
    let mut ws = WorkingSet::new(&base, &Detached);
    let conduit = ws.create("Conduit", "C1", vec![]).unwrap();
    let err = ws.link(&region("R1"), "parents", &conduit).unwrap_err();
    assert_eq!(err.kind.name(), "TypeMismatch");
    assert!(targets(ws.state(), &region("R1"), "parents").is_empty());
}

#[test]
fn attributes_are_checked_on_create() {
    let base = empty();
    let mut ws = WorkingSet::new(&base, &Detached);
    let id = ws
        .create("Region", "R1", vec![("population".into(), Value::Int(4))])
        .unwrap();
    assert_eq!(ws.state().get(&id).unwrap().attribute("population"), Some(&Value::Int(4)));
    let err = ws
        .create("Region", "R2", vec![("population".into(), Value::Text("many".into()))])
        .unwrap_err();
    assert_eq!(err.kind.name(), "InvalidValue");
    let err = ws.create("Region", "R1", vec![]).unwrap_err();
    assert_eq!(err.kind.name(), "ConstraintViolation");
}
