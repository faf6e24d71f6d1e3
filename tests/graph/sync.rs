//! Write-through and hydration against the in-memory driver

use std::sync::Arc;

use ontoloom_foundation::ObjectId;
use ontoloom_graph::{GraphDriver, GraphSync, MemoryGraph, NodeKey};
use ontoloom_schema::ObjectModel;
use ontoloom_storage::{Delta, Detached, ModelState, WorkingSet};

const SCHEMA: &str = r#"<Classes>
  <Class name="Region">
    <Collection>regions</Collection>
    <Attribute type="text" is_key="true">name</Attribute>
    <Attribute type="int" required="false" indexed="true">population</Attribute>
    <Reference type="Region" multiplicity="multi" required="false" inverse="parents">direct_constituents</Reference>
    <Reference type="Region" multiplicity="multi" required="false" inverse="direct_constituents">parents</Reference>
  </Class>
</Classes>"#;

fn region(key: &str) -> ObjectId {
    ObjectId::new("Region", key)
}

fn tree(model: &Arc<ObjectModel>) -> Delta {
    let base = ModelState::new(Arc::clone(model));
    let mut ws = WorkingSet::new(&base, &Detached);
    for key in ["R1", "R2", "R3"] {
        ws.create("Region", key, vec![]).unwrap();
    }
    ws.link(&region("R1"), "direct_constituents", &region("R2")).unwrap();
    ws.link(&region("R3"), "parents", &region("R1")).unwrap();
    ws.finish().unwrap()
}

#[test]
fn inverse_pairs_are_stored_once_and_hydrate_both_ways() {
    let model = Arc::new(ObjectModel::compile(SCHEMA).unwrap());
    let graph = Arc::new(MemoryGraph::new());
    let sync = GraphSync::new(graph.clone());
    let delta = tree(&model);
    sync.write_through(&delta.changes, &delta.state).unwrap();

    let counts = graph.counts().unwrap();
    assert_eq!((counts.nodes, counts.edges), (3, 2));

    let r1 = sync.load(&model, &region("R1")).unwrap().unwrap();
    let children: Vec<_> = r1.reference("direct_constituents").unwrap().targets().cloned().collect();
    assert_eq!(children, [region("R2"), region("R3")]);
    let r3 = sync.load(&model, &region("R3")).unwrap().unwrap();
    assert!(r3.reference("parents").unwrap().contains(&region("R1")));
    assert!(sync.load(&model, &region("R9")).unwrap().is_none());
}

#[test]
fn failed_batch_writes_nothing() {
    let model = Arc::new(ObjectModel::compile(SCHEMA).unwrap());
    let graph = Arc::new(MemoryGraph::new());
    let sync = GraphSync::new(graph.clone());
    let delta = tree(&model);

    graph.fail_next(1);
    let err = sync.write_through(&delta.changes, &delta.state).unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(graph.counts().unwrap().nodes, 0);

    sync.write_through(&delta.changes, &delta.state).unwrap();
    assert!(graph.node(&NodeKey::new("Region", "R2")).unwrap().is_some());
}

#[test]
fn initialize_schema_records_indexes_and_fingerprint() {
    let model = ObjectModel::compile(SCHEMA).unwrap();
    let graph = Arc::new(MemoryGraph::new());
    let sync = GraphSync::new(graph.clone());
    sync.initialize_schema(&model).unwrap();
    assert_eq!(
        graph.indexes(),
        [
            ("Region".to_string(), "name".to_string()),
            ("Region".to_string(), "population".to_string()),
        ]
    );
    assert_eq!(graph.schema_marker().unwrap(), Some(model.fingerprint()));

    sync.wipe().unwrap();
    assert_eq!(graph.counts().unwrap().nodes, 0);
}

const SHARED_NAME: &str = r#"<Classes>
  <Class name="Region">
    <Collection>regions</Collection>
    <Attribute type="text" is_key="true">name</Attribute>
    <Reference type="Conduit" multiplicity="multi" required="false" inverse="origin">outgoing_conduits</Reference>
  </Class>
  <Class name="Conduit">
    <Collection>conduits</Collection>
    <Attribute type="text" is_key="true">id</Attribute>
    <Reference type="Region" multiplicity="mono" required="true" inverse="outgoing_conduits">origin</Reference>
  </Class>
  <Class name="Pipe">
    <Collection>pipes</Collection>
    <Attribute type="text" is_key="true">id</Attribute>
    <Reference type="Region" multiplicity="mono" required="true">origin</Reference>
  </Class>
</Classes>"#;

#[test]
fn references_sharing_a_name_hydrate_separately() {
    let model = Arc::new(ObjectModel::compile(SHARED_NAME).unwrap());
    let graph = Arc::new(MemoryGraph::new());
    let sync = GraphSync::new(graph.clone());
    let base = ModelState::new(Arc::clone(&model));
    let mut ws = WorkingSet::new(&base, &Detached);
    let r1 = ws.create("Region", "R1", vec![]).unwrap();
    let pipe = ws.create("Pipe", "P1", vec![]).unwrap();
    ws.link(&pipe, "origin", &r1).unwrap();
    let conduit = ws.create("Conduit", "C1", vec![]).unwrap();
    ws.link(&conduit, "origin", &r1).unwrap();
    let delta = ws.finish().unwrap();
    sync.write_through(&delta.changes, &delta.state).unwrap();

    let edges = graph.edges();
    assert_eq!(edges.len(), 2);
    assert!(edges.iter().all(|edge| edge.label == "ORIGIN"));

    let region = sync.load(&model, &r1).unwrap().unwrap();
    let conduits: Vec<_> = region.reference("outgoing_conduits").unwrap().targets().cloned().collect();
    assert_eq!(conduits, [conduit.clone()]);
    assert_eq!(&region, delta.state.get(&r1).unwrap());
    for id in [pipe, conduit] {
        let loaded = sync.load(&model, &id).unwrap().unwrap();
        assert!(loaded.reference("origin").unwrap().contains(&r1));
    }
}
