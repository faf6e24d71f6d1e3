//! Command sessions over a schema file, checked against the store.

use std::sync::Arc;

use ontoloom_foundation::ObjectId;
use ontoloom_graph::{BlobStore, FsBlobStore, GraphDriver, MemoryBlobStore, MemoryGraph, RetryPolicy};
use ontoloom_runtime::{ModelContext, Outcome, Session};
use ontoloom_schema::ObjectModel;

const NETWORK: &str = r#"<?xml version="1.0"?>
<Classes>
  <Class name="Region">
    <Collection>regions</Collection>
    <Attribute type="text" is_key="true">name</Attribute>
    <Reference type="Region" multiplicity="multi" required="false" inverse="parents">direct_constituents</Reference>
    <Reference type="Region" multiplicity="multi" required="false" inverse="direct_constituents">parents</Reference>
  </Class>
  <Class name="Conduit">
    <Collection>conduits</Collection>
    <Attribute type="text" is_key="true">id</Attribute>
    <Reference type="Region" multiplicity="mono" required="true">origin</Reference>
  </Class>
</Classes>"#;

struct Fixture {
    _dir: tempfile::TempDir,
    blobs: Arc<FsBlobStore>,
    graph: Arc<MemoryGraph>,
    session: Session,
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let blobs = Arc::new(FsBlobStore::open(dir.path()).unwrap());
    blobs.write("network.xml", NETWORK).unwrap();
    let graph = Arc::new(MemoryGraph::new());
    let context = ModelContext::new(graph.clone(), blobs.clone()).with_retry(RetryPolicy::none());
    context.load_schema("network.xml").unwrap();
    Fixture {
        _dir: dir,
        blobs,
        graph,
        session: Session::new(Arc::new(context)),
    }
}

#[test]
fn loading_writes_the_generated_model() {
    let f = fixture();
    let artifact = f.blobs.read("network.model").unwrap();
    assert_eq!(artifact, ObjectModel::compile(NETWORK).unwrap().artifact());
    assert!(artifact.contains("reference origin mono Region required"));
}

#[test]
fn constituents_and_parents_stay_symmetric() {
    let mut f = fixture();
    for line in [
        "create Region R1 name=R1",
        "create Region R2 name=R2",
        "link Region R1 direct_constituents Region R2",
    ] {
        let response = f.session.execute(line);
        assert_eq!(response.outcome, Outcome::Committed, "{response}");
    }

    let response = f.session.execute("get Region R2");
    assert_eq!(response.objects["regions"][0].to_string(), "Region:R2 name=R2 direct_constituents=[] parents=[R1]");

    let response = f.session.execute("delete Region R1");
    assert_eq!(response.outcome, Outcome::Committed, "{response}");
    assert!(response.to_string().contains("Region:R2 name=R2 direct_constituents=[] parents=[]"));
    let response = f.session.execute("get Region R2");
    assert_eq!(response.objects["regions"][0].references["parents"], Vec::<String>::new());
    assert!(response.to_string().contains("parents=[]"));

    assert_eq!(f.graph.nodes().len(), 1);
    assert!(f.graph.edges().is_empty());
}

#[test]
fn conduit_without_origin_is_never_created() {
    let mut f = fixture();
    let response = f.session.execute("create Conduit C1");
    assert_eq!(response.outcome, Outcome::Failed);
    let report = response.error.as_ref().unwrap();
    assert_eq!(report.category, "ReferenceError");
    assert_eq!(report.kind, "MultiplicityViolation");
    assert_eq!(report.identifiers, ["Conduit:C1", "origin"]);

    assert_eq!(f.session.execute("get Conduit C1").error.unwrap().kind, "UnknownObject");
    assert_eq!(f.graph.counts().unwrap().nodes, 0);
    assert!(!f.session.context().snapshot().unwrap().contains(&ObjectId::new("Conduit", "C1")));
}

#[test]
fn conduit_with_origin_is_linked_in_the_store() {
    let mut f = fixture();
    f.session.execute("create Region R1");
    let response = f.session.execute("create Conduit C1 origin=R1");
    assert_eq!(response.outcome, Outcome::Committed, "{response}");
    assert_eq!(f.graph.edges().len(), 1);
    assert_eq!(f.graph.edges()[0].label, "ORIGIN");

    let response = f.session.execute("unlink Conduit C1 origin Region R1");
    assert_eq!(response.error.unwrap().kind, "MultiplicityViolation");
    assert_eq!(f.graph.edges().len(), 1);
}

#[test]
fn every_failed_command_leaves_the_store_as_it_was() {
    let mut f = fixture();
    f.session.execute("create Region R1");
    f.session.execute("create Region R2 parents=R1");
    let nodes = f.graph.nodes();
    let edges = f.graph.edges();
    for line in [
        "create Region R1",
        "create Region R3 parents=R9",
        "link Region R1 parents Conduit C1",
        "set Region R1 name R5",
        "delete Nation N1",
        "create Conduit C2 origin=R1,R2",
        "link Region R1 \"direct_constituents",
    ] {
        let response = f.session.execute(line);
        assert_eq!(response.outcome, Outcome::Failed, "{line} should fail");
        assert_eq!(f.graph.nodes(), nodes, "{line}");
        assert_eq!(f.graph.edges(), edges, "{line}");
    }
}

const PLANT: &str = r#"<Classes>
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
</Classes>"#;

fn plant_session(graph: &Arc<MemoryGraph>) -> Session {
    let context = ModelContext::new(graph.clone(), Arc::new(MemoryBlobStore::new()))
        .with_retry(RetryPolicy::none());
    context.load_schema_text("plant.xml", PLANT).unwrap();
    Session::new(Arc::new(context))
}

#[test]
fn a_fresh_session_reads_objects_behind_a_shared_reference_name() {
    let graph = Arc::new(MemoryGraph::new());
    let mut writer = plant_session(&graph);
    for line in ["create Region R1", "create Pipe P1 origin=R1", "create Conduit C1 origin=R1"] {
        let response = writer.execute(line);
        assert_eq!(response.outcome, Outcome::Committed, "{response}");
    }

    let mut reader = plant_session(&graph);
    let response = reader.execute("get Region R1");
    assert_eq!(response.outcome, Outcome::Done, "{response}");
    assert_eq!(response.objects["regions"][0].references["outgoing_conduits"], ["C1"]);

    let response = reader.execute("delete Region R1");
    assert_eq!(response.outcome, Outcome::Committed, "{response}");
    assert_eq!(graph.nodes().len(), 2);
    assert!(graph.edges().is_empty());
}

#[test]
fn taking_a_required_partner_away_fails() {
    let graph = Arc::new(MemoryGraph::new());
    let mut session = plant_session(&graph);
    session.execute("create Worker W1");
    let response = session.execute("create Desk D1 owner=W1");
    assert_eq!(response.outcome, Outcome::Committed, "{response}");
    let edges = graph.edges();

    let response = session.execute("create Desk D2 owner=W1");
    let report = response.error.as_ref().unwrap();
    assert_eq!(report.kind, "MultiplicityViolation");
    assert_eq!(report.identifiers, ["Desk:D1", "owner"]);
    assert_eq!(graph.edges(), edges);
    let response = session.execute("get Desk D1");
    assert_eq!(response.objects["desks"][0].references["owner"], ["W1"]);
}
