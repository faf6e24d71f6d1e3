//! Model context tests: schema lifecycle, write-through atomicity, retry,
//! and hydration from the store.

use std::sync::Arc;
use std::time::Duration;

use ontoloom_foundation::ObjectId;
use ontoloom_graph::{BlobStore, MemoryBlobStore, MemoryGraph, RetryPolicy};
use ontoloom_runtime::{ModelContext, Outcome, Session};

const SCHEMA: &str = r#"<Classes>
  <Class name="Region">
    <Collection>regions</Collection>
    <Attribute type="text" is_key="true">name</Attribute>
    <Attribute type="int" required="false">population</Attribute>
    <Reference type="Region" multiplicity="multi" required="false" inverse="parents">direct_constituents</Reference>
    <Reference type="Region" multiplicity="multi" required="false" inverse="direct_constituents">parents</Reference>
  </Class>
</Classes>"#;

fn context(graph: &Arc<MemoryGraph>, retry: RetryPolicy) -> Arc<ModelContext> {
    let blobs = Arc::new(MemoryBlobStore::new().with("regions.xml", SCHEMA));
    let context = ModelContext::new(graph.clone(), blobs).with_retry(retry);
    context.load_schema("regions.xml").unwrap();
    Arc::new(context)
}

#[test]
fn store_failure_leaves_memory_and_store_unchanged() {
    let graph = Arc::new(MemoryGraph::new());
    let mut session = Session::new(context(&graph, RetryPolicy::none()));
    assert!(session.execute("create Region R1").is_success());
    let before = session.context().snapshot().unwrap();

    graph.fail_next(1);
    let response = session.execute("set Region R1 population 7");
    assert_eq!(response.outcome, Outcome::Failed);
    assert_eq!(response.error.unwrap().kind, "StoreUnavailable");
    assert_eq!(session.context().snapshot().unwrap(), before);
    assert_eq!(graph.nodes().len(), 1);
    assert!(!graph.nodes()[0].properties.contains_key("population"));
}

#[test]
fn transient_failures_are_retried() {
    let graph = Arc::new(MemoryGraph::new());
    let retry = RetryPolicy {
        max_attempts: 3,
        backoff: Duration::ZERO,
    };
    let mut session = Session::new(context(&graph, retry));
    graph.fail_next(2);
    let response = session.execute("create Region R1");
    assert!(response.is_success(), "{response}");
    assert_eq!(graph.nodes().len(), 1);
}

#[test]
fn a_fresh_context_hydrates_from_the_store() {
    let graph = Arc::new(MemoryGraph::new());
    let mut writer = Session::new(context(&graph, RetryPolicy::none()));
    writer.execute("create Region R1");
    writer.execute("create Region R2 parents=R1");

    let mut reader = Session::new(context(&graph, RetryPolicy::none()));
    assert_eq!(reader.context().status().objects, 0);
    let response = reader.execute("get Region R2");
    assert_eq!(response.objects["regions"][0].references["parents"], ["R1"]);

    // Linking faults both ends in; the store keeps one edge per pair.
    assert!(reader.execute("link Region R1 direct_constituents Region R2").is_success());
    assert_eq!(graph.edges().len(), 1);
    let response = reader.execute("delete Region R1");
    assert_eq!(response.deleted, ["Region:R1"]);
    assert!(graph.edges().is_empty());
    assert!(reader.context().get(&ObjectId::new("Region", "R1")).is_err());
}

#[test]
fn failed_load_keeps_the_previous_model() {
    let graph = Arc::new(MemoryGraph::new());
    let context = context(&graph, RetryPolicy::none());
    let before = context.model().unwrap().fingerprint();
    let err = context.load_schema_text("broken.xml", "<Classes><Class/></Classes>").unwrap_err();
    assert_eq!(err.kind.category(), "ValidationError");
    assert_eq!(context.model().unwrap().fingerprint(), before);
    assert!(context.blobs().read("broken.model").is_err());
}

#[test]
fn status_reports_initialization_and_wipe() {
    let graph = Arc::new(MemoryGraph::new());
    let context = context(&graph, RetryPolicy::none());
    assert!(!context.status().schema_initialized());
    context.initialize_schema().unwrap();
    assert!(context.status().schema_initialized());

    let mut session = Session::new(Arc::clone(&context));
    session.execute("create Region R1");
    let version = context.status().version;
    context.wipe().unwrap();
    let status = context.status();
    assert_eq!((status.objects, status.store.nodes), (0, 0));
    assert!(status.version > version);

    assert!(context.unload());
    assert_eq!(session.execute("get Region R1").error.unwrap().kind, "NoModelLoaded");
    assert!(context.status().to_string().contains("schema: none loaded"));
}
