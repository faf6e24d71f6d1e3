//! Snapshot file tests

use ontoloom_foundation::Value;
use ontoloom_graph::{GraphDriver, MemoryGraph, NodeKey, Properties, StoredEdge};

fn populated() -> MemoryGraph {
    let graph = MemoryGraph::new();
    let r1 = NodeKey::new("Region", "R1");
    let r2 = NodeKey::new("Region", "R2");
    graph
        .upsert_node(r1.clone(), [("population".to_string(), Value::Int(10))].into())
        .unwrap();
    graph.upsert_node(r2.clone(), Properties::new()).unwrap();
    graph
        .upsert_edge(StoredEdge {
            from: r1,
            label: "DIRECT_CONSTITUENTS".into(),
            to: r2,
        })
        .unwrap();
    graph
}

#[test]
fn snapshot_file_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("graph.msgpack");
    let graph = populated();
    graph.save_to_file(&path).unwrap();

    let reopened = MemoryGraph::open(&path).unwrap();
    assert_eq!(reopened.nodes(), graph.nodes());
    assert_eq!(reopened.edges(), graph.edges());
    assert_eq!(reopened.counts().unwrap(), graph.counts().unwrap());
}

#[test]
fn missing_file_opens_empty() {
    let dir = tempfile::tempdir().unwrap();
    let graph = MemoryGraph::open(dir.path().join("absent.msgpack")).unwrap();
    assert_eq!(graph.counts().unwrap().nodes, 0);
}

#[test]
fn corrupt_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("graph.msgpack");
    std::fs::write(&path, b"not msgpack").unwrap();
    let err = MemoryGraph::open(&path).err().unwrap();
    assert_eq!(err.kind.category(), "SerializationError");
}
