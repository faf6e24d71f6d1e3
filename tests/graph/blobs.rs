//! File-backed blob store tests

use ontoloom_graph::{BlobStore, FsBlobStore};

#[test]
fn write_read_list_delete() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsBlobStore::open(dir.path().join("blobs")).unwrap();
    store.write("network.xml", "<Classes/>").unwrap();
    store.write("network.model", "").unwrap();

    assert_eq!(store.read("network.xml").unwrap(), "<Classes/>");
    assert_eq!(store.list().unwrap(), ["network.model", "network.xml"]);

    store.delete("network.model").unwrap();
    assert_eq!(store.list().unwrap(), ["network.xml"]);
    assert_eq!(store.read("network.model").unwrap_err().kind.name(), "UnknownResource");
}

#[test]
fn names_cannot_escape_the_root() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsBlobStore::open(dir.path()).unwrap();
    assert!(store.write("../outside.xml", "x").is_err());
    assert!(store.write("", "x").is_err());
    assert!(store.read("..").is_err());
}
