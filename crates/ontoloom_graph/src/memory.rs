//! In-process graph store.
//!
//! [`MemoryGraph`] keeps its contents in persistent maps behind a mutex. A
//! batch is applied to a clone and swapped in only if every operation
//! succeeded, which makes batches atomic for free. Snapshots can be saved to
//! and loaded from a `MessagePack` file.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use im::{OrdMap, OrdSet};
use ontoloom_foundation::{Error, ErrorKind, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::driver::{GraphDriver, GraphOp, NodeKey, Properties, StoreCounts, StoredEdge, StoredNode};

#[derive(Clone, Debug, Default)]
struct Graph {
    nodes: OrdMap<NodeKey, Properties>,
    edges: OrdSet<StoredEdge>,
    indexes: OrdSet<(String, String)>,
    marker: Option<String>,
}

impl Graph {
    fn apply(&mut self, op: &GraphOp) -> Result<()> {
        match op {
            GraphOp::CreateNode { id, properties } => {
                if self.nodes.contains_key(id) {
                    return Err(Error::constraint_violation(format!(
                        "node {id} already exists"
                    )));
                }
                self.nodes.insert(id.clone(), properties.clone());
            }
            GraphOp::UpsertNode { id, properties } => {
                self.nodes.insert(id.clone(), properties.clone());
            }
            GraphOp::DeleteNode(id) => {
                if self.nodes.remove(id).is_some() {
                    let touching: Vec<StoredEdge> = self
                        .edges
                        .iter()
                        .filter(|e| &e.from == id || &e.to == id)
                        .cloned()
                        .collect();
                    for edge in touching {
                        self.edges.remove(&edge);
                    }
                }
            }
            GraphOp::UpsertEdge(edge) => {
                for end in [&edge.from, &edge.to] {
                    if !self.nodes.contains_key(end) {
                        return Err(Error::constraint_violation(format!(
                            "edge {} -[{}]-> {} has no node {end}",
                            edge.from, edge.label, edge.to
                        )));
                    }
                }
                self.edges.insert(edge.clone());
            }
            GraphOp::DeleteEdge(edge) => {
                self.edges.remove(edge);
            }
            GraphOp::CreateIndex { label, property } => {
                self.indexes.insert((label.clone(), property.clone()));
            }
            GraphOp::SetSchemaMarker(marker) => self.marker.clone_from(marker),
            GraphOp::Clear => *self = Self::default(),
        }
        Ok(())
    }
}

#[derive(Default)]
struct Inner {
    graph: Graph,
    failures: usize,
}

impl Inner {
    fn check_available(&mut self) -> Result<()> {
        if self.failures > 0 {
            self.failures -= 1;
            return Err(Error::store_unavailable("injected outage"));
        }
        Ok(())
    }
}

/// Plain form of the store contents, for file snapshots.
#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    nodes: Vec<StoredNode>,
    edges: Vec<StoredEdge>,
    indexes: Vec<(String, String)>,
    marker: Option<String>,
}

/// An in-process [`GraphDriver`].
#[derive(Default)]
pub struct MemoryGraph {
    inner: Mutex<Inner>,
}

impl MemoryGraph {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `count` calls fail as unavailable.
    pub fn fail_next(&self, count: usize) {
        self.inner.lock().failures = count;
    }

    /// Every node, ordered by label and key.
    #[must_use]
    pub fn nodes(&self) -> Vec<StoredNode> {
        self.inner
            .lock()
            .graph
            .nodes
            .iter()
            .map(|(id, properties)| StoredNode {
                id: id.clone(),
                properties: properties.clone(),
            })
            .collect()
    }

    /// Every edge, ordered.
    #[must_use]
    pub fn edges(&self) -> Vec<StoredEdge> {
        self.inner.lock().graph.edges.iter().cloned().collect()
    }

    /// Declared indexes as `(label, property)` pairs.
    #[must_use]
    pub fn indexes(&self) -> Vec<(String, String)> {
        self.inner.lock().graph.indexes.iter().cloned().collect()
    }

    /// Serializes the contents to `MessagePack` bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let snapshot = {
            let inner = self.inner.lock();
            let graph = &inner.graph;
            Snapshot {
                nodes: graph
                    .nodes
                    .iter()
                    .map(|(id, properties)| StoredNode {
                        id: id.clone(),
                        properties: properties.clone(),
                    })
                    .collect(),
                edges: graph.edges.iter().cloned().collect(),
                indexes: graph.indexes.iter().cloned().collect(),
                marker: graph.marker.clone(),
            }
        };
        rmp_serde::to_vec_named(&snapshot)
            .map_err(|e| Error::new(ErrorKind::SerializationError(e.to_string())))
    }

    /// Rebuilds a store from `MessagePack` bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let snapshot: Snapshot = rmp_serde::from_slice(bytes)
            .map_err(|e| Error::new(ErrorKind::SerializationError(e.to_string())))?;
        let graph = Graph {
            nodes: snapshot
                .nodes
                .into_iter()
                .map(|node| (node.id, node.properties))
                .collect(),
            edges: snapshot.edges.into_iter().collect(),
            indexes: snapshot.indexes.into_iter().collect(),
            marker: snapshot.marker,
        };
        Ok(Self {
            inner: Mutex::new(Inner { graph, failures: 0 }),
        })
    }

    /// Writes a snapshot file, replacing any existing one.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or serialization fails.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let bytes = self.to_bytes()?;
        let file = File::create(path).map_err(|e| {
            Error::new(ErrorKind::IoError(format!(
                "failed to create file '{}': {e}",
                path.display()
            )))
        })?;
        let mut writer = BufWriter::new(file);
        writer.write_all(&bytes).and_then(|()| writer.flush()).map_err(|e| {
            Error::new(ErrorKind::IoError(format!(
                "failed to write to file '{}': {e}",
                path.display()
            )))
        })?;
        debug!(path = %path.display(), bytes = bytes.len(), "saved graph snapshot");
        Ok(())
    }

    /// Loads a snapshot file, or starts empty if the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or decoded.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::new()),
            Err(e) => {
                return Err(Error::new(ErrorKind::IoError(format!(
                    "failed to open file '{}': {e}",
                    path.display()
                ))));
            }
        };
        let mut bytes = Vec::new();
        BufReader::new(file).read_to_end(&mut bytes).map_err(|e| {
            Error::new(ErrorKind::IoError(format!(
                "failed to read file '{}': {e}",
                path.display()
            )))
        })?;
        Self::from_bytes(&bytes)
    }
}

impl GraphDriver for MemoryGraph {
    fn execute(&self, batch: &[GraphOp]) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.check_available()?;
        let mut staged = inner.graph.clone();
        for op in batch {
            staged.apply(op)?;
        }
        inner.graph = staged;
        Ok(())
    }

    fn node(&self, id: &NodeKey) -> Result<Option<StoredNode>> {
        let mut inner = self.inner.lock();
        inner.check_available()?;
        Ok(inner.graph.nodes.get(id).map(|properties| StoredNode {
            id: id.clone(),
            properties: properties.clone(),
        }))
    }

    fn edges_from(&self, from: &NodeKey, label: &str) -> Result<Vec<StoredEdge>> {
        let mut inner = self.inner.lock();
        inner.check_available()?;
        Ok(inner
            .graph
            .edges
            .iter()
            .filter(|e| &e.from == from && e.label == label)
            .cloned()
            .collect())
    }

    fn edges_to(&self, to: &NodeKey, label: &str) -> Result<Vec<StoredEdge>> {
        let mut inner = self.inner.lock();
        inner.check_available()?;
        Ok(inner
            .graph
            .edges
            .iter()
            .filter(|e| &e.to == to && e.label == label)
            .cloned()
            .collect())
    }

    fn count_by_label(&self, label: &str) -> Result<usize> {
        let mut inner = self.inner.lock();
        inner.check_available()?;
        Ok(inner.graph.nodes.keys().filter(|id| id.label == label).count())
    }

    fn counts(&self) -> Result<StoreCounts> {
        let mut inner = self.inner.lock();
        inner.check_available()?;
        Ok(StoreCounts {
            nodes: inner.graph.nodes.len(),
            edges: inner.graph.edges.len(),
            indexes: inner.graph.indexes.len(),
        })
    }

    fn schema_marker(&self) -> Result<Option<String>> {
        let mut inner = self.inner.lock();
        inner.check_available()?;
        Ok(inner.graph.marker.clone())
    }
}
