//! The backing graph store interface.
//!
//! A driver stores labelled nodes with properties and labelled directed
//! edges between them. Writes are expressed as [`GraphOp`] batches; a batch
//! is applied completely or not at all.

use std::collections::BTreeMap;
use std::fmt;

use ontoloom_foundation::{Result, Value};
use serde::{Deserialize, Serialize};

/// Node property map.
pub type Properties = BTreeMap<String, Value>;

/// Identity of a node: its label plus its key property.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeKey {
    /// Node label.
    pub label: String,
    /// Key property value.
    pub key: String,
}

impl NodeKey {
    /// Creates a node key.
    #[must_use]
    pub fn new(label: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            key: key.into(),
        }
    }
}

impl fmt::Debug for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}:{})", self.label, self.key)
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.label, self.key)
    }
}

/// A stored node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoredNode {
    /// Label and key.
    pub id: NodeKey,
    /// Every property, including the reserved ones.
    pub properties: Properties,
}

/// A stored directed edge.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StoredEdge {
    /// Source node.
    pub from: NodeKey,
    /// Edge label.
    pub label: String,
    /// Destination node.
    pub to: NodeKey,
}

/// Node, edge, and index totals.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreCounts {
    /// Number of nodes.
    pub nodes: usize,
    /// Number of edges.
    pub edges: usize,
    /// Number of property indexes.
    pub indexes: usize,
}

/// One write operation.
#[derive(Clone, Debug, PartialEq)]
pub enum GraphOp {
    /// Inserts a node; fails with a constraint violation if it exists.
    CreateNode {
        /// Label and key.
        id: NodeKey,
        /// Properties.
        properties: Properties,
    },
    /// Inserts or replaces a node's properties.
    UpsertNode {
        /// Label and key.
        id: NodeKey,
        /// Properties.
        properties: Properties,
    },
    /// Removes a node and every edge touching it. Missing nodes are ignored.
    DeleteNode(NodeKey),
    /// Adds an edge if absent; both endpoints must exist.
    UpsertEdge(StoredEdge),
    /// Removes an edge if present.
    DeleteEdge(StoredEdge),
    /// Declares a property index on a label.
    CreateIndex {
        /// Node label.
        label: String,
        /// Indexed property.
        property: String,
    },
    /// Sets or clears the schema marker.
    SetSchemaMarker(Option<String>),
    /// Removes every node, edge, index, and the schema marker.
    Clear,
}

/// A backing graph store.
///
/// Implementations must be safe to share between threads. Transient
/// failures surface as `StoreUnavailable`, permanent ones as
/// `ConstraintViolation`.
pub trait GraphDriver: Send + Sync {
    /// Applies a batch atomically.
    ///
    /// # Errors
    ///
    /// Returns a store error; the store is unchanged when this fails.
    fn execute(&self, batch: &[GraphOp]) -> Result<()>;

    /// Looks up a node by label and key.
    ///
    /// # Errors
    ///
    /// Returns a store error if the store cannot be reached.
    fn node(&self, id: &NodeKey) -> Result<Option<StoredNode>>;

    /// Edges leaving `from` with the given label.
    ///
    /// # Errors
    ///
    /// Returns a store error if the store cannot be reached.
    fn edges_from(&self, from: &NodeKey, label: &str) -> Result<Vec<StoredEdge>>;

    /// Edges arriving at `to` with the given label.
    ///
    /// # Errors
    ///
    /// Returns a store error if the store cannot be reached.
    fn edges_to(&self, to: &NodeKey, label: &str) -> Result<Vec<StoredEdge>>;

    /// Number of nodes with a label.
    ///
    /// # Errors
    ///
    /// Returns a store error if the store cannot be reached.
    fn count_by_label(&self, label: &str) -> Result<usize>;

    /// Node, edge, and index totals.
    ///
    /// # Errors
    ///
    /// Returns a store error if the store cannot be reached.
    fn counts(&self) -> Result<StoreCounts>;

    /// The schema marker, if the schema was initialized.
    ///
    /// # Errors
    ///
    /// Returns a store error if the store cannot be reached.
    fn schema_marker(&self) -> Result<Option<String>>;

    /// Checks that the store answers.
    ///
    /// # Errors
    ///
    /// Returns a store error if it does not.
    fn health(&self) -> Result<()> {
        self.counts().map(|_| ())
    }

    /// Inserts or replaces one node.
    ///
    /// # Errors
    ///
    /// See [`execute`](Self::execute).
    fn upsert_node(&self, id: NodeKey, properties: Properties) -> Result<()> {
        self.execute(&[GraphOp::UpsertNode { id, properties }])
    }

    /// Removes one node and its edges.
    ///
    /// # Errors
    ///
    /// See [`execute`](Self::execute).
    fn delete_node(&self, id: NodeKey) -> Result<()> {
        self.execute(&[GraphOp::DeleteNode(id)])
    }

    /// Adds one edge.
    ///
    /// # Errors
    ///
    /// See [`execute`](Self::execute).
    fn upsert_edge(&self, edge: StoredEdge) -> Result<()> {
        self.execute(&[GraphOp::UpsertEdge(edge)])
    }

    /// Removes one edge.
    ///
    /// # Errors
    ///
    /// See [`execute`](Self::execute).
    fn delete_edge(&self, edge: StoredEdge) -> Result<()> {
        self.execute(&[GraphOp::DeleteEdge(edge)])
    }
}
