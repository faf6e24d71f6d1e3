//! Status introspection.

use std::fmt;

use serde::Serialize;

/// The active schema, if one is loaded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SchemaStatus {
    /// Name the schema was loaded under.
    pub name: String,
    /// Model fingerprint.
    pub fingerprint: String,
    /// Generated (concrete) classes.
    pub classes: usize,
    /// Abstract classes.
    pub abstract_classes: usize,
    /// Declared composites.
    pub composites: usize,
}

/// What the backing store reports.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct StoreStatus {
    /// Whether the health check passed.
    pub healthy: bool,
    /// The health check failure, if any.
    pub error: Option<String>,
    /// Node count.
    pub nodes: usize,
    /// Edge count.
    pub edges: usize,
    /// Index count.
    pub indexes: usize,
    /// Schema marker stored by the last initialization.
    pub marker: Option<String>,
}

/// A point-in-time report on the model context.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    /// Loaded schema, or `None`.
    pub schema: Option<SchemaStatus>,
    /// Objects held in memory.
    pub objects: usize,
    /// Snapshot version.
    pub version: u64,
    /// Store counts and health.
    pub store: StoreStatus,
}

impl StatusReport {
    /// Returns true if the store was initialized for the loaded schema.
    #[must_use]
    pub fn schema_initialized(&self) -> bool {
        match (&self.schema, &self.store.marker) {
            (Some(schema), Some(marker)) => &schema.fingerprint == marker,
            _ => false,
        }
    }
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.schema {
            Some(schema) => {
                writeln!(f, "schema: {} ({})", schema.name, schema.fingerprint)?;
                writeln!(
                    f,
                    "classes: {} generated, {} abstract, {} composite",
                    schema.classes, schema.abstract_classes, schema.composites
                )?;
            }
            None => writeln!(f, "schema: none loaded")?,
        }
        writeln!(f, "objects in memory: {} (version {})", self.objects, self.version)?;
        if let Some(error) = &self.store.error {
            return write!(f, "store: unavailable ({error})");
        }
        write!(
            f,
            "store: {} nodes, {} edges, {} indexes, schema {}",
            self.store.nodes,
            self.store.edges,
            self.store.indexes,
            if self.schema_initialized() {
                "initialized"
            } else if self.store.marker.is_some() {
                "initialized for another model"
            } else {
                "not initialized"
            }
        )
    }
}
