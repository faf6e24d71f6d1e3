//! Ontoloom - ontology schema compiler and object graph runtime
//!
//! This crate re-exports all layers of the Ontoloom system for convenient access.
//! For detailed documentation, see the individual layer crates.
//!
//! # Architecture
//!
//! ```text
//! Layer 4: ontoloom_runtime    - Model context, command sessions, REPL, CLI
//! Layer 3: ontoloom_graph      - Graph driver, object persistence, blob store
//! Layer 2: ontoloom_storage    - Runtime objects, reference integrity engine
//! Layer 1: ontoloom_schema     - XML loading, validation, hierarchy, object model
//! Layer 0: ontoloom_foundation - Core types (Value, ObjectId, Error)
//! ```

pub use ontoloom_foundation as foundation;
pub use ontoloom_graph as graph;
pub use ontoloom_runtime as runtime;
pub use ontoloom_schema as schema;
pub use ontoloom_storage as storage;
