//! Graph store persistence for Ontoloom.
//!
//! This crate provides:
//! - [`GraphDriver`] - The backing store interface, with atomic write batches
//! - [`MemoryGraph`] - An in-process driver with snapshot files and fault injection
//! - [`GraphSync`] - Object to node/edge mapping, write-through, and hydration
//! - [`RetryPolicy`] - Bounded retry of transient store failures
//! - [`BlobStore`] - Named text resources (schemas, artifacts)

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod blob;
pub mod driver;
pub mod memory;
pub mod retry;
pub mod sync;

pub use blob::{BlobStore, FsBlobStore, MemoryBlobStore};
pub use driver::{GraphDriver, GraphOp, NodeKey, Properties, StoreCounts, StoredEdge, StoredNode};
pub use memory::MemoryGraph;
pub use retry::RetryPolicy;
pub use sync::GraphSync;
