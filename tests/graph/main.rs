//! Integration tests for Layer 3: Graph
//!
//! Tests for store write-through, hydration, snapshot files, and blob storage.

mod blobs;
mod files;
mod sync;
