//! Integration tests for Layer 2: Storage
//!
//! Tests for the reference integrity engine over in-memory snapshots.

mod integrity;
mod properties;
