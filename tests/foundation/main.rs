//! Integration tests for Layer 0: Foundation
//!
//! Tests for core types: Value, ObjectId, AttributeType, and Error.

mod errors;
mod values;
