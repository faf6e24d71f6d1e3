//! Integration tests for Layer 1: Schema
//!
//! Tests for XML reading, hierarchy resolution, validation, and the compiled model.

mod hierarchy;
mod model;
mod validation;
