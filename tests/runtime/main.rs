//! Integration tests for Layer 4: Runtime
//!
//! Tests for the model context, sessions, and configuration.

mod config;
mod context;
