//! Schema loading, hierarchy resolution, and object model generation.
//!
//! This crate provides:
//! - [`xml`] - A small XML reader for schema documents
//! - [`SchemaDocument`] - Declared classes and composites, read or built in code
//! - [`Hierarchy`] - Inheritance resolution and field-table flattening
//! - [`validate()`] - Complete, non-fail-fast semantic checks
//! - [`ObjectModel`] - Compiled, immutable per-class descriptors
//!
//! ```text
//! XML text ──read──▶ SchemaDocument ──resolve──▶ Hierarchy ──validate──▶ ObjectModel
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod artifact;
pub mod document;
pub mod hierarchy;
pub mod model;
pub mod validate;
pub mod xml;

pub use document::{AttributeDef, ClassDef, CompositeDef, ReferenceDef, SchemaDocument};
pub use hierarchy::{FieldTable, Hierarchy};
pub use model::{AttributeSlot, CompositeDescriptor, ObjectModel, ReferenceSlot, TypeDescriptor};
pub use validate::validate;
