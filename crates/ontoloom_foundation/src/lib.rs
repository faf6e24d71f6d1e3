//! Core values, identifiers, and errors for Ontoloom.
//!
//! This crate provides:
//! - [`Value`] - Typed attribute values (text, numbers, dates, geo positions, composites)
//! - [`AttributeType`] - Attribute type descriptors declared by schemas
//! - [`ObjectId`] - Identity of a runtime object (class plus key value)
//! - [`Error`] - Rich error types with context, grouped into user-visible categories

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod id;
pub mod types;
pub mod value;

pub use error::{
    AttributeError, Error, ErrorContext, ErrorKind, IssueCode, NotFound, ReferenceError, Result,
    StoreError, ValidationIssue,
};
pub use id::ObjectId;
pub use types::{AttributeType, Multiplicity};
pub use value::{ParseValueError, Value};
