//! Runtime objects, model snapshots, and reference integrity for Ontoloom.
//!
//! This crate provides:
//! - [`RuntimeObject`] - An instance of a concrete class with its slots
//! - [`ModelState`] - Immutable snapshot of every object in memory
//! - [`WorkingSet`] - Staged, symmetric reference mutation
//!
//! All reference slot changes go through a [`WorkingSet`]. Nothing outside
//! this crate can write a slot directly, so inverse pairs cannot drift apart.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod integrity;
pub mod object;
pub mod state;

pub use integrity::{Change, Delta, Detached, ObjectSource, WorkingSet};
pub use object::{RefSlot, RuntimeObject};
pub use state::{Incoming, ModelState};
