//! Command sessions, REPL, and CLI for Ontoloom.
//!
//! This crate provides:
//! - [`ModelContext`] - The active model, its in-memory snapshot, and store write-through
//! - [`Session`] - Parses and runs commands, one atomic unit each
//! - [`Repl`] - Interactive loop and batch runner with meta-commands
//! - [`OntoloomConfig`] - TOML configuration and logging setup

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod command;
pub mod config;
pub mod context;
pub mod editor;
pub mod logging;
pub mod repl;
pub mod session;
pub mod status;

pub use command::Command;
pub use config::OntoloomConfig;
pub use context::ModelContext;
pub use editor::{LineEditor, ReadResult, RustylineEditor};
pub use repl::{Reply, Repl};
pub use session::{CommandResponse, ErrorReport, ObjectView, Outcome, Session, SessionState};
pub use status::{SchemaStatus, StatusReport, StoreStatus};
