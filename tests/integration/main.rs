//! End-to-end tests: schema file on disk, command sessions, graph store.

mod scenarios;
