//! Snapshot storage abstraction and implementations for Trihunt.
//!
//! This crate provides a trait-based key-value snapshot interface with a
//! JSON-file reference implementation and an in-memory store for tests
//! and ephemeral sessions.

#![warn(missing_docs)]

pub mod trait_;
pub mod json_store;
pub mod memory;

pub use trait_::{Result, SnapshotStore, StorageError};
pub use json_store::JsonSnapshotStore;
pub use memory::MemorySnapshotStore;
