//! Document store abstraction for Cirrus.
//!
//! This module provides a trait-based interface over the platform's
//! document partitions (registry and per-tenant) with two backends: a
//! CouchDB-compatible HTTP store for production and an in-memory store
//! for development and testing.

pub mod couch;
pub mod memory;
pub mod store;

pub use couch::CouchDocStore;
pub use memory::MemoryDocStore;
pub use store::{is_missing_partition, missing_partition, DocMeta, DocumentStore, FindQuery, IndexDef};
