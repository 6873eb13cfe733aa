//! Byte-storage abstraction for Cirrus.
//!
//! This module provides a trait-based interface over where a tenant's
//! file contents are physically kept, with a local filesystem backend and
//! a volatile in-memory backend, plus locator-based resolution.
//!
//! # Design Principles
//! - Backend isolation: no backend-specific logic outside this crate
//! - Root-creation scope: tenant provisioning only needs directory
//!   create/remove/probe; file content operations live elsewhere

pub mod backend;
pub mod local;
pub mod locator;
pub mod memory;

pub use backend::StorageBackend;
pub use local::LocalBackend;
pub use locator::{resolve, tenant_locator};
pub use memory::MemoryBackend;
