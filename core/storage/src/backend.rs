//! Storage backend trait definition.

use async_trait::async_trait;

use cirrus_common::Result;

/// Byte-storage backend for tenant roots.
///
/// A backend manages directories directly under its own root; each tenant
/// owns exactly one such directory, named after its domain. File-content
/// operations live elsewhere and are out of scope here.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Get the backend name (e.g., "local", "memory").
    fn name(&self) -> &str;

    /// Create a directory under the backend root.
    ///
    /// # Errors
    /// - Directory already exists
    /// - Permission denied
    async fn create_dir(&self, name: &str) -> Result<()>;

    /// Remove a directory under the backend root.
    ///
    /// # Errors
    /// - Directory not found
    async fn remove_dir(&self, name: &str) -> Result<()>;

    /// Check whether a directory exists under the backend root.
    async fn exists(&self, name: &str) -> Result<bool>;
}
