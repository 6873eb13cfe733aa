//! In-memory storage backend for testing and development.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use crate::backend::StorageBackend;
use cirrus_common::{Error, Result};

/// In-memory storage backend.
///
/// Volatile: all state is lost on process restart. Never use it for a
/// production tenant.
pub struct MemoryBackend {
    dirs: Arc<RwLock<HashSet<String>>>,
}

impl MemoryBackend {
    /// Create a new empty backend.
    pub fn new() -> Self {
        Self {
            dirs: Arc::new(RwLock::new(HashSet::new())),
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    fn name(&self) -> &str {
        "memory"
    }

    async fn create_dir(&self, name: &str) -> Result<()> {
        let mut dirs = self.dirs.write().unwrap();
        if !dirs.insert(name.to_string()) {
            return Err(Error::AlreadyExists(format!("Directory: {}", name)));
        }
        Ok(())
    }

    async fn remove_dir(&self, name: &str) -> Result<()> {
        let mut dirs = self.dirs.write().unwrap();
        if !dirs.remove(name) {
            return Err(Error::NotFound(format!("Directory not found: {}", name)));
        }
        Ok(())
    }

    async fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.dirs.read().unwrap().contains(name))
    }
}
