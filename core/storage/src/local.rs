//! Local filesystem storage backend.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::backend::StorageBackend;
use cirrus_common::{Error, Result, FORBIDDEN_DOMAIN_CHARS};

/// Local filesystem storage backend.
///
/// Tenant roots are directories directly under `root`.
pub struct LocalBackend {
    root: PathBuf,
}

impl LocalBackend {
    /// Create a new local backend rooted at the given path.
    ///
    /// Touches nothing on disk; the root directory is created lazily on
    /// the first `create_dir`.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Resolve a directory name to a filesystem path, rejecting anything
    /// that would escape the backend root.
    fn dir_path(&self, name: &str) -> Result<PathBuf> {
        if name.is_empty()
            || name == "."
            || name == ".."
            || name.contains(FORBIDDEN_DOMAIN_CHARS)
        {
            return Err(Error::Validation(format!(
                "Invalid directory name '{}'",
                name.escape_default()
            )));
        }
        Ok(self.root.join(name))
    }
}

#[async_trait]
impl StorageBackend for LocalBackend {
    fn name(&self) -> &str {
        "local"
    }

    async fn create_dir(&self, name: &str) -> Result<()> {
        let path = self.dir_path(name)?;
        if !self.root.exists() {
            fs::create_dir_all(&self.root).await?;
        }
        match fs::create_dir(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(Error::AlreadyExists(format!("Directory: {}", name)))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn remove_dir(&self, name: &str) -> Result<()> {
        let path = self.dir_path(name)?;
        if !path.exists() {
            return Err(Error::NotFound(format!("Directory not found: {}", name)));
        }
        fs::remove_dir_all(&path).await?;
        Ok(())
    }

    async fn exists(&self, name: &str) -> Result<bool> {
        let path = self.dir_path(name)?;
        Ok(path.is_dir())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_create_and_remove_dir() {
        let temp = TempDir::new().unwrap();
        let backend = LocalBackend::new(temp.path());

        backend.create_dir("alice.example.com").await.unwrap();
        assert!(backend.exists("alice.example.com").await.unwrap());

        backend.remove_dir("alice.example.com").await.unwrap();
        assert!(!backend.exists("alice.example.com").await.unwrap());
    }

    #[tokio::test]
    async fn test_create_existing_dir_is_already_exists() {
        let temp = TempDir::new().unwrap();
        let backend = LocalBackend::new(temp.path());

        backend.create_dir("tenant").await.unwrap();

        let err = backend.create_dir("tenant").await.unwrap_err();
        assert!(matches!(err, Error::AlreadyExists(_)));
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn test_escaping_names_rejected() {
        let temp = TempDir::new().unwrap();
        let backend = LocalBackend::new(temp.path());

        assert!(backend.create_dir("..").await.is_err());
        assert!(backend.create_dir("a/b").await.is_err());
        assert!(backend.create_dir("").await.is_err());
    }

    #[tokio::test]
    async fn test_missing_root_is_created_on_first_write() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("a").join("b");
        let backend = LocalBackend::new(&nested);

        // Construction alone leaves the filesystem untouched.
        assert!(!nested.exists());

        backend.create_dir("tenant").await.unwrap();
        assert!(nested.join("tenant").is_dir());
    }
}
