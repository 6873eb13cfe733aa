//! Storage and index provisioning for a single tenant.

use serde_json::json;
use std::sync::Arc;
use tracing::warn;

use crate::record::{TenantRecord, FILE_DOC_TYPE};
use crate::retry::CallGuard;
use cirrus_docstore::{DocumentStore, IndexDef};
use cirrus_storage::StorageBackend;
use cirrus_common::Result;

/// Creates a tenant's byte-storage root.
pub struct StorageProvisioner {
    docs: Arc<dyn DocumentStore>,
    guard: CallGuard,
}

impl StorageProvisioner {
    /// Create a new provisioner.
    pub fn new(docs: Arc<dyn DocumentStore>, guard: CallGuard) -> Self {
        Self { docs, guard }
    }

    /// Create the tenant-exclusive root directory, then the root
    /// file-metadata document in the tenant's partition.
    ///
    /// An empty directory with no matching metadata is an invalid state,
    /// so a failed metadata write removes the directory again before the
    /// error is returned.
    pub async fn create_root(
        &self,
        backend: &Arc<dyn StorageBackend>,
        record: &TenantRecord,
    ) -> Result<()> {
        let domain = record.domain.as_str();
        self.guard.run(|| backend.create_dir(domain)).await?;

        if let Err(err) = self.create_root_dir_doc(&record.partition()).await {
            if let Err(cleanup) = self.guard.run(|| backend.remove_dir(domain)).await {
                warn!(
                    domain,
                    error = %cleanup,
                    "failed to remove root directory while rolling back"
                );
            }
            return Err(err);
        }

        Ok(())
    }

    /// Write the root directory's metadata document.
    async fn create_root_dir_doc(&self, partition: &str) -> Result<()> {
        let doc = json!({
            "type": "directory",
            "name": "",
            "path": "/",
            "folder_id": "",
        });
        self.guard
            .run(|| self.docs.create_doc(partition, FILE_DOC_TYPE, doc.clone()))
            .await?;
        Ok(())
    }
}

/// Defines the secondary indexes a tenant's file-metadata partition needs.
pub struct IndexProvisioner {
    docs: Arc<dyn DocumentStore>,
    guard: CallGuard,
}

impl IndexProvisioner {
    /// Create a new provisioner.
    pub fn new(docs: Arc<dyn DocumentStore>, guard: CallGuard) -> Self {
        Self { docs, guard }
    }

    /// The index set every tenant partition carries: (folder_id, name,
    /// type) for child listing and collision detection, (path) for direct
    /// path resolution.
    pub fn required_indexes() -> [IndexDef; 2] {
        [
            IndexDef::on_fields(&["folder_id", "name", "type"]),
            IndexDef::on_fields(&["path"]),
        ]
    }

    /// Idempotently define the file-metadata indexes on `partition`.
    /// Re-invocation on an already-indexed partition is a no-op.
    pub async fn ensure_indexes(&self, partition: &str) -> Result<()> {
        for index in Self::required_indexes() {
            self.guard
                .run(|| self.docs.define_index(partition, FILE_DOC_TYPE, &index))
                .await?;
        }
        Ok(())
    }
}
