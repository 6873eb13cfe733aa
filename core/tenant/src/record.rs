//! Tenant record type.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use url::Url;

use cirrus_common::{Domain, Error, Result};
use cirrus_storage::{self as storage, StorageBackend};

/// Process-wide partition holding tenant records.
pub const REGISTRY_PARTITION: &str = "global/";
/// Document type of tenant records in the registry partition.
pub const TENANT_DOC_TYPE: &str = "tenants";
/// Document type of file metadata in a tenant's own partition.
pub const FILE_DOC_TYPE: &str = "files";

/// A tenant record: one isolated customer realm.
///
/// Persisted in the registry partition as `{_id, _rev, domain, storage}`.
/// The resolved byte-storage backend is cached on the in-memory record
/// only and is never persisted.
#[derive(Clone, Serialize, Deserialize)]
pub struct TenantRecord {
    /// Store-assigned document identifier.
    #[serde(rename = "_id", default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// Store-assigned document revision.
    #[serde(rename = "_rev", default, skip_serializing_if = "String::is_empty")]
    pub rev: String,
    /// The tenant's main DNS domain, like alice.example.com.
    pub domain: Domain,
    /// Where the tenant's file contents are persisted.
    #[serde(rename = "storage")]
    pub storage_locator: String,
    #[serde(skip)]
    storage: Option<Arc<dyn StorageBackend>>,
}

impl TenantRecord {
    /// Build a fresh, unpersisted record for `domain`.
    ///
    /// The storage locator is derived deterministically by joining the
    /// global storage root with the domain.
    pub fn new(domain: Domain, storage_root: &Url) -> Self {
        let locator = storage::tenant_locator(storage_root, domain.as_str());
        Self {
            id: String::new(),
            rev: String::new(),
            domain,
            storage_locator: locator.to_string(),
            storage: None,
        }
    }

    /// Name of this tenant's document partition.
    pub fn partition(&self) -> String {
        self.domain.partition()
    }

    /// Resolve the byte-storage backend for this record.
    ///
    /// The handle is cached on this in-memory record, so repeated calls
    /// within one process are free. The cache is never shared across
    /// processes or persisted.
    ///
    /// # Errors
    /// - Malformed locator or unsupported scheme (configuration error)
    pub fn resolve_storage(&mut self) -> Result<Arc<dyn StorageBackend>> {
        if let Some(backend) = &self.storage {
            return Ok(backend.clone());
        }

        let locator = Url::parse(&self.storage_locator).map_err(|e| {
            Error::Configuration(format!(
                "Invalid storage locator '{}': {}",
                self.storage_locator, e
            ))
        })?;

        let backend = storage::resolve(&locator)?;
        self.storage = Some(backend.clone());
        Ok(backend)
    }

    /// The already-resolved backend, if any.
    pub fn storage(&self) -> Option<&Arc<dyn StorageBackend>> {
        self.storage.as_ref()
    }
}

impl fmt::Debug for TenantRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TenantRecord")
            .field("id", &self.id)
            .field("rev", &self.rev)
            .field("domain", &self.domain)
            .field("storage_locator", &self.storage_locator)
            .field("storage_resolved", &self.storage.is_some())
            .finish()
    }
}
