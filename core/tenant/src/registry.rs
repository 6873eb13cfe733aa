//! Tenant registry: creation and lookup of tenant records.

use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

use crate::provision::{IndexProvisioner, StorageProvisioner};
use crate::record::{TenantRecord, REGISTRY_PARTITION, TENANT_DOC_TYPE};
use crate::retry::{CallGuard, RetryConfig};
use cirrus_common::{Config, Domain, Error, Result};
use cirrus_docstore::{is_missing_partition, DocumentStore, FindQuery, IndexDef};
use cirrus_storage::StorageBackend;

/// Domain every development request resolves to.
///
/// Lookup by an empty domain or a loopback host is aliased to this tenant
/// as a development convenience. Never rely on it in production.
pub const DEV_ALIAS: &str = "dev";

/// Registry of tenant records in the process-wide registry partition.
///
/// Creation orchestrates the storage and index provisioners; the three
/// steps are not transactional, so every step after the registry write is
/// paired with a compensating action that undoes it on failure.
pub struct TenantRegistry {
    docs: Arc<dyn DocumentStore>,
    storage_root: Url,
    storage: Arc<dyn StorageBackend>,
    guard: CallGuard,
}

impl TenantRegistry {
    /// Create a registry from the platform configuration.
    ///
    /// The byte-storage backend for the global root is resolved here,
    /// once, and shared by every create and rollback. Tenant roots are
    /// directories named after the domain, directly under that root.
    ///
    /// # Errors
    /// - Malformed storage root locator or unsupported scheme
    ///   (configuration error)
    pub fn new(docs: Arc<dyn DocumentStore>, config: &Config) -> Result<Self> {
        let storage_root = Url::parse(&config.storage_root).map_err(|e| {
            Error::Configuration(format!(
                "Invalid storage root '{}': {}",
                config.storage_root, e
            ))
        })?;
        let storage = cirrus_storage::resolve(&storage_root)?;

        let guard = CallGuard::new(
            config.external_call_timeout(),
            RetryConfig::new(config.max_retries),
        );

        Ok(Self {
            docs,
            storage_root,
            storage,
            guard,
        })
    }

    /// Override the call guard, mainly to tighten timings in tests.
    pub fn with_guard(mut self, guard: CallGuard) -> Self {
        self.guard = guard;
        self
    }

    /// Provision a new tenant.
    ///
    /// Validates the domain before touching any external system, then:
    /// writes the tenant record, defines the registry domain index,
    /// creates the byte-storage root (with its root metadata document)
    /// and defines the file-metadata indexes. If any step after the
    /// record write fails, the record is removed again (and the root
    /// directory, if it was already created) before the error is
    /// returned, so no partial tenant survives.
    ///
    /// `locale` and `apps` are accepted for forward compatibility; app
    /// installation is deferred to the apps subsystem.
    ///
    /// Note: no uniqueness constraint on the domain is enforced here.
    pub async fn create(&self, domain: &str, locale: &str, apps: &[String]) -> Result<TenantRecord> {
        let domain = Domain::parse(domain)?;
        let mut record = TenantRecord::new(domain, &self.storage_root);

        debug!(
            domain = %record.domain,
            locale,
            apps = apps.len(),
            "provisioning tenant"
        );

        let doc = serde_json::to_value(&record)
            .map_err(|e| Error::Serialization(e.to_string()))?;
        let meta = self
            .guard
            .run(|| {
                self.docs
                    .create_doc(REGISTRY_PARTITION, TENANT_DOC_TYPE, doc.clone())
            })
            .await?;
        record.id = meta.id;
        record.rev = meta.rev;

        let by_domain = IndexDef::on_fields(&["domain"]);
        if let Err(err) = self
            .guard
            .run(|| {
                self.docs
                    .define_index(REGISTRY_PARTITION, TENANT_DOC_TYPE, &by_domain)
            })
            .await
        {
            self.compensate(&record, false).await;
            return Err(err);
        }

        // create_root removes its own directory on internal failure, so a
        // failure here never leaves the root behind.
        if let Err(err) = StorageProvisioner::new(self.docs.clone(), self.guard.clone())
            .create_root(&self.storage, &record)
            .await
        {
            self.compensate(&record, false).await;
            return Err(err);
        }

        if let Err(err) = IndexProvisioner::new(self.docs.clone(), self.guard.clone())
            .ensure_indexes(&record.partition())
            .await
        {
            self.compensate(&record, true).await;
            return Err(err);
        }

        // Cache the tenant's own storage handle on the returned record.
        if let Err(err) = record.resolve_storage() {
            self.compensate(&record, true).await;
            return Err(err);
        }

        info!(domain = %record.domain, "tenant provisioned");
        Ok(record)
    }

    /// Undo a partially provisioned tenant. Failures here are logged and
    /// swallowed; the provisioning error itself is what the caller sees.
    ///
    /// `root_created` says whether provisioning got past the root
    /// directory step. The directory is only removed then, so a create
    /// that collided with an existing tenant's directory cannot destroy
    /// that tenant's data.
    async fn compensate(&self, record: &TenantRecord, root_created: bool) {
        warn!(domain = %record.domain, "rolling back partial tenant");

        if let Err(err) = self
            .guard
            .run(|| {
                self.docs
                    .delete_doc(REGISTRY_PARTITION, TENANT_DOC_TYPE, &record.id, &record.rev)
            })
            .await
        {
            warn!(
                domain = %record.domain,
                error = %err,
                "failed to delete tenant record while rolling back"
            );
        }

        if root_created {
            let domain = record.domain.as_str();
            if let Err(err) = self.guard.run(|| self.storage.remove_dir(domain)).await {
                warn!(
                    domain,
                    error = %err,
                    "failed to remove root directory while rolling back"
                );
            }
        }
    }

    /// Look up the tenant record for a request domain.
    ///
    /// Performs an exact-match query on the registry's domain index,
    /// limited to one result. A missing record and a missing registry
    /// partition both report the same not-found condition.
    pub async fn get(&self, domain: &str) -> Result<TenantRecord> {
        let domain = effective_domain(domain);

        let query = FindQuery::equal("domain", domain).limit(1);
        let found = self
            .guard
            .run(|| self.docs.find_docs(REGISTRY_PARTITION, TENANT_DOC_TYPE, &query))
            .await;

        let docs = match found {
            Err(err) if is_missing_partition(&err) => return Err(not_provisioned(domain)),
            other => other?,
        };

        match docs.into_iter().next() {
            Some(doc) => serde_json::from_value(doc)
                .map_err(|e| Error::Serialization(format!("Corrupt tenant record: {}", e))),
            None => Err(not_provisioned(domain)),
        }
    }
}

/// Resolve the development alias.
fn effective_domain(domain: &str) -> &str {
    if domain.is_empty() || domain.contains("127.0.0.1") || domain.contains("localhost") {
        DEV_ALIAS
    } else {
        domain
    }
}

fn not_provisioned(domain: &str) -> Error {
    Error::NotFound(format!(
        "No tenant for domain '{}', provision it first with 'cirrus tenants add'",
        domain
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::FILE_DOC_TYPE;
    use async_trait::async_trait;
    use cirrus_docstore::{DocMeta, MemoryDocStore};
    use serde_json::Value;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;
    use tempfile::TempDir;

    fn mem_config() -> Config {
        Config {
            storage_root: "mem://localhost/cirrus".to_string(),
            ..Config::default()
        }
    }

    fn quick_guard() -> CallGuard {
        CallGuard::new(
            Duration::from_secs(1),
            RetryConfig::new(0).with_jitter(false),
        )
    }

    fn registry(docs: Arc<MemoryDocStore>, config: &Config) -> TenantRegistry {
        TenantRegistry::new(docs, config)
            .unwrap()
            .with_guard(quick_guard())
    }

    /// Wraps a MemoryDocStore and fails selected operations, for
    /// exercising the rollback path.
    struct FailingStore {
        inner: MemoryDocStore,
        fail_tenant_index: AtomicBool,
        fail_root_doc: AtomicBool,
        hang_delete: AtomicBool,
    }

    impl FailingStore {
        fn new() -> Self {
            Self {
                inner: MemoryDocStore::new(),
                fail_tenant_index: AtomicBool::new(false),
                fail_root_doc: AtomicBool::new(false),
                hang_delete: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl DocumentStore for FailingStore {
        async fn create_doc(
            &self,
            partition: &str,
            doc_type: &str,
            doc: Value,
        ) -> Result<DocMeta> {
            if doc_type == FILE_DOC_TYPE && self.fail_root_doc.load(Ordering::SeqCst) {
                return Err(Error::ExternalSystem("root doc write failed".to_string()));
            }
            self.inner.create_doc(partition, doc_type, doc).await
        }

        async fn delete_doc(
            &self,
            partition: &str,
            doc_type: &str,
            id: &str,
            rev: &str,
        ) -> Result<()> {
            if self.hang_delete.load(Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
            self.inner.delete_doc(partition, doc_type, id, rev).await
        }

        async fn define_index(
            &self,
            partition: &str,
            doc_type: &str,
            index: &IndexDef,
        ) -> Result<()> {
            if partition != REGISTRY_PARTITION && self.fail_tenant_index.load(Ordering::SeqCst) {
                return Err(Error::ExternalSystem("index definition failed".to_string()));
            }
            self.inner.define_index(partition, doc_type, index).await
        }

        async fn find_docs(
            &self,
            partition: &str,
            doc_type: &str,
            query: &FindQuery,
        ) -> Result<Vec<Value>> {
            self.inner.find_docs(partition, doc_type, query).await
        }
    }

    #[tokio::test]
    async fn test_create_then_get_roundtrip() {
        let docs = Arc::new(MemoryDocStore::new());
        let registry = registry(docs, &mem_config());

        registry.create("alice.example.com", "en", &[]).await.unwrap();

        let found = registry.get("alice.example.com").await.unwrap();
        assert_eq!(found.domain.as_str(), "alice.example.com");
        assert!(!found.id.is_empty());
        assert!(!found.rev.is_empty());
    }

    #[tokio::test]
    async fn test_create_provisions_everything() {
        let temp = TempDir::new().unwrap();
        let config = Config {
            storage_root: format!("file://{}", temp.path().display()),
            ..Config::default()
        };
        let docs = Arc::new(MemoryDocStore::new());
        let registry = registry(docs.clone(), &config);

        registry.create("alice.example.com", "en", &[]).await.unwrap();

        // Root directory on disk.
        assert!(temp.path().join("alice.example.com").is_dir());
        // Root metadata document.
        assert_eq!(docs.doc_count("alice.example.com/", FILE_DOC_TYPE), 1);
        // Both file-metadata indexes.
        let defined = docs.defined_indexes("alice.example.com/", FILE_DOC_TYPE);
        assert!(defined.contains(&IndexDef::on_fields(&["folder_id", "name", "type"])));
        assert!(defined.contains(&IndexDef::on_fields(&["path"])));
        // Registry domain index.
        assert!(docs
            .defined_indexes(REGISTRY_PARTITION, TENANT_DOC_TYPE)
            .contains(&IndexDef::on_fields(&["domain"])));
    }

    #[tokio::test]
    async fn test_root_directory_sits_directly_under_storage_root() {
        let temp = TempDir::new().unwrap();
        let config = Config {
            storage_root: format!("file://{}", temp.path().display()),
            ..Config::default()
        };
        let docs = Arc::new(MemoryDocStore::new());
        let registry = registry(docs, &config);

        registry.create("alice.example.com", "en", &[]).await.unwrap();

        let root = temp.path().join("alice.example.com");
        assert!(root.is_dir());
        // Not nested one level deeper under a per-tenant locator.
        assert!(!root.join("alice.example.com").exists());
    }

    #[tokio::test]
    async fn test_malformed_domain_touches_nothing() {
        let docs = Arc::new(MemoryDocStore::new());
        let registry = registry(docs.clone(), &mem_config());

        for bad in ["bad/domain", "bad\\domain", ".", "..", ""] {
            let err = registry.create(bad, "en", &[]).await.unwrap_err();
            assert!(matches!(err, Error::Validation(_)), "{:?}", bad);
        }

        assert!(!docs.partition_exists(REGISTRY_PARTITION));
    }

    #[tokio::test]
    async fn test_failed_index_step_rolls_back_record_and_directory() {
        let temp = TempDir::new().unwrap();
        let config = Config {
            storage_root: format!("file://{}", temp.path().display()),
            ..Config::default()
        };
        let docs = Arc::new(FailingStore::new());
        docs.fail_tenant_index.store(true, Ordering::SeqCst);
        let registry = TenantRegistry::new(docs.clone(), &config)
            .unwrap()
            .with_guard(quick_guard());

        let err = registry.create("alice.example.com", "en", &[]).await.unwrap_err();
        assert!(matches!(err, Error::ExternalSystem(_)));

        // No registry record, no directory left behind.
        assert_eq!(docs.inner.doc_count(REGISTRY_PARTITION, TENANT_DOC_TYPE), 0);
        assert!(!temp.path().join("alice.example.com").exists());
    }

    #[tokio::test]
    async fn test_failed_root_doc_rolls_back_directory() {
        let temp = TempDir::new().unwrap();
        let config = Config {
            storage_root: format!("file://{}", temp.path().display()),
            ..Config::default()
        };
        let docs = Arc::new(FailingStore::new());
        docs.fail_root_doc.store(true, Ordering::SeqCst);
        let registry = TenantRegistry::new(docs.clone(), &config)
            .unwrap()
            .with_guard(quick_guard());

        let err = registry.create("alice.example.com", "en", &[]).await.unwrap_err();
        assert!(matches!(err, Error::ExternalSystem(_)));

        assert_eq!(docs.inner.doc_count(REGISTRY_PARTITION, TENANT_DOC_TYPE), 0);
        assert!(!temp.path().join("alice.example.com").exists());
    }

    #[tokio::test]
    async fn test_rollback_calls_are_time_bounded() {
        let temp = TempDir::new().unwrap();
        let config = Config {
            storage_root: format!("file://{}", temp.path().display()),
            ..Config::default()
        };
        let docs = Arc::new(FailingStore::new());
        docs.fail_tenant_index.store(true, Ordering::SeqCst);
        docs.hang_delete.store(true, Ordering::SeqCst);
        let registry = TenantRegistry::new(docs.clone(), &config)
            .unwrap()
            .with_guard(CallGuard::new(
                Duration::from_millis(50),
                RetryConfig::new(0).with_jitter(false),
            ));

        let started = std::time::Instant::now();
        let err = registry.create("alice.example.com", "en", &[]).await.unwrap_err();
        assert!(matches!(err, Error::ExternalSystem(_)));

        // The stuck record delete times out instead of wedging create.
        assert!(started.elapsed() < Duration::from_secs(5));
        // The directory rollback still runs after the timed-out delete.
        assert!(!temp.path().join("alice.example.com").exists());
    }

    #[tokio::test]
    async fn test_get_unknown_domain_is_not_found() {
        let docs = Arc::new(MemoryDocStore::new());
        let registry = registry(docs, &mem_config());

        registry.create("alice.example.com", "en", &[]).await.unwrap();

        let err = registry.get("nobody.example.com").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert!(err.to_string().contains("cirrus tenants add"));
    }

    #[tokio::test]
    async fn test_get_before_any_create_is_not_found() {
        let docs = Arc::new(MemoryDocStore::new());
        let registry = registry(docs, &mem_config());

        // Registry partition does not exist yet; same NotFound as an
        // unknown domain.
        let err = registry.get("alice.example.com").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_dev_alias_resolution() {
        let docs = Arc::new(MemoryDocStore::new());
        let registry = registry(docs, &mem_config());

        registry.create(DEV_ALIAS, "en", &[]).await.unwrap();

        for host in ["", "localhost", "localhost:8080", "127.0.0.1:8080"] {
            let found = registry.get(host).await.unwrap();
            assert_eq!(found.domain.as_str(), DEV_ALIAS, "{:?}", host);
        }
    }

    #[test]
    fn test_effective_domain() {
        assert_eq!(effective_domain(""), DEV_ALIAS);
        assert_eq!(effective_domain("localhost"), DEV_ALIAS);
        assert_eq!(effective_domain("127.0.0.1:8080"), DEV_ALIAS);
        assert_eq!(effective_domain("alice.example.com"), "alice.example.com");
    }
}
