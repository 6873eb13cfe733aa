//! Storage locator resolution.
//!
//! A locator is a URI of the form `scheme://host/path`. The scheme picks
//! the backend; the path roots it.

use std::sync::Arc;
use url::Url;

use crate::backend::StorageBackend;
use crate::local::LocalBackend;
use crate::memory::MemoryBackend;
use cirrus_common::{Error, Result};

/// Resolve a storage locator into a concrete backend.
///
/// `file` roots a local backend at the locator path; `mem` yields a
/// process-local volatile backend (test/dev only).
///
/// # Errors
/// - Unsupported scheme (configuration error)
pub fn resolve(locator: &Url) -> Result<Arc<dyn StorageBackend>> {
    match locator.scheme() {
        "file" => Ok(Arc::new(LocalBackend::new(locator.path()))),
        "mem" => Ok(Arc::new(MemoryBackend::new())),
        scheme => Err(Error::Configuration(format!(
            "Unknown storage scheme: {}",
            scheme
        ))),
    }
}

/// Derive a tenant's storage locator from the global storage root.
///
/// The tenant locator is always the root locator with the domain appended
/// as a final path segment.
pub fn tenant_locator(root: &Url, domain: &str) -> Url {
    let mut locator = root.clone();
    let joined = format!("{}/{}", locator.path().trim_end_matches('/'), domain);
    locator.set_path(&joined);
    locator
}
