//! Platform configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default storage root when none is configured.
const DEFAULT_STORAGE_ROOT: &str = "file:///var/lib/cirrus";

/// Platform-wide configuration.
///
/// Loaded once at process start; every consumer receives the relevant
/// pieces explicitly rather than reading hidden global state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Global storage root locator. Tenant roots are derived by joining
    /// this locator with the tenant domain.
    pub storage_root: String,
    /// Document-store endpoint. None selects the in-memory store
    /// (development only, nothing survives a restart).
    pub docstore_url: Option<String>,
    /// External TTL cache for authorization-handshake state. None selects
    /// the embedded in-process store.
    pub state_cache_url: Option<String>,
    /// Timeout applied to each external-system call, in seconds.
    pub external_call_timeout_secs: u64,
    /// Maximum retries for transient external-system errors.
    pub max_retries: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_root: DEFAULT_STORAGE_ROOT.to_string(),
            docstore_url: None,
            state_cache_url: None,
            external_call_timeout_secs: 10,
            max_retries: 3,
        }
    }
}

impl Config {
    /// Load configuration from a JSON file.
    ///
    /// Missing fields fall back to their defaults.
    pub fn load(path: impl AsRef<Path>) -> crate::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str(&raw).map_err(|e| crate::Error::Configuration(e.to_string()))
    }

    /// Timeout for a single external-system call.
    pub fn external_call_timeout(&self) -> Duration {
        Duration::from_secs(self.external_call_timeout_secs)
    }
}
