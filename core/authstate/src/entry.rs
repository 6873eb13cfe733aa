//! Handshake-correlation state entries and their reference tokens.

use chrono::{DateTime, Utc};
use rand::{distr::Alphanumeric, RngExt};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How long a state entry stays retrievable.
pub const STATE_TTL: Duration = Duration::from_secs(15 * 60);

/// Length of a reference token in alphanumeric characters.
///
/// 24 characters over a 62-symbol alphabet is about 142 bits, which makes
/// collisions negligible at any realistic entry volume.
pub const REFERENCE_LEN: usize = 24;

/// State stashed between the two legs of a connector authorization flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateEntry {
    /// Domain of the tenant that started the flow.
    pub tenant_domain: String,
    /// Kind of account being connected.
    pub account_type: String,
    /// Opaque state carried for the external client.
    pub client_state: String,
    /// When the entry expires. Stamped by the store on add; any
    /// caller-supplied value is overridden.
    pub expires_at: DateTime<Utc>,
}

impl StateEntry {
    /// Build an entry for a freshly started flow.
    pub fn new(
        tenant_domain: impl Into<String>,
        account_type: impl Into<String>,
        client_state: impl Into<String>,
    ) -> Self {
        Self {
            tenant_domain: tenant_domain.into(),
            account_type: account_type.into(),
            client_state: client_state.into(),
            expires_at: Utc::now(),
        }
    }

    /// Whether the entry has outlived its TTL.
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }
}

/// Generate a fresh reference token.
///
/// Tokens come from a cryptographically secure generator and are never
/// reused: the space is large enough that a repeat is not a practical
/// concern.
pub fn new_reference() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(REFERENCE_LEN)
        .map(char::from)
        .collect()
}
