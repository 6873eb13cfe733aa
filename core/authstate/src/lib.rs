//! Ephemeral authorization-handshake state for Cirrus.
//!
//! A connector authorization flow stashes correlation state when it
//! starts and retrieves it when the external provider redirects back.
//! This module provides that store behind one capability trait with two
//! interchangeable backends: an embedded in-process map and an external
//! TTL cache.

pub mod embedded;
pub mod entry;
pub mod external;
pub mod store;

pub use embedded::EmbeddedStateStore;
pub use entry::{new_reference, StateEntry, REFERENCE_LEN, STATE_TTL};
pub use external::{ExternalStateStore, RedisCache, TtlCache};
pub use store::{from_config, StateStore};
