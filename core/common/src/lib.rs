//! Common utilities and types shared across Cirrus modules.
//!
//! This module provides foundational types that are used throughout the
//! codebase, ensuring consistency and type safety.

pub mod config;
pub mod error;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use types::{Domain, FORBIDDEN_DOMAIN_CHARS};
