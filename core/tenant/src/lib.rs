//! Tenant provisioning for Cirrus.
//!
//! This module provides:
//! - Tenant record creation and lookup in the registry partition
//! - Byte-storage root provisioning with rollback
//! - Idempotent file-metadata index definition
//! - A timeout/retry guard for every external-system call
//!
//! # Architecture
//! `TenantRegistry` orchestrates the provisioners. The multi-system
//! creation sequence is not transactional; each step after the registry
//! write pairs with a compensating action invoked on later failure.

pub mod provision;
pub mod record;
pub mod registry;
pub mod retry;

pub use provision::{IndexProvisioner, StorageProvisioner};
pub use record::{TenantRecord, FILE_DOC_TYPE, REGISTRY_PARTITION, TENANT_DOC_TYPE};
pub use registry::{TenantRegistry, DEV_ALIAS};
pub use retry::{CallGuard, RetryConfig};
