//! Document store trait definition.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use cirrus_common::{Error, Result};

/// Identity of a stored document after a write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocMeta {
    /// Store-assigned document identifier.
    pub id: String,
    /// Store-assigned revision.
    pub rev: String,
}

/// A secondary index over document fields.
///
/// Two definitions are equal when they cover the same fields in the same
/// order, which is what makes index definition idempotent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct IndexDef {
    fields: Vec<String>,
}

impl IndexDef {
    /// Create an index definition over the given fields.
    pub fn on_fields(fields: &[&str]) -> Self {
        Self {
            fields: fields.iter().map(|f| f.to_string()).collect(),
        }
    }

    /// The indexed fields, in order.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Deterministic index name derived from the fields.
    pub fn name(&self) -> String {
        format!("by-{}", self.fields.join("-"))
    }
}

/// An exact-match query against one document field.
#[derive(Debug, Clone)]
pub struct FindQuery {
    /// Field to match.
    pub field: String,
    /// Required value.
    pub value: String,
    /// Maximum number of results.
    pub limit: usize,
}

impl FindQuery {
    /// Build an equality query on `field`.
    pub fn equal(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
            limit: 25,
        }
    }

    /// Cap the number of results.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }
}

/// Document store interface.
///
/// A partition is a named collection of typed documents; the registry
/// partition holds tenant records and each tenant has its own partition
/// for file metadata. Implementations create partitions on first write.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create a document, allocating its id and revision.
    async fn create_doc(&self, partition: &str, doc_type: &str, doc: Value) -> Result<DocMeta>;

    /// Delete a document by id and revision.
    async fn delete_doc(&self, partition: &str, doc_type: &str, id: &str, rev: &str)
        -> Result<()>;

    /// Define a secondary index. Defining the same index twice is a no-op.
    async fn define_index(&self, partition: &str, doc_type: &str, index: &IndexDef)
        -> Result<()>;

    /// Run an exact-match query. Fails with a missing-partition error when
    /// the partition has never been written to.
    async fn find_docs(&self, partition: &str, doc_type: &str, query: &FindQuery)
        -> Result<Vec<Value>>;
}

/// Error for a query against a partition that does not exist.
pub fn missing_partition(partition: &str) -> Error {
    Error::NotFound(format!("partition '{}' does not exist", partition))
}

/// Check whether an error reports a missing partition.
pub fn is_missing_partition(err: &Error) -> bool {
    matches!(err, Error::NotFound(msg) if msg.starts_with("partition '"))
}
