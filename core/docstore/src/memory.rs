//! In-memory document store for development and testing.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};
use uuid::Uuid;

use crate::store::{missing_partition, DocMeta, DocumentStore, FindQuery, IndexDef};
use cirrus_common::{Error, Result};

#[derive(Debug, Clone)]
struct StoredDoc {
    rev: String,
    body: Value,
}

#[derive(Debug, Default)]
struct Partition {
    // doc_type -> id -> document
    docs: HashMap<String, HashMap<String, StoredDoc>>,
    // (doc_type, index)
    indexes: HashSet<(String, IndexDef)>,
}

/// In-memory document store.
///
/// Partitions are created implicitly on first write and everything is lost
/// on drop. Useful for tests and local development only.
pub struct MemoryDocStore {
    partitions: Arc<RwLock<HashMap<String, Partition>>>,
}

impl MemoryDocStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            partitions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Whether a partition exists.
    pub fn partition_exists(&self, partition: &str) -> bool {
        self.partitions.read().unwrap().contains_key(partition)
    }

    /// Indexes defined on a partition for a document type.
    pub fn defined_indexes(&self, partition: &str, doc_type: &str) -> Vec<IndexDef> {
        let partitions = self.partitions.read().unwrap();
        match partitions.get(partition) {
            Some(p) => p
                .indexes
                .iter()
                .filter(|(t, _)| t == doc_type)
                .map(|(_, index)| index.clone())
                .collect(),
            None => Vec::new(),
        }
    }

    /// Number of documents of a type in a partition.
    pub fn doc_count(&self, partition: &str, doc_type: &str) -> usize {
        let partitions = self.partitions.read().unwrap();
        partitions
            .get(partition)
            .and_then(|p| p.docs.get(doc_type))
            .map(|docs| docs.len())
            .unwrap_or(0)
    }
}

impl Default for MemoryDocStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocStore {
    async fn create_doc(&self, partition: &str, doc_type: &str, doc: Value) -> Result<DocMeta> {
        let id = Uuid::new_v4().to_string();
        let rev = format!("1-{}", Uuid::new_v4().simple());

        let mut partitions = self.partitions.write().unwrap();
        partitions
            .entry(partition.to_string())
            .or_default()
            .docs
            .entry(doc_type.to_string())
            .or_default()
            .insert(
                id.clone(),
                StoredDoc {
                    rev: rev.clone(),
                    body: doc,
                },
            );

        Ok(DocMeta { id, rev })
    }

    async fn delete_doc(
        &self,
        partition: &str,
        doc_type: &str,
        id: &str,
        rev: &str,
    ) -> Result<()> {
        let mut partitions = self.partitions.write().unwrap();
        let docs = partitions
            .get_mut(partition)
            .ok_or_else(|| missing_partition(partition))?
            .docs
            .get_mut(doc_type)
            .ok_or_else(|| Error::NotFound(format!("document '{}' not found", id)))?;

        match docs.get(id) {
            Some(stored) if stored.rev == rev => {}
            Some(_) => {
                return Err(Error::ExternalSystem(format!(
                    "revision conflict deleting document '{}'",
                    id
                )))
            }
            None => return Err(Error::NotFound(format!("document '{}' not found", id))),
        }

        docs.remove(id);
        Ok(())
    }

    async fn define_index(
        &self,
        partition: &str,
        doc_type: &str,
        index: &IndexDef,
    ) -> Result<()> {
        let mut partitions = self.partitions.write().unwrap();
        partitions
            .entry(partition.to_string())
            .or_default()
            .indexes
            .insert((doc_type.to_string(), index.clone()));
        Ok(())
    }

    async fn find_docs(
        &self,
        partition: &str,
        doc_type: &str,
        query: &FindQuery,
    ) -> Result<Vec<Value>> {
        let partitions = self.partitions.read().unwrap();
        let part = partitions
            .get(partition)
            .ok_or_else(|| missing_partition(partition))?;

        let matches = part
            .docs
            .get(doc_type)
            .map(|docs| {
                docs.iter()
                    .filter(|(_, stored)| {
                        stored.body.get(&query.field).and_then(Value::as_str)
                            == Some(query.value.as_str())
                    })
                    .take(query.limit)
                    .map(|(id, stored)| {
                        let mut body = stored.body.clone();
                        if let Value::Object(obj) = &mut body {
                            obj.insert("_id".to_string(), Value::String(id.clone()));
                            obj.insert("_rev".to_string(), Value::String(stored.rev.clone()));
                        }
                        body
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(matches)
    }
}
