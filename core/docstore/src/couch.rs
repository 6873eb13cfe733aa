//! CouchDB-compatible HTTP document store.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::store::{missing_partition, DocMeta, DocumentStore, FindQuery, IndexDef};
use cirrus_common::{Error, Result};

/// Write response from the document store.
#[derive(Debug, Deserialize)]
struct WriteResponse {
    id: String,
    rev: String,
}

/// Response from an index definition.
#[derive(Debug, Deserialize)]
struct IndexResponse {
    result: String,
}

/// Response from a selector query.
#[derive(Debug, Deserialize)]
struct FindResponse {
    docs: Vec<Value>,
}

/// CouchDB-compatible document store over HTTP.
///
/// Partitions map to databases; the database is created on demand the
/// first time a partition is written to.
pub struct CouchDocStore {
    http: Client,
    base: String,
}

impl CouchDocStore {
    /// Create a new store client against the given server URL.
    pub fn new(base_url: &str) -> Result<Self> {
        let base = url::Url::parse(base_url)
            .map_err(|e| Error::Configuration(format!("Invalid docstore URL: {}", e)))?;

        let http = Client::builder()
            .user_agent("Cirrus/0.1")
            .build()
            .map_err(|e| Error::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base: base.as_str().trim_end_matches('/').to_string(),
        })
    }

    /// Map a partition and document type to a database name.
    ///
    /// Database names only allow lowercase letters, digits and a few
    /// separators, so the partition prefix is flattened.
    fn db_name(partition: &str, doc_type: &str) -> String {
        let raw = format!("{}{}", partition, doc_type);
        raw.trim_matches('/')
            .to_lowercase()
            .replace(['/', '.', ':'], "-")
    }

    fn db_url(&self, partition: &str, doc_type: &str) -> String {
        format!("{}/{}", self.base, Self::db_name(partition, doc_type))
    }

    /// Create the database backing a partition. Safe to call when it
    /// already exists.
    async fn create_db(&self, partition: &str, doc_type: &str) -> Result<()> {
        let url = self.db_url(partition, doc_type);
        let response = self
            .http
            .put(&url)
            .send()
            .await
            .map_err(|e| Error::ExternalSystem(format!("Failed to create database: {}", e)))?;

        match response.status() {
            // 412 means the database already exists.
            status if status.is_success() || status == StatusCode::PRECONDITION_FAILED => {
                debug!(partition, doc_type, "database ready");
                Ok(())
            }
            status => Err(Error::ExternalSystem(format!(
                "Database creation returned {}",
                status
            ))),
        }
    }

    async fn error_from(response: reqwest::Response, context: &str) -> Error {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Error::ExternalSystem(format!("{} returned {}: {}", context, status, body))
    }
}

#[async_trait]
impl DocumentStore for CouchDocStore {
    async fn create_doc(&self, partition: &str, doc_type: &str, doc: Value) -> Result<DocMeta> {
        let url = self.db_url(partition, doc_type);

        // First write to a partition creates its database.
        for attempt in 0..2 {
            let response = self
                .http
                .post(&url)
                .json(&doc)
                .send()
                .await
                .map_err(|e| Error::ExternalSystem(format!("Failed to create document: {}", e)))?;

            match response.status() {
                status if status.is_success() => {
                    let meta: WriteResponse = response.json().await.map_err(|e| {
                        Error::ExternalSystem(format!("Invalid write response: {}", e))
                    })?;
                    return Ok(DocMeta {
                        id: meta.id,
                        rev: meta.rev,
                    });
                }
                StatusCode::NOT_FOUND if attempt == 0 => {
                    self.create_db(partition, doc_type).await?;
                }
                _ => return Err(Self::error_from(response, "Document creation").await),
            }
        }
        unreachable!("second attempt either succeeds or returns")
    }

    async fn delete_doc(
        &self,
        partition: &str,
        doc_type: &str,
        id: &str,
        rev: &str,
    ) -> Result<()> {
        let url = format!("{}/{}", self.db_url(partition, doc_type), id);
        let response = self
            .http
            .delete(&url)
            .query(&[("rev", rev)])
            .send()
            .await
            .map_err(|e| Error::ExternalSystem(format!("Failed to delete document: {}", e)))?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::NOT_FOUND => {
                Err(Error::NotFound(format!("document '{}' not found", id)))
            }
            _ => Err(Self::error_from(response, "Document deletion").await),
        }
    }

    async fn define_index(
        &self,
        partition: &str,
        doc_type: &str,
        index: &IndexDef,
    ) -> Result<()> {
        let url = format!("{}/_index", self.db_url(partition, doc_type));
        let body = json!({
            "index": { "fields": index.fields() },
            "name": index.name(),
            "type": "json",
        });

        for attempt in 0..2 {
            let response = self
                .http
                .post(&url)
                .json(&body)
                .send()
                .await
                .map_err(|e| Error::ExternalSystem(format!("Failed to define index: {}", e)))?;

            match response.status() {
                status if status.is_success() => {
                    let result: IndexResponse = response.json().await.map_err(|e| {
                        Error::ExternalSystem(format!("Invalid index response: {}", e))
                    })?;
                    // "created" on first definition, "exists" on re-definition.
                    debug!(name = %index.name(), result = %result.result, "index defined");
                    return Ok(());
                }
                StatusCode::NOT_FOUND if attempt == 0 => {
                    self.create_db(partition, doc_type).await?;
                }
                _ => return Err(Self::error_from(response, "Index definition").await),
            }
        }
        unreachable!("second attempt either succeeds or returns")
    }

    async fn find_docs(
        &self,
        partition: &str,
        doc_type: &str,
        query: &FindQuery,
    ) -> Result<Vec<Value>> {
        let url = format!("{}/_find", self.db_url(partition, doc_type));
        let body = json!({
            "selector": { (query.field.as_str()): { "$eq": query.value } },
            "limit": query.limit,
        });

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::ExternalSystem(format!("Failed to query documents: {}", e)))?;

        match response.status() {
            status if status.is_success() => {
                let found: FindResponse = response
                    .json()
                    .await
                    .map_err(|e| Error::ExternalSystem(format!("Invalid find response: {}", e)))?;
                Ok(found.docs)
            }
            StatusCode::NOT_FOUND => Err(missing_partition(partition)),
            _ => Err(Self::error_from(response, "Document query").await),
        }
    }
}
