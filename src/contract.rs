//! # contract: capability interfaces for the sync pipeline
//!
//! This module defines the two external capabilities the pipeline depends on,
//! plus the plain data records that cross them:
//!
//! - [`DocumentStore`]: the knowledge-base API (datasets and documents)
//! - [`ObjectStore`]: the storage bucket ("fetch bytes by key")
//!
//! ## Interface & Extensibility
//! - All methods are async and return typed errors from [`crate::error`].
//! - Implementations own transport and authentication; the traits are agnostic
//!   of both. See [`crate::upload::KnowledgeClient`] and
//!   [`crate::download::S3ObjectStore`] for the production implementations.
//!
//! ## Mocking & Testing
//! - Both traits are annotated for `mockall`, so tests get `MockDocumentStore`
//!   and `MockObjectStore`. The mocks are exported behind the default
//!   `test-export-mocks` feature so integration tests can use them too.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

use crate::error::{ObjectStoreError, StoreError};

/// Remote container for documents. One per bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// Remote document. `name` is the decoded object key it was created from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// One page of a paginated listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    #[serde(rename = "data", default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default)]
    pub has_more: bool,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, has_more: bool) -> Self {
        Self { items, has_more }
    }
}

/// Processing rule sent with every uploaded file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessRule {
    pub mode: String,
}

/// The JSON sidecar of a file upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadOptions {
    pub indexing_technique: String,
    pub process_rule: ProcessRule,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            indexing_technique: "high_quality".to_string(),
            process_rule: ProcessRule {
                mode: "automatic".to_string(),
            },
        }
    }
}

/// A file to create or replace a document from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    /// Sent as the multipart filename; becomes the document name.
    pub filename: String,
    pub bytes: Vec<u8>,
    pub options: UploadOptions,
}

/// Knowledge-base API surface used by the pipeline.
///
/// Pages are 1-based. Every call is a single request/response; retries, if
/// any, are the implementor's business.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn list_datasets(&self, page: u32, limit: u32) -> Result<Page<Dataset>, StoreError>;

    async fn create_dataset(&self, name: &str) -> Result<Dataset, StoreError>;

    async fn list_documents(
        &self,
        dataset_id: &str,
        page: u32,
        limit: u32,
    ) -> Result<Page<DocumentRecord>, StoreError>;

    /// Create a new document in `dataset_id` from a file.
    async fn create_document_by_file(
        &self,
        dataset_id: &str,
        upload: FileUpload,
    ) -> Result<DocumentRecord, StoreError>;

    /// Replace the content of an existing document.
    async fn update_document_by_file(
        &self,
        dataset_id: &str,
        document_id: &str,
        upload: FileUpload,
    ) -> Result<DocumentRecord, StoreError>;

    async fn delete_document(&self, dataset_id: &str, document_id: &str) -> Result<(), StoreError>;
}

/// Bucket read access.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Raw bytes of `key` in `bucket`. `key` is the decoded object key.
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, ObjectStoreError>;
}
