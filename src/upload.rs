#![doc = "Knowledge-base client: implements the DocumentStore contract over the document API's HTTP interface."]
//
//! # Knowledge-base client
//!
//! [`KnowledgeClient`] is the production [`DocumentStore`]. It talks to the
//! dataset/document endpoints of the knowledge-base API with a bearer key.
//!
//! - Construct it from a [`SyncConfig`] (`DOCUMENT_API_BASE_URL`, `DOCUMENT_API_KEY`).
//! - Listings are JSON, file uploads are multipart with a `file` part and a
//!   JSON `data` part.
//! - Non-2xx responses become [`StoreError::Api`] carrying the response body,
//!   so callers can log the API's own error document.
//!
//! No retries happen here: a failed call is final for the unit of work that
//! issued it.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::config::SyncConfig;
use crate::contract::{Dataset, DocumentRecord, DocumentStore, FileUpload, Page};
use crate::error::{ConfigError, StoreError};

/// Create/update-by-file response. Only the document part is of interest, and
/// the upload has succeeded even when it is missing.
#[derive(Debug, Deserialize)]
struct DocumentEnvelope {
    #[serde(default)]
    document: Option<DocumentRecord>,
}

impl DocumentEnvelope {
    fn into_record(self, fallback_id: &str, filename: &str) -> DocumentRecord {
        self.document.unwrap_or_else(|| {
            tracing::warn!(filename, "Upload response carried no document, using request values");
            DocumentRecord {
                id: fallback_id.to_string(),
                name: filename.to_string(),
            }
        })
    }
}

pub struct KnowledgeClient {
    client: Client,
    config: SyncConfig,
}

impl std::fmt::Debug for KnowledgeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KnowledgeClient")
            .field("api_base_url", &self.config.api_base_url())
            .finish_non_exhaustive()
    }
}

impl KnowledgeClient {
    pub fn new(config: &SyncConfig) -> Result<Self, ConfigError> {
        let client = Client::builder().build().map_err(|e| {
            tracing::error!(error = ?e, "Failed to build HTTP client");
            ConfigError::HttpClient(e.to_string())
        })?;
        tracing::info!(
            api_base_url = config.api_base_url(),
            api_key_set = !config.api_key().is_empty(),
            "Initialized KnowledgeClient"
        );
        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    fn datasets_url(&self) -> String {
        self.config.endpoint("datasets")
    }

    fn documents_url(&self, dataset_id: &str) -> String {
        self.config
            .endpoint(&format!("datasets/{dataset_id}/documents"))
    }

    fn create_by_file_url(&self, dataset_id: &str) -> String {
        self.config
            .endpoint(&format!("datasets/{dataset_id}/document/create_by_file"))
    }

    fn update_by_file_url(&self, dataset_id: &str, document_id: &str) -> String {
        self.config.endpoint(&format!(
            "datasets/{dataset_id}/documents/{document_id}/update_by_file"
        ))
    }

    fn document_url(&self, dataset_id: &str, document_id: &str) -> String {
        self.config
            .endpoint(&format!("datasets/{dataset_id}/documents/{document_id}"))
    }

    fn authorised(&self, request: RequestBuilder) -> RequestBuilder {
        request.bearer_auth(self.config.api_key())
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, StoreError> {
        let response = self.authorised(request).send().await.map_err(|e| {
            tracing::error!(error = %e, "Document API request failed");
            StoreError::Transport(e.to_string())
        })?;

        let status = response.status();
        if status.is_success() {
            tracing::debug!(status = %status, url = %response.url(), "Document API responded");
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        tracing::error!(status = %status, body = %body, "Document API error response");
        Err(StoreError::Api {
            status: status.as_u16(),
            body,
        })
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, StoreError> {
        let response = self.send(request).await?;
        let text = response
            .text()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        parse_body(&text)
    }

    fn file_form(upload: FileUpload) -> Result<Form, StoreError> {
        let data = serde_json::to_string(&upload.options)
            .map_err(|e| StoreError::Decode(format!("unserialisable upload options: {e}")))?;
        tracing::debug!(filename = %upload.filename, data = %data, "Building file upload form");
        let file = Part::bytes(upload.bytes).file_name(upload.filename);
        Ok(Form::new().part("file", file).text("data", data))
    }
}

fn parse_body<T: DeserializeOwned>(text: &str) -> Result<T, StoreError> {
    serde_json::from_str(text).map_err(|e| {
        tracing::error!(error = %e, body = %text, "Unexpected document API response body");
        StoreError::Decode(e.to_string())
    })
}

fn paging(page: u32, limit: u32) -> [(&'static str, u32); 2] {
    [("page", page), ("limit", limit)]
}

#[async_trait]
impl DocumentStore for KnowledgeClient {
    async fn list_datasets(&self, page: u32, limit: u32) -> Result<Page<Dataset>, StoreError> {
        tracing::debug!(page, limit, "Listing datasets");
        let request = self.client.get(self.datasets_url()).query(&paging(page, limit));
        self.send_json(request).await
    }

    async fn create_dataset(&self, name: &str) -> Result<Dataset, StoreError> {
        tracing::info!(name, "Creating dataset");
        let request = self
            .client
            .post(self.datasets_url())
            .json(&serde_json::json!({ "name": name }));
        self.send_json(request).await
    }

    async fn list_documents(
        &self,
        dataset_id: &str,
        page: u32,
        limit: u32,
    ) -> Result<Page<DocumentRecord>, StoreError> {
        tracing::debug!(dataset_id, page, limit, "Listing documents");
        let request = self
            .client
            .get(self.documents_url(dataset_id))
            .query(&paging(page, limit));
        self.send_json(request).await
    }

    async fn create_document_by_file(
        &self,
        dataset_id: &str,
        upload: FileUpload,
    ) -> Result<DocumentRecord, StoreError> {
        tracing::info!(dataset_id, filename = %upload.filename, "Uploading new document");
        let filename = upload.filename.clone();
        let form = Self::file_form(upload)?;
        let request = self
            .client
            .post(self.create_by_file_url(dataset_id))
            .multipart(form);
        let envelope: DocumentEnvelope = self.send_json(request).await?;
        let document = envelope.into_record("", &filename);
        tracing::info!(document_id = %document.id, "Document created");
        Ok(document)
    }

    async fn update_document_by_file(
        &self,
        dataset_id: &str,
        document_id: &str,
        upload: FileUpload,
    ) -> Result<DocumentRecord, StoreError> {
        tracing::info!(dataset_id, document_id, filename = %upload.filename, "Uploading document update");
        let filename = upload.filename.clone();
        let form = Self::file_form(upload)?;
        let request = self
            .client
            .post(self.update_by_file_url(dataset_id, document_id))
            .multipart(form);
        let envelope: DocumentEnvelope = self.send_json(request).await?;
        let document = envelope.into_record(document_id, &filename);
        tracing::info!(document_id = %document.id, "Document updated");
        Ok(document)
    }

    async fn delete_document(&self, dataset_id: &str, document_id: &str) -> Result<(), StoreError> {
        tracing::info!(dataset_id, document_id, "Deleting document");
        let request = self.client.delete(self.document_url(dataset_id, document_id));
        let response = self.send(request).await?;
        tracing::info!(document_id, status = %response.status(), "Document deleted");
        Ok(())
    }
}
