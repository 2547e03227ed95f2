//! Error types for the sync pipeline.
//!
//! Two channels are kept apart: [`FatalError`] for the pre-flight steps that
//! abort a whole invocation, and [`EventError`] for failures scoped to a single
//! change event. An `EventError` is always turned into a report entry and never
//! escapes the reconciler.

use thiserror::Error;

/// Failure talking to the knowledge-base document API.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The API answered with a non-success status. `body` holds whatever the
    /// API sent back, usually a JSON error document.
    #[error("document API returned status {status}: {body}")]
    Api { status: u16, body: String },

    /// The request never produced a response (DNS, TLS, connection reset...).
    #[error("document API request failed: {0}")]
    Transport(String),

    /// The API answered with a body we could not parse.
    #[error("unexpected document API response: {0}")]
    Decode(String),
}

impl StoreError {
    /// Structured error body returned by the API, when there is one.
    pub fn api_body(&self) -> Option<&str> {
        match self {
            StoreError::Api { body, .. } => Some(body.as_str()),
            _ => None,
        }
    }
}

/// Failure fetching an object from the storage bucket.
#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("failed to fetch s3://{bucket}/{key}: {message}")]
    Fetch {
        bucket: String,
        key: String,
        message: String,
    },

    #[error("failed to read body of s3://{bucket}/{key}: {message}")]
    Read {
        bucket: String,
        key: String,
        message: String,
    },
}

/// An object key that does not decode to valid UTF-8.
#[derive(Debug, Error)]
#[error("object key `{key}` cannot be percent-decoded: {message}")]
pub struct KeyDecodeError {
    pub key: String,
    pub message: String,
}

/// Failure while processing one change event.
#[derive(Debug, Error)]
pub enum EventError {
    #[error(transparent)]
    Decode(#[from] KeyDecodeError),

    #[error(transparent)]
    Fetch(#[from] ObjectStoreError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Failure of a pre-flight step. No event is processed once one of these occurs.
#[derive(Debug, Error)]
pub enum FatalError {
    #[error("Unable to connect to the document API. Please check your internet connection and API configuration.")]
    ApiUnreachable,

    #[error("failed to resolve dataset `{namespace}`: {source}")]
    DatasetResolution {
        namespace: String,
        #[source]
        source: StoreError,
    },

    #[error("failed to load documents of dataset {dataset_id}: {source}")]
    IndexLoad {
        dataset_id: String,
        #[source]
        source: StoreError,
    },
}

/// Missing or unusable runtime configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("required environment variable is not set: {0}")]
    MissingEnvVar(String),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),
}
