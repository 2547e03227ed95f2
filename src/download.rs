//! Object retrieval from the storage bucket.
//!
//! [`S3ObjectStore`] is the production [`ObjectStore`]: a thin wrapper around
//! an `aws-sdk-s3` client. Credentials and region come from the standard AWS
//! provider chain (Lambda execution role, env vars, profile).

use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::Client;
use tracing::{debug, error, info};

use crate::contract::ObjectStore;
use crate::error::ObjectStoreError;

#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    client: Client,
}

impl S3ObjectStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from the default AWS configuration chain.
    pub async fn from_env() -> Self {
        let sdk_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        info!(
            region = ?sdk_config.region().map(|r| r.as_ref().to_string()),
            "Initialized S3 client"
        );
        Self::new(Client::new(&sdk_config))
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, ObjectStoreError> {
        debug!(bucket, key, "Fetching object");
        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                let message = DisplayErrorContext(&e).to_string();
                error!(bucket, key, error = %message, "Failed to fetch object");
                ObjectStoreError::Fetch {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                    message,
                }
            })?;

        let body = output.body.collect().await.map_err(|e| {
            error!(bucket, key, error = %e, "Failed to read object body");
            ObjectStoreError::Read {
                bucket: bucket.to_string(),
                key: key.to_string(),
                message: e.to_string(),
            }
        })?;

        let bytes = body.into_bytes().to_vec();
        info!(bucket, key, size = bytes.len(), "Object downloaded");
        Ok(bytes)
    }
}
