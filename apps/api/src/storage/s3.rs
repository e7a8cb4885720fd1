use async_trait::async_trait;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;
use tracing::info;

use super::{ObjectStore, ObjectStoreError};
use crate::config::S3Config;

/// Blob storage backed by an S3-compatible bucket (AWS or MinIO).
#[derive(Debug, Clone)]
pub struct S3BlobStore {
    client: Client,
    bucket: String,
}

impl S3BlobStore {
    pub fn new(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    /// Builds a client for MinIO (custom endpoint, path-style) or AWS.
    pub async fn connect(config: &S3Config) -> Self {
        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            "jobtrail-static",
        );

        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials);
        if let Some(endpoint) = &config.endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        let sdk_config = loader.load().await;

        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(config.endpoint.is_some())
            .build();

        Self::new(Client::from_conf(s3_config), config.bucket.clone())
    }

    /// Creates the bucket unless it already exists.
    pub async fn ensure_bucket(&self) -> Result<(), ObjectStoreError> {
        if self
            .client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .is_ok()
        {
            return Ok(());
        }

        match self.client.create_bucket().bucket(&self.bucket).send().await {
            Ok(_) => {
                info!("Created bucket {}", self.bucket);
                Ok(())
            }
            Err(e)
                if e.as_service_error().is_some_and(|se| {
                    se.is_bucket_already_exists() || se.is_bucket_already_owned_by_you()
                }) =>
            {
                Ok(())
            }
            Err(e) => Err(ObjectStoreError::Backend(format!(
                "create bucket {} failed: {}",
                self.bucket,
                DisplayErrorContext(&e)
            ))),
        }
    }
}

#[async_trait]
impl ObjectStore for S3BlobStore {
    async fn put(
        &self,
        key: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<(), ObjectStoreError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(bytes))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| {
                ObjectStoreError::Backend(format!("S3 upload failed: {}", DisplayErrorContext(&e)))
            })?;

        info!("Uploaded s3://{}/{}", self.bucket, key);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Bytes, ObjectStoreError> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().is_some_and(|se| se.is_no_such_key()) {
                    ObjectStoreError::NotFound(key.to_string())
                } else {
                    ObjectStoreError::Backend(format!(
                        "S3 download failed: {}",
                        DisplayErrorContext(&e)
                    ))
                }
            })?;

        let data = output
            .body
            .collect()
            .await
            .map_err(|e| ObjectStoreError::Backend(format!("S3 body read failed: {e}")))?;
        Ok(data.into_bytes())
    }

    async fn delete(&self, key: &str) -> Result<(), ObjectStoreError> {
        // DeleteObject succeeds for missing keys.
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                ObjectStoreError::Backend(format!("S3 delete failed: {}", DisplayErrorContext(&e)))
            })?;
        Ok(())
    }
}
