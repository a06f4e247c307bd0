//! S3 Object Store
//!
//! Handles S3-compatible storage for published videos.
//! Supports any S3-compatible backend: AWS S3, MinIO, Backblaze B2, Cloudflare R2.

use std::path::Path;

use async_trait::async_trait;
use aws_config::Region;
use aws_sdk_s3::{
    config::{Credentials, IdentityCache, SharedCredentialsProvider, StalledStreamProtectionConfig},
    primitives::ByteStream,
    Client,
};
use tracing::info;

use crate::config::Config;

use super::store::{ObjectStore, StoreError};

/// S3-backed [`ObjectStore`].
#[derive(Clone)]
pub struct S3ObjectStore {
    client: Client,
    bucket: String,
    region: String,
    endpoint: Option<String>,
}

impl S3ObjectStore {
    /// Create a new S3 store from configuration.
    ///
    /// Supports custom endpoints for S3-compatible backends (MinIO, R2, B2).
    /// Uses path-style addressing when a custom endpoint is configured.
    pub fn new(config: &Config) -> Self {
        let mut s3_config_builder = aws_sdk_s3::Config::builder()
            .region(Region::new(config.s3_region.clone()))
            .stalled_stream_protection(StalledStreamProtectionConfig::disabled())
            .identity_cache(IdentityCache::no_cache());

        // Configure credentials from environment
        if let (Ok(access_key), Ok(secret_key)) = (
            std::env::var("AWS_ACCESS_KEY_ID"),
            std::env::var("AWS_SECRET_ACCESS_KEY"),
        ) {
            let credentials = Credentials::new(
                access_key,
                secret_key,
                None, // session token
                None, // expiry
                "environment",
            );
            s3_config_builder =
                s3_config_builder.credentials_provider(SharedCredentialsProvider::new(credentials));
        }

        // Configure custom endpoint for S3-compatible backends
        if let Some(endpoint) = &config.s3_endpoint {
            s3_config_builder = s3_config_builder
                .endpoint_url(endpoint)
                .force_path_style(true); // Required for MinIO and most S3-compatible backends
        }

        let client = Client::from_conf(s3_config_builder.build());

        info!(
            bucket = %config.s3_bucket,
            region = %config.s3_region,
            endpoint = ?config.s3_endpoint,
            "S3 object store initialized"
        );

        Self {
            client,
            bucket: config.s3_bucket.clone(),
            region: config.s3_region.clone(),
            endpoint: config.s3_endpoint.clone(),
        }
    }

    /// Check if the bucket is accessible (health check).
    pub async fn health_check(&self) -> Result<(), StoreError> {
        self.client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(|e| StoreError::Config(format!("Bucket not accessible: {e}")))?;

        Ok(())
    }

    /// Get the bucket name.
    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put_file(
        &self,
        key: &str,
        path: &Path,
        content_type: &str,
    ) -> Result<(), StoreError> {
        // Stream straight from disk; video files are too large to buffer
        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| StoreError::Upload(e.to_string()))?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body)
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StoreError::Upload(e.to_string()))?;

        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        match &self.endpoint {
            // Path-style for S3-compatible backends
            Some(endpoint) => format!("{}/{}/{}", endpoint.trim_end_matches('/'), self.bucket, key),
            // Virtual-hosted style for real AWS
            None => format!(
                "https://{}.s3.{}.amazonaws.com/{}",
                self.bucket, self.region, key
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_url_aws_virtual_hosted() {
        let store = S3ObjectStore::new(&Config {
            s3_bucket: "reelvault-media".into(),
            s3_region: "eu-west-2".into(),
            s3_endpoint: None,
            ..Config::default_for_test()
        });

        assert_eq!(
            store.public_url("landscape/abc123.mp4"),
            "https://reelvault-media.s3.eu-west-2.amazonaws.com/landscape/abc123.mp4"
        );
    }

    #[test]
    fn test_public_url_custom_endpoint_path_style() {
        let store = S3ObjectStore::new(&Config {
            s3_bucket: "reelvault-media".into(),
            s3_endpoint: Some("http://localhost:9000/".into()),
            ..Config::default_for_test()
        });

        assert_eq!(
            store.public_url("portrait/xyz.mp4"),
            "http://localhost:9000/reelvault-media/portrait/xyz.mp4"
        );
    }
}
