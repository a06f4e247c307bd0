//! Object store abstraction for published media.
//!
//! Narrow seam over the durable store: put a file, name its public URL.
//! Pipeline tests substitute an in-memory fake; production uses the S3
//! implementation in [`super::s3`].

use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Failed to upload an object.
    #[error("Failed to upload object: {0}")]
    Upload(String),

    /// Store configuration error.
    #[error("Object store configuration error: {0}")]
    Config(String),
}

/// Durable storage for published video objects.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Stream the file at `path` to the store under `key`, declaring
    /// `content_type` on the stored object.
    ///
    /// No retries; a failed call may leave no object or a store-side
    /// incomplete upload, both invisible to callers.
    async fn put_file(&self, key: &str, path: &Path, content_type: &str)
        -> Result<(), StoreError>;

    /// Canonical public retrieval URL for `key`.
    fn public_url(&self, key: &str) -> String;
}
