//! Reusable test helpers for HTTP integration tests.
//!
//! Provides `TestApp` for building and sending requests through the full
//! axum router, with fake media tools injected through the pipeline seams so
//! no ffprobe, ffmpeg, or S3 access is needed.
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{self, Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

use rv_server::api::{create_router, AppState};
use rv_server::auth::jwt;
use rv_server::config::Config;
use rv_server::db::{self, User, Video};
use rv_server::media::probe::{Dimensions, MediaProber, ProbeError};
use rv_server::media::remux::{RemuxError, Remuxer};
use rv_server::media::store::{ObjectStore, StoreError};
use rv_server::media::{PipelineConfig, VideoPipeline};

// ============================================================================
// Fake media tools
// ============================================================================

/// Prober fake returning a fixed result.
pub struct StubProber {
    pub result: Result<Dimensions, fn() -> ProbeError>,
}

#[async_trait]
impl MediaProber for StubProber {
    async fn probe(&self, _path: &Path) -> Result<Dimensions, ProbeError> {
        self.result.map_err(|e| e())
    }
}

/// Remuxer fake that copies the input instead of invoking ffmpeg.
pub struct CopyRemuxer {
    pub fail: bool,
}

#[async_trait]
impl Remuxer for CopyRemuxer {
    async fn remux(&self, input: &Path) -> Result<PathBuf, RemuxError> {
        if self.fail {
            return Err(RemuxError::ToolFailed("moov atom not found".into()));
        }
        let output = PathBuf::from(format!("{}.faststart.mp4", input.display()));
        tokio::fs::copy(input, &output).await?;
        Ok(output)
    }
}

/// Object store fake that records uploaded keys and serves AWS-shaped URLs.
#[derive(Default)]
pub struct RecordingStore {
    pub fail: bool,
    uploads: Mutex<Vec<String>>,
}

impl RecordingStore {
    /// Keys uploaded so far, in order.
    pub fn uploaded_keys(&self) -> Vec<String> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStore for RecordingStore {
    async fn put_file(
        &self,
        key: &str,
        path: &Path,
        _content_type: &str,
    ) -> Result<(), StoreError> {
        if self.fail {
            return Err(StoreError::Upload("connection reset".into()));
        }
        assert!(path.exists(), "uploaded artifact should exist on disk");
        self.uploads.lock().unwrap().push(key.to_string());
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("https://test-bucket.s3.us-east-1.amazonaws.com/{key}")
    }
}

// ============================================================================
// Test App
// ============================================================================

/// Knobs for building a [`TestApp`] with specific behavior.
pub struct TestAppOptions {
    /// Probe result handed to the pipeline.
    pub probe: Result<Dimensions, fn() -> ProbeError>,
    /// Whether the remuxer fails.
    pub remux_fails: bool,
    /// Whether the object store rejects uploads.
    pub store_fails: bool,
    /// Whether a pipeline is configured at all.
    pub pipeline: bool,
    /// Video payload cap in bytes.
    pub max_video_upload_size: u64,
    /// Thumbnail payload cap in bytes.
    pub max_thumbnail_size: u64,
}

impl Default for TestAppOptions {
    fn default() -> Self {
        Self {
            probe: Ok(Dimensions {
                width: 1920,
                height: 1080,
            }),
            remux_fails: false,
            store_fails: false,
            pipeline: true,
            max_video_upload_size: 1 << 20,
            max_thumbnail_size: 1 << 20,
        }
    }
}

/// A test application wrapping the full axum router.
///
/// Holds the temp directories backing staging and assets so they live as
/// long as the test and vanish afterwards.
pub struct TestApp {
    pub router: Router,
    pub pool: SqlitePool,
    pub config: Arc<Config>,
    pub store: Arc<RecordingStore>,
    pub staging: TempDir,
    pub assets: TempDir,
}

impl TestApp {
    /// Create a test app with default options: happy-path fakes, 16:9 probe.
    pub async fn new() -> Self {
        Self::with_options(TestAppOptions::default()).await
    }

    /// Create a test app with the given options.
    pub async fn with_options(options: TestAppOptions) -> Self {
        let staging = TempDir::new().expect("Failed to create staging dir");
        let assets = TempDir::new().expect("Failed to create assets dir");

        let config = Config {
            staging_dir: staging.path().to_path_buf(),
            assets_root: assets.path().to_path_buf(),
            max_video_upload_size: options.max_video_upload_size,
            max_thumbnail_size: options.max_thumbnail_size,
            ..Config::default_for_test()
        };

        // In-memory SQLite lives and dies with its connection, so the pool
        // must hold exactly one.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(&config.database_url)
            .await
            .expect("Failed to open in-memory database");
        db::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let store = Arc::new(RecordingStore {
            fail: options.store_fails,
            ..RecordingStore::default()
        });

        let pipeline = options.pipeline.then(|| {
            VideoPipeline::new(
                Arc::new(StubProber {
                    result: options.probe,
                }),
                Arc::new(CopyRemuxer {
                    fail: options.remux_fails,
                }),
                store.clone(),
                PipelineConfig {
                    staging_dir: config.staging_dir.clone(),
                    max_upload_bytes: config.max_video_upload_size,
                },
            )
        });

        let state = AppState::new(pool.clone(), config.clone(), pipeline);
        let router = create_router(state);

        Self {
            router,
            pool,
            config: Arc::new(config),
            store,
            staging,
            assets,
        }
    }

    /// Build an HTTP request with the given method and URI.
    pub fn request(method: Method, uri: &str) -> http::request::Builder {
        Request::builder().method(method).uri(uri)
    }

    /// Send a request through the router via `tower::ServiceExt::oneshot`.
    pub async fn oneshot(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("oneshot request failed")
    }

    /// Whether the staging directory currently holds any file.
    pub fn staging_is_empty(&self) -> bool {
        std::fs::read_dir(self.staging.path())
            .expect("Failed to read staging dir")
            .next()
            .is_none()
    }
}

// ============================================================================
// User & Auth helpers
// ============================================================================

/// Create a test user with a unique email.
pub async fn create_test_user(pool: &SqlitePool) -> User {
    let email = format!("user-{}@example.com", Uuid::now_v7().simple());
    db::create_user(pool, &email, "not-a-real-hash")
        .await
        .expect("Failed to create test user")
}

/// Create a draft video record owned by `owner_id`.
pub async fn create_test_video(pool: &SqlitePool, owner_id: Uuid) -> Video {
    db::create_video(pool, owner_id, "Test clip", "Integration test fixture")
        .await
        .expect("Failed to create test video")
}

/// Generate an access token for the given user.
pub fn generate_access_token(config: &Config, user_id: Uuid) -> String {
    jwt::generate_access_token(user_id, &config.jwt_secret, config.jwt_access_expiry)
        .expect("Failed to generate access token")
}

// ============================================================================
// Request body helpers
// ============================================================================

/// Boundary used by [`multipart_body`].
pub const MULTIPART_BOUNDARY: &str = "reelvault-test-boundary";

/// Content-Type header value matching [`multipart_body`].
pub fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={MULTIPART_BOUNDARY}")
}

/// Build a multipart body with a single file field.
pub fn multipart_body(field: &str, filename: &str, content_type: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{MULTIPART_BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n")
            .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{MULTIPART_BOUNDARY}--\r\n").as_bytes());
    body
}

/// Collect a response body and parse it as JSON.
pub async fn body_to_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("Failed to collect response body")
        .to_bytes();
    serde_json::from_slice(&bytes).unwrap_or_else(|e| {
        let preview = String::from_utf8_lossy(&bytes);
        panic!("Failed to parse response as JSON: {e}\nBody: {preview}")
    })
}
