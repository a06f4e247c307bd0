//! Video ingestion pipeline.
//!
//! Drives one upload from inbound stream to published URL:
//! stage to a temp file, probe dimensions, classify aspect, remux for
//! fast-start playback, upload to the object store, persist the URL.
//!
//! Stages are strictly sequential; each consumes the file the previous one
//! produced. Every staged artifact is removed before the request returns,
//! in reverse order of creation, whether the run succeeds or aborts.

use std::path::PathBuf;
use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::Bytes;
use futures::Stream;
use mime_guess::mime::Mime;
use sqlx::SqlitePool;
use thiserror::Error;
use uuid::Uuid;

use crate::db::{self, Video};

use super::aspect;
use super::keys;
use super::probe::{MediaProber, ProbeError};
use super::remux::{Remuxer, RemuxError};
use super::staging::{stage_stream, StagedArtifact, StagingError};
use super::store::{ObjectStore, StoreError};

/// The single supported inbound container type.
pub const SUPPORTED_VIDEO_TYPE: &str = "video/mp4";

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur while ingesting a video upload.
#[derive(Debug, Error)]
pub enum UploadError {
    /// Video uploads are not configured.
    #[error("Video uploads are not configured")]
    NotConfigured,

    /// Video record not found.
    #[error("Video not found")]
    NotFound,

    /// Requester does not own the target record.
    #[error("Access denied")]
    Forbidden,

    /// No video field provided.
    #[error("No video file provided")]
    NoFile,

    /// Declared content type is not the supported video type.
    #[error("Unsupported content type {mime_type:?} (only video/mp4 is accepted)")]
    InvalidMimeType {
        /// The rejected content type.
        mime_type: String,
    },

    /// Declared content type does not match the file's magic bytes.
    #[error("File content does not match declared type {declared:?}")]
    ContentMismatch {
        /// The content type the client declared.
        declared: String,
    },

    /// Malformed multipart payload.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Upload exceeds the configured maximum size.
    #[error("Upload exceeds maximum size of {max_bytes} bytes")]
    TooLarge {
        /// Maximum allowed size in bytes.
        max_bytes: u64,
    },

    /// Staging the inbound stream failed.
    #[error("Failed to stage upload: {0}")]
    Staging(std::io::Error),

    /// Writing a thumbnail into the local assets directory failed.
    #[error("Failed to store thumbnail")]
    AssetWrite(#[source] std::io::Error),

    /// Probing the staged file failed.
    #[error("Probe failed: {0}")]
    Probe(#[from] ProbeError),

    /// Fast-start remux failed.
    #[error("Remux failed: {0}")]
    Remux(#[from] RemuxError),

    /// Upload to the object store failed.
    #[error("Object store upload failed: {0}")]
    Storage(#[from] StoreError),

    /// The object was stored but the record update failed; the stored
    /// object is orphaned until an external sweep reconciles it.
    #[error("Failed to persist video record")]
    Persist(#[source] sqlx::Error),

    /// Database error before any object was stored.
    #[error("Database error")]
    Database(#[from] sqlx::Error),
}

impl From<StagingError> for UploadError {
    fn from(e: StagingError) -> Self {
        match e {
            StagingError::TooLarge { max_bytes } => Self::TooLarge { max_bytes },
            StagingError::Io(io) => Self::Staging(io),
        }
    }
}

impl IntoResponse for UploadError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            Self::NotConfigured => (
                StatusCode::SERVICE_UNAVAILABLE,
                "STORAGE_NOT_CONFIGURED",
                self.to_string(),
            ),
            Self::NotFound => (StatusCode::NOT_FOUND, "VIDEO_NOT_FOUND", self.to_string()),
            Self::Forbidden => (StatusCode::FORBIDDEN, "FORBIDDEN", self.to_string()),
            Self::NoFile => (StatusCode::BAD_REQUEST, "NO_FILE", self.to_string()),
            Self::InvalidMimeType { .. } | Self::ContentMismatch { .. } => (
                StatusCode::BAD_REQUEST,
                "INVALID_CONTENT_TYPE",
                self.to_string(),
            ),
            Self::Validation(_) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                self.to_string(),
            ),
            Self::TooLarge { .. } => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "PAYLOAD_TOO_LARGE",
                self.to_string(),
            ),
            Self::Staging(_) => (StatusCode::BAD_REQUEST, "STAGING_FAILED", self.to_string()),
            Self::AssetWrite(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "ASSET_WRITE_FAILED",
                self.to_string(),
            ),
            Self::Probe(_) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "PROBE_FAILED",
                self.to_string(),
            ),
            Self::Remux(_) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "REMUX_FAILED",
                self.to_string(),
            ),
            Self::Storage(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "UPLOAD_FAILED",
                "Upload to object store failed".to_string(),
            ),
            Self::Persist(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "PERSIST_FAILED",
                self.to_string(),
            ),
            Self::Database(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "DATABASE_ERROR",
                "Database operation failed".to_string(),
            ),
        };

        let body = Json(serde_json::json!({
            "error": code,
            "message": message,
        }));

        (status, body).into_response()
    }
}

// ============================================================================
// Pipeline State
// ============================================================================

/// Where a pipeline run currently stands.
///
/// The happy path walks the variants in declaration order; `Aborted` is
/// reachable from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Received,
    Validated,
    Staged,
    Probed,
    Classified,
    Remuxed,
    Uploaded,
    Published,
    Aborted,
}

impl PipelineState {
    /// Successor on the happy path. Terminal states have none.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Received => Some(Self::Validated),
            Self::Validated => Some(Self::Staged),
            Self::Staged => Some(Self::Probed),
            Self::Probed => Some(Self::Classified),
            Self::Classified => Some(Self::Remuxed),
            Self::Remuxed => Some(Self::Uploaded),
            Self::Uploaded => Some(Self::Published),
            Self::Published | Self::Aborted => None,
        }
    }

    /// Whether the run can make no further transitions.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Published | Self::Aborted)
    }
}

// ============================================================================
// Pipeline
// ============================================================================

/// Configuration injected into the pipeline at construction.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Directory for staged artifacts.
    pub staging_dir: PathBuf,
    /// Maximum accepted payload size in bytes.
    pub max_upload_bytes: u64,
}

/// One inbound upload, valid for a single pipeline invocation.
pub struct UploadRequest<S> {
    /// Target video record.
    pub video_id: Uuid,
    /// Authenticated principal driving the upload.
    pub owner_id: Uuid,
    /// Content type declared by the client for the payload.
    pub content_type: String,
    /// The payload byte stream.
    pub payload: S,
}

/// Mutable per-run scope: current state plus artifacts pending cleanup.
struct RunScope {
    state: PipelineState,
    staged: Option<StagedArtifact>,
    remuxed: Option<StagedArtifact>,
}

/// Orchestrates the ingestion stages behind narrow tool seams.
pub struct VideoPipeline {
    prober: Arc<dyn MediaProber>,
    remuxer: Arc<dyn Remuxer>,
    store: Arc<dyn ObjectStore>,
    config: PipelineConfig,
}

impl VideoPipeline {
    #[must_use]
    pub fn new(
        prober: Arc<dyn MediaProber>,
        remuxer: Arc<dyn Remuxer>,
        store: Arc<dyn ObjectStore>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            prober,
            remuxer,
            store,
            config,
        }
    }

    /// Run the full pipeline for one upload and return the updated record.
    ///
    /// Cleanup of staged artifacts is unconditional: it happens on success,
    /// on every error, and (via drop) if the future is cancelled mid-run.
    pub async fn run<S, E>(
        &self,
        pool: &SqlitePool,
        request: UploadRequest<S>,
    ) -> Result<Video, UploadError>
    where
        S: Stream<Item = Result<Bytes, E>> + Send,
        E: Into<Box<dyn std::error::Error + Send + Sync>> + Send,
    {
        let video_id = request.video_id;
        let mut scope = RunScope {
            state: PipelineState::Received,
            staged: None,
            remuxed: None,
        };

        let result = self.drive(pool, request, &mut scope).await;

        if result.is_err() && !scope.state.is_terminal() {
            tracing::debug!(
                video_id = %video_id,
                from = ?scope.state,
                "Pipeline aborted"
            );
            scope.state = PipelineState::Aborted;
        }

        // Remove artifacts in reverse order of creation
        for artifact in [scope.remuxed.take(), scope.staged.take()]
            .into_iter()
            .flatten()
        {
            artifact.discard();
        }

        result
    }

    /// The happy-path stage sequence. Artifacts are parked in `scope` the
    /// moment they exist so `run` can clean up no matter where this exits.
    async fn drive<S, E>(
        &self,
        pool: &SqlitePool,
        request: UploadRequest<S>,
        scope: &mut RunScope,
    ) -> Result<Video, UploadError>
    where
        S: Stream<Item = Result<Bytes, E>> + Send,
        E: Into<Box<dyn std::error::Error + Send + Sync>> + Send,
    {
        let video_id = request.video_id;

        // Received -> Validated: ownership and declared content type
        let video = db::find_video_by_id(pool, video_id)
            .await?
            .ok_or(UploadError::NotFound)?;
        if video.user_id != request.owner_id {
            return Err(UploadError::Forbidden);
        }

        let mime: Mime =
            request
                .content_type
                .parse()
                .map_err(|_| UploadError::InvalidMimeType {
                    mime_type: request.content_type.clone(),
                })?;
        if mime.essence_str() != SUPPORTED_VIDEO_TYPE {
            return Err(UploadError::InvalidMimeType {
                mime_type: request.content_type.clone(),
            });
        }
        Self::advance(&mut scope.state, video_id);

        // Validated -> Staged: buffer the stream under the size cap
        let staged = stage_stream(
            &self.config.staging_dir,
            request.payload,
            self.config.max_upload_bytes,
        )
        .await?;
        let staged_path = staged.path().to_path_buf();
        scope.staged = Some(staged);
        Self::advance(&mut scope.state, video_id);

        // Staged -> Probed
        let dims = self.prober.probe(&staged_path).await?;
        Self::advance(&mut scope.state, video_id);

        // Probed -> Classified
        let bucket = aspect::classify(dims.width, dims.height);
        tracing::debug!(
            video_id = %video_id,
            width = dims.width,
            height = dims.height,
            bucket = %bucket,
            "Video classified"
        );
        Self::advance(&mut scope.state, video_id);

        // Classified -> Remuxed: additive, the raw artifact stays valid
        let remuxed_path = self.remuxer.remux(&staged_path).await?;
        scope.remuxed = Some(StagedArtifact::from_path(remuxed_path.clone()));
        Self::advance(&mut scope.state, video_id);

        // Remuxed -> Uploaded
        let key = keys::object_key(bucket, &mime);
        self.store
            .put_file(&key, &remuxed_path, SUPPORTED_VIDEO_TYPE)
            .await?;
        Self::advance(&mut scope.state, video_id);

        // Uploaded -> Published. A failure here orphans the stored object;
        // reconciliation belongs to an external sweep, not this request.
        let url = self.store.public_url(&key);
        let video = db::update_video_url(pool, video_id, &url)
            .await
            .map_err(UploadError::Persist)?;
        Self::advance(&mut scope.state, video_id);

        tracing::info!(video_id = %video_id, url = %url, "Video published");
        Ok(video)
    }

    /// Advance to the next happy-path state, logging the transition.
    fn advance(state: &mut PipelineState, video_id: Uuid) {
        if let Some(next) = state.next() {
            tracing::debug!(
                video_id = %video_id,
                from = ?*state,
                to = ?next,
                "Pipeline state transition"
            );
            *state = next;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::probe::Dimensions;
    use async_trait::async_trait;
    use futures::stream;
    use std::path::Path;
    use std::sync::Mutex;
    use tempfile::TempDir;

    // ========================================================================
    // Fakes
    // ========================================================================

    struct FakeProber {
        result: Result<Dimensions, fn() -> ProbeError>,
    }

    #[async_trait]
    impl MediaProber for FakeProber {
        async fn probe(&self, _path: &Path) -> Result<Dimensions, ProbeError> {
            self.result.map_err(|e| e())
        }
    }

    struct FakeRemuxer {
        fail: bool,
    }

    #[async_trait]
    impl Remuxer for FakeRemuxer {
        async fn remux(&self, input: &Path) -> Result<PathBuf, RemuxError> {
            if self.fail {
                return Err(RemuxError::ToolFailed("moov atom not found".into()));
            }
            let output = PathBuf::from(format!("{}.faststart.mp4", input.display()));
            tokio::fs::copy(input, &output).await?;
            Ok(output)
        }
    }

    #[derive(Default)]
    struct FakeStore {
        uploads: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl ObjectStore for FakeStore {
        async fn put_file(
            &self,
            key: &str,
            _path: &Path,
            _content_type: &str,
        ) -> Result<(), StoreError> {
            if self.fail {
                return Err(StoreError::Upload("connection reset".into()));
            }
            self.uploads.lock().unwrap().push(key.to_string());
            Ok(())
        }

        fn public_url(&self, key: &str) -> String {
            format!("https://bucket.s3.us-east-1.amazonaws.com/{key}")
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    struct Fixture {
        pool: SqlitePool,
        staging: TempDir,
        owner: crate::db::User,
        video: Video,
    }

    async fn fixture() -> Fixture {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        crate::db::run_migrations(&pool).await.unwrap();

        let owner = crate::db::create_user(&pool, "owner@example.com", "hash")
            .await
            .unwrap();
        let video = crate::db::create_video(&pool, owner.id, "test clip", "")
            .await
            .unwrap();

        Fixture {
            pool,
            staging: TempDir::new().unwrap(),
            owner,
            video,
        }
    }

    fn pipeline_with(
        fx: &Fixture,
        prober: FakeProber,
        remuxer: FakeRemuxer,
        store: Arc<FakeStore>,
    ) -> VideoPipeline {
        VideoPipeline::new(
            Arc::new(prober),
            Arc::new(remuxer),
            store,
            PipelineConfig {
                staging_dir: fx.staging.path().to_path_buf(),
                max_upload_bytes: 1024,
            },
        )
    }

    fn landscape_prober() -> FakeProber {
        FakeProber {
            result: Ok(Dimensions {
                width: 1920,
                height: 1080,
            }),
        }
    }

    fn mp4_request(
        video_id: Uuid,
        owner_id: Uuid,
    ) -> UploadRequest<impl Stream<Item = Result<Bytes, std::io::Error>>> {
        UploadRequest {
            video_id,
            owner_id,
            content_type: "video/mp4".to_string(),
            payload: stream::iter(vec![Ok(Bytes::from_static(b"ftypisom fake video"))]),
        }
    }

    fn staging_is_empty(fx: &Fixture) -> bool {
        std::fs::read_dir(fx.staging.path()).unwrap().next().is_none()
    }

    // ========================================================================
    // State machine
    // ========================================================================

    #[test]
    fn test_happy_path_state_order() {
        let expected = [
            PipelineState::Received,
            PipelineState::Validated,
            PipelineState::Staged,
            PipelineState::Probed,
            PipelineState::Classified,
            PipelineState::Remuxed,
            PipelineState::Uploaded,
            PipelineState::Published,
        ];

        let mut state = PipelineState::Received;
        for window in expected.windows(2) {
            assert_eq!(state, window[0]);
            state = state.next().unwrap();
            assert_eq!(state, window[1]);
        }
        assert!(state.is_terminal());
        assert_eq!(state.next(), None);
    }

    #[test]
    fn test_aborted_is_terminal() {
        assert!(PipelineState::Aborted.is_terminal());
        assert_eq!(PipelineState::Aborted.next(), None);
        assert!(!PipelineState::Classified.is_terminal());
    }

    // ========================================================================
    // Pipeline runs
    // ========================================================================

    #[tokio::test]
    async fn test_successful_run_publishes_and_cleans_up() {
        let fx = fixture().await;
        let store = Arc::new(FakeStore::default());
        let pipeline = pipeline_with(
            &fx,
            landscape_prober(),
            FakeRemuxer { fail: false },
            store.clone(),
        );

        let video = pipeline
            .run(&fx.pool, mp4_request(fx.video.id, fx.owner.id))
            .await
            .unwrap();

        let url = video.video_url.expect("video_url should be set");
        assert!(url.contains("/landscape/"));
        assert!(url.ends_with(".mp4"));

        let uploads = store.uploads.lock().unwrap();
        assert_eq!(uploads.len(), 1);
        assert!(uploads[0].starts_with("landscape/"));
        drop(uploads);

        assert!(staging_is_empty(&fx), "all staged artifacts removed");

        // The record in the database carries the same URL
        let stored = crate::db::find_video_by_id(&fx.pool, fx.video.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.video_url.as_deref(), Some(url.as_str()));
    }

    #[tokio::test]
    async fn test_portrait_video_lands_in_portrait_prefix() {
        let fx = fixture().await;
        let store = Arc::new(FakeStore::default());
        let pipeline = pipeline_with(
            &fx,
            FakeProber {
                result: Ok(Dimensions {
                    width: 1080,
                    height: 1920,
                }),
            },
            FakeRemuxer { fail: false },
            store.clone(),
        );

        pipeline
            .run(&fx.pool, mp4_request(fx.video.id, fx.owner.id))
            .await
            .unwrap();

        assert!(store.uploads.lock().unwrap()[0].starts_with("portrait/"));
    }

    #[tokio::test]
    async fn test_wrong_content_type_rejected_before_staging() {
        let fx = fixture().await;
        let store = Arc::new(FakeStore::default());
        let pipeline = pipeline_with(
            &fx,
            landscape_prober(),
            FakeRemuxer { fail: false },
            store.clone(),
        );

        let request = UploadRequest {
            video_id: fx.video.id,
            owner_id: fx.owner.id,
            content_type: "video/webm".to_string(),
            payload: stream::iter(vec![Ok::<_, std::io::Error>(Bytes::from_static(b"x"))]),
        };

        let err = pipeline.run(&fx.pool, request).await.unwrap_err();

        assert!(matches!(err, UploadError::InvalidMimeType { .. }));
        assert!(staging_is_empty(&fx), "no temp file before validation");
        assert!(store.uploads.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_non_owner_rejected_with_no_side_effects() {
        let fx = fixture().await;
        let stranger = crate::db::create_user(&fx.pool, "stranger@example.com", "hash")
            .await
            .unwrap();
        let store = Arc::new(FakeStore::default());
        let pipeline = pipeline_with(
            &fx,
            landscape_prober(),
            FakeRemuxer { fail: false },
            store.clone(),
        );

        let err = pipeline
            .run(&fx.pool, mp4_request(fx.video.id, stranger.id))
            .await
            .unwrap_err();

        assert!(matches!(err, UploadError::Forbidden));
        assert!(staging_is_empty(&fx));
        assert!(store.uploads.lock().unwrap().is_empty());

        let stored = crate::db::find_video_by_id(&fx.pool, fx.video.id)
            .await
            .unwrap()
            .unwrap();
        assert!(stored.video_url.is_none(), "record must be untouched");
    }

    #[tokio::test]
    async fn test_unknown_video_is_not_found() {
        let fx = fixture().await;
        let store = Arc::new(FakeStore::default());
        let pipeline = pipeline_with(
            &fx,
            landscape_prober(),
            FakeRemuxer { fail: false },
            store,
        );

        let err = pipeline
            .run(&fx.pool, mp4_request(Uuid::now_v7(), fx.owner.id))
            .await
            .unwrap_err();

        assert!(matches!(err, UploadError::NotFound));
    }

    #[tokio::test]
    async fn test_oversize_payload_rejected_and_cleaned_up() {
        let fx = fixture().await;
        let store = Arc::new(FakeStore::default());
        let pipeline = VideoPipeline::new(
            Arc::new(landscape_prober()),
            Arc::new(FakeRemuxer { fail: false }),
            store.clone(),
            PipelineConfig {
                staging_dir: fx.staging.path().to_path_buf(),
                max_upload_bytes: 4,
            },
        );

        let err = pipeline
            .run(&fx.pool, mp4_request(fx.video.id, fx.owner.id))
            .await
            .unwrap_err();

        assert!(matches!(err, UploadError::TooLarge { max_bytes: 4 }));
        assert!(staging_is_empty(&fx), "oversize staging must leave no file");
        assert!(store.uploads.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_probe_failure_aborts_before_remux() {
        let fx = fixture().await;
        let store = Arc::new(FakeStore::default());
        let pipeline = pipeline_with(
            &fx,
            FakeProber {
                result: Err(|| ProbeError::ZeroDimensions),
            },
            // A failing remuxer proves remux is never reached
            FakeRemuxer { fail: true },
            store.clone(),
        );

        let err = pipeline
            .run(&fx.pool, mp4_request(fx.video.id, fx.owner.id))
            .await
            .unwrap_err();

        assert!(matches!(err, UploadError::Probe(_)));
        assert!(staging_is_empty(&fx));
        assert!(store.uploads.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remux_failure_cleans_up_raw_artifact() {
        let fx = fixture().await;
        let store = Arc::new(FakeStore::default());
        let pipeline = pipeline_with(
            &fx,
            landscape_prober(),
            FakeRemuxer { fail: true },
            store.clone(),
        );

        let err = pipeline
            .run(&fx.pool, mp4_request(fx.video.id, fx.owner.id))
            .await
            .unwrap_err();

        assert!(matches!(err, UploadError::Remux(_)));
        assert!(staging_is_empty(&fx));
        assert!(store.uploads.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_store_failure_cleans_up_both_artifacts() {
        let fx = fixture().await;
        let store = Arc::new(FakeStore {
            fail: true,
            ..FakeStore::default()
        });
        let pipeline = pipeline_with(
            &fx,
            landscape_prober(),
            FakeRemuxer { fail: false },
            store,
        );

        let err = pipeline
            .run(&fx.pool, mp4_request(fx.video.id, fx.owner.id))
            .await
            .unwrap_err();

        assert!(matches!(err, UploadError::Storage(_)));
        assert!(
            staging_is_empty(&fx),
            "raw and remuxed artifacts both removed"
        );

        let stored = crate::db::find_video_by_id(&fx.pool, fx.video.id)
            .await
            .unwrap()
            .unwrap();
        assert!(stored.video_url.is_none());
    }
}
