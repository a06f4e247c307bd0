//! Server Configuration
//!
//! Loads configuration from environment variables.

use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

/// Default maximum video upload size: 1 GiB.
const DEFAULT_MAX_VIDEO_UPLOAD_SIZE: u64 = 1 << 30;

/// Default maximum thumbnail size: 10 MiB.
const DEFAULT_MAX_THUMBNAIL_SIZE: u64 = 10 << 20;

/// Headroom on top of the payload cap for multipart boundaries and part
/// headers, so the staging-time cap is what actually rejects oversize files.
const MULTIPART_FRAMING_ALLOWANCE: u64 = 1 << 20;

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address (e.g., "0.0.0.0:8080")
    pub bind_address: String,

    /// `SQLite` connection URL (e.g., "sqlite://reelvault.db?mode=rwc")
    pub database_url: String,

    /// JWT signing secret
    pub jwt_secret: String,

    /// JWT access token expiry in seconds (default: 3600 = 1 hour)
    pub jwt_access_expiry: i64,

    /// Directory for locally served assets such as thumbnails (default: "./assets")
    pub assets_root: PathBuf,

    /// Directory for staged upload artifacts (default: the OS temp dir)
    pub staging_dir: PathBuf,

    /// Maximum video upload size in bytes (default: 1 GiB)
    pub max_video_upload_size: u64,

    /// Maximum thumbnail upload size in bytes (default: 10 MiB)
    pub max_thumbnail_size: u64,

    /// S3 bucket name for published videos
    pub s3_bucket: String,

    /// S3 region, used for the published URL (default: "us-east-1")
    pub s3_region: String,

    /// S3-compatible storage endpoint (optional; real AWS when unset)
    pub s3_endpoint: Option<String>,

    /// Path to the ffprobe binary (default: "ffprobe")
    pub ffprobe_path: String,

    /// Path to the ffmpeg binary (default: "ffmpeg")
    pub ffmpeg_path: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            bind_address: env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".into()),
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            jwt_access_expiry: env::var("JWT_ACCESS_EXPIRY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3600),
            assets_root: env::var("ASSETS_ROOT")
                .map_or_else(|_| PathBuf::from("./assets"), PathBuf::from),
            staging_dir: env::var("STAGING_DIR")
                .map_or_else(|_| env::temp_dir(), PathBuf::from),
            max_video_upload_size: env::var("MAX_VIDEO_UPLOAD_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_MAX_VIDEO_UPLOAD_SIZE),
            max_thumbnail_size: env::var("MAX_THUMBNAIL_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_MAX_THUMBNAIL_SIZE),
            s3_bucket: env::var("S3_BUCKET").unwrap_or_else(|_| "reelvault".into()),
            s3_region: env::var("S3_REGION")
                .or_else(|_| env::var("AWS_REGION"))
                .unwrap_or_else(|_| "us-east-1".into()),
            s3_endpoint: env::var("S3_ENDPOINT").ok(),
            ffprobe_path: env::var("FFPROBE_PATH").unwrap_or_else(|_| "ffprobe".into()),
            ffmpeg_path: env::var("FFMPEG_PATH").unwrap_or_else(|_| "ffmpeg".into()),
        })
    }

    /// Check if a custom S3-compatible endpoint is configured.
    #[must_use]
    pub const fn has_custom_endpoint(&self) -> bool {
        self.s3_endpoint.is_some()
    }

    /// The port portion of the bind address, used for locally served asset URLs.
    #[must_use]
    pub fn port(&self) -> &str {
        self.bind_address.rsplit(':').next().unwrap_or("8080")
    }

    /// Request body limit for video uploads: the payload cap plus framing.
    #[must_use]
    pub fn video_body_limit(&self) -> usize {
        usize::try_from(self.max_video_upload_size.saturating_add(MULTIPART_FRAMING_ALLOWANCE))
            .unwrap_or(usize::MAX)
    }

    /// Request body limit for thumbnail uploads: the payload cap plus framing.
    #[must_use]
    pub fn thumbnail_body_limit(&self) -> usize {
        usize::try_from(self.max_thumbnail_size.saturating_add(MULTIPART_FRAMING_ALLOWANCE))
            .unwrap_or(usize::MAX)
    }

    /// Create a default configuration for testing.
    ///
    /// Uses an in-memory `SQLite` database, so tests need no external services.
    #[must_use]
    pub fn default_for_test() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".into(),
            database_url: "sqlite::memory:".into(),
            jwt_secret: "test-secret".into(),
            jwt_access_expiry: 3600,
            assets_root: PathBuf::from("./assets"),
            staging_dir: env::temp_dir(),
            max_video_upload_size: DEFAULT_MAX_VIDEO_UPLOAD_SIZE,
            max_thumbnail_size: DEFAULT_MAX_THUMBNAIL_SIZE,
            s3_bucket: "test-bucket".into(),
            s3_region: "us-east-1".into(),
            s3_endpoint: None,
            ffprobe_path: "ffprobe".into(),
            ffmpeg_path: "ffmpeg".into(),
        }
    }
}
