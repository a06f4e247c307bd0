//! Fast-start remuxing via an external ffmpeg invocation.
//!
//! Rewrites the container so the moov atom precedes the media data, letting
//! playback begin before the full file downloads. Streams are copied
//! verbatim; nothing is re-encoded. Behind a trait for the same reason as
//! the prober: pipeline tests substitute fakes.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;

#[derive(Debug, Error)]
pub enum RemuxError {
    #[error("Failed to invoke remux tool: {0}")]
    Spawn(#[from] io::Error),
    #[error("Remux tool exited with an error: {0}")]
    ToolFailed(String),
}

/// Produces a playback-optimized copy of a staged video file.
#[async_trait]
pub trait Remuxer: Send + Sync {
    /// Remux the file at `input` into a new fast-start file and return its
    /// path. The input file is left untouched.
    async fn remux(&self, input: &Path) -> Result<PathBuf, RemuxError>;
}

/// [`Remuxer`] backed by the ffmpeg command-line tool.
#[derive(Debug, Clone)]
pub struct FfmpegRemuxer {
    ffmpeg_bin: String,
}

impl FfmpegRemuxer {
    #[must_use]
    pub fn new(ffmpeg_bin: impl Into<String>) -> Self {
        Self {
            ffmpeg_bin: ffmpeg_bin.into(),
        }
    }
}

/// Output path derived from the input path. Staged inputs have per-request
/// random names, so the derived path cannot collide across requests.
fn derive_output_path(input: &Path) -> PathBuf {
    PathBuf::from(format!("{}.faststart.mp4", input.display()))
}

#[async_trait]
impl Remuxer for FfmpegRemuxer {
    async fn remux(&self, input: &Path) -> Result<PathBuf, RemuxError> {
        let output_path = derive_output_path(input);

        let output = Command::new(&self.ffmpeg_bin)
            .arg("-i")
            .arg(input)
            .args(["-c", "copy", "-movflags", "faststart", "-f", "mp4"])
            .arg(&output_path)
            .output()
            .await?;

        if !output.status.success() {
            // ffmpeg may leave a partial output file behind on failure
            let _ = tokio::fs::remove_file(&output_path).await;
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RemuxError::ToolFailed(stderr.trim().to_string()));
        }

        Ok(output_path)
    }
}
