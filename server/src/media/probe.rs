//! Media probing via an external ffprobe invocation.
//!
//! The prober is behind a trait so the pipeline can be tested with
//! deterministic fakes instead of a real ffprobe binary.

use std::io;
use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tokio::process::Command;

/// Pixel dimensions of the primary video stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("Failed to invoke probe tool: {0}")]
    Spawn(#[from] io::Error),
    #[error("Probe tool exited with an error: {0}")]
    ToolFailed(String),
    #[error("Probe output could not be parsed: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("No video stream found")]
    NoVideoStream,
    #[error("Video stream reports zero dimensions")]
    ZeroDimensions,
}

/// Extracts structural properties from a staged video file.
#[async_trait]
pub trait MediaProber: Send + Sync {
    /// Probe the file at `path` and return the primary video stream's
    /// pixel dimensions.
    async fn probe(&self, path: &Path) -> Result<Dimensions, ProbeError>;
}

/// [`MediaProber`] backed by the ffprobe command-line tool.
#[derive(Debug, Clone)]
pub struct FfprobeProber {
    ffprobe_bin: String,
}

impl FfprobeProber {
    #[must_use]
    pub fn new(ffprobe_bin: impl Into<String>) -> Self {
        Self {
            ffprobe_bin: ffprobe_bin.into(),
        }
    }
}

#[async_trait]
impl MediaProber for FfprobeProber {
    async fn probe(&self, path: &Path) -> Result<Dimensions, ProbeError> {
        let output = Command::new(&self.ffprobe_bin)
            .args(["-v", "error", "-print_format", "json", "-show_streams"])
            .arg(path)
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ProbeError::ToolFailed(stderr.trim().to_string()));
        }

        parse_dimensions(&output.stdout)
    }
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
}

/// Parse ffprobe's JSON stream listing and pick out the first video stream.
fn parse_dimensions(stdout: &[u8]) -> Result<Dimensions, ProbeError> {
    let parsed: FfprobeOutput = serde_json::from_slice(stdout)?;

    let stream = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or(ProbeError::NoVideoStream)?;

    let width = stream.width.unwrap_or(0);
    let height = stream.height.unwrap_or(0);
    if width == 0 || height == 0 {
        return Err(ProbeError::ZeroDimensions);
    }

    Ok(Dimensions { width, height })
}
