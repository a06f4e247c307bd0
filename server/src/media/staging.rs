//! Temp staging for inbound upload streams.
//!
//! Every staged file is wrapped in a [`StagedArtifact`] whose backing
//! [`TempPath`] deletes the file on drop. Normal pipeline exits call
//! [`StagedArtifact::discard`] so removal failures are logged; drop is the
//! backstop for panics and client disconnects mid-copy.

use std::io;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use futures::{Stream, TryStreamExt};
use tempfile::{Builder, TempPath};
use thiserror::Error;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tokio_util::io::StreamReader;

/// Prefix for staged file names, so stray files are attributable.
const STAGING_PREFIX: &str = "reelvault-upload-";

#[derive(Debug, Error)]
pub enum StagingError {
    #[error("Upload exceeds maximum size of {max_bytes} bytes")]
    TooLarge { max_bytes: u64 },
    #[error("Staging I/O failed: {0}")]
    Io(#[from] io::Error),
}

/// A temp file owned exclusively by one upload request.
///
/// The file is removed when the artifact is discarded or dropped.
#[derive(Debug)]
pub struct StagedArtifact {
    path: TempPath,
}

impl StagedArtifact {
    /// Take ownership of an existing file (e.g. remuxer output) so it is
    /// cleaned up like any other staged artifact.
    #[must_use]
    pub fn from_path(path: PathBuf) -> Self {
        Self {
            path: TempPath::from_path(path),
        }
    }

    /// Path to the staged file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the staged file now, logging on failure.
    ///
    /// Removal errors are not surfaced to callers; a leaked temp file must
    /// not mask the real pipeline outcome.
    pub fn discard(self) {
        let path = self.path.to_path_buf();
        if let Err(e) = self.path.close() {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "Failed to remove staged artifact"
            );
        }
    }
}

/// Buffer an inbound byte stream into a fresh temp file under `dir`,
/// enforcing `max_bytes` on the total copied.
///
/// Reads one byte past the cap so an overrun is detectable without trusting
/// a declared length. On any failure the partial file is removed before
/// returning.
pub async fn stage_stream<S, E>(
    dir: &Path,
    stream: S,
    max_bytes: u64,
) -> Result<StagedArtifact, StagingError>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let (std_file, temp_path) = Builder::new()
        .prefix(STAGING_PREFIX)
        .tempfile_in(dir)?
        .into_parts();

    let reader = StreamReader::new(stream.map_err(io::Error::other));
    let limited = reader.take(max_bytes.saturating_add(1));
    futures::pin_mut!(limited);

    let mut writer = BufWriter::new(File::from_std(std_file));
    let copied = tokio::io::copy(&mut limited, &mut writer).await?;
    writer.flush().await?;

    if copied > max_bytes {
        return Err(StagingError::TooLarge { max_bytes });
    }

    Ok(StagedArtifact { path: temp_path })
}
