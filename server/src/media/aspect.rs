//! Aspect ratio classification for uploaded videos.
//!
//! Buckets a video's width:height ratio into landscape, portrait, or other.
//! The bucket becomes the storage key prefix, so playback clients can request
//! appropriately shaped media without probing the file.

use std::fmt;

/// Tolerance band for nominal 16:9 video (exclusive bounds).
const LANDSCAPE_MIN_RATIO: f64 = 1.6;
const LANDSCAPE_MAX_RATIO: f64 = 1.9;

/// Tolerance band for nominal 9:16 video (exclusive bounds).
const PORTRAIT_MIN_RATIO: f64 = 0.5;
const PORTRAIT_MAX_RATIO: f64 = 0.65;

/// Coarse aspect ratio bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AspectBucket {
    /// Nominal 16:9.
    Landscape,
    /// Nominal 9:16.
    Portrait,
    /// Everything else (square, cinema-wide, odd crops).
    Other,
}

impl AspectBucket {
    /// Storage key prefix for this bucket.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Landscape => "landscape",
            Self::Portrait => "portrait",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for AspectBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// Classify pixel dimensions into an aspect bucket.
///
/// Uses tolerance bands rather than exact fractions because real-world
/// encodes rarely hit 16:9 or 9:16 precisely (anamorphic sources, rounding
/// to even macroblock sizes). Total over all positive dimensions.
#[must_use]
pub fn classify(width: u32, height: u32) -> AspectBucket {
    let ratio = f64::from(width) / f64::from(height);

    if ratio > LANDSCAPE_MIN_RATIO && ratio < LANDSCAPE_MAX_RATIO {
        AspectBucket::Landscape
    } else if ratio > PORTRAIT_MIN_RATIO && ratio < PORTRAIT_MAX_RATIO {
        AspectBucket::Portrait
    } else {
        AspectBucket::Other
    }
}
