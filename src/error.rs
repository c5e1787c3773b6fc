//! Error types for the `reelscan` crate.
//!
//! This module defines [`ReelscanError`], the unified error type returned by
//! all fallible operations in the crate. Only source-level and
//! configuration-level failures surface here: per-sample decode failures are
//! absorbed by the detectors and shorten the analysed range instead.

use std::{io::Error as IoError, path::PathBuf};

use thiserror::Error;

/// Everything that can go wrong in `reelscan`.
///
/// Detectors return it for bad parameters and cancellation; FFmpeg sources
/// return it when a file cannot be opened; reports return it for I/O and
/// JSON failures.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ReelscanError {
    /// Opening or probing a media file failed.
    #[error("Failed to open media file at {path}: {reason}")]
    FileOpen {
        /// Path that was passed to the opener.
        path: PathBuf,
        /// What FFmpeg reported.
        reason: String,
    },

    /// The file has no video stream to analyse.
    #[error("No video stream found in file")]
    NoVideoStream,

    /// The source opened but its metadata makes analysis impossible
    /// (zero dimensions, no usable frame rate).
    #[error("Source unavailable for analysis: {0}")]
    SourceUnavailable(String),

    /// A detector was called with parameters it cannot honour.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A decoded frame could not be converted to RGB.
    #[error("Failed to decode video frame: {0}")]
    VideoDecodeError(String),

    /// Seeking, demuxing or decoding failed inside FFmpeg.
    #[error("FFmpeg error: {0}")]
    FfmpegError(String),

    /// An I/O error occurred while reading or writing a report.
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),

    /// A report could not be serialized or parsed.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// A [`CancellationToken`](crate::CancellationToken) stopped the detector.
    #[error("Operation cancelled")]
    Cancelled,
}

#[cfg(feature = "ffmpeg")]
impl From<ffmpeg_next::Error> for ReelscanError {
    fn from(error: ffmpeg_next::Error) -> Self {
        ReelscanError::FfmpegError(error.to_string())
    }
}
