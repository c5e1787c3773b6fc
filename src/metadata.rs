//! Video metadata.
//!
//! [`VideoMetadata`] is what every [`FrameSource`](crate::FrameSource)
//! exposes about the stream it decodes. It is read once when a source is
//! opened and never changes afterwards.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Metadata for the analysed video stream.
///
/// # Example
///
/// ```
/// use std::time::Duration;
///
/// use reelscan::VideoMetadata;
///
/// let metadata = VideoMetadata::new(Duration::from_secs(120), 25.0, 320, 180);
/// assert_eq!(metadata.frame_count, 3000);
/// assert_eq!(metadata.duration_seconds(), 120.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[must_use]
pub struct VideoMetadata {
    /// Total duration of the stream.
    pub duration: Duration,
    /// Coded width in pixels.
    pub width: u32,
    /// Coded height in pixels.
    pub height: u32,
    /// Average frame rate. Timestamps are mapped to frames with it.
    pub frames_per_second: f64,
    /// `duration × frames_per_second`, truncated. Frames at or past it are
    /// never requested.
    pub frame_count: u64,
    /// Codec name (e.g. `"h264"`), or `"synthetic"` for generated sources.
    pub codec: String,
}

impl VideoMetadata {
    /// Build metadata from duration, frame rate and dimensions.
    ///
    /// The frame count is derived as `duration × fps`, truncated.
    pub fn new(duration: Duration, frames_per_second: f64, width: u32, height: u32) -> Self {
        let frame_count = if frames_per_second > 0.0 {
            (duration.as_secs_f64() * frames_per_second) as u64
        } else {
            0
        };
        Self {
            duration,
            width,
            height,
            frames_per_second,
            frame_count,
            codec: "unknown".to_string(),
        }
    }

    /// Set the codec name.
    pub fn with_codec(mut self, codec: impl Into<String>) -> Self {
        self.codec = codec.into();
        self
    }

    /// Total duration in seconds.
    pub fn duration_seconds(&self) -> f64 {
        self.duration.as_secs_f64()
    }
}
