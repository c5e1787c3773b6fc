//! Generated in-memory video.
//!
//! [`SyntheticVideo`] renders each frame from a closure of its timestamp. It
//! implements both [`FrameSource`] and [`SourceDescriptor`], which makes it
//! the reference source for tests, benchmarks and examples that should not
//! depend on FFmpeg or fixture files.
//!
//! # Example
//!
//! ```
//! use image::{Rgb, RgbImage};
//! use reelscan::{FrameSource, SyntheticVideo};
//!
//! // Two shots: dark grey for 10 seconds, then white.
//! let mut video = SyntheticVideo::new(20.0, 25.0, 64, 36, |seconds| {
//!     let level = if seconds < 10.0 { 40 } else { 255 };
//!     RgbImage::from_pixel(64, 36, Rgb([level, level, level]))
//! });
//!
//! assert_eq!(video.frame_count(), 500);
//! assert!(video.frame_at(12.0).is_some());
//! assert!(video.frame_at(20.0).is_none());
//! ```

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::Arc;
use std::time::Duration;

use image::{Rgb, RgbImage};

use crate::{
    conversion,
    error::ReelscanError,
    metadata::VideoMetadata,
    source::{FrameSource, SourceDescriptor},
};

type FrameGenerator = dyn Fn(f64) -> RgbImage + Send + Sync;

/// A video whose frames are produced by a generator closure.
///
/// Cloning is cheap: clones share the generator.
#[derive(Clone)]
pub struct SyntheticVideo {
    metadata: VideoMetadata,
    generator: Arc<FrameGenerator>,
    unavailable_after: Option<f64>,
}

impl Debug for SyntheticVideo {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("SyntheticVideo")
            .field("metadata", &self.metadata)
            .field("unavailable_after", &self.unavailable_after)
            .finish_non_exhaustive()
    }
}

impl SyntheticVideo {
    /// Create a video of `duration_seconds` at `frames_per_second`, where
    /// every frame is `generator(timestamp_in_seconds)`.
    ///
    /// The generator should return images of `width × height`. A negative,
    /// NaN or unrepresentable duration gives an empty video.
    pub fn new<F>(
        duration_seconds: f64,
        frames_per_second: f64,
        width: u32,
        height: u32,
        generator: F,
    ) -> Self
    where
        F: Fn(f64) -> RgbImage + Send + Sync + 'static,
    {
        let duration = Duration::try_from_secs_f64(duration_seconds).unwrap_or(Duration::ZERO);
        Self {
            metadata: VideoMetadata::new(duration, frames_per_second, width, height)
                .with_codec("synthetic"),
            generator: Arc::new(generator),
            unavailable_after: None,
        }
    }

    /// A video that shows a single solid colour for its whole duration.
    pub fn solid(
        duration_seconds: f64,
        frames_per_second: f64,
        width: u32,
        height: u32,
        color: [u8; 3],
    ) -> Self {
        Self::new(duration_seconds, frames_per_second, width, height, move |_| {
            RgbImage::from_pixel(width, height, Rgb(color))
        })
    }

    /// A video made of consecutive solid-colour shots.
    ///
    /// Each entry is `(shot_end_seconds, color)`; shots must be given in
    /// time order. Timestamps past the last shot end reuse the last colour.
    pub fn shots(
        frames_per_second: f64,
        width: u32,
        height: u32,
        shots: &[(f64, [u8; 3])],
    ) -> Self {
        let shots: Vec<(f64, [u8; 3])> = shots.to_vec();
        let duration = shots.last().map(|&(end, _)| end).unwrap_or(0.0);
        Self::new(duration, frames_per_second, width, height, move |seconds| {
            let color = shots
                .iter()
                .find(|&&(end, _)| seconds < end)
                .or(shots.last())
                .map(|&(_, color)| color)
                .unwrap_or([0, 0, 0]);
            RgbImage::from_pixel(width, height, Rgb(color))
        })
    }

    /// Make every frame at or after `seconds` unavailable, as if the decoder
    /// failed there. Metadata still reports the full duration.
    #[must_use]
    pub fn unavailable_after(mut self, seconds: f64) -> Self {
        self.unavailable_after = Some(seconds);
        self
    }
}

impl FrameSource for SyntheticVideo {
    fn metadata(&self) -> &VideoMetadata {
        &self.metadata
    }

    fn frame(&mut self, frame_number: u64) -> Option<RgbImage> {
        if frame_number >= self.metadata.frame_count {
            return None;
        }
        let seconds =
            conversion::frame_number_to_seconds(frame_number, self.metadata.frames_per_second);
        if self.unavailable_after.is_some_and(|limit| seconds >= limit) {
            log::trace!("Synthetic frame {frame_number} ({seconds:.3}s) marked unavailable");
            return None;
        }
        Some((self.generator)(seconds))
    }
}

impl SourceDescriptor for SyntheticVideo {
    type Source = SyntheticVideo;

    fn source_metadata(&self) -> &VideoMetadata {
        &self.metadata
    }

    fn open_source(&self) -> Result<Self::Source, ReelscanError> {
        Ok(self.clone())
    }
}
