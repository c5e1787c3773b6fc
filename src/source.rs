//! Frame source capability.
//!
//! Detectors never touch containers or codecs. They pull decoded frames
//! from a [`FrameSource`], a single decode session with its own cursor, and
//! obtain sessions from a [`SourceDescriptor`], an immutable handle on the
//! underlying video that can be shared between threads.
//!
//! Because each detector run opens and owns a fresh session, the three
//! detectors can run concurrently over the same file without sharing any
//! mutable decode state.

use image::RgbImage;

use crate::{conversion, error::ReelscanError, metadata::VideoMetadata};

/// A decode session over one video stream.
///
/// Implementations decode on demand. Detectors request frames with
/// monotonically increasing frame numbers whenever they can, so sessions
/// backed by sequential decoders should decode forward from their current
/// position and only seek on backward or long-distance requests.
pub trait FrameSource {
    /// Metadata of the stream this session decodes.
    fn metadata(&self) -> &VideoMetadata;

    /// Decode the frame with the given number.
    ///
    /// Returns `None` when the frame is unavailable: past the end of the
    /// stream, or the decoder failed at this position. Callers treat both
    /// as end-of-stream.
    fn frame(&mut self, frame_number: u64) -> Option<RgbImage>;

    /// Decode the frame displayed at `seconds` into the stream.
    fn frame_at(&mut self, seconds: f64) -> Option<RgbImage> {
        let frame_number =
            conversion::seconds_to_frame_number(seconds, self.metadata().frames_per_second);
        self.frame(frame_number)
    }

    /// Total duration in seconds.
    fn duration(&self) -> f64 {
        self.metadata().duration_seconds()
    }

    /// Frames per second.
    fn frame_rate(&self) -> f64 {
        self.metadata().frames_per_second
    }

    /// Estimated total number of frames.
    fn frame_count(&self) -> u64 {
        self.metadata().frame_count
    }

    /// Frame dimensions as `(width, height)`.
    fn dimensions(&self) -> (u32, u32) {
        let metadata = self.metadata();
        (metadata.width, metadata.height)
    }
}

impl<S: FrameSource + ?Sized> FrameSource for &mut S {
    fn metadata(&self) -> &VideoMetadata {
        (**self).metadata()
    }

    fn frame(&mut self, frame_number: u64) -> Option<RgbImage> {
        (**self).frame(frame_number)
    }
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn metadata(&self) -> &VideoMetadata {
        (**self).metadata()
    }

    fn frame(&mut self, frame_number: u64) -> Option<RgbImage> {
        (**self).frame(frame_number)
    }
}

/// An immutable description of a video that can open independent
/// [`FrameSource`] sessions.
///
/// Opening a session is the only place where a source-level failure (file
/// missing, unreadable, no video stream) can surface.
pub trait SourceDescriptor: Send + Sync {
    /// The session type produced by [`open_source`](SourceDescriptor::open_source).
    type Source: FrameSource;

    /// Metadata of the described video, available without opening a session.
    fn source_metadata(&self) -> &VideoMetadata;

    /// Open a fresh decode session positioned at the start of the stream.
    fn open_source(&self) -> Result<Self::Source, ReelscanError>;
}
