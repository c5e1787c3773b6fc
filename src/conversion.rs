//! Internal utility functions.
//!
//! Helpers for timestamp conversion, pixel-data copying, and other shared
//! logic that does not belong in any single public module.

/// Tolerance applied before flooring `seconds × fps`, so that sample times
/// computed by repeated float arithmetic land on the intended frame.
const FRAME_EPSILON: f64 = 1e-6;

/// Convert a timestamp in seconds to a frame number using the video's
/// frame rate. Negative timestamps map to frame 0.
pub(crate) fn seconds_to_frame_number(seconds: f64, frames_per_second: f64) -> u64 {
    if seconds <= 0.0 || frames_per_second <= 0.0 {
        return 0;
    }
    (seconds * frames_per_second + FRAME_EPSILON).floor() as u64
}

/// Convert a frame number back to its timestamp in seconds.
pub(crate) fn frame_number_to_seconds(frame_number: u64, frames_per_second: f64) -> f64 {
    if frames_per_second <= 0.0 {
        return 0.0;
    }
    frame_number as f64 / frames_per_second
}

/// Number of samples taken at `interval` cadence over `[start, end)`.
pub(crate) fn sample_count(start: f64, end: f64, interval: f64) -> u64 {
    if end <= start || interval <= 0.0 {
        return 0;
    }
    ((end - start) / interval - FRAME_EPSILON).floor() as u64 + 1
}

/// Number of complete `length`-second windows that fit in `[0, span]`.
pub(crate) fn whole_window_count(span: f64, length: f64) -> u64 {
    if span <= 0.0 || length <= 0.0 {
        return 0;
    }
    (span / length + FRAME_EPSILON).floor() as u64
}

/// Format a timestamp in seconds as `m:ss`.
///
/// Minutes are not wrapped into hours, matching how editors label long
/// timelines (`95:07`).
///
/// # Example
///
/// ```
/// assert_eq!(reelscan::format_timestamp(0.0), "0:00");
/// assert_eq!(reelscan::format_timestamp(75.9), "1:15");
/// assert_eq!(reelscan::format_timestamp(5707.0), "95:07");
/// ```
pub fn format_timestamp(seconds: f64) -> String {
    let whole = seconds.max(0.0) as u64;
    format!("{}:{:02}", whole / 60, whole % 60)
}

#[cfg(feature = "ffmpeg")]
pub(crate) use self::stream::*;

#[cfg(feature = "ffmpeg")]
mod stream {
    use ffmpeg_next::{Rational, frame::Video as VideoFrame};

    /// Copy pixel data from an FFmpeg video frame into a tightly-packed buffer.
    ///
    /// `bytes_per_pixel` is the number of bytes per pixel for the output
    /// format (3 for RGB24).
    pub(crate) fn frame_to_buffer(
        video_frame: &VideoFrame,
        width: u32,
        height: u32,
        bytes_per_pixel: usize,
    ) -> Vec<u8> {
        let stride = video_frame.stride(0);
        let expected_stride = (width as usize) * bytes_per_pixel;
        let data = video_frame.data(0);

        if stride == expected_stride {
            data[..expected_stride * (height as usize)].to_vec()
        } else {
            let mut buffer = Vec::with_capacity(expected_stride * (height as usize));
            for row in 0..(height as usize) {
                let row_start = row * stride;
                buffer.extend_from_slice(&data[row_start..row_start + expected_stride]);
            }
            buffer
        }
    }

    /// Rescale a PTS value from stream time base to seconds.
    pub(crate) fn pts_to_seconds(pts: i64, time_base: Rational) -> f64 {
        pts as f64 * time_base.numerator() as f64 / time_base.denominator() as f64
    }

    /// Rescale a PTS value to a frame number, clamping pre-roll to frame 0.
    pub(crate) fn pts_to_frame_number(pts: i64, time_base: Rational, frames_per_second: f64) -> u64 {
        let seconds = pts_to_seconds(pts, time_base).max(0.0);
        (seconds * frames_per_second + super::FRAME_EPSILON).floor() as u64
    }

    /// Convert a frame number to a seek timestamp in AV_TIME_BASE
    /// (microseconds), as expected by `Input::seek`.
    pub(crate) fn frame_number_to_seek_timestamp(frame_number: u64, frames_per_second: f64) -> i64 {
        let seconds = super::frame_number_to_seconds(frame_number, frames_per_second);
        (seconds * 1_000_000.0) as i64
    }
}
