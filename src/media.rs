//! FFmpeg-backed frame sources.
//!
//! [`MediaSource`] probes a file once and describes it; every
//! [`open_source`](SourceDescriptor::open_source) call opens an independent
//! [`MediaFile`] decode session with its own demuxer, decoder and scaler.
//!
//! A session decodes forward from its cursor and only seeks when a frame
//! behind the cursor, or far ahead of it, is requested. Decode failures are
//! logged and reported as an unavailable frame, which detectors treat as the
//! end of the stream.
//!
//! # Example
//!
//! ```no_run
//! use reelscan::{FrameOutputOptions, MediaSource, SceneSegmenter, SourceDescriptor};
//!
//! // Analyse at 320 px wide; metrics are resolution-independent.
//! let source = MediaSource::open_with_output("movie.mp4", FrameOutputOptions::new().with_width(320))?;
//! let mut session = source.open_source()?;
//! let scenes = SceneSegmenter::new().detect_scenes(&mut session, 600.0, 30.0)?;
//! println!("{} scenes", scenes.len());
//! # Ok::<(), reelscan::ReelscanError>(())
//! ```

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::path::{Path, PathBuf};
use std::time::Duration;

use ffmpeg_next::{
    Error as FfmpegError, Packet, Rational,
    codec::context::Context as CodecContext,
    decoder::Video as VideoDecoder,
    format::{Pixel, context::Input},
    frame::Video as VideoFrame,
    media::Type,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
    util::log::Level,
};
use image::RgbImage;

use crate::{
    configuration::FrameOutputOptions,
    conversion,
    error::ReelscanError,
    metadata::VideoMetadata,
    source::{FrameSource, SourceDescriptor},
};

/// Forward gaps longer than this many seconds are crossed with a seek
/// instead of decoding every frame in between.
const MAX_DECODE_AHEAD_SECONDS: f64 = 10.0;

/// Map a Rust log level filter onto FFmpeg's own console verbosity.
///
/// FFmpeg logs to stderr independently of the `log` facade. `Off` silences
/// it; `Trace` enables everything.
pub fn set_decoder_log_level(level: log::LevelFilter) {
    let level = match level {
        log::LevelFilter::Off => Level::Quiet,
        log::LevelFilter::Error => Level::Error,
        log::LevelFilter::Warn => Level::Warning,
        log::LevelFilter::Info => Level::Info,
        log::LevelFilter::Debug => Level::Debug,
        log::LevelFilter::Trace => Level::Trace,
    };
    ffmpeg_next::util::log::set_level(level);
}

/// An immutable, probed description of a video file.
#[derive(Debug, Clone)]
pub struct MediaSource {
    path: PathBuf,
    metadata: VideoMetadata,
    output: FrameOutputOptions,
}

impl MediaSource {
    /// Probe `path`, failing fast if it cannot be decoded.
    ///
    /// # Errors
    ///
    /// [`ReelscanError::FileOpen`] if the file is missing or unreadable,
    /// [`ReelscanError::NoVideoStream`] if it has no video stream.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ReelscanError> {
        Self::open_with_output(path, FrameOutputOptions::default())
    }

    /// Probe `path`; sessions will scale frames according to `output`.
    ///
    /// # Errors
    ///
    /// As [`open`](MediaSource::open).
    pub fn open_with_output<P: AsRef<Path>>(
        path: P,
        output: FrameOutputOptions,
    ) -> Result<Self, ReelscanError> {
        let probe = MediaFile::open_with_output(path.as_ref(), output)?;
        Ok(Self {
            path: probe.path.clone(),
            metadata: probe.metadata.clone(),
            output,
        })
    }

    /// Path of the described file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SourceDescriptor for MediaSource {
    type Source = MediaFile;

    fn source_metadata(&self) -> &VideoMetadata {
        &self.metadata
    }

    fn open_source(&self) -> Result<Self::Source, ReelscanError> {
        MediaFile::open_with_output(&self.path, self.output)
    }
}

/// A decode session over the best video stream of a file.
pub struct MediaFile {
    path: PathBuf,
    metadata: VideoMetadata,
    input: Input,
    decoder: VideoDecoder,
    scaler: ScalingContext,
    stream_index: usize,
    time_base: Rational,
    output_width: u32,
    output_height: u32,
    /// Frame number the decoder will produce next.
    cursor: u64,
    end_of_stream: bool,
    last_frame: Option<(u64, RgbImage)>,
}

impl Debug for MediaFile {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("MediaFile")
            .field("path", &self.path)
            .field("metadata", &self.metadata)
            .field("output", &(self.output_width, self.output_height))
            .field("cursor", &self.cursor)
            .finish_non_exhaustive()
    }
}

impl MediaFile {
    /// Open a session at source resolution.
    ///
    /// # Errors
    ///
    /// [`ReelscanError::FileOpen`] or [`ReelscanError::NoVideoStream`].
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ReelscanError> {
        Self::open_with_output(path, FrameOutputOptions::default())
    }

    /// Open a session that scales frames according to `output`.
    ///
    /// # Errors
    ///
    /// [`ReelscanError::FileOpen`] or [`ReelscanError::NoVideoStream`].
    pub fn open_with_output<P: AsRef<Path>>(
        path: P,
        output: FrameOutputOptions,
    ) -> Result<Self, ReelscanError> {
        let path = path.as_ref().to_path_buf();
        log::debug!("Opening video: {}", path.display());

        let open_error = |reason: String| ReelscanError::FileOpen {
            path: path.clone(),
            reason,
        };

        ffmpeg_next::init()
            .map_err(|error| open_error(format!("FFmpeg initialisation failed: {error}")))?;
        let input =
            ffmpeg_next::format::input(&path).map_err(|error| open_error(error.to_string()))?;

        let stream = input
            .streams()
            .best(Type::Video)
            .ok_or(ReelscanError::NoVideoStream)?;
        let stream_index = stream.index();
        let time_base = stream.time_base();

        let decoder = CodecContext::from_parameters(stream.parameters())
            .and_then(|context| context.decoder().video())
            .map_err(|error| {
                open_error(format!(
                    "Failed to create video decoder for stream {stream_index}: {error}"
                ))
            })?;

        let frame_rate = stream.avg_frame_rate();
        let frames_per_second = if frame_rate.denominator() != 0 {
            frame_rate.numerator() as f64 / frame_rate.denominator() as f64
        } else {
            let rate = stream.rate();
            if rate.denominator() != 0 {
                rate.numerator() as f64 / rate.denominator() as f64
            } else {
                0.0
            }
        };

        let container_duration = input.duration();
        let duration = if container_duration > 0 {
            Duration::from_micros(container_duration as u64)
        } else if stream.duration() > 0 {
            Duration::from_secs_f64(conversion::pts_to_seconds(stream.duration(), time_base))
        } else {
            Duration::ZERO
        };

        let codec = decoder
            .codec()
            .map(|codec| codec.name().to_string())
            .unwrap_or_else(|| "unknown".to_string());
        let metadata =
            VideoMetadata::new(duration, frames_per_second, decoder.width(), decoder.height())
                .with_codec(codec);

        let (output_width, output_height) =
            output.resolve_dimensions(decoder.width(), decoder.height());
        let scaler = ScalingContext::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            Pixel::RGB24,
            output_width,
            output_height,
            ScalingFlags::BILINEAR,
        )
        .map_err(|error| open_error(format!("Failed to create RGB converter: {error}")))?;

        log::info!(
            "Opened {}: {} {}×{} @ {:.2} fps, {:.1}s (analysing at {}×{})",
            path.display(),
            metadata.codec,
            metadata.width,
            metadata.height,
            metadata.frames_per_second,
            metadata.duration_seconds(),
            output_width,
            output_height
        );

        Ok(Self {
            path,
            metadata,
            input,
            decoder,
            scaler,
            stream_index,
            time_base,
            output_width,
            output_height,
            cursor: 0,
            end_of_stream: false,
            last_frame: None,
        })
    }

    /// Path of the decoded file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size of the frames this session returns, as `(width, height)`.
    pub fn output_dimensions(&self) -> (u32, u32) {
        (self.output_width, self.output_height)
    }

    fn seek_to(&mut self, frame_number: u64) -> Result<(), ReelscanError> {
        let timestamp = conversion::frame_number_to_seek_timestamp(
            frame_number,
            self.metadata.frames_per_second,
        );
        log::trace!("Seeking to frame {frame_number} ({timestamp} µs)");
        self.input.seek(timestamp, ..timestamp)?;
        self.decoder.flush();
        self.end_of_stream = false;
        self.cursor = 0;
        Ok(())
    }

    /// Decode forward until the first frame at or after `target`.
    fn decode_until(&mut self, target: u64) -> Result<Option<RgbImage>, ReelscanError> {
        let mut decoded = VideoFrame::empty();
        loop {
            while self.decoder.receive_frame(&mut decoded).is_ok() {
                let pts = decoded.timestamp().or(decoded.pts()).unwrap_or(0);
                let number = conversion::pts_to_frame_number(
                    pts,
                    self.time_base,
                    self.metadata.frames_per_second,
                );
                self.cursor = number + 1;
                if number >= target {
                    return self.convert(&decoded).map(Some);
                }
            }

            if self.end_of_stream {
                return Ok(None);
            }

            let mut packet = Packet::empty();
            match packet.read(&mut self.input) {
                Ok(()) => {
                    if packet.stream() == self.stream_index {
                        self.decoder.send_packet(&packet)?;
                    }
                }
                Err(FfmpegError::Eof) => {
                    self.decoder.send_eof()?;
                    self.end_of_stream = true;
                }
                Err(error) => return Err(error.into()),
            }
        }
    }

    fn convert(&mut self, decoded: &VideoFrame) -> Result<RgbImage, ReelscanError> {
        let mut rgb = VideoFrame::empty();
        self.scaler.run(decoded, &mut rgb)?;
        let buffer =
            conversion::frame_to_buffer(&rgb, self.output_width, self.output_height, 3);
        RgbImage::from_raw(self.output_width, self.output_height, buffer).ok_or_else(|| {
            ReelscanError::VideoDecodeError("Converted frame has an unexpected size".to_string())
        })
    }
}

impl FrameSource for MediaFile {
    fn metadata(&self) -> &VideoMetadata {
        &self.metadata
    }

    fn frame(&mut self, frame_number: u64) -> Option<RgbImage> {
        if self.metadata.frame_count > 0 && frame_number >= self.metadata.frame_count {
            return None;
        }
        if let Some((cached, image)) = &self.last_frame {
            if *cached == frame_number {
                return Some(image.clone());
            }
        }

        let max_gap = (self.metadata.frames_per_second * MAX_DECODE_AHEAD_SECONDS).max(1.0) as u64;
        if frame_number < self.cursor || frame_number - self.cursor > max_gap {
            if let Err(error) = self.seek_to(frame_number) {
                log::warn!("Seek to frame {frame_number} failed: {error}");
                return None;
            }
        }

        match self.decode_until(frame_number) {
            Ok(Some(image)) => {
                self.last_frame = Some((frame_number, image.clone()));
                Some(image)
            }
            Ok(None) => {
                log::debug!("Stream ended before frame {frame_number}");
                None
            }
            Err(error) => {
                log::warn!("Failed to decode frame {frame_number}: {error}");
                None
            }
        }
    }
}
