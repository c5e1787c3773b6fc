//! Scene segmentation.
//!
//! [`SceneSegmenter`] samples the video at a fixed cadence (one frame per
//! second by default) and cuts whenever the mean absolute luma difference
//! between two consecutive samples exceeds a caller-supplied threshold. The
//! resulting [`Scene`]s are gapless and ordered: the first starts at 0, each
//! ends where the next begins, and the last ends at the analysed duration.
//!
//! Sampling is deliberately sparse, so cut positions are accurate to the
//! sampling interval, not to the frame.
//!
//! # Example
//!
//! ```
//! use reelscan::{SceneSegmenter, SyntheticVideo};
//!
//! // Hard cuts at 40s and 80s.
//! let mut video = SyntheticVideo::shots(
//!     25.0,
//!     64,
//!     36,
//!     &[(40.0, [30, 30, 30]), (80.0, [200, 200, 200]), (120.0, [90, 90, 90])],
//! );
//!
//! let scenes = SceneSegmenter::new().detect_scenes(&mut video, 600.0, 30.0)?;
//! let bounds: Vec<(f64, f64)> = scenes.iter().map(|s| (s.start, s.end)).collect();
//! assert_eq!(bounds, vec![(0.0, 40.0), (40.0, 80.0), (80.0, 120.0)]);
//! # Ok::<(), reelscan::ReelscanError>(())
//! ```

use std::collections::VecDeque;
use std::sync::Arc;

use image::GrayImage;
use serde::{Deserialize, Serialize};

use crate::{
    configuration::AnalysisOptions,
    conversion,
    error::ReelscanError,
    features::{self, FaceDetector, FeatureExtractor},
    progress::OperationType,
    source::FrameSource,
};

/// Default analysis limit, in seconds, used by [`Analyzer`](crate::Analyzer).
pub const DEFAULT_MAX_SCENE_DURATION: f64 = 600.0;

/// Default cut threshold (mean absolute luma difference between samples).
pub const DEFAULT_SCENE_THRESHOLD: f64 = 30.0;

/// A contiguous span of video between two detected cuts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    /// Sequential id, starting at 0.
    pub id: usize,
    /// Start of the scene in seconds.
    pub start: f64,
    /// End of the scene in seconds (exclusive).
    pub end: f64,
    /// Mean luma over the scene's samples.
    pub brightness: f64,
    /// Mean luma difference between consecutive samples inside the scene.
    pub motion: f64,
    /// Faces found on the scene's middle sample.
    pub face_count: u32,
    /// Human-readable tag derived from brightness, motion and faces.
    pub description: String,
    /// Subtitle lines spoken during the scene, see [`attach_dialogues`].
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dialogues: Vec<Dialogue>,
}

impl Scene {
    /// Length of the scene in seconds.
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Midpoint of the scene in seconds.
    pub fn midpoint(&self) -> f64 {
        (self.start + self.end) / 2.0
    }

    /// Whether `seconds` falls inside `[start, end)`.
    pub fn contains(&self, seconds: f64) -> bool {
        seconds >= self.start && seconds < self.end
    }
}

/// A subtitle line as produced by a subtitle extractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subtitle {
    /// Start of the line in seconds.
    pub start: f64,
    /// End of the line in seconds.
    pub end: f64,
    /// The spoken text.
    pub text: String,
}

/// A subtitle line attached to a scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dialogue {
    /// Seconds from the scene start to the line start.
    pub offset: f64,
    /// The spoken text.
    pub text: String,
}

/// Attach subtitle lines to the scenes they start in.
///
/// Each scene's previous dialogues are replaced. A subtitle belongs to the
/// scene whose `[start, end)` contains the subtitle's start; subtitles
/// outside every scene are dropped.
pub fn attach_dialogues(scenes: &mut [Scene], subtitles: &[Subtitle]) {
    for scene in scenes.iter_mut() {
        scene.dialogues = subtitles
            .iter()
            .filter(|subtitle| scene.contains(subtitle.start))
            .map(|subtitle| Dialogue {
                offset: subtitle.start - scene.start,
                text: subtitle.text.clone(),
            })
            .collect();
    }
}

/// Derive the description tag of a scene.
///
/// ```
/// assert_eq!(reelscan::describe_scene(30.0, 25.0, 2), "dark, high motion, 2 people");
/// assert_eq!(reelscan::describe_scene(120.0, 4.0, 0), "normal light, static");
/// ```
pub fn describe_scene(brightness: f64, motion: f64, face_count: u32) -> String {
    let mut parts = vec![
        if brightness < 50.0 {
            "dark".to_string()
        } else if brightness < 150.0 {
            "normal light".to_string()
        } else {
            "bright".to_string()
        },
        if motion > 20.0 {
            "high motion".to_string()
        } else if motion > 10.0 {
            "medium motion".to_string()
        } else {
            "static".to_string()
        },
    ];

    match face_count {
        0 => {}
        1 => parts.push("1 person".to_string()),
        n => parts.push(format!("{n} people")),
    }

    parts.join(", ")
}

/// Scene segmentation settings.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneDetectionOptions {
    /// Seconds between two samples. Default: 1.0.
    pub sample_interval: f64,
}

impl Default for SceneDetectionOptions {
    fn default() -> Self {
        Self {
            sample_interval: 1.0,
        }
    }
}

impl SceneDetectionOptions {
    /// Create options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the sampling cadence in seconds.
    #[must_use]
    pub fn sample_interval(mut self, seconds: f64) -> Self {
        self.sample_interval = seconds;
        self
    }
}

/// Splits a video into [`Scene`]s by frame-difference thresholding.
///
/// The segmenter holds no state between calls; every invocation is a pure
/// function of the source and its parameters.
#[derive(Debug, Clone, Default)]
pub struct SceneSegmenter {
    options: SceneDetectionOptions,
    extractor: FeatureExtractor,
}

impl SceneSegmenter {
    /// Create a segmenter with default options and no face model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the segmentation options.
    #[must_use]
    pub fn with_options(mut self, options: SceneDetectionOptions) -> Self {
        self.options = options;
        self
    }

    /// Plug in a face detector, evaluated on each scene's middle sample.
    #[must_use]
    pub fn with_face_detector(mut self, detector: Arc<dyn FaceDetector>) -> Self {
        self.extractor = self.extractor.with_face_detector(detector);
        self
    }

    /// Segment the first `min(max_duration, source duration)` seconds of
    /// `source`, cutting where consecutive samples differ by more than
    /// `threshold`.
    ///
    /// # Errors
    ///
    /// [`ReelscanError::InvalidConfiguration`] for a negative or NaN
    /// threshold or duration, or a non-positive sampling interval.
    pub fn detect_scenes<S>(
        &self,
        source: &mut S,
        max_duration: f64,
        threshold: f64,
    ) -> Result<Vec<Scene>, ReelscanError>
    where
        S: FrameSource + ?Sized,
    {
        self.detect_scenes_with_options(source, max_duration, threshold, &AnalysisOptions::new())
    }

    /// Like [`detect_scenes`](SceneSegmenter::detect_scenes), with progress
    /// reporting and cancellation.
    ///
    /// # Errors
    ///
    /// As [`detect_scenes`](SceneSegmenter::detect_scenes), plus
    /// [`ReelscanError::Cancelled`] when the token fires between samples.
    pub fn detect_scenes_with_options<S>(
        &self,
        source: &mut S,
        max_duration: f64,
        threshold: f64,
        options: &AnalysisOptions,
    ) -> Result<Vec<Scene>, ReelscanError>
    where
        S: FrameSource + ?Sized,
    {
        if threshold.is_nan() || threshold < 0.0 {
            return Err(ReelscanError::InvalidConfiguration(format!(
                "scene threshold must be a non-negative number, got {threshold}"
            )));
        }
        if max_duration.is_nan() || max_duration < 0.0 {
            return Err(ReelscanError::InvalidConfiguration(format!(
                "maximum scene analysis duration must be non-negative, got {max_duration}"
            )));
        }
        let interval = self.options.sample_interval;
        if !(interval > 0.0) {
            return Err(ReelscanError::InvalidConfiguration(format!(
                "scene sampling interval must be positive, got {interval}"
            )));
        }

        let analyzed_duration = max_duration.min(source.duration());
        if analyzed_duration <= 0.0 {
            return Ok(Vec::new());
        }

        let total_samples = conversion::sample_count(0.0, analyzed_duration, interval);
        log::debug!(
            "Detecting scenes over {analyzed_duration:.2}s ({total_samples} samples, threshold={threshold})"
        );

        let mut tracker = options.tracker(OperationType::SceneDetection, Some(total_samples));
        let mut scenes = Vec::new();
        let mut current: Option<SceneAccumulator> = None;

        for index in 0..total_samples {
            if options.is_cancelled() {
                return Err(ReelscanError::Cancelled);
            }

            let timestamp = index as f64 * interval;
            let Some(frame) = source.frame_at(timestamp) else {
                log::warn!("Frame unavailable at {timestamp:.2}s, ending scene detection early");
                break;
            };
            let gray = features::luma(&frame);
            let brightness = features::mean_luma(&gray);

            let mut accumulator = match current.take() {
                None => SceneAccumulator::new(timestamp),
                Some(mut accumulator) => {
                    let difference = accumulator
                        .last_frame()
                        .map(|previous| features::mean_abs_difference(previous, &gray))
                        .unwrap_or(0.0);

                    if difference > threshold {
                        log::trace!("Cut at {timestamp:.2}s (difference {difference:.2})");
                        scenes.push(accumulator.finish(scenes.len(), timestamp, &self.extractor));
                        SceneAccumulator::new(timestamp)
                    } else {
                        accumulator.record_motion(difference);
                        accumulator
                    }
                }
            };

            accumulator.push(gray, brightness);
            current = Some(accumulator);
            tracker.advance(Some(timestamp));
        }

        if let Some(accumulator) = current {
            scenes.push(accumulator.finish(scenes.len(), analyzed_duration, &self.extractor));
        }
        tracker.finish();

        log::info!(
            "Detected {} scene(s) in the first {analyzed_duration:.2}s",
            scenes.len()
        );
        Ok(scenes)
    }
}

/// Running aggregate of the samples of the scene being built.
///
/// Only frames that can still become the middle sample are retained.
struct SceneAccumulator {
    start: f64,
    sample_count: usize,
    brightness_sum: f64,
    motion_sum: f64,
    motion_count: usize,
    frames: VecDeque<GrayImage>,
    first_retained: usize,
}

impl SceneAccumulator {
    fn new(start: f64) -> Self {
        Self {
            start,
            sample_count: 0,
            brightness_sum: 0.0,
            motion_sum: 0.0,
            motion_count: 0,
            frames: VecDeque::new(),
            first_retained: 0,
        }
    }

    fn last_frame(&self) -> Option<&GrayImage> {
        self.frames.back()
    }

    fn record_motion(&mut self, difference: f64) {
        self.motion_sum += difference;
        self.motion_count += 1;
    }

    fn push(&mut self, frame: GrayImage, brightness: f64) {
        self.sample_count += 1;
        self.brightness_sum += brightness;
        self.frames.push_back(frame);

        // Frames before the current midpoint can never become it again.
        while self.first_retained < self.sample_count / 2 {
            self.frames.pop_front();
            self.first_retained += 1;
        }
    }

    fn finish(self, id: usize, end: f64, extractor: &FeatureExtractor) -> Scene {
        let brightness = if self.sample_count > 0 {
            self.brightness_sum / self.sample_count as f64
        } else {
            0.0
        };
        let motion = if self.motion_count > 0 {
            self.motion_sum / self.motion_count as f64
        } else {
            0.0
        };
        let face_count = self
            .frames
            .front()
            .map(|middle| extractor.count_faces(middle))
            .unwrap_or(0);

        Scene {
            id,
            start: self.start,
            end,
            brightness,
            motion,
            face_count,
            description: describe_scene(brightness, motion, face_count),
            dialogues: Vec::new(),
        }
    }
}
