//! Highlight scoring.
//!
//! [`HighlightScorer`] ranks candidate spans by a weighted feature score and
//! greedily keeps the best non-overlapping ones. It works in two modes:
//!
//! - **Scene-driven**, when scenes are supplied: every [`Scene`] is a
//!   candidate, scored from its motion, faces, dialogue count, duration and
//!   brightness ([`SceneScoreWeights`]).
//! - **Raw**, without scenes: one frame per second is sampled and scored
//!   from its features ([`SampleScoreWeights`]); each selected sample opens
//!   a fixed-length highlight.
//!
//! Highlights are selected by score but returned in time order, numbered
//! from 0.
//!
//! # Example
//!
//! ```
//! use reelscan::{HighlightScorer, HighlightType, Scene, SyntheticVideo};
//!
//! let scene = |id: usize, start: f64, end: f64, motion: f64, face_count: u32| Scene {
//!     id,
//!     start,
//!     end,
//!     brightness: 100.0,
//!     motion,
//!     face_count,
//!     description: String::new(),
//!     dialogues: Vec::new(),
//! };
//! let scenes = vec![scene(0, 0.0, 40.0, 5.0, 0), scene(1, 40.0, 50.0, 25.0, 2)];
//!
//! let mut video = SyntheticVideo::solid(50.0, 25.0, 16, 16, [100, 100, 100]);
//! let highlights =
//!     HighlightScorer::new().detect_highlights(&mut video, Some(&scenes), 1, 5.0, 60.0)?;
//!
//! assert_eq!(highlights.len(), 1);
//! assert_eq!(highlights[0].start, 40.0);
//! assert_eq!(highlights[0].kind, HighlightType::Action);
//! # Ok::<(), reelscan::ReelscanError>(())
//! ```

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{
    configuration::AnalysisOptions,
    conversion::{self, format_timestamp},
    error::ReelscanError,
    features::{self, FaceDetector, FeatureExtractor, FrameSample},
    progress::OperationType,
    scene::Scene,
    source::FrameSource,
};

/// Category of a highlight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HighlightType {
    /// Dominated by motion.
    Action,
    /// Carried by speech.
    Dialogue,
    /// Three or more people on screen.
    Group,
    /// Everything else.
    Scenic,
}

impl Display for HighlightType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let name = match self {
            HighlightType::Action => "action",
            HighlightType::Dialogue => "dialogue",
            HighlightType::Group => "group",
            HighlightType::Scenic => "scenic",
        };
        f.write_str(name)
    }
}

/// A selected, scored time span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Highlight {
    /// Sequential id in time order, starting at 0.
    pub id: usize,
    /// Start in seconds.
    pub start: f64,
    /// End in seconds.
    pub end: f64,
    /// Score that got the span selected. Informational.
    pub score: f64,
    /// Why the span was selected. Informational.
    pub reason: String,
    /// Category of the span.
    #[serde(rename = "type")]
    pub kind: HighlightType,
}

impl Highlight {
    /// Length in seconds.
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Whether the two highlights share any time.
    pub fn overlaps(&self, other: &Highlight) -> bool {
        self.start < other.end && other.start < self.end
    }
}

impl Display for Highlight {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(
            f,
            "#{} {} - {} [{}] score {:.1}: {}",
            self.id,
            format_timestamp(self.start),
            format_timestamp(self.end),
            self.kind,
            self.score,
            self.reason
        )
    }
}

/// Points awarded to scenes in scene-driven mode.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneScoreWeights {
    /// Motion above which a scene is high-motion. Default: 20.
    pub high_motion_threshold: f64,
    /// Motion above which a scene is medium-motion. Default: 10.
    pub medium_motion_threshold: f64,
    /// Default: 30.
    pub high_motion_points: f64,
    /// Default: 20.
    pub medium_motion_points: f64,
    /// Default: 5.
    pub low_motion_points: f64,
    /// Points per detected face. Default: 15.
    pub points_per_face: f64,
    /// Points per attached dialogue line. Default: 10.
    pub points_per_dialogue: f64,
    /// Duration range earning [`ideal_duration_points`](Self::ideal_duration_points).
    /// Default: 5 to 20 seconds.
    pub ideal_duration: (f64, f64),
    /// Default: 20.
    pub ideal_duration_points: f64,
    /// Wider duration range earning
    /// [`acceptable_duration_points`](Self::acceptable_duration_points).
    /// Default: 3 to 30 seconds.
    pub acceptable_duration: (f64, f64),
    /// Default: 10.
    pub acceptable_duration_points: f64,
    /// Brightness range earning [`brightness_points`](Self::brightness_points).
    /// Default: 50 to 150.
    pub brightness_range: (f64, f64),
    /// Default: 10.
    pub brightness_points: f64,
    /// Faces from which a scene is a group scene. Default: 3.
    pub group_face_count: u32,
    /// Dialogue lines above which a scene is key dialogue. Default: 2.
    pub key_dialogue_count: usize,
}

impl Default for SceneScoreWeights {
    fn default() -> Self {
        Self {
            high_motion_threshold: 20.0,
            medium_motion_threshold: 10.0,
            high_motion_points: 30.0,
            medium_motion_points: 20.0,
            low_motion_points: 5.0,
            points_per_face: 15.0,
            points_per_dialogue: 10.0,
            ideal_duration: (5.0, 20.0),
            ideal_duration_points: 20.0,
            acceptable_duration: (3.0, 30.0),
            acceptable_duration_points: 10.0,
            brightness_range: (50.0, 150.0),
            brightness_points: 10.0,
            group_face_count: 3,
            key_dialogue_count: 2,
        }
    }
}

/// Points awarded to samples in raw mode.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleScoreWeights {
    /// Multiplier of the motion value. Default: 30.
    pub motion: f64,
    /// Multiplier of the edge density. Default: 20.
    pub edge_density: f64,
    /// Colour variance is divided by this. Default: 1000.
    pub color_variance_divisor: f64,
    /// Cap of the colour variance contribution. Default: 20.
    pub color_variance_cap: f64,
    /// Points per detected face. Default: 25.
    pub points_per_face: f64,
    /// Brightness range earning [`brightness_points`](Self::brightness_points).
    /// Default: 50 to 150.
    pub brightness_range: (f64, f64),
    /// Default: 10.
    pub brightness_points: f64,
    /// Motion above which a raw highlight is action. Default: 5.
    pub action_motion_threshold: f64,
}

impl Default for SampleScoreWeights {
    fn default() -> Self {
        Self {
            motion: 30.0,
            edge_density: 20.0,
            color_variance_divisor: 1000.0,
            color_variance_cap: 20.0,
            points_per_face: 25.0,
            brightness_range: (50.0, 150.0),
            brightness_points: 10.0,
            action_motion_threshold: 5.0,
        }
    }
}

/// Highlight scoring settings.
#[derive(Debug, Clone, PartialEq)]
pub struct HighlightOptions {
    /// Raw-mode sampling cadence in seconds. Default: 1.
    pub sample_interval: f64,
    /// Raw-mode highlight length before clamping to the requested duration
    /// bounds. Default: 10.
    pub preferred_duration: f64,
    /// Scene-driven weights.
    pub scene_weights: SceneScoreWeights,
    /// Raw-mode weights.
    pub sample_weights: SampleScoreWeights,
}

impl Default for HighlightOptions {
    fn default() -> Self {
        Self {
            sample_interval: 1.0,
            preferred_duration: 10.0,
            scene_weights: SceneScoreWeights::default(),
            sample_weights: SampleScoreWeights::default(),
        }
    }
}

impl HighlightOptions {
    /// Create options with the documented weights.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the raw-mode sampling cadence.
    #[must_use]
    pub fn sample_interval(mut self, seconds: f64) -> Self {
        self.sample_interval = seconds;
        self
    }

    /// Set the raw-mode highlight length.
    #[must_use]
    pub fn preferred_duration(mut self, seconds: f64) -> Self {
        self.preferred_duration = seconds;
        self
    }

    /// Replace the scene-driven weights.
    #[must_use]
    pub fn scene_weights(mut self, weights: SceneScoreWeights) -> Self {
        self.scene_weights = weights;
        self
    }

    /// Replace the raw-mode weights.
    #[must_use]
    pub fn sample_weights(mut self, weights: SampleScoreWeights) -> Self {
        self.sample_weights = weights;
        self
    }
}

fn within((low, high): (f64, f64), value: f64) -> bool {
    value >= low && value <= high
}

/// Picks the most noteworthy non-overlapping spans of a video.
#[derive(Debug, Clone, Default)]
pub struct HighlightScorer {
    options: HighlightOptions,
    extractor: FeatureExtractor,
}

impl HighlightScorer {
    /// Create a scorer with the documented weights and no face model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the scoring settings.
    #[must_use]
    pub fn with_options(mut self, options: HighlightOptions) -> Self {
        self.options = options;
        self
    }

    /// Plug in a face detector for raw-mode samples.
    #[must_use]
    pub fn with_face_detector(mut self, detector: Arc<dyn FaceDetector>) -> Self {
        self.extractor = self.extractor.with_face_detector(detector);
        self
    }

    /// Scene-driven score of `scene`.
    ///
    /// ```
    /// use reelscan::{HighlightScorer, Scene};
    ///
    /// let scene = Scene {
    ///     id: 0,
    ///     start: 0.0,
    ///     end: 10.0,
    ///     brightness: 100.0,
    ///     motion: 25.0,
    ///     face_count: 2,
    ///     description: String::new(),
    ///     dialogues: Vec::new(),
    /// };
    /// // 30 (motion) + 2 × 15 (faces) + 20 (duration) + 10 (brightness)
    /// assert_eq!(HighlightScorer::new().score_scene(&scene), 90.0);
    /// ```
    pub fn score_scene(&self, scene: &Scene) -> f64 {
        let weights = &self.options.scene_weights;

        let motion = if scene.motion > weights.high_motion_threshold {
            weights.high_motion_points
        } else if scene.motion > weights.medium_motion_threshold {
            weights.medium_motion_points
        } else {
            weights.low_motion_points
        };

        let duration = scene.duration();
        let duration_points = if within(weights.ideal_duration, duration) {
            weights.ideal_duration_points
        } else if within(weights.acceptable_duration, duration) {
            weights.acceptable_duration_points
        } else {
            0.0
        };

        let brightness = if within(weights.brightness_range, scene.brightness) {
            weights.brightness_points
        } else {
            0.0
        };

        motion
            + scene.face_count as f64 * weights.points_per_face
            + scene.dialogues.len() as f64 * weights.points_per_dialogue
            + duration_points
            + brightness
    }

    /// Raw-mode score of a frame sample.
    pub fn score_sample(&self, sample: &FrameSample) -> f64 {
        let weights = &self.options.sample_weights;
        let color = if weights.color_variance_divisor > 0.0 {
            (sample.color_variance / weights.color_variance_divisor).min(weights.color_variance_cap)
        } else {
            weights.color_variance_cap
        };
        let brightness = if within(weights.brightness_range, sample.brightness) {
            weights.brightness_points
        } else {
            0.0
        };

        weights.motion * sample.motion_vs_prev
            + weights.edge_density * sample.edge_density
            + color
            + weights.points_per_face * sample.face_count as f64
            + brightness
    }

    /// Select up to `max_highlights` non-overlapping highlights lasting
    /// between `min_duration` and `max_duration` seconds.
    ///
    /// With a non-empty `scenes`, the scenes are the candidates and `source`
    /// is not decoded. Scenes shorter than `min_duration` are skipped and
    /// scenes longer than `max_duration` are truncated. Without scenes, or
    /// with an empty list, `source` is sampled instead.
    ///
    /// # Errors
    ///
    /// [`ReelscanError::InvalidConfiguration`] when `min_duration` is not
    /// positive or `max_duration < min_duration`.
    pub fn detect_highlights<S>(
        &self,
        source: &mut S,
        scenes: Option<&[Scene]>,
        max_highlights: usize,
        min_duration: f64,
        max_duration: f64,
    ) -> Result<Vec<Highlight>, ReelscanError>
    where
        S: FrameSource + ?Sized,
    {
        self.detect_highlights_with_options(
            source,
            scenes,
            max_highlights,
            min_duration,
            max_duration,
            &AnalysisOptions::new(),
        )
    }

    /// Like [`detect_highlights`](HighlightScorer::detect_highlights), with
    /// progress reporting and cancellation.
    ///
    /// # Errors
    ///
    /// As [`detect_highlights`](HighlightScorer::detect_highlights), plus
    /// [`ReelscanError::Cancelled`].
    pub fn detect_highlights_with_options<S>(
        &self,
        source: &mut S,
        scenes: Option<&[Scene]>,
        max_highlights: usize,
        min_duration: f64,
        max_duration: f64,
        options: &AnalysisOptions,
    ) -> Result<Vec<Highlight>, ReelscanError>
    where
        S: FrameSource + ?Sized,
    {
        if !(min_duration > 0.0) {
            return Err(ReelscanError::InvalidConfiguration(format!(
                "minimum highlight duration must be positive, got {min_duration}"
            )));
        }
        if !(max_duration >= min_duration) {
            return Err(ReelscanError::InvalidConfiguration(format!(
                "maximum highlight duration ({max_duration}) is shorter than the minimum ({min_duration})"
            )));
        }
        if !(self.options.sample_interval > 0.0) {
            return Err(ReelscanError::InvalidConfiguration(format!(
                "highlight sampling interval must be positive, got {}",
                self.options.sample_interval
            )));
        }
        if max_highlights == 0 {
            return Ok(Vec::new());
        }

        let mut highlights = match scenes {
            Some(scenes) if !scenes.is_empty() => {
                self.select_from_scenes(scenes, max_highlights, min_duration, max_duration, options)?
            }
            _ => self.select_from_samples(
                source,
                max_highlights,
                min_duration,
                max_duration,
                options,
            )?,
        };

        highlights.sort_by(|a, b| a.start.total_cmp(&b.start));
        for (id, highlight) in highlights.iter_mut().enumerate() {
            highlight.id = id;
        }

        log::info!("Selected {} highlight(s)", highlights.len());
        Ok(highlights)
    }

    fn select_from_scenes(
        &self,
        scenes: &[Scene],
        max_highlights: usize,
        min_duration: f64,
        max_duration: f64,
        options: &AnalysisOptions,
    ) -> Result<Vec<Highlight>, ReelscanError> {
        let mut tracker =
            options.tracker(OperationType::HighlightDetection, Some(scenes.len() as u64));

        let mut ranked = Vec::with_capacity(scenes.len());
        for scene in scenes {
            if options.is_cancelled() {
                return Err(ReelscanError::Cancelled);
            }
            ranked.push((self.score_scene(scene), scene));
            tracker.advance(Some(scene.start));
        }
        tracker.finish();

        // Stable: equal scores keep their time order.
        ranked.sort_by(|a, b| b.0.total_cmp(&a.0));

        let mut selected: Vec<Highlight> = Vec::new();
        for (score, scene) in ranked {
            if selected.len() >= max_highlights {
                break;
            }
            if scene.duration() < min_duration {
                log::trace!("Scene {} too short for a highlight ({:.1}s)", scene.id, scene.duration());
                continue;
            }

            let candidate = Highlight {
                id: 0,
                start: scene.start,
                end: scene.end.min(scene.start + max_duration),
                score,
                reason: self.scene_reason(scene),
                kind: self.scene_type(scene),
            };
            if selected.iter().any(|chosen| chosen.overlaps(&candidate)) {
                continue;
            }

            log::debug!("Highlight from scene {}: {candidate}", scene.id);
            selected.push(candidate);
        }
        Ok(selected)
    }

    fn select_from_samples<S>(
        &self,
        source: &mut S,
        max_highlights: usize,
        min_duration: f64,
        max_duration: f64,
        options: &AnalysisOptions,
    ) -> Result<Vec<Highlight>, ReelscanError>
    where
        S: FrameSource + ?Sized,
    {
        let total = source.duration().max(0.0);
        let interval = self.options.sample_interval;
        let sample_total = conversion::sample_count(0.0, total, interval);
        let mut tracker = options.tracker(OperationType::HighlightDetection, Some(sample_total));

        let mut samples = Vec::with_capacity(sample_total as usize);
        let mut previous = None;
        for index in 0..sample_total {
            if options.is_cancelled() {
                return Err(ReelscanError::Cancelled);
            }

            let timestamp = index as f64 * interval;
            let Some(frame) = source.frame_at(timestamp) else {
                log::warn!("Frame unavailable at {timestamp:.2}s, ending highlight sampling early");
                break;
            };
            let gray = features::luma(&frame);
            let sample = self.extractor.sample(timestamp, &frame, &gray, previous.as_ref());
            samples.push((self.score_sample(&sample), sample));
            previous = Some(gray);
            tracker.advance(Some(timestamp));
        }
        tracker.finish();

        samples.sort_by(|a, b| b.0.total_cmp(&a.0));

        let duration = self.options.preferred_duration.clamp(min_duration, max_duration);
        let spacing = 2.0 * min_duration;
        let weights = &self.options.sample_weights;

        let mut selected: Vec<Highlight> = Vec::new();
        for (score, sample) in samples {
            if selected.len() >= max_highlights {
                break;
            }
            let start = sample.timestamp;
            if selected.iter().any(|chosen| (chosen.start - start).abs() < spacing) {
                continue;
            }
            let end = (start + duration).min(total);
            if end - start < min_duration {
                continue;
            }

            let candidate = Highlight {
                id: 0,
                start,
                end,
                score,
                reason: format!("high-motion moment (motion: {:.1})", sample.motion_vs_prev),
                kind: if sample.motion_vs_prev > weights.action_motion_threshold {
                    HighlightType::Action
                } else {
                    HighlightType::Dialogue
                },
            };
            if selected.iter().any(|chosen| chosen.overlaps(&candidate)) {
                continue;
            }

            log::debug!("Highlight from sample at {start:.1}s: {candidate}");
            selected.push(candidate);
        }
        Ok(selected)
    }

    fn scene_type(&self, scene: &Scene) -> HighlightType {
        let weights = &self.options.scene_weights;
        if scene.motion > weights.high_motion_threshold {
            HighlightType::Action
        } else if !scene.dialogues.is_empty() {
            HighlightType::Dialogue
        } else if scene.face_count >= weights.group_face_count {
            HighlightType::Group
        } else {
            HighlightType::Scenic
        }
    }

    fn scene_reason(&self, scene: &Scene) -> String {
        let weights = &self.options.scene_weights;
        let mut reasons = Vec::new();
        if scene.motion > weights.high_motion_threshold {
            reasons.push("high-motion scene");
        }
        if scene.face_count >= weights.group_face_count {
            reasons.push("group interaction");
        } else if scene.face_count > 0 {
            reasons.push("characters on screen");
        }
        if scene.dialogues.len() > weights.key_dialogue_count {
            reasons.push("key dialogue");
        }

        if reasons.is_empty() {
            "high overall score".to_string()
        } else {
            reasons.join(", ")
        }
    }
}
