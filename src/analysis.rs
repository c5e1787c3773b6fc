//! Whole-video analysis.
//!
//! [`Analyzer`] validates a source, then runs scene segmentation followed by
//! highlight scoring in one decode session and boundary detection in
//! another. With the `rayon` feature the two sessions run in parallel; they
//! share nothing but the immutable [`SourceDescriptor`].
//!
//! The results are collected in an [`AnalysisReport`], the JSON interchange
//! record for consumers in other processes.
//!
//! # Example
//!
//! ```
//! use reelscan::{AnalysisReport, AnalysisRequest, Analyzer, SyntheticVideo};
//!
//! let video = SyntheticVideo::shots(
//!     10.0,
//!     32,
//!     18,
//!     &[(40.0, [30, 30, 30]), (80.0, [200, 200, 200]), (120.0, [90, 90, 90])],
//! );
//!
//! let analyzer = Analyzer::new().with_request(AnalysisRequest::new().max_highlights(2));
//! let report = analyzer.analyze(&video)?;
//! assert_eq!(report.scenes.len(), 3);
//! assert!(report.highlights.len() <= 2);
//!
//! let restored = AnalysisReport::from_json(&report.to_json()?)?;
//! assert_eq!(restored, report);
//! # Ok::<(), reelscan::ReelscanError>(())
//! ```

use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{
    boundary::{ContentBoundaries, ContentBoundaryDetector},
    composition::{Composition, CompositionAnalyzer},
    configuration::AnalysisOptions,
    error::ReelscanError,
    features::FaceDetector,
    highlight::{Highlight, HighlightScorer},
    metadata::VideoMetadata,
    scene::{self, DEFAULT_MAX_SCENE_DURATION, DEFAULT_SCENE_THRESHOLD, Scene, SceneSegmenter, Subtitle},
    source::SourceDescriptor,
    validation::{self, Severity},
};

/// Parameters of a whole-video analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRequest {
    /// Seconds analysed by scene segmentation. Default: 600.
    pub max_scene_duration: f64,
    /// Scene cut threshold. Default: 30.
    pub scene_threshold: f64,
    /// Length of the ad scan after the intro. Default: 600.
    pub ad_sample_duration: f64,
    /// Highlights to select. Default: 10.
    pub max_highlights: usize,
    /// Shortest highlight in seconds. Default: 3.
    pub min_highlight_duration: f64,
    /// Longest highlight in seconds. Default: 30.
    pub max_highlight_duration: f64,
    /// Score scenes rather than raw samples. Default: `true`.
    pub highlights_from_scenes: bool,
    /// Subtitle lines attached to the scenes before scoring.
    pub subtitles: Vec<Subtitle>,
    /// Also analyze the composition of every scene. Default: `false`.
    pub analyze_composition: bool,
}

impl Default for AnalysisRequest {
    fn default() -> Self {
        Self {
            max_scene_duration: DEFAULT_MAX_SCENE_DURATION,
            scene_threshold: DEFAULT_SCENE_THRESHOLD,
            ad_sample_duration: 600.0,
            max_highlights: 10,
            min_highlight_duration: 3.0,
            max_highlight_duration: 30.0,
            highlights_from_scenes: true,
            subtitles: Vec::new(),
            analyze_composition: false,
        }
    }
}

impl AnalysisRequest {
    /// Create a request with the default parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the seconds analysed by scene segmentation.
    #[must_use]
    pub fn max_scene_duration(mut self, seconds: f64) -> Self {
        self.max_scene_duration = seconds;
        self
    }

    /// Set the scene cut threshold.
    #[must_use]
    pub fn scene_threshold(mut self, threshold: f64) -> Self {
        self.scene_threshold = threshold;
        self
    }

    /// Set the ad scan length.
    #[must_use]
    pub fn ad_sample_duration(mut self, seconds: f64) -> Self {
        self.ad_sample_duration = seconds;
        self
    }

    /// Set the number of highlights to select.
    #[must_use]
    pub fn max_highlights(mut self, count: usize) -> Self {
        self.max_highlights = count;
        self
    }

    /// Set the highlight duration bounds.
    #[must_use]
    pub fn highlight_duration(mut self, min_seconds: f64, max_seconds: f64) -> Self {
        self.min_highlight_duration = min_seconds;
        self.max_highlight_duration = max_seconds;
        self
    }

    /// Choose between scene-driven and raw highlight scoring.
    #[must_use]
    pub fn highlights_from_scenes(mut self, enabled: bool) -> Self {
        self.highlights_from_scenes = enabled;
        self
    }

    /// Attach subtitle lines to the detected scenes.
    #[must_use]
    pub fn subtitles(mut self, subtitles: Vec<Subtitle>) -> Self {
        self.subtitles = subtitles;
        self
    }

    /// Enable per-scene composition analysis.
    #[must_use]
    pub fn analyze_composition(mut self, enabled: bool) -> Self {
        self.analyze_composition = enabled;
        self
    }
}

/// Everything an analysis produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Metadata of the analysed video.
    pub metadata: VideoMetadata,
    /// Detected scenes, gapless and ordered.
    pub scenes: Vec<Scene>,
    /// Intro, outro and black-frame boundaries.
    pub boundaries: ContentBoundaries,
    /// Selected highlights, ordered by start.
    pub highlights: Vec<Highlight>,
    /// Composition per scene, when requested.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub compositions: Vec<Option<Composition>>,
}

impl AnalysisReport {
    /// Serialize to pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// [`ReelscanError::JsonError`] if serialization fails.
    pub fn to_json(&self) -> Result<String, ReelscanError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a report from JSON.
    ///
    /// # Errors
    ///
    /// [`ReelscanError::JsonError`] for malformed input.
    pub fn from_json(json: &str) -> Result<Self, ReelscanError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Write the report as JSON to `path`.
    ///
    /// # Errors
    ///
    /// [`ReelscanError::IoError`] or [`ReelscanError::JsonError`].
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ReelscanError> {
        let path = path.as_ref();
        fs::write(path, self.to_json()?)?;
        log::info!("Saved analysis report to {}", path.display());
        Ok(())
    }

    /// Read a report previously written by [`save`](AnalysisReport::save).
    ///
    /// # Errors
    ///
    /// [`ReelscanError::IoError`] or [`ReelscanError::JsonError`].
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ReelscanError> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

/// Runs every detector over one video.
#[derive(Debug, Clone, Default)]
pub struct Analyzer {
    request: AnalysisRequest,
    segmenter: SceneSegmenter,
    boundary_detector: ContentBoundaryDetector,
    scorer: HighlightScorer,
    composition: CompositionAnalyzer,
}

impl Analyzer {
    /// Create an analyzer with default parameters and detectors.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the analysis parameters.
    #[must_use]
    pub fn with_request(mut self, request: AnalysisRequest) -> Self {
        self.request = request;
        self
    }

    /// Replace the scene segmenter.
    #[must_use]
    pub fn with_segmenter(mut self, segmenter: SceneSegmenter) -> Self {
        self.segmenter = segmenter;
        self
    }

    /// Replace the boundary detector.
    #[must_use]
    pub fn with_boundary_detector(mut self, detector: ContentBoundaryDetector) -> Self {
        self.boundary_detector = detector;
        self
    }

    /// Replace the highlight scorer.
    #[must_use]
    pub fn with_scorer(mut self, scorer: HighlightScorer) -> Self {
        self.scorer = scorer;
        self
    }

    /// Replace the composition analyzer.
    #[must_use]
    pub fn with_composition_analyzer(mut self, analyzer: CompositionAnalyzer) -> Self {
        self.composition = analyzer;
        self
    }

    /// Use `detector` for scene faces and raw highlight samples.
    #[must_use]
    pub fn with_face_detector(mut self, detector: Arc<dyn FaceDetector>) -> Self {
        self.segmenter = self.segmenter.with_face_detector(detector.clone());
        self.scorer = self.scorer.with_face_detector(detector);
        self
    }

    /// Analyze the video described by `descriptor`.
    ///
    /// # Errors
    ///
    /// [`ReelscanError::SourceUnavailable`] when the metadata fails
    /// validation, any error from opening a session, and
    /// [`ReelscanError::InvalidConfiguration`] for invalid request
    /// parameters.
    pub fn analyze<D: SourceDescriptor>(&self, descriptor: &D) -> Result<AnalysisReport, ReelscanError> {
        self.analyze_with_options(descriptor, &AnalysisOptions::new())
    }

    /// Like [`analyze`](Analyzer::analyze), with progress reporting and
    /// cancellation shared by all detectors.
    ///
    /// # Errors
    ///
    /// As [`analyze`](Analyzer::analyze), plus [`ReelscanError::Cancelled`].
    pub fn analyze_with_options<D: SourceDescriptor>(
        &self,
        descriptor: &D,
        options: &AnalysisOptions,
    ) -> Result<AnalysisReport, ReelscanError> {
        let metadata = descriptor.source_metadata().clone();
        let report = validation::validate_metadata(&metadata);
        for warning in report.messages(Severity::Warning) {
            log::warn!("{warning}");
        }
        if !report.is_valid() {
            let errors: Vec<&str> = report.messages(Severity::Error).collect();
            return Err(ReelscanError::SourceUnavailable(errors.join("; ")));
        }
        log::info!(
            "Analyzing {}×{} video, {:.1}s at {:.2} fps",
            metadata.width,
            metadata.height,
            metadata.duration_seconds(),
            metadata.frames_per_second
        );

        #[cfg(feature = "rayon")]
        let (content, boundaries) = rayon::join(
            || self.content_pass(descriptor, options),
            || self.boundary_pass(descriptor, options),
        );

        #[cfg(not(feature = "rayon"))]
        let (content, boundaries) = (
            self.content_pass(descriptor, options),
            self.boundary_pass(descriptor, options),
        );

        let (scenes, highlights, compositions) = content?;
        Ok(AnalysisReport {
            metadata,
            scenes,
            boundaries: boundaries?,
            highlights,
            compositions,
        })
    }

    /// Scenes, then highlights and compositions, over one session.
    fn content_pass<D: SourceDescriptor>(
        &self,
        descriptor: &D,
        options: &AnalysisOptions,
    ) -> Result<(Vec<Scene>, Vec<Highlight>, Vec<Option<Composition>>), ReelscanError> {
        let request = &self.request;
        let mut source = descriptor.open_source()?;

        let mut scenes = self.segmenter.detect_scenes_with_options(
            &mut source,
            request.max_scene_duration,
            request.scene_threshold,
            options,
        )?;
        if !request.subtitles.is_empty() {
            scene::attach_dialogues(&mut scenes, &request.subtitles);
        }

        let highlights = self.scorer.detect_highlights_with_options(
            &mut source,
            request.highlights_from_scenes.then_some(scenes.as_slice()),
            request.max_highlights,
            request.min_highlight_duration,
            request.max_highlight_duration,
            options,
        )?;

        let compositions = if request.analyze_composition {
            self.composition.analyze_scenes(&mut source, &scenes, options)?
        } else {
            Vec::new()
        };

        Ok((scenes, highlights, compositions))
    }

    fn boundary_pass<D: SourceDescriptor>(
        &self,
        descriptor: &D,
        options: &AnalysisOptions,
    ) -> Result<ContentBoundaries, ReelscanError> {
        let mut source = descriptor.open_source()?;
        self.boundary_detector.detect_boundaries_with_options(
            &mut source,
            self.request.ad_sample_duration,
            None,
            options,
        )
    }
}
