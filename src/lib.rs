//! # reelscan
//!
//! Find the structure of a video: scenes, intro and outro, black frames and
//! highlights.
//!
//! `reelscan` samples decoded frames sparsely, reduces them to a few scalar
//! features (brightness, motion, edge density, colour variance, faces) and
//! runs simple, tunable heuristics over those features. Decoding sits behind
//! the [`FrameSource`] trait; the optional `ffmpeg` feature provides a
//! file-backed implementation via
//! [`ffmpeg-next`](https://crates.io/crates/ffmpeg-next), and
//! [`SyntheticVideo`] generates frames in memory.
//!
//! ## Quick Start
//!
//! ### Segment Scenes
//!
//! ```
//! use reelscan::{SceneSegmenter, SyntheticVideo};
//!
//! let mut video = SyntheticVideo::shots(
//!     25.0,
//!     64,
//!     36,
//!     &[(12.0, [20, 20, 20]), (30.0, [220, 220, 220])],
//! );
//! let scenes = SceneSegmenter::new().detect_scenes(&mut video, 600.0, 30.0)?;
//! assert_eq!(scenes.len(), 2);
//! assert_eq!(scenes[1].start, 12.0);
//! # Ok::<(), reelscan::ReelscanError>(())
//! ```
//!
//! ### Analyze a File
//!
//! ```no_run
//! # #[cfg(feature = "ffmpeg")]
//! # {
//! use reelscan::{Analyzer, MediaSource};
//!
//! let source = MediaSource::open("movie.mp4")?;
//! let report = Analyzer::new().analyze(&source)?;
//! println!("{}", report.boundaries);
//! report.save("analysis.json")?;
//! # }
//! # Ok::<(), reelscan::ReelscanError>(())
//! ```
//!
//! ## Features
//!
//! - **Scene segmentation**: frame-difference cuts at a fixed sampling
//!   cadence, gapless scene lists with brightness, motion and face counts
//! - **Content boundaries**: intro end from cut-frequency drops, outro start
//!   from rolling credits and trailing black, black-frame runs in between
//! - **Highlights**: weighted scoring of scenes or raw samples with greedy
//!   non-overlapping selection
//! - **Composition**: rule of thirds, symmetry, depth of field, leading
//!   lines and a dominant-colour palette per scene
//! - **Progress & cancellation**: callbacks and `CancellationToken` for
//!   every sampling loop
//! - **Validation**: metadata checks before any detector runs
//! - **JSON reports**: `AnalysisReport` for consumers in other processes
//!
//! ### Optional Features
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `ffmpeg` | `MediaSource` and `MediaFile` decode files through FFmpeg |
//! | `rayon` | `Analyzer` runs scene and boundary passes in parallel |
//! | `full` | Enables all of the above |
//!
//! ## Requirements
//!
//! The `ffmpeg` feature needs the FFmpeg development libraries installed on
//! the system. The core library has no native dependencies.

pub mod analysis;
pub mod boundary;
pub mod composition;
pub mod configuration;
mod conversion;
pub mod error;
pub mod features;
pub mod highlight;
#[cfg(feature = "ffmpeg")]
pub mod media;
pub mod metadata;
pub mod progress;
pub mod scene;
pub mod source;
pub mod synthetic;
pub mod validation;

pub use analysis::{AnalysisReport, AnalysisRequest, Analyzer};
pub use boundary::{
    BlackFrameSegment, BoundaryDetectionOptions, ContentBoundaries, ContentBoundaryDetector,
    IntroWindow, TimeSpan,
};
pub use composition::{Composition, CompositionAnalyzer, DepthOfField};
pub use configuration::{AnalysisOptions, FrameOutputOptions, FrameSize};
pub use conversion::format_timestamp;
pub use error::ReelscanError;
pub use features::{FaceDetector, FeatureExtractor, FrameSample, NoFaceDetector};
pub use highlight::{
    Highlight, HighlightOptions, HighlightScorer, HighlightType, SampleScoreWeights,
    SceneScoreWeights,
};
#[cfg(feature = "ffmpeg")]
pub use media::{MediaFile, MediaSource, set_decoder_log_level};
pub use metadata::VideoMetadata;
pub use progress::{CancellationToken, OperationType, ProgressCallback, ProgressInfo};
pub use scene::{
    Dialogue, Scene, SceneDetectionOptions, SceneSegmenter, Subtitle, attach_dialogues,
    describe_scene,
};
pub use source::{FrameSource, SourceDescriptor};
pub use synthetic::SyntheticVideo;
pub use validation::{Severity, ValidationIssue, ValidationReport, validate_metadata};
