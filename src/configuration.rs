//! Operational settings.
//!
//! [`AnalysisOptions`] carries what every detector honours but none of them
//! decides: who hears about progress, how often, and whether to stop.
//! [`FrameOutputOptions`] picks the resolution an FFmpeg session decodes to.
//!
//! Heuristic constants are not here. Each detector keeps its thresholds in
//! its own options struct.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use reelscan::{AnalysisOptions, CancellationToken, FrameOutputOptions, ProgressInfo};
//!
//! let token = CancellationToken::new();
//! let options = AnalysisOptions::new()
//!     .with_progress(Arc::new(|info: &ProgressInfo| {
//!         println!("{:?}: {} samples", info.operation, info.samples);
//!     }))
//!     .with_cancellation(token.clone())
//!     .with_report_interval(25);
//!
//! // Half the source height, width following the aspect ratio.
//! let output = FrameOutputOptions::new().with_height(540);
//! assert_eq!(output.resolve_dimensions(1920, 1080), (960, 540));
//! ```

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::Arc;

use crate::progress::{CancellationToken, OperationType, ProgressCallback, ProgressTracker};

/// Target frame size of a decode session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameSize {
    /// Keep the source resolution.
    #[default]
    Source,
    /// Scale to this width; the height follows the aspect ratio.
    Width(u32),
    /// Scale to this height; the width follows the aspect ratio.
    Height(u32),
    /// Scale to exactly `(width, height)`, stretching if needed.
    Exact(u32, u32),
}

/// Frame output settings of FFmpeg decode sessions.
///
/// Every detector metric is a mean or a ratio, so analysing downscaled
/// frames gives near-identical results in a fraction of the time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameOutputOptions {
    /// Requested frame size.
    pub size: FrameSize,
}

impl FrameOutputOptions {
    /// Keep the source resolution.
    pub fn new() -> Self {
        Self::default()
    }

    /// Scale to `width`, keeping the aspect ratio.
    #[must_use]
    pub fn with_width(mut self, width: u32) -> Self {
        self.size = FrameSize::Width(width);
        self
    }

    /// Scale to `height`, keeping the aspect ratio.
    #[must_use]
    pub fn with_height(mut self, height: u32) -> Self {
        self.size = FrameSize::Height(height);
        self
    }

    /// Scale to exactly `width × height`.
    #[must_use]
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.size = FrameSize::Exact(width, height);
        self
    }

    /// Output `(width, height)` for a source of the given size.
    ///
    /// A derived side never collapses below one pixel.
    pub fn resolve_dimensions(&self, source_width: u32, source_height: u32) -> (u32, u32) {
        // Scale `across` by the factor that maps `along` onto `target`.
        let follow = |target: u32, along: u32, across: u32| {
            if along == 0 {
                across
            } else {
                ((across as f64 * target as f64 / along as f64).round() as u32).max(1)
            }
        };

        match self.size {
            FrameSize::Source => (source_width, source_height),
            FrameSize::Width(width) => (width, follow(width, source_width, source_height)),
            FrameSize::Height(height) => (follow(height, source_height, source_width), height),
            FrameSize::Exact(width, height) => (width, height),
        }
    }
}

/// Progress and cancellation settings shared by all detectors.
///
/// Pass it to the `*_with_options` methods of
/// [`SceneSegmenter`](crate::SceneSegmenter),
/// [`ContentBoundaryDetector`](crate::ContentBoundaryDetector),
/// [`HighlightScorer`](crate::HighlightScorer),
/// [`CompositionAnalyzer`](crate::CompositionAnalyzer) and
/// [`Analyzer`](crate::Analyzer). The default value reports nothing and
/// never cancels, which is what the plain methods use.
#[derive(Clone)]
pub struct AnalysisOptions {
    progress: Option<Arc<dyn ProgressCallback>>,
    cancellation: Option<CancellationToken>,
    report_interval: u64,
}

impl Debug for AnalysisOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("AnalysisOptions")
            .field("reports_progress", &self.progress.is_some())
            .field("cancellable", &self.cancellation.is_some())
            .field("report_interval", &self.report_interval)
            .finish()
    }
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisOptions {
    /// No callback, no token, a report after every sample.
    pub fn new() -> Self {
        Self {
            progress: None,
            cancellation: None,
            report_interval: 1,
        }
    }

    /// Report progress to `callback`.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Stop detectors when `token` is cancelled.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Report every `samples` samples instead of after each one. Zero is
    /// treated as one.
    #[must_use]
    pub fn with_report_interval(mut self, samples: u64) -> Self {
        self.report_interval = samples.max(1);
        self
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancellation.as_ref().is_some_and(CancellationToken::is_cancelled)
    }

    pub(crate) fn tracker(
        &self,
        operation: OperationType,
        expected_samples: Option<u64>,
    ) -> ProgressTracker {
        ProgressTracker::new(
            self.progress.clone(),
            operation,
            expected_samples,
            self.report_interval,
        )
    }
}
