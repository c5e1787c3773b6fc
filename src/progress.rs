//! Progress reporting and cancellation.
//!
//! Every detector walks the video one sample at a time, and on a feature
//! film those walks are where the time goes. A [`ProgressCallback`] watches
//! them through [`ProgressInfo`] snapshots; a [`CancellationToken`] stops
//! them between two samples. Any `Fn(&ProgressInfo)` closure is a callback.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use reelscan::{AnalysisOptions, CancellationToken, ProgressInfo, SceneSegmenter, SyntheticVideo};
//!
//! let mut video = SyntheticVideo::solid(30.0, 10.0, 32, 18, [90, 90, 90]);
//! let options = AnalysisOptions::new()
//!     .with_progress(Arc::new(|info: &ProgressInfo| {
//!         if let Some(fraction) = info.fraction() {
//!             println!("[{:?}] {:.0}%", info.operation, fraction * 100.0);
//!         }
//!     }))
//!     .with_cancellation(CancellationToken::new());
//!
//! let scenes = SceneSegmenter::new().detect_scenes_with_options(&mut video, 600.0, 30.0, &options)?;
//! assert_eq!(scenes.len(), 1);
//! # Ok::<(), reelscan::ReelscanError>(())
//! ```

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::time::{Duration, Instant};

/// Which detector a progress report comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum OperationType {
    /// [`SceneSegmenter`](crate::SceneSegmenter).
    SceneDetection,
    /// [`ContentBoundaryDetector`](crate::ContentBoundaryDetector).
    BoundaryDetection,
    /// [`HighlightScorer`](crate::HighlightScorer).
    HighlightDetection,
    /// [`CompositionAnalyzer`](crate::CompositionAnalyzer).
    CompositionAnalysis,
}

/// One progress report.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressInfo {
    /// Detector that is running.
    pub operation: OperationType,
    /// Samples taken so far.
    pub samples: u64,
    /// Samples the walk will take, when known before it starts. Boundary
    /// detection stops its scans on content and leaves this empty.
    pub expected_samples: Option<u64>,
    /// Stream position of the latest sample in seconds. `None` in the
    /// closing report of a walk.
    pub position: Option<f64>,
    /// Wall-clock time since the walk started.
    pub elapsed: Duration,
}

impl ProgressInfo {
    /// Completed share of the walk in `0.0..=1.0`, when the sample count is
    /// known.
    pub fn fraction(&self) -> Option<f64> {
        self.expected_samples
            .filter(|&expected| expected > 0)
            .map(|expected| (self.samples as f64 / expected as f64).min(1.0))
    }

    /// Time left, extrapolated from the throughput so far.
    pub fn estimated_remaining(&self) -> Option<Duration> {
        let expected = self.expected_samples?;
        if self.samples == 0 {
            return None;
        }
        let left = expected.saturating_sub(self.samples);
        Some(self.elapsed.mul_f64(left as f64 / self.samples as f64))
    }
}

/// Receives progress reports.
///
/// Callbacks must be [`Send`] and [`Sync`]: with the `rayon` feature the
/// analyzer runs two detectors at once and both report to the same
/// callback. A callback only observes; cancel through a
/// [`CancellationToken`].
pub trait ProgressCallback: Send + Sync {
    /// Called every [`with_report_interval`](crate::AnalysisOptions::with_report_interval)
    /// samples and once when a walk ends.
    fn on_progress(&self, info: &ProgressInfo);
}

impl<F> ProgressCallback for F
where
    F: Fn(&ProgressInfo) + Send + Sync,
{
    fn on_progress(&self, info: &ProgressInfo) {
        self(info)
    }
}

/// Shared flag that stops running detectors.
///
/// Clones observe the same flag. Detectors check it before every sample and
/// return [`ReelscanError::Cancelled`](crate::ReelscanError::Cancelled) once
/// it is set.
///
/// ```
/// use reelscan::CancellationToken;
///
/// let token = CancellationToken::new();
/// let handle = token.clone();
/// handle.cancel();
/// assert!(token.is_cancelled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    /// A token that has not been cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask every detector holding a clone of this token to stop.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// Whether [`cancel`](CancellationToken::cancel) has been called.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// Counts the samples of one detector walk and reports them.
pub(crate) struct ProgressTracker {
    callback: Option<Arc<dyn ProgressCallback>>,
    operation: OperationType,
    expected_samples: Option<u64>,
    samples: u64,
    report_every: u64,
    started: Instant,
}

impl ProgressTracker {
    pub(crate) fn new(
        callback: Option<Arc<dyn ProgressCallback>>,
        operation: OperationType,
        expected_samples: Option<u64>,
        report_every: u64,
    ) -> Self {
        Self {
            callback,
            operation,
            expected_samples,
            samples: 0,
            report_every: report_every.max(1),
            started: Instant::now(),
        }
    }

    /// Count one sample taken at `position` seconds.
    pub(crate) fn advance(&mut self, position: Option<f64>) {
        self.samples += 1;
        if self.samples % self.report_every == 0 {
            self.report(position);
        }
    }

    /// Send the closing report.
    pub(crate) fn finish(&self) {
        self.report(None);
    }

    fn report(&self, position: Option<f64>) {
        let Some(callback) = &self.callback else {
            return;
        };
        callback.on_progress(&ProgressInfo {
            operation: self.operation,
            samples: self.samples,
            expected_samples: self.expected_samples,
            position,
            elapsed: self.started.elapsed(),
        });
    }
}
