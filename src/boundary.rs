//! Content boundary detection.
//!
//! [`ContentBoundaryDetector`] partitions a video's timeline into intro,
//! main content and outro, and lists the black-frame segments inside the
//! main content. Every heuristic falls back to a fixed default when it finds
//! nothing, so detection never fails on an inconclusive video.
//!
//! - **Intro end**: the first complete 10-second window, within the first
//!   three minutes, whose cut frequency drops below half of the previous window's.
//! - **Outro start**: scanning backward over the last five minutes, the
//!   latest point that shows rolling credits, or that is black and only
//!   followed by black or credits.
//! - **Black frames**: runs of dark samples at a 5-second cadence, reported
//!   when they span at least 2 seconds.
//! - **Ads**: an extension point that currently reports nothing.
//!
//! All constants live in [`BoundaryDetectionOptions`].
//!
//! # Example
//!
//! ```
//! use reelscan::{ContentBoundaryDetector, SyntheticVideo};
//!
//! let mut video = SyntheticVideo::solid(600.0, 10.0, 32, 18, [120, 120, 120]);
//! let boundaries = ContentBoundaryDetector::new().detect_boundaries(&mut video, 300.0)?;
//!
//! // No cut-frequency drop: the intro defaults to 30 seconds.
//! assert_eq!(boundaries.intro_end, 30.0);
//! assert_eq!(boundaries.outro_start, 570.0);
//! assert!(boundaries.ad_segments.is_empty());
//! # Ok::<(), reelscan::ReelscanError>(())
//! ```

use std::fmt::{Display, Formatter, Result as FmtResult};

use image::GrayImage;
use serde::{Deserialize, Serialize};

use crate::{
    configuration::AnalysisOptions,
    conversion::{self, format_timestamp},
    error::ReelscanError,
    features::{self, FeatureExtractor},
    progress::{OperationType, ProgressTracker},
    scene::Scene,
    source::FrameSource,
};

/// A half-open time range in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeSpan {
    /// Start in seconds.
    pub start: f64,
    /// End in seconds.
    pub end: f64,
}

impl TimeSpan {
    /// Create a span.
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// Length of the span in seconds, never negative.
    pub fn duration(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }
}

/// A run of consecutive black samples.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlackFrameSegment {
    /// First black sample, in seconds.
    pub start: f64,
    /// First non-black sample after the run, in seconds.
    pub end: f64,
    /// `end - start`.
    pub duration: f64,
}

/// The intro / main content / outro partition of a video.
///
/// Always satisfies `0 <= intro_end <= outro_start <= total_duration`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentBoundaries {
    /// Duration of the whole video in seconds.
    pub total_duration: f64,
    /// End of the intro in seconds.
    pub intro_end: f64,
    /// Start of the outro in seconds.
    pub outro_start: f64,
    /// `intro_end..outro_start`.
    pub main_content: TimeSpan,
    /// Advertisement breaks inside the main content. Currently always empty.
    pub ad_segments: Vec<TimeSpan>,
    /// Black-frame runs inside the main content, ordered by start.
    pub black_frame_segments: Vec<BlackFrameSegment>,
}

impl ContentBoundaries {
    /// `0..intro_end`.
    pub fn intro(&self) -> TimeSpan {
        TimeSpan::new(0.0, self.intro_end)
    }

    /// `outro_start..total_duration`.
    pub fn outro(&self) -> TimeSpan {
        TimeSpan::new(self.outro_start, self.total_duration)
    }

    /// `intro_end..outro_start`.
    pub fn main_content(&self) -> TimeSpan {
        self.main_content
    }
}

impl Display for ContentBoundaries {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        writeln!(
            f,
            "Intro:        0:00 - {}",
            format_timestamp(self.intro_end)
        )?;
        writeln!(
            f,
            "Main content: {} - {} ({:.0}s)",
            format_timestamp(self.main_content.start),
            format_timestamp(self.main_content.end),
            self.main_content.duration()
        )?;
        write!(
            f,
            "Outro:        {} - {}",
            format_timestamp(self.outro_start),
            format_timestamp(self.total_duration)
        )?;
        for segment in &self.black_frame_segments {
            write!(
                f,
                "\nBlack frames: {} - {} ({:.0}s)",
                format_timestamp(segment.start),
                format_timestamp(segment.end),
                segment.duration
            )?;
        }
        Ok(())
    }
}

/// Cut frequency and edge density of one intro analysis window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntroWindow {
    /// Window start in seconds.
    pub start: f64,
    /// Window end in seconds.
    pub end: f64,
    /// Cuts between consecutive samples of the window, or scene starts
    /// inside it.
    pub cut_count: u32,
    /// `cut_count` per second of window.
    pub cut_frequency: f64,
    /// Edge density of the window's first frame (on-screen text proxy).
    pub edge_density: f64,
}

/// Thresholds, windows and fallbacks of the boundary heuristics.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryDetectionOptions {
    /// Leading seconds examined for the intro. Default: 180.
    pub intro_analysis_span: f64,
    /// Length of an intro window. Default: 10.
    pub intro_window: f64,
    /// Sampling cadence inside intro windows. Default: 1.
    pub intro_sample_interval: f64,
    /// Luma difference counted as a cut. Default: 30.
    pub intro_cut_threshold: f64,
    /// A window ends the intro when its frequency falls below this fraction
    /// of the previous window's. Default: 0.5.
    pub intro_frequency_drop: f64,
    /// Intro end when no drop is found, capped at the analysed span.
    /// Default: 30.
    pub default_intro_end: f64,
    /// Trailing seconds examined for the outro. Default: 300.
    pub outro_analysis_span: f64,
    /// The backward scan starts this many seconds before the end. Default: 30.
    pub outro_scan_offset: f64,
    /// Distance between outro candidates, and between the points checked
    /// after a black candidate. Default: 10.
    pub outro_scan_step: f64,
    /// Frames sampled for the rolling-credit test. Default: 5.
    pub credits_frame_count: u32,
    /// Spacing of those frames in seconds. Default: 0.2.
    pub credits_frame_spacing: f64,
    /// Mean lower-half difference that signals rolling credits. Default: 10.
    pub credits_motion_threshold: f64,
    /// Fallback outro length in seconds. Default: 60.
    pub default_outro_length: f64,
    /// Fallback outro start as a fraction of the duration. Default: 0.95.
    pub default_outro_ratio: f64,
    /// Mean luma below which a frame is black. Default: 20.
    pub black_luma_threshold: f64,
    /// Cadence of the black-frame scan. Default: 5.
    pub black_frame_interval: f64,
    /// Shortest reported black-frame run. Default: 2.
    pub min_black_segment: f64,
}

impl Default for BoundaryDetectionOptions {
    fn default() -> Self {
        Self {
            intro_analysis_span: 180.0,
            intro_window: 10.0,
            intro_sample_interval: 1.0,
            intro_cut_threshold: 30.0,
            intro_frequency_drop: 0.5,
            default_intro_end: 30.0,
            outro_analysis_span: 300.0,
            outro_scan_offset: 30.0,
            outro_scan_step: 10.0,
            credits_frame_count: 5,
            credits_frame_spacing: 0.2,
            credits_motion_threshold: 10.0,
            default_outro_length: 60.0,
            default_outro_ratio: 0.95,
            black_luma_threshold: 20.0,
            black_frame_interval: 5.0,
            min_black_segment: 2.0,
        }
    }
}

impl BoundaryDetectionOptions {
    /// Create options with the documented defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set how many leading seconds are examined for the intro.
    #[must_use]
    pub fn intro_analysis_span(mut self, seconds: f64) -> Self {
        self.intro_analysis_span = seconds;
        self
    }

    /// Set the intro window length.
    #[must_use]
    pub fn intro_window(mut self, seconds: f64) -> Self {
        self.intro_window = seconds;
        self
    }

    /// Set the luma difference counted as a cut in the intro.
    #[must_use]
    pub fn intro_cut_threshold(mut self, threshold: f64) -> Self {
        self.intro_cut_threshold = threshold;
        self
    }

    /// Set the fallback intro end.
    #[must_use]
    pub fn default_intro_end(mut self, seconds: f64) -> Self {
        self.default_intro_end = seconds;
        self
    }

    /// Set how many trailing seconds are examined for the outro.
    #[must_use]
    pub fn outro_analysis_span(mut self, seconds: f64) -> Self {
        self.outro_analysis_span = seconds;
        self
    }

    /// Set the lower-half motion that signals rolling credits.
    #[must_use]
    pub fn credits_motion_threshold(mut self, threshold: f64) -> Self {
        self.credits_motion_threshold = threshold;
        self
    }

    /// Set the mean luma below which a frame is black.
    #[must_use]
    pub fn black_luma_threshold(mut self, threshold: f64) -> Self {
        self.black_luma_threshold = threshold;
        self
    }

    /// Set the cadence of the black-frame scan.
    #[must_use]
    pub fn black_frame_interval(mut self, seconds: f64) -> Self {
        self.black_frame_interval = seconds;
        self
    }

    /// Set the shortest reported black-frame run.
    #[must_use]
    pub fn min_black_segment(mut self, seconds: f64) -> Self {
        self.min_black_segment = seconds;
        self
    }

    fn validate(&self) -> Result<(), ReelscanError> {
        let positive = [
            ("intro window", self.intro_window),
            ("intro sample interval", self.intro_sample_interval),
            ("outro scan step", self.outro_scan_step),
            ("black frame interval", self.black_frame_interval),
        ];
        for (name, value) in positive {
            if !(value > 0.0) {
                return Err(ReelscanError::InvalidConfiguration(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }

        let non_negative = [
            ("intro analysis span", self.intro_analysis_span),
            ("outro analysis span", self.outro_analysis_span),
            ("credits frame spacing", self.credits_frame_spacing),
            ("minimum black segment", self.min_black_segment),
        ];
        for (name, value) in non_negative {
            if value.is_nan() || value < 0.0 {
                return Err(ReelscanError::InvalidConfiguration(format!(
                    "{name} must be non-negative, got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// Locates intro, outro, black frames and ads in a video.
///
/// Holds configuration only; each call is independent.
#[derive(Debug, Clone, Default)]
pub struct ContentBoundaryDetector {
    options: BoundaryDetectionOptions,
    extractor: FeatureExtractor,
}

impl ContentBoundaryDetector {
    /// Create a detector with the default heuristics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the heuristic constants.
    #[must_use]
    pub fn with_options(mut self, options: BoundaryDetectionOptions) -> Self {
        self.options = options;
        self
    }

    /// Replace the feature extractor used for intro edge density.
    #[must_use]
    pub fn with_feature_extractor(mut self, extractor: FeatureExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    /// The heuristic constants in use.
    pub fn options(&self) -> &BoundaryDetectionOptions {
        &self.options
    }

    /// Detect all boundaries of `source`.
    ///
    /// `sample_duration` bounds the ad scan, which starts at the intro end.
    ///
    /// # Errors
    ///
    /// [`ReelscanError::InvalidConfiguration`] for a negative
    /// `sample_duration` or invalid options.
    pub fn detect_boundaries<S>(
        &self,
        source: &mut S,
        sample_duration: f64,
    ) -> Result<ContentBoundaries, ReelscanError>
    where
        S: FrameSource + ?Sized,
    {
        self.detect_boundaries_with_options(source, sample_duration, None, &AnalysisOptions::new())
    }

    /// Like [`detect_boundaries`](ContentBoundaryDetector::detect_boundaries),
    /// counting intro cuts from already detected scenes instead of sampling.
    ///
    /// # Errors
    ///
    /// As [`detect_boundaries`](ContentBoundaryDetector::detect_boundaries).
    pub fn detect_boundaries_with_scenes<S>(
        &self,
        source: &mut S,
        sample_duration: f64,
        scenes: &[Scene],
    ) -> Result<ContentBoundaries, ReelscanError>
    where
        S: FrameSource + ?Sized,
    {
        self.detect_boundaries_with_options(
            source,
            sample_duration,
            Some(scenes),
            &AnalysisOptions::new(),
        )
    }

    /// Full-control boundary detection with optional scenes, progress
    /// reporting and cancellation.
    ///
    /// # Errors
    ///
    /// As [`detect_boundaries`](ContentBoundaryDetector::detect_boundaries),
    /// plus [`ReelscanError::Cancelled`].
    pub fn detect_boundaries_with_options<S>(
        &self,
        source: &mut S,
        sample_duration: f64,
        scenes: Option<&[Scene]>,
        options: &AnalysisOptions,
    ) -> Result<ContentBoundaries, ReelscanError>
    where
        S: FrameSource + ?Sized,
    {
        if sample_duration.is_nan() || sample_duration < 0.0 {
            return Err(ReelscanError::InvalidConfiguration(format!(
                "ad scan duration must be non-negative, got {sample_duration}"
            )));
        }
        self.options.validate()?;

        let total = source.duration().max(0.0);
        log::debug!("Detecting content boundaries over {total:.2}s");
        let mut tracker = options.tracker(OperationType::BoundaryDetection, None);

        let windows = self.scan_intro_windows(source, scenes, options, &mut tracker)?;
        let intro_end = self.intro_end_from_windows(&windows, total).min(total);

        let outro_start = self
            .scan_outro(source, options, &mut tracker)?
            .max(intro_end)
            .min(total);

        let black_frame_segments =
            self.scan_black_frames(source, intro_end, outro_start, options, &mut tracker)?;

        let ad_window = TimeSpan::new(intro_end, (intro_end + sample_duration).min(outro_start));
        let ad_segments = self.detect_ads(ad_window);

        tracker.finish();

        let boundaries = ContentBoundaries {
            total_duration: total,
            intro_end,
            outro_start,
            main_content: TimeSpan::new(intro_end, outro_start),
            ad_segments,
            black_frame_segments,
        };
        log::info!(
            "Content boundaries: intro ends at {}, outro starts at {}, {} black segment(s)",
            format_timestamp(intro_end),
            format_timestamp(outro_start),
            boundaries.black_frame_segments.len()
        );
        Ok(boundaries)
    }

    /// Per-window cut frequency and edge density over the intro span.
    ///
    /// With `scenes`, cuts are the scene starts instead of sampled
    /// differences; edge density is still measured on the source.
    ///
    /// # Errors
    ///
    /// [`ReelscanError::InvalidConfiguration`] for invalid options,
    /// [`ReelscanError::Cancelled`] when the token fires.
    pub fn intro_windows<S>(
        &self,
        source: &mut S,
        scenes: Option<&[Scene]>,
        options: &AnalysisOptions,
    ) -> Result<Vec<IntroWindow>, ReelscanError>
    where
        S: FrameSource + ?Sized,
    {
        self.options.validate()?;
        let mut tracker = options.tracker(OperationType::BoundaryDetection, None);
        let windows = self.scan_intro_windows(source, scenes, options, &mut tracker)?;
        tracker.finish();
        Ok(windows)
    }

    /// Where the intro ends, in seconds.
    ///
    /// # Errors
    ///
    /// As [`intro_windows`](ContentBoundaryDetector::intro_windows).
    pub fn detect_intro<S>(
        &self,
        source: &mut S,
        scenes: Option<&[Scene]>,
        options: &AnalysisOptions,
    ) -> Result<f64, ReelscanError>
    where
        S: FrameSource + ?Sized,
    {
        let total = source.duration().max(0.0);
        let windows = self.intro_windows(source, scenes, options)?;
        Ok(self.intro_end_from_windows(&windows, total).min(total))
    }

    /// Where the outro starts, in seconds, before clamping against the intro.
    ///
    /// # Errors
    ///
    /// [`ReelscanError::InvalidConfiguration`] for invalid options,
    /// [`ReelscanError::Cancelled`] when the token fires.
    pub fn detect_outro<S>(
        &self,
        source: &mut S,
        options: &AnalysisOptions,
    ) -> Result<f64, ReelscanError>
    where
        S: FrameSource + ?Sized,
    {
        self.options.validate()?;
        let mut tracker = options.tracker(OperationType::BoundaryDetection, None);
        let outro_start = self.scan_outro(source, options, &mut tracker)?;
        tracker.finish();
        Ok(outro_start)
    }

    /// Black-frame runs between `start` and `end` seconds.
    ///
    /// [`detect_boundaries`](ContentBoundaryDetector::detect_boundaries)
    /// scans the main content only; this method scans any range.
    ///
    /// # Errors
    ///
    /// [`ReelscanError::InvalidConfiguration`] for invalid options,
    /// [`ReelscanError::Cancelled`] when the token fires.
    pub fn detect_black_frames<S>(
        &self,
        source: &mut S,
        start: f64,
        end: f64,
        options: &AnalysisOptions,
    ) -> Result<Vec<BlackFrameSegment>, ReelscanError>
    where
        S: FrameSource + ?Sized,
    {
        self.options.validate()?;
        let samples = conversion::sample_count(start.trunc(), end, self.options.black_frame_interval);
        let mut tracker = options.tracker(OperationType::BoundaryDetection, Some(samples));
        let segments = self.scan_black_frames(source, start, end, options, &mut tracker)?;
        tracker.finish();
        Ok(segments)
    }

    /// Advertisement breaks inside `window`.
    ///
    /// No ad detection policy exists yet, so this always returns an empty
    /// list; callers must treat the list as authoritative.
    pub fn detect_ads(&self, window: TimeSpan) -> Vec<TimeSpan> {
        log::debug!(
            "Ad scan window {} - {}: no ad detection policy, reporting none",
            format_timestamp(window.start),
            format_timestamp(window.end)
        );
        Vec::new()
    }

    fn intro_end_from_windows(&self, windows: &[IntroWindow], total: f64) -> f64 {
        let drop = windows.windows(2).find(|pair| {
            pair[1].cut_frequency < pair[0].cut_frequency * self.options.intro_frequency_drop
        });

        match drop {
            Some(pair) => {
                log::debug!(
                    "Cut frequency drops from {:.2}/s to {:.2}/s at {}, intro ends there",
                    pair[0].cut_frequency,
                    pair[1].cut_frequency,
                    format_timestamp(pair[1].start)
                );
                pair[1].start
            }
            None => {
                let span = self.options.intro_analysis_span.min(total);
                let fallback = self.options.default_intro_end.min(span);
                log::debug!("No cut frequency drop found, intro defaults to {fallback:.1}s");
                fallback
            }
        }
    }

    fn scan_intro_windows<S>(
        &self,
        source: &mut S,
        scenes: Option<&[Scene]>,
        options: &AnalysisOptions,
        tracker: &mut ProgressTracker,
    ) -> Result<Vec<IntroWindow>, ReelscanError>
    where
        S: FrameSource + ?Sized,
    {
        let span = self.options.intro_analysis_span.min(source.duration());
        let window_length = self.options.intro_window;
        let window_count = conversion::whole_window_count(span, window_length);

        let mut windows = Vec::with_capacity(window_count as usize);

        'windows: for index in 0..window_count {
            let start = index as f64 * window_length;
            let end = start + window_length;

            let (cut_count, edge_density, complete) = match scenes {
                Some(scenes) => {
                    if options.is_cancelled() {
                        return Err(ReelscanError::Cancelled);
                    }
                    let cuts = scenes
                        .iter()
                        .filter(|scene| scene.start > 0.0 && scene.start >= start && scene.start < end)
                        .count() as u32;
                    let Some(frame) = source.frame_at(start) else {
                        log::warn!("Frame unavailable at {start:.2}s, ending intro analysis early");
                        break 'windows;
                    };
                    tracker.advance(Some(start));
                    (cuts, Some(self.extractor.edge_density(&features::luma(&frame))), true)
                }
                None => self.sample_intro_window(source, start, end, options, tracker)?,
            };

            if let Some(edge_density) = edge_density {
                let window = IntroWindow {
                    start,
                    end,
                    cut_count,
                    cut_frequency: cut_count as f64 / (end - start),
                    edge_density,
                };
                log::debug!(
                    "Intro window {} - {}: {} cut(s), {:.3} cuts/s, edge density {:.3}",
                    format_timestamp(start),
                    format_timestamp(end),
                    window.cut_count,
                    window.cut_frequency,
                    window.edge_density
                );
                windows.push(window);
            }

            if !complete {
                break;
            }
        }

        Ok(windows)
    }

    /// Sample one intro window. Returns the cut count, the edge density of
    /// the first decoded frame (`None` when nothing decoded) and whether the
    /// window was sampled to its end. Cuts are only counted between samples
    /// of this window.
    fn sample_intro_window<S>(
        &self,
        source: &mut S,
        start: f64,
        end: f64,
        options: &AnalysisOptions,
        tracker: &mut ProgressTracker,
    ) -> Result<(u32, Option<f64>, bool), ReelscanError>
    where
        S: FrameSource + ?Sized,
    {
        let interval = self.options.intro_sample_interval;
        let mut cut_count = 0;
        let mut edge_density = None;
        let mut previous: Option<GrayImage> = None;

        for step in 0..conversion::sample_count(start, end, interval) {
            if options.is_cancelled() {
                return Err(ReelscanError::Cancelled);
            }

            let timestamp = start + step as f64 * interval;
            let Some(frame) = source.frame_at(timestamp) else {
                log::warn!("Frame unavailable at {timestamp:.2}s, ending intro analysis early");
                return Ok((cut_count, edge_density, false));
            };
            let gray = features::luma(&frame);

            if edge_density.is_none() {
                edge_density = Some(self.extractor.edge_density(&gray));
            }
            if let Some(previous) = previous.as_ref() {
                if features::mean_abs_difference(previous, &gray) > self.options.intro_cut_threshold {
                    cut_count += 1;
                }
            }

            previous = Some(gray);
            tracker.advance(Some(timestamp));
        }

        Ok((cut_count, edge_density, true))
    }

    fn scan_outro<S>(
        &self,
        source: &mut S,
        options: &AnalysisOptions,
        tracker: &mut ProgressTracker,
    ) -> Result<f64, ReelscanError>
    where
        S: FrameSource + ?Sized,
    {
        let total = source.duration().max(0.0);
        let window_start = total - self.options.outro_analysis_span.min(total);
        let stop = window_start.trunc();

        let mut candidate = (total - self.options.outro_scan_offset).trunc();
        while candidate > stop && candidate >= 0.0 {
            if options.is_cancelled() {
                return Err(ReelscanError::Cancelled);
            }

            if self.shows_rolling_credits(source, candidate) {
                log::debug!("Rolling credits at {}, outro starts there", format_timestamp(candidate));
                return Ok(candidate);
            }
            if self.is_black_until_end(source, candidate, total) {
                log::debug!(
                    "Black frame at {} followed only by black or credits, outro starts there",
                    format_timestamp(candidate)
                );
                return Ok(candidate);
            }

            tracker.advance(Some(candidate));
            candidate -= self.options.outro_scan_step;
        }

        let fallback =
            (total - self.options.default_outro_length).max(total * self.options.default_outro_ratio);
        log::debug!("No outro signature found, outro defaults to {fallback:.1}s");
        Ok(fallback.max(0.0))
    }

    /// Rolling-credit signature: sustained movement in the lower half over
    /// frames spaced across one second.
    fn shows_rolling_credits<S>(&self, source: &mut S, seconds: f64) -> bool
    where
        S: FrameSource + ?Sized,
    {
        let mut regions = Vec::with_capacity(self.options.credits_frame_count as usize);
        for index in 0..self.options.credits_frame_count {
            let timestamp = seconds + index as f64 * self.options.credits_frame_spacing;
            match source.frame_at(timestamp) {
                Some(frame) => regions.push(features::lower_half(&features::luma(&frame))),
                None => break,
            }
        }
        if regions.len() < 2 {
            return false;
        }

        let differences: Vec<f64> = regions
            .windows(2)
            .map(|pair| features::mean_abs_difference(&pair[0], &pair[1]))
            .collect();
        let mean = differences.iter().sum::<f64>() / differences.len() as f64;
        log::trace!("Lower-half movement at {seconds:.1}s: {mean:.2}");
        mean > self.options.credits_motion_threshold
    }

    fn is_black<S>(&self, source: &mut S, seconds: f64) -> Option<bool>
    where
        S: FrameSource + ?Sized,
    {
        source
            .frame_at(seconds)
            .map(|frame| features::mean_luma(&features::luma(&frame)) < self.options.black_luma_threshold)
    }

    /// A black frame at `seconds` after which every checked point up to the
    /// end is black or shows credits. The stream ending early counts as the
    /// end.
    fn is_black_until_end<S>(&self, source: &mut S, seconds: f64, total: f64) -> bool
    where
        S: FrameSource + ?Sized,
    {
        if self.is_black(source, seconds) != Some(true) {
            return false;
        }

        let step = self.options.outro_scan_step;
        for index in 1..conversion::sample_count(seconds, total, step) {
            let timestamp = seconds + index as f64 * step;
            match self.is_black(source, timestamp) {
                None => break,
                Some(true) => {}
                Some(false) => {
                    if !self.shows_rolling_credits(source, timestamp) {
                        return false;
                    }
                }
            }
        }
        true
    }

    fn scan_black_frames<S>(
        &self,
        source: &mut S,
        start: f64,
        end: f64,
        options: &AnalysisOptions,
        tracker: &mut ProgressTracker,
    ) -> Result<Vec<BlackFrameSegment>, ReelscanError>
    where
        S: FrameSource + ?Sized,
    {
        let first = start.trunc();
        let interval = self.options.black_frame_interval;
        let mut segments = Vec::new();
        let mut run_start: Option<f64> = None;
        let mut scan_end = end;

        for index in 0..conversion::sample_count(first, end, interval) {
            if options.is_cancelled() {
                return Err(ReelscanError::Cancelled);
            }

            let timestamp = first + index as f64 * interval;
            let Some(black) = self.is_black(source, timestamp) else {
                log::warn!("Frame unavailable at {timestamp:.2}s, ending black frame scan early");
                scan_end = timestamp;
                break;
            };

            if black {
                run_start.get_or_insert(timestamp);
            } else if let Some(run) = run_start.take() {
                self.push_black_segment(&mut segments, run, timestamp);
            }
            tracker.advance(Some(timestamp));
        }

        if let Some(run) = run_start {
            self.push_black_segment(&mut segments, run, scan_end);
        }

        log::debug!(
            "Found {} black frame segment(s) between {} and {}",
            segments.len(),
            format_timestamp(start),
            format_timestamp(end)
        );
        Ok(segments)
    }

    fn push_black_segment(&self, segments: &mut Vec<BlackFrameSegment>, start: f64, end: f64) {
        let duration = end - start;
        if duration >= self.options.min_black_segment {
            segments.push(BlackFrameSegment {
                start,
                end,
                duration,
            });
        }
    }
}
