//! Per-frame feature extraction.
//!
//! Every detector reduces decoded frames to a handful of scalars: mean luma
//! (brightness), mean absolute luma difference against the previous sample
//! (motion), the fraction of edge pixels (a proxy for on-screen text and
//! graphics), hue plus saturation variance (visual busyness), and a face
//! count from a pluggable [`FaceDetector`].
//!
//! # Example
//!
//! ```
//! use image::{Rgb, RgbImage};
//! use reelscan::FeatureExtractor;
//!
//! let dark = RgbImage::from_pixel(32, 32, Rgb([10, 10, 10]));
//! let bright = RgbImage::from_pixel(32, 32, Rgb([210, 210, 210]));
//!
//! let extractor = FeatureExtractor::new();
//! let sample = extractor.extract(1.0, Some(&bright), Some(&dark));
//! assert!((sample.brightness - 210.0).abs() < 1.0);
//! assert!((sample.motion_vs_prev - 200.0).abs() < 1.0);
//! assert_eq!(sample.face_count, 0);
//! ```

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::Arc;

use image::{GrayImage, RgbImage, imageops};
use serde::{Deserialize, Serialize};

/// Default Sobel gradient magnitude above which a pixel counts as an edge.
pub const DEFAULT_EDGE_THRESHOLD: f64 = 100.0;

/// Scalar features of one sampled frame.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FrameSample {
    /// Position of the sample in seconds.
    pub timestamp: f64,
    /// Mean luma, 0–255.
    pub brightness: f64,
    /// Mean absolute luma difference against the previous sample, or 0.
    pub motion_vs_prev: f64,
    /// Fraction of pixels classified as edges, 0–1.
    pub edge_density: f64,
    /// Hue variance plus saturation variance in 8-bit HSV.
    pub color_variance: f64,
    /// Number of frontal faces found.
    pub face_count: u32,
}

impl FrameSample {
    /// The all-zero sample returned for an absent frame.
    pub fn empty(timestamp: f64) -> Self {
        Self {
            timestamp,
            ..Self::default()
        }
    }
}

/// Frontal-face detection capability.
///
/// Face detection is an external model; implement this trait to plug one
/// in. Detectors call it on a single representative grayscale frame, never
/// on every sample of a scene. Closures of type `Fn(&GrayImage) -> u32`
/// implement it directly.
pub trait FaceDetector: Send + Sync {
    /// Count the frontal faces visible in `frame`.
    fn count_faces(&self, frame: &GrayImage) -> u32;
}

impl<F> FaceDetector for F
where
    F: Fn(&GrayImage) -> u32 + Send + Sync,
{
    fn count_faces(&self, frame: &GrayImage) -> u32 {
        self(frame)
    }
}

/// A [`FaceDetector`] for deployments without a face model. Always reports
/// zero faces.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFaceDetector;

impl FaceDetector for NoFaceDetector {
    fn count_faces(&self, _frame: &GrayImage) -> u32 {
        0
    }
}

/// Computes [`FrameSample`]s from decoded frames.
#[derive(Clone)]
pub struct FeatureExtractor {
    edge_threshold: f64,
    face_detector: Arc<dyn FaceDetector>,
}

impl Debug for FeatureExtractor {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("FeatureExtractor")
            .field("edge_threshold", &self.edge_threshold)
            .finish_non_exhaustive()
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureExtractor {
    /// Create an extractor with the default edge threshold and no face model.
    pub fn new() -> Self {
        Self {
            edge_threshold: DEFAULT_EDGE_THRESHOLD,
            face_detector: Arc::new(NoFaceDetector),
        }
    }

    /// Set the Sobel magnitude above which a pixel counts as an edge.
    #[must_use]
    pub fn with_edge_threshold(mut self, threshold: f64) -> Self {
        self.edge_threshold = threshold;
        self
    }

    /// Plug in a face detector.
    #[must_use]
    pub fn with_face_detector(mut self, detector: Arc<dyn FaceDetector>) -> Self {
        self.face_detector = detector;
        self
    }

    /// Compute all features of `frame`, with motion measured against
    /// `previous`.
    ///
    /// An absent frame yields [`FrameSample::empty`]; the caller decides
    /// whether that means end-of-stream.
    pub fn extract(
        &self,
        timestamp: f64,
        frame: Option<&RgbImage>,
        previous: Option<&RgbImage>,
    ) -> FrameSample {
        let Some(frame) = frame else {
            return FrameSample::empty(timestamp);
        };
        let gray = luma(frame);
        let previous_gray = previous.map(luma);
        self.sample(timestamp, frame, &gray, previous_gray.as_ref())
    }

    /// Count faces on a representative grayscale frame.
    pub fn count_faces(&self, frame: &GrayImage) -> u32 {
        self.face_detector.count_faces(frame)
    }

    /// Edge density of a grayscale frame under this extractor's threshold.
    pub fn edge_density(&self, frame: &GrayImage) -> f64 {
        edge_density(frame, self.edge_threshold)
    }

    /// Feature computation over an already converted luma plane.
    pub(crate) fn sample(
        &self,
        timestamp: f64,
        frame: &RgbImage,
        gray: &GrayImage,
        previous_gray: Option<&GrayImage>,
    ) -> FrameSample {
        FrameSample {
            timestamp,
            brightness: mean_luma(gray),
            motion_vs_prev: previous_gray
                .map(|previous| mean_abs_difference(previous, gray))
                .unwrap_or(0.0),
            edge_density: self.edge_density(gray),
            color_variance: color_variance(frame),
            face_count: self.count_faces(gray),
        }
    }
}

/// Convert an RGB frame to its luma plane.
pub fn luma(frame: &RgbImage) -> GrayImage {
    imageops::grayscale(frame)
}

/// Mean luma over the full frame, 0–255.
pub fn mean_luma(frame: &GrayImage) -> f64 {
    let pixels = frame.as_raw();
    if pixels.is_empty() {
        return 0.0;
    }
    pixels.iter().map(|&p| p as u64).sum::<u64>() as f64 / pixels.len() as f64
}

/// Mean absolute per-pixel difference between two luma planes.
///
/// Frames of different sizes are compared over their overlapping region.
pub fn mean_abs_difference(a: &GrayImage, b: &GrayImage) -> f64 {
    let width = a.width().min(b.width());
    let height = a.height().min(b.height());
    let total = (width as u64) * (height as u64);
    if total == 0 {
        return 0.0;
    }

    if a.dimensions() == b.dimensions() {
        let sum: u64 = a
            .as_raw()
            .iter()
            .zip(b.as_raw())
            .map(|(&p, &q)| p.abs_diff(q) as u64)
            .sum();
        return sum as f64 / total as f64;
    }

    let mut sum: u64 = 0;
    for y in 0..height {
        for x in 0..width {
            sum += a.get_pixel(x, y)[0].abs_diff(b.get_pixel(x, y)[0]) as u64;
        }
    }
    sum as f64 / total as f64
}

/// Fraction of pixels whose Sobel gradient magnitude reaches `threshold`.
///
/// Border pixels have no full neighbourhood and never count as edges, but
/// they do count towards the total.
pub fn edge_density(frame: &GrayImage, threshold: f64) -> f64 {
    let (width, height) = frame.dimensions();
    let total = (width as u64) * (height as u64);
    if width < 3 || height < 3 {
        return 0.0;
    }

    let threshold_squared = threshold * threshold;
    let edges = sobel_magnitudes_squared(frame)
        .into_iter()
        .filter(|&magnitude| magnitude >= threshold_squared)
        .count();
    edges as f64 / total as f64
}

/// Squared Sobel gradient magnitude of every interior pixel, row-major.
pub(crate) fn sobel_magnitudes_squared(frame: &GrayImage) -> Vec<f64> {
    let (width, height) = frame.dimensions();
    if width < 3 || height < 3 {
        return Vec::new();
    }
    let (w, h) = (width as usize, height as usize);
    let pixels = frame.as_raw();
    let at = |x: usize, y: usize| pixels[y * w + x] as f64;

    let mut magnitudes = Vec::with_capacity((w - 2) * (h - 2));
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let gx = (at(x + 1, y - 1) + 2.0 * at(x + 1, y) + at(x + 1, y + 1))
                - (at(x - 1, y - 1) + 2.0 * at(x - 1, y) + at(x - 1, y + 1));
            let gy = (at(x - 1, y + 1) + 2.0 * at(x, y + 1) + at(x + 1, y + 1))
                - (at(x - 1, y - 1) + 2.0 * at(x, y - 1) + at(x + 1, y - 1));
            magnitudes.push(gx * gx + gy * gy);
        }
    }
    magnitudes
}

/// Hue variance plus saturation variance, with hue in `[0, 180)` and
/// saturation in `[0, 255]` (8-bit HSV conventions).
pub fn color_variance(frame: &RgbImage) -> f64 {
    let count = (frame.width() as u64 * frame.height() as u64) as f64;
    if count == 0.0 {
        return 0.0;
    }

    let (mut hue_sum, mut hue_sq, mut sat_sum, mut sat_sq) = (0.0, 0.0, 0.0, 0.0);
    for pixel in frame.pixels() {
        let (hue, saturation) = hue_saturation(pixel.0);
        hue_sum += hue;
        hue_sq += hue * hue;
        sat_sum += saturation;
        sat_sq += saturation * saturation;
    }

    let variance = |sum: f64, sum_sq: f64| {
        let mean = sum / count;
        (sum_sq / count - mean * mean).max(0.0)
    };
    variance(hue_sum, hue_sq) + variance(sat_sum, sat_sq)
}

fn hue_saturation([r, g, b]: [u8; 3]) -> (f64, f64) {
    let (r, g, b) = (r as f64, g as f64, b as f64);
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let saturation = if max > 0.0 { delta / max * 255.0 } else { 0.0 };
    if delta == 0.0 {
        return (0.0, saturation);
    }

    let degrees = if max == r {
        60.0 * (g - b) / delta
    } else if max == g {
        120.0 + 60.0 * (b - r) / delta
    } else {
        240.0 + 60.0 * (r - g) / delta
    };
    let degrees = if degrees < 0.0 { degrees + 360.0 } else { degrees };
    (degrees / 2.0, saturation)
}

/// The lower half of a luma plane, where subtitles and end credits live.
pub fn lower_half(frame: &GrayImage) -> GrayImage {
    let (width, height) = frame.dimensions();
    let top = height / 2;
    imageops::crop_imm(frame, 0, top, width, height - top).to_image()
}
