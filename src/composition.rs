//! Scene composition analysis.
//!
//! Describes the framing of a scene from its middle frame: whether edges
//! concentrate around the rule-of-thirds lines, how mirror-symmetric the
//! frame is, and a depth-of-field class derived from the variance of the
//! Laplacian (sharp, detailed frames score high). Straight lines are found
//! with a Hough transform over Canny edges, and the dominant colours with
//! k-means on a 100×100 thumbnail.

use std::collections::HashMap;

use image::{
    GrayImage, RgbImage,
    imageops::{self, FilterType},
};
use imageproc::{
    edges::canny,
    hough::{LineDetectionOptions, detect_lines},
};
use kmeans_colors::get_kmeans;
use palette::Srgb;
use serde::{Deserialize, Serialize};

use crate::{
    configuration::AnalysisOptions,
    error::ReelscanError,
    features::{self, DEFAULT_EDGE_THRESHOLD},
    progress::OperationType,
    scene::Scene,
    source::FrameSource,
};

/// Side of the square thumbnail the palette is clustered on.
const PALETTE_THUMBNAIL_SIDE: u32 = 100;
const PALETTE_MAX_ITERATIONS: usize = 20;
const PALETTE_CONVERGENCE: f32 = 0.0025;
const PALETTE_SEED: u64 = 42;

/// Depth-of-field class of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DepthOfField {
    /// Mostly blurred: low Laplacian variance.
    Shallow,
    /// In between.
    Medium,
    /// Sharp throughout: high Laplacian variance.
    Deep,
}

/// Composition features of one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Composition {
    /// Edges concentrate near the third lines.
    pub rule_of_thirds: bool,
    /// Horizontal mirror symmetry, 0 (none) to 1 (perfect).
    pub symmetry: f64,
    /// Depth-of-field class.
    pub depth: DepthOfField,
    /// Variance of the Laplacian the depth class was derived from.
    pub laplacian_variance: f64,
    /// Straight lines found by the Hough transform.
    pub leading_lines: usize,
    /// Dominant colours as `#rrggbb`, most common first.
    pub color_palette: Vec<String>,
}

/// Computes [`Composition`]s of frames and scenes.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositionAnalyzer {
    /// Sobel magnitude above which a pixel is an edge. Default: 100.
    pub edge_threshold: f64,
    /// Distance in pixels from a third line that counts as near it.
    /// Default: 20.
    pub thirds_margin: u32,
    /// Fraction of edges near the third lines required for
    /// `rule_of_thirds`. Default: 0.3.
    pub thirds_edge_ratio: f64,
    /// Laplacian variance below which depth is shallow. Default: 100.
    pub shallow_depth_variance: f64,
    /// Laplacian variance below which depth is medium. Default: 500.
    pub medium_depth_variance: f64,
    /// Canny hysteresis thresholds for line detection. Default: 50 and 150.
    pub canny_thresholds: (f32, f32),
    /// Hough votes a line needs. Default: 100.
    pub line_vote_threshold: u32,
    /// Radius of non-maximum suppression in Hough space. Default: 8.
    pub line_suppression_radius: u32,
    /// Number of palette colours. Default: 5.
    pub palette_size: usize,
}

impl Default for CompositionAnalyzer {
    fn default() -> Self {
        Self {
            edge_threshold: DEFAULT_EDGE_THRESHOLD,
            thirds_margin: 20,
            thirds_edge_ratio: 0.3,
            shallow_depth_variance: 100.0,
            medium_depth_variance: 500.0,
            canny_thresholds: (50.0, 150.0),
            line_vote_threshold: 100,
            line_suppression_radius: 8,
            palette_size: 5,
        }
    }
}

impl CompositionAnalyzer {
    /// Create an analyzer with the default thresholds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Analyze one frame.
    ///
    /// ```
    /// use image::{Rgb, RgbImage};
    /// use reelscan::{CompositionAnalyzer, DepthOfField};
    ///
    /// let flat = RgbImage::from_pixel(64, 36, Rgb([80, 80, 80]));
    /// let composition = CompositionAnalyzer::new().analyze_frame(&flat);
    ///
    /// assert_eq!(composition.symmetry, 1.0);
    /// assert_eq!(composition.depth, DepthOfField::Shallow);
    /// assert!(!composition.rule_of_thirds);
    /// assert_eq!(composition.leading_lines, 0);
    /// assert_eq!(composition.color_palette, vec!["#505050"]);
    /// ```
    pub fn analyze_frame(&self, frame: &RgbImage) -> Composition {
        let gray = features::luma(frame);
        let laplacian_variance = laplacian_variance(&gray);
        let depth = if laplacian_variance < self.shallow_depth_variance {
            DepthOfField::Shallow
        } else if laplacian_variance < self.medium_depth_variance {
            DepthOfField::Medium
        } else {
            DepthOfField::Deep
        };

        Composition {
            rule_of_thirds: self.follows_rule_of_thirds(&gray),
            symmetry: symmetry(&gray),
            depth,
            laplacian_variance,
            leading_lines: self.leading_lines(&gray),
            color_palette: self.color_palette(frame),
        }
    }

    /// Analyze the middle frame of `scene`. `None` when that frame cannot be
    /// decoded.
    pub fn analyze_scene<S>(&self, source: &mut S, scene: &Scene) -> Option<Composition>
    where
        S: FrameSource + ?Sized,
    {
        let frame = source.frame_at(scene.midpoint())?;
        Some(self.analyze_frame(&frame))
    }

    /// Analyze every scene, in order.
    ///
    /// # Errors
    ///
    /// [`ReelscanError::Cancelled`] when the token fires between scenes.
    pub fn analyze_scenes<S>(
        &self,
        source: &mut S,
        scenes: &[Scene],
        options: &AnalysisOptions,
    ) -> Result<Vec<Option<Composition>>, ReelscanError>
    where
        S: FrameSource + ?Sized,
    {
        let mut tracker =
            options.tracker(OperationType::CompositionAnalysis, Some(scenes.len() as u64));
        let mut compositions = Vec::with_capacity(scenes.len());

        for scene in scenes {
            if options.is_cancelled() {
                return Err(ReelscanError::Cancelled);
            }
            let composition = self.analyze_scene(source, scene);
            if composition.is_none() {
                log::warn!("Middle frame of scene {} unavailable, no composition", scene.id);
            }
            compositions.push(composition);
            tracker.advance(Some(scene.midpoint()));
        }

        tracker.finish();
        Ok(compositions)
    }

    fn follows_rule_of_thirds(&self, gray: &GrayImage) -> bool {
        let (width, height) = gray.dimensions();
        if width < 3 || height < 3 {
            return false;
        }

        let margin = self.thirds_margin as i64;
        let rows = [height as i64 / 3, 2 * height as i64 / 3];
        let columns = [width as i64 / 3, 2 * width as i64 / 3];
        let near = |lines: &[i64; 2], position: i64| {
            lines
                .iter()
                .filter(|&&line| position >= line - margin && position < line + margin)
                .count()
        };

        let threshold_squared = self.edge_threshold * self.edge_threshold;
        let inner_width = (width - 2) as usize;
        let mut total_edges = 0usize;
        let mut near_edges = 0usize;

        let magnitudes = features::sobel_magnitudes_squared(gray);
        for (index, _) in magnitudes
            .iter()
            .enumerate()
            .filter(|&(_, &magnitude)| magnitude >= threshold_squared)
        {
            let x = (index % inner_width) as i64 + 1;
            let y = (index / inner_width) as i64 + 1;
            total_edges += 1;
            // Crossings of a row band and a column band count once per band.
            near_edges += near(&rows, y) + near(&columns, x);
        }

        near_edges as f64 / (total_edges as f64 + 1.0) > self.thirds_edge_ratio
    }

    fn leading_lines(&self, gray: &GrayImage) -> usize {
        let (width, height) = gray.dimensions();
        if width < 3 || height < 3 {
            return 0;
        }

        let (low, high) = self.canny_thresholds;
        let edges = canny(gray, low, high);
        let options = LineDetectionOptions {
            vote_threshold: self.line_vote_threshold,
            suppression_radius: self.line_suppression_radius,
        };
        detect_lines(&edges, options).len()
    }

    /// Dominant colours of a thumbnail of `frame`. A thumbnail with no more
    /// distinct colours than the palette size lists them directly; otherwise
    /// they are clustered with seeded k-means.
    fn color_palette(&self, frame: &RgbImage) -> Vec<String> {
        if frame.width() == 0 || frame.height() == 0 || self.palette_size == 0 {
            return Vec::new();
        }

        let thumbnail = imageops::resize(
            frame,
            PALETTE_THUMBNAIL_SIDE,
            PALETTE_THUMBNAIL_SIDE,
            FilterType::Nearest,
        );
        let mut counts: HashMap<[u8; 3], usize> = HashMap::new();
        for pixel in thumbnail.pixels() {
            *counts.entry(pixel.0).or_default() += 1;
        }

        let mut colors: Vec<([u8; 3], usize)> = if counts.len() <= self.palette_size {
            counts.into_iter().collect()
        } else {
            let samples: Vec<Srgb> = thumbnail
                .pixels()
                .map(|pixel| Srgb::new(pixel[0], pixel[1], pixel[2]).into_format::<f32>())
                .collect();
            let clusters = get_kmeans(
                self.palette_size,
                PALETTE_MAX_ITERATIONS,
                PALETTE_CONVERGENCE,
                false,
                &samples,
                PALETTE_SEED,
            );

            let mut members = vec![0usize; clusters.centroids.len()];
            for &index in &clusters.indices {
                members[index as usize] += 1;
            }
            clusters
                .centroids
                .into_iter()
                .zip(members)
                .filter(|&(_, count)| count > 0)
                .map(|(centroid, count)| {
                    let centroid = centroid.into_format::<u8>();
                    ([centroid.red, centroid.green, centroid.blue], count)
                })
                .collect()
        };

        colors.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        log::trace!("Colour palette: {colors:?}");
        colors
            .into_iter()
            .map(|([red, green, blue], _)| format!("#{red:02x}{green:02x}{blue:02x}"))
            .collect()
    }
}

/// `1 - mean|left - mirrored right| / 255` over the two frame halves.
fn symmetry(gray: &GrayImage) -> f64 {
    let (width, height) = gray.dimensions();
    let half = width / 2;
    if half == 0 || height == 0 {
        return 1.0;
    }

    let mut sum: u64 = 0;
    for y in 0..height {
        for x in 0..half {
            let left = gray.get_pixel(x, y)[0];
            let right = gray.get_pixel(width - 1 - x, y)[0];
            sum += left.abs_diff(right) as u64;
        }
    }
    let mean = sum as f64 / (half as u64 * height as u64) as f64;
    1.0 - mean / 255.0
}

/// Variance of the 4-neighbour Laplacian over interior pixels.
fn laplacian_variance(gray: &GrayImage) -> f64 {
    let (width, height) = gray.dimensions();
    if width < 3 || height < 3 {
        return 0.0;
    }
    let (w, h) = (width as usize, height as usize);
    let pixels = gray.as_raw();
    let at = |x: usize, y: usize| pixels[y * w + x] as f64;

    let (mut sum, mut sum_sq, mut count) = (0.0, 0.0, 0.0);
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let value = at(x - 1, y) + at(x + 1, y) + at(x, y - 1) + at(x, y + 1) - 4.0 * at(x, y);
            sum += value;
            sum_sq += value * value;
            count += 1.0;
        }
    }
    let mean = sum / count;
    (sum_sq / count - mean * mean).max(0.0)
}
