//! Feature extraction tests.

use std::sync::Arc;

use image::{GrayImage, Luma, Rgb, RgbImage};
use reelscan::{FeatureExtractor, FrameSample, NoFaceDetector, features};

fn solid(level: u8) -> RgbImage {
    RgbImage::from_pixel(32, 32, Rgb([level, level, level]))
}

/// Vertical stripes two pixels wide.
fn stripes() -> RgbImage {
    RgbImage::from_fn(32, 32, |x, _| {
        if (x / 2) % 2 == 0 {
            Rgb([0, 0, 0])
        } else {
            Rgb([255, 255, 255])
        }
    })
}

// ── Brightness and motion ─────────────────────────────────────────

#[test]
fn brightness_is_mean_luma() {
    let sample = FeatureExtractor::new().extract(0.0, Some(&solid(137)), None);
    assert_eq!(sample.brightness, 137.0);
}

#[test]
fn motion_without_previous_frame_is_zero() {
    let sample = FeatureExtractor::new().extract(3.0, Some(&solid(200)), None);
    assert_eq!(sample.motion_vs_prev, 0.0);
    assert_eq!(sample.timestamp, 3.0);
}

#[test]
fn motion_is_mean_absolute_difference() {
    let sample = FeatureExtractor::new().extract(1.0, Some(&solid(90)), Some(&solid(60)));
    assert_eq!(sample.motion_vs_prev, 30.0);
}

#[test]
fn absent_frame_yields_empty_sample() {
    let sample = FeatureExtractor::new().extract(12.0, None, Some(&solid(60)));
    assert_eq!(sample, FrameSample::empty(12.0));
    assert_eq!(sample.brightness, 0.0);
    assert_eq!(sample.face_count, 0);
}

#[test]
fn difference_of_mismatched_sizes_uses_overlap() {
    let small = GrayImage::from_pixel(4, 4, Luma([10]));
    let large = GrayImage::from_pixel(8, 8, Luma([30]));
    assert_eq!(features::mean_abs_difference(&small, &large), 20.0);
}

// ── Edges and colour ──────────────────────────────────────────────

#[test]
fn flat_frame_has_no_edges() {
    let sample = FeatureExtractor::new().extract(0.0, Some(&solid(128)), None);
    assert_eq!(sample.edge_density, 0.0);
}

#[test]
fn stripes_are_dense_in_edges() {
    let sample = FeatureExtractor::new().extract(0.0, Some(&stripes()), None);
    // Every interior pixel is an edge; the border never is.
    let expected = (30.0 * 30.0) / (32.0 * 32.0);
    assert!((sample.edge_density - expected).abs() < 1e-9, "{}", sample.edge_density);
}

#[test]
fn edge_threshold_is_configurable() {
    let extractor = FeatureExtractor::new().with_edge_threshold(5000.0);
    let sample = extractor.extract(0.0, Some(&stripes()), None);
    assert_eq!(sample.edge_density, 0.0);
}

#[test]
fn grey_frames_have_no_color_variance() {
    assert_eq!(features::color_variance(&solid(77)), 0.0);
}

#[test]
fn two_hues_have_hue_variance() {
    // Half pure red (hue 0), half pure blue (hue 120 on the 0..180 scale).
    let frame = RgbImage::from_fn(10, 10, |x, _| {
        if x < 5 {
            Rgb([255, 0, 0])
        } else {
            Rgb([0, 0, 255])
        }
    });
    let variance = features::color_variance(&frame);
    assert!((variance - 3600.0).abs() < 1e-6, "{variance}");
}

#[test]
fn lower_half_keeps_the_bottom_rows() {
    let frame = GrayImage::from_fn(6, 5, |_, y| Luma([y as u8]));
    let half = features::lower_half(&frame);
    assert_eq!(half.dimensions(), (6, 3));
    assert_eq!(half.get_pixel(0, 0)[0], 2);
}

// ── Faces ─────────────────────────────────────────────────────────

#[test]
fn default_extractor_reports_no_faces() {
    let sample = FeatureExtractor::new().extract(0.0, Some(&stripes()), None);
    assert_eq!(sample.face_count, 0);
}

#[test]
fn closure_face_detector_is_used() {
    let extractor = FeatureExtractor::new().with_face_detector(Arc::new(|_: &GrayImage| 3u32));
    let sample = extractor.extract(0.0, Some(&solid(100)), None);
    assert_eq!(sample.face_count, 3);
    assert_eq!(extractor.count_faces(&GrayImage::new(4, 4)), 3);
}

#[test]
fn explicit_no_face_detector() {
    let extractor = FeatureExtractor::new().with_face_detector(Arc::new(NoFaceDetector));
    assert_eq!(extractor.count_faces(&GrayImage::new(4, 4)), 0);
}

#[test]
fn sample_serializes_to_flat_json() {
    let sample = FeatureExtractor::new().extract(2.0, Some(&solid(50)), None);
    let value = serde_json::to_value(sample).expect("serialize");
    assert_eq!(value["timestamp"], 2.0);
    assert_eq!(value["brightness"], 50.0);
}
