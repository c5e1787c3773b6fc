//! Scene segmentation integration tests.
//!
//! All sources are generated in memory with `SyntheticVideo`.

use std::sync::Arc;

use image::{GrayImage, Rgb, RgbImage};
use reelscan::{
    AnalysisOptions, CancellationToken, ReelscanError, Scene, SceneDetectionOptions,
    SceneSegmenter, Subtitle, SyntheticVideo, attach_dialogues,
};

fn three_shot_video() -> SyntheticVideo {
    SyntheticVideo::shots(
        25.0,
        64,
        36,
        &[
            (40.0, [30, 30, 30]),
            (80.0, [200, 200, 200]),
            (120.0, [90, 90, 90]),
        ],
    )
}

fn assert_gapless(scenes: &[Scene], analyzed_duration: f64) {
    assert!(!scenes.is_empty(), "Expected at least one scene");
    assert_eq!(scenes[0].start, 0.0);
    for pair in scenes.windows(2) {
        assert_eq!(pair[0].end, pair[1].start, "Scenes must be contiguous");
    }
    for (index, scene) in scenes.iter().enumerate() {
        assert_eq!(scene.id, index);
        assert!(scene.end > scene.start, "Scene {index} is empty");
    }
    assert_eq!(scenes.last().map(|scene| scene.end), Some(analyzed_duration));
}

// ── Cuts ───────────────────────────────────────────────────────────

#[test]
fn hard_cuts_split_into_three_scenes() {
    let mut video = three_shot_video();
    let scenes = SceneSegmenter::new()
        .detect_scenes(&mut video, 600.0, 30.0)
        .expect("Scene detection failed");

    let bounds: Vec<(f64, f64)> = scenes.iter().map(|scene| (scene.start, scene.end)).collect();
    assert_eq!(bounds, vec![(0.0, 40.0), (40.0, 80.0), (80.0, 120.0)]);
}

#[test]
fn threshold_above_every_difference_yields_one_scene() {
    let mut video = three_shot_video();
    let scenes = SceneSegmenter::new()
        .detect_scenes(&mut video, 600.0, 255.0)
        .expect("Scene detection failed");

    assert_eq!(scenes.len(), 1);
    assert_gapless(&scenes, 120.0);
}

#[test]
fn scenes_are_gapless_for_irregular_content() {
    let mut video = SyntheticVideo::new(97.5, 24.0, 48, 27, |seconds| {
        let level = ((seconds / 7.0) as u32 * 53 % 256) as u8;
        RgbImage::from_pixel(48, 27, Rgb([level, level / 2, 255 - level]))
    });
    let scenes = SceneSegmenter::new()
        .detect_scenes(&mut video, 600.0, 20.0)
        .expect("Scene detection failed");

    assert!(scenes.len() > 1);
    assert_gapless(&scenes, 97.5);
}

#[test]
fn max_duration_limits_the_analysed_range() {
    let mut video = three_shot_video();
    let scenes = SceneSegmenter::new()
        .detect_scenes(&mut video, 50.0, 30.0)
        .expect("Scene detection failed");

    assert_eq!(scenes.len(), 2);
    assert_gapless(&scenes, 50.0);
}

#[test]
fn stream_shorter_than_one_interval_is_one_scene() {
    let mut video = SyntheticVideo::solid(0.5, 30.0, 16, 16, [120, 120, 120]);
    let scenes = SceneSegmenter::new()
        .detect_scenes(&mut video, 600.0, 30.0)
        .expect("Scene detection failed");

    assert_eq!(scenes.len(), 1);
    assert_eq!((scenes[0].start, scenes[0].end), (0.0, 0.5));
}

#[test]
fn empty_stream_yields_no_scenes() {
    let mut video = SyntheticVideo::solid(0.0, 30.0, 16, 16, [120, 120, 120]);
    let scenes = SceneSegmenter::new()
        .detect_scenes(&mut video, 600.0, 30.0)
        .expect("Scene detection failed");

    assert!(scenes.is_empty());
}

#[test]
fn coarser_sampling_interval_places_cuts_on_the_grid() {
    let mut video = SyntheticVideo::shots(10.0, 32, 18, &[(7.0, [0, 0, 0]), (20.0, [250, 250, 250])]);
    let scenes = SceneSegmenter::new()
        .with_options(SceneDetectionOptions::new().sample_interval(2.0))
        .detect_scenes(&mut video, 600.0, 30.0)
        .expect("Scene detection failed");

    assert_eq!(scenes.len(), 2);
    assert_eq!(scenes[1].start, 8.0);
    assert_gapless(&scenes, 20.0);
}

// ── Scene features ────────────────────────────────────────────────

#[test]
fn scene_brightness_and_description() {
    let mut video = SyntheticVideo::solid(10.0, 25.0, 32, 18, [30, 30, 30]);
    let scenes = SceneSegmenter::new()
        .detect_scenes(&mut video, 600.0, 30.0)
        .expect("Scene detection failed");

    assert_eq!(scenes.len(), 1);
    assert!((scenes[0].brightness - 30.0).abs() < 1e-9);
    assert_eq!(scenes[0].motion, 0.0);
    assert_eq!(scenes[0].face_count, 0);
    assert_eq!(scenes[0].description, "dark, static");
}

#[test]
fn motion_below_threshold_is_averaged_within_the_scene() {
    let mut video = SyntheticVideo::new(20.0, 25.0, 32, 18, |seconds| {
        let level = if (seconds as u64) % 2 == 0 { 100 } else { 115 };
        RgbImage::from_pixel(32, 18, Rgb([level, level, level]))
    });
    let scenes = SceneSegmenter::new()
        .detect_scenes(&mut video, 600.0, 30.0)
        .expect("Scene detection failed");

    assert_eq!(scenes.len(), 1);
    assert!((scenes[0].motion - 15.0).abs() < 1e-9);
    assert!((scenes[0].brightness - 107.5).abs() < 1e-9);
    assert_eq!(scenes[0].description, "normal light, medium motion");
}

#[test]
fn faces_are_counted_on_the_middle_sample() {
    // Brightness encodes the timestamp; the detector reports it back.
    let mut video = SyntheticVideo::new(9.0, 10.0, 16, 16, |seconds| {
        let level = seconds as u8;
        RgbImage::from_pixel(16, 16, Rgb([level, level, level]))
    });
    let detector = Arc::new(|frame: &GrayImage| frame.get_pixel(0, 0)[0] as u32);
    let scenes = SceneSegmenter::new()
        .with_face_detector(detector)
        .detect_scenes(&mut video, 600.0, 30.0)
        .expect("Scene detection failed");

    // Samples 0..=8, middle sample is index 4.
    assert_eq!(scenes.len(), 1);
    assert_eq!(scenes[0].face_count, 4);
    assert!(scenes[0].description.ends_with("4 people"));
}

// ── Failure handling ──────────────────────────────────────────────

#[test]
fn decode_failure_keeps_accumulated_scenes() {
    let mut video = three_shot_video().unavailable_after(55.0);
    let scenes = SceneSegmenter::new()
        .detect_scenes(&mut video, 600.0, 30.0)
        .expect("Scene detection failed");

    assert_eq!(scenes.len(), 2);
    assert_eq!(scenes[1].start, 40.0);
    assert_gapless(&scenes, 120.0);
}

#[test]
fn unavailable_first_frame_yields_no_scenes() {
    let mut video = three_shot_video().unavailable_after(0.0);
    let scenes = SceneSegmenter::new()
        .detect_scenes(&mut video, 600.0, 30.0)
        .expect("Scene detection failed");

    assert!(scenes.is_empty());
}

#[test]
fn negative_threshold_is_rejected() {
    let mut video = three_shot_video();
    let result = SceneSegmenter::new().detect_scenes(&mut video, 600.0, -1.0);

    match result {
        Err(ReelscanError::InvalidConfiguration(message)) => {
            assert!(message.contains("threshold"), "Unexpected message: {message}");
        }
        other => panic!("Expected InvalidConfiguration, got: {other:?}"),
    }
}

#[test]
fn zero_sampling_interval_is_rejected() {
    let mut video = three_shot_video();
    let result = SceneSegmenter::new()
        .with_options(SceneDetectionOptions::new().sample_interval(0.0))
        .detect_scenes(&mut video, 600.0, 30.0);

    assert!(matches!(result, Err(ReelscanError::InvalidConfiguration(_))));
}

#[test]
fn cancelled_detection_returns_error() {
    let token = CancellationToken::new();
    token.cancel();
    let options = AnalysisOptions::new().with_cancellation(token);

    let mut video = three_shot_video();
    let result = SceneSegmenter::new().detect_scenes_with_options(&mut video, 600.0, 30.0, &options);

    assert!(matches!(result, Err(ReelscanError::Cancelled)));
}

#[test]
fn repeated_detection_is_identical() {
    let segmenter = SceneSegmenter::new();
    let first = segmenter
        .detect_scenes(&mut three_shot_video(), 600.0, 30.0)
        .expect("Scene detection failed");
    let second = segmenter
        .detect_scenes(&mut three_shot_video(), 600.0, 30.0)
        .expect("Scene detection failed");

    assert_eq!(
        serde_json::to_string(&first).expect("serialize"),
        serde_json::to_string(&second).expect("serialize"),
    );
}

// ── Dialogues ─────────────────────────────────────────────────────

#[test]
fn dialogues_attach_to_the_scene_they_start_in() {
    let mut video = three_shot_video();
    let mut scenes = SceneSegmenter::new()
        .detect_scenes(&mut video, 600.0, 30.0)
        .expect("Scene detection failed");

    let line = |start: f64, text: &str| Subtitle {
        start,
        end: start + 2.0,
        text: text.to_string(),
    };
    let subtitles = vec![
        line(5.0, "hello"),
        line(39.5, "still first"),
        line(40.0, "second"),
        line(130.0, "after the end"),
    ];
    attach_dialogues(&mut scenes, &subtitles);

    let texts: Vec<Vec<&str>> = scenes
        .iter()
        .map(|scene| scene.dialogues.iter().map(|d| d.text.as_str()).collect())
        .collect();
    assert_eq!(texts, vec![vec!["hello", "still first"], vec!["second"], vec![]]);
    assert_eq!(scenes[1].dialogues[0].offset, 0.0);
    assert_eq!(scenes[0].dialogues[1].offset, 39.5);
}

#[test]
fn scene_json_uses_flat_records() {
    let mut video = three_shot_video();
    let scenes = SceneSegmenter::new()
        .detect_scenes(&mut video, 600.0, 30.0)
        .expect("Scene detection failed");

    let value = serde_json::to_value(&scenes[1]).expect("serialize");
    assert_eq!(value["start"], 40.0);
    assert_eq!(value["end"], 80.0);
    assert!(value.get("dialogues").is_none(), "Empty dialogues are omitted");
}
