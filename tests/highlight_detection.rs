//! Highlight scoring tests.

use std::sync::Arc;

use image::{GrayImage, Rgb, RgbImage};
use reelscan::{
    AnalysisOptions, CancellationToken, Dialogue, Highlight, HighlightOptions, HighlightScorer,
    HighlightType, ReelscanError, Scene, SyntheticVideo,
};

fn scene(id: usize, start: f64, end: f64, motion: f64, face_count: u32) -> Scene {
    Scene {
        id,
        start,
        end,
        brightness: 100.0,
        motion,
        face_count,
        description: String::new(),
        dialogues: Vec::new(),
    }
}

fn five_scenes() -> Vec<Scene> {
    vec![
        scene(0, 0.0, 40.0, 5.0, 0),
        scene(1, 40.0, 48.0, 12.0, 0),
        scene(2, 48.0, 60.0, 3.0, 1),
        scene(3, 60.0, 70.0, 25.0, 2),
        scene(4, 70.0, 72.0, 8.0, 0),
    ]
}

fn placeholder_video() -> SyntheticVideo {
    SyntheticVideo::solid(72.0, 10.0, 16, 16, [100, 100, 100])
}

/// Grey video with two bursts of alternating brightness.
fn bursty_video() -> SyntheticVideo {
    SyntheticVideo::new(120.0, 5.0, 32, 18, |seconds| {
        let in_burst = (30.0..40.0).contains(&seconds) || (80.0..90.0).contains(&seconds);
        let level = if !in_burst {
            120
        } else if (seconds as u32) % 2 == 0 {
            60
        } else {
            200
        };
        RgbImage::from_pixel(32, 18, Rgb([level, level, level]))
    })
}

fn assert_well_formed(highlights: &[Highlight], min_duration: f64, max_duration: f64) {
    for (index, highlight) in highlights.iter().enumerate() {
        assert_eq!(highlight.id, index);
        assert!(highlight.score >= 0.0);
        let duration = highlight.duration();
        assert!(
            duration >= min_duration && duration <= max_duration,
            "Highlight {index} lasts {duration}s"
        );
    }
    for pair in highlights.windows(2) {
        assert!(pair[0].start <= pair[1].start, "Highlights must be time-ordered");
        assert!(!pair[0].overlaps(&pair[1]), "Highlights must not overlap");
    }
}

// ── Scene-driven ──────────────────────────────────────────────────

#[test]
fn energetic_scene_outscores_long_static_scene() {
    let scenes = five_scenes();
    let scorer = HighlightScorer::new();

    assert_eq!(scorer.score_scene(&scenes[3]), 90.0);
    assert_eq!(scorer.score_scene(&scenes[0]), 15.0);

    let highlights = scorer
        .detect_highlights(&mut placeholder_video(), Some(&scenes), 1, 3.0, 30.0)
        .expect("Highlight detection failed");
    assert_eq!(highlights.len(), 1);
    assert_eq!((highlights[0].start, highlights[0].end), (60.0, 70.0));
    assert_eq!(highlights[0].kind, HighlightType::Action);
    assert_eq!(highlights[0].reason, "high-motion scene, characters on screen");
}

#[test]
fn scene_highlights_respect_duration_bounds() {
    let scenes = five_scenes();
    let highlights = HighlightScorer::new()
        .detect_highlights(&mut placeholder_video(), Some(&scenes), 5, 3.0, 30.0)
        .expect("Highlight detection failed");

    // The 2-second scene is too short; the 40-second one is truncated.
    let spans: Vec<(f64, f64)> = highlights.iter().map(|h| (h.start, h.end)).collect();
    assert_eq!(spans, vec![(0.0, 30.0), (40.0, 48.0), (48.0, 60.0), (60.0, 70.0)]);
    assert_well_formed(&highlights, 3.0, 30.0);
}

#[test]
fn scene_types_follow_features() {
    let mut group = scene(0, 0.0, 10.0, 4.0, 3);
    let mut talk = scene(1, 10.0, 20.0, 4.0, 1);
    talk.dialogues = (0..3)
        .map(|index| Dialogue {
            offset: index as f64,
            text: format!("line {index}"),
        })
        .collect();
    let quiet = scene(2, 20.0, 30.0, 4.0, 0);
    group.brightness = 200.0;

    let scenes = vec![group, talk, quiet];
    let highlights = HighlightScorer::new()
        .detect_highlights(&mut placeholder_video(), Some(&scenes), 3, 3.0, 30.0)
        .expect("Highlight detection failed");

    let kinds: Vec<HighlightType> = highlights.iter().map(|h| h.kind).collect();
    assert_eq!(
        kinds,
        vec![HighlightType::Group, HighlightType::Dialogue, HighlightType::Scenic]
    );
    assert_eq!(highlights[0].reason, "group interaction");
    assert_eq!(highlights[1].reason, "characters on screen, key dialogue");
    assert_eq!(highlights[2].reason, "high overall score");
    // 5 + 15 + 3 × 10 + 20 + 10
    assert_eq!(highlights[1].score, 80.0);
}

#[test]
fn zero_highlights_requested_is_empty() {
    let scenes = five_scenes();
    let scorer = HighlightScorer::new();

    let from_scenes = scorer
        .detect_highlights(&mut placeholder_video(), Some(&scenes), 0, 3.0, 30.0)
        .expect("Highlight detection failed");
    let from_samples = scorer
        .detect_highlights(&mut placeholder_video(), None, 0, 3.0, 30.0)
        .expect("Highlight detection failed");

    assert!(from_scenes.is_empty());
    assert!(from_samples.is_empty());
}

#[test]
fn empty_scene_list_falls_back_to_raw_samples() {
    let scorer = HighlightScorer::new();
    let from_empty = scorer
        .detect_highlights(&mut bursty_video(), Some(&[]), 3, 3.0, 30.0)
        .expect("Highlight detection failed");
    let from_samples = scorer
        .detect_highlights(&mut bursty_video(), None, 3, 3.0, 30.0)
        .expect("Highlight detection failed");

    assert_eq!(from_empty.len(), 3);
    assert_eq!(from_empty, from_samples);
}

// ── Raw samples ───────────────────────────────────────────────────

#[test]
fn raw_mode_picks_motion_bursts() {
    let highlights = HighlightScorer::new()
        .detect_highlights(&mut bursty_video(), None, 3, 3.0, 30.0)
        .expect("Highlight detection failed");

    let spans: Vec<(f64, f64)> = highlights.iter().map(|h| (h.start, h.end)).collect();
    assert_eq!(spans, vec![(0.0, 10.0), (32.0, 42.0), (82.0, 92.0)]);
    assert_eq!(highlights[1].kind, HighlightType::Action);
    assert_eq!(highlights[0].kind, HighlightType::Dialogue);
    assert!(highlights[1].reason.starts_with("high-motion moment (motion: 140.0)"));
    assert_well_formed(&highlights, 3.0, 30.0);
}

#[test]
fn raw_mode_keeps_starts_apart() {
    let highlights = HighlightScorer::new()
        .detect_highlights(&mut bursty_video(), None, 20, 4.0, 6.0)
        .expect("Highlight detection failed");

    assert!(highlights.len() > 3);
    for (index, first) in highlights.iter().enumerate() {
        for second in &highlights[index + 1..] {
            assert!((first.start - second.start).abs() >= 8.0);
        }
    }
    assert_well_formed(&highlights, 4.0, 6.0);
}

#[test]
fn raw_highlights_are_clipped_to_the_video() {
    let mut video = SyntheticVideo::solid(15.0, 5.0, 16, 16, [120, 120, 120]);
    let highlights = HighlightScorer::new()
        .detect_highlights(&mut video, None, 5, 3.0, 30.0)
        .expect("Highlight detection failed");

    let spans: Vec<(f64, f64)> = highlights.iter().map(|h| (h.start, h.end)).collect();
    assert_eq!(spans, vec![(0.0, 10.0), (10.0, 15.0)]);
    assert_well_formed(&highlights, 3.0, 30.0);
}

#[test]
fn raw_highlight_length_is_configurable() {
    let mut video = SyntheticVideo::solid(60.0, 5.0, 16, 16, [120, 120, 120]);
    let highlights = HighlightScorer::new()
        .with_options(HighlightOptions::new().preferred_duration(20.0))
        .detect_highlights(&mut video, None, 1, 3.0, 15.0)
        .expect("Highlight detection failed");

    // 20 seconds clamped to the 15-second maximum.
    assert_eq!(highlights.len(), 1);
    assert_eq!(highlights[0].duration(), 15.0);
}

#[test]
fn raw_mode_counts_faces() {
    let mut video = SyntheticVideo::solid(5.0, 5.0, 16, 16, [10, 10, 10]);
    let scorer = HighlightScorer::new().with_face_detector(Arc::new(|_: &GrayImage| 2u32));
    let highlights = scorer
        .detect_highlights(&mut video, None, 1, 1.0, 5.0)
        .expect("Highlight detection failed");

    // Dark frames earn no brightness bonus: the score is faces only.
    assert_eq!(highlights[0].score, 50.0);
}

// ── Errors ────────────────────────────────────────────────────────

#[test]
fn max_shorter_than_min_is_rejected() {
    let result =
        HighlightScorer::new().detect_highlights(&mut placeholder_video(), None, 3, 10.0, 5.0);

    match result {
        Err(ReelscanError::InvalidConfiguration(message)) => {
            assert!(message.contains("shorter than the minimum"), "{message}");
        }
        other => panic!("Expected InvalidConfiguration, got: {other:?}"),
    }
}

#[test]
fn non_positive_min_duration_is_rejected() {
    let scenes = five_scenes();
    let result = HighlightScorer::new().detect_highlights(
        &mut placeholder_video(),
        Some(&scenes),
        3,
        0.0,
        5.0,
    );
    assert!(matches!(result, Err(ReelscanError::InvalidConfiguration(_))));
}

#[test]
fn cancelled_scoring_returns_error() {
    let token = CancellationToken::new();
    token.cancel();
    let options = AnalysisOptions::new().with_cancellation(token);

    let result = HighlightScorer::new().detect_highlights_with_options(
        &mut bursty_video(),
        None,
        3,
        3.0,
        30.0,
        &options,
    );
    assert!(matches!(result, Err(ReelscanError::Cancelled)));
}

// ── Output ────────────────────────────────────────────────────────

#[test]
fn highlight_type_serializes_lowercase() {
    let scenes = five_scenes();
    let highlights = HighlightScorer::new()
        .detect_highlights(&mut placeholder_video(), Some(&scenes), 1, 3.0, 30.0)
        .expect("Highlight detection failed");

    let value = serde_json::to_value(&highlights[0]).expect("serialize");
    assert_eq!(value["type"], "action");
    assert_eq!(value["start"], 60.0);
}

#[test]
fn repeated_scoring_is_identical() {
    let scorer = HighlightScorer::new();
    let first = scorer
        .detect_highlights(&mut bursty_video(), None, 4, 3.0, 30.0)
        .expect("Highlight detection failed");
    let second = scorer
        .detect_highlights(&mut bursty_video(), None, 4, 3.0, 30.0)
        .expect("Highlight detection failed");

    assert_eq!(first, second);
}
