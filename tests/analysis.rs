//! Whole-video analysis tests.

use std::sync::Arc;

use image::GrayImage;
use reelscan::{
    AnalysisOptions, AnalysisReport, AnalysisRequest, Analyzer, CancellationToken, HighlightType,
    ReelscanError, Subtitle, SyntheticVideo,
};

fn three_shot_video() -> SyntheticVideo {
    SyntheticVideo::shots(
        10.0,
        32,
        18,
        &[
            (40.0, [30, 30, 30]),
            (80.0, [200, 200, 200]),
            (120.0, [90, 90, 90]),
        ],
    )
}

// ── Full runs ─────────────────────────────────────────────────────

#[test]
fn analysis_combines_every_detector() {
    let report = Analyzer::new()
        .with_request(AnalysisRequest::new().max_highlights(2))
        .analyze(&three_shot_video())
        .expect("Analysis failed");

    assert_eq!(report.metadata.width, 32);
    assert_eq!(report.scenes.len(), 3);
    assert!(report.highlights.len() <= 2);
    assert!(report.compositions.is_empty());

    let boundaries = &report.boundaries;
    assert_eq!(boundaries.total_duration, 120.0);
    assert!(boundaries.intro_end <= boundaries.outro_start);
    assert!(boundaries.outro_start <= boundaries.total_duration);
    assert!(boundaries.ad_segments.is_empty());
}

#[test]
fn subtitles_turn_a_scene_into_dialogue() {
    let subtitles = [42.0, 50.0, 61.0]
        .iter()
        .map(|&start| Subtitle {
            start,
            end: start + 3.0,
            text: format!("line at {start}"),
        })
        .collect();
    let request = AnalysisRequest::new().max_highlights(1).subtitles(subtitles);

    let report = Analyzer::new()
        .with_request(request)
        .analyze(&three_shot_video())
        .expect("Analysis failed");

    assert_eq!(report.scenes[1].dialogues.len(), 3);
    assert_eq!(report.highlights.len(), 1);
    let highlight = &report.highlights[0];
    assert_eq!(highlight.kind, HighlightType::Dialogue);
    assert_eq!((highlight.start, highlight.end), (40.0, 70.0));
    assert_eq!(highlight.reason, "key dialogue");
}

#[test]
fn raw_highlights_can_be_requested() {
    let request = AnalysisRequest::new()
        .highlights_from_scenes(false)
        .max_highlights(3)
        .highlight_duration(5.0, 15.0);

    let report = Analyzer::new()
        .with_request(request)
        .analyze(&three_shot_video())
        .expect("Analysis failed");

    assert_eq!(report.highlights.len(), 3);
    for highlight in &report.highlights {
        assert!(highlight.duration() >= 5.0 && highlight.duration() <= 15.0);
    }
    // The two hard cuts are the strongest moments.
    let starts: Vec<f64> = report.highlights.iter().map(|h| h.start).collect();
    assert!(starts.contains(&40.0) && starts.contains(&80.0), "{starts:?}");
}

#[test]
fn compositions_follow_the_scenes() {
    let report = Analyzer::new()
        .with_request(AnalysisRequest::new().analyze_composition(true))
        .analyze(&three_shot_video())
        .expect("Analysis failed");

    assert_eq!(report.compositions.len(), report.scenes.len());
    assert!(report.compositions.iter().all(Option::is_some));
}

#[test]
fn face_detector_reaches_the_scenes() {
    let report = Analyzer::new()
        .with_face_detector(Arc::new(|_: &GrayImage| 1u32))
        .analyze(&three_shot_video())
        .expect("Analysis failed");

    assert!(report.scenes.iter().all(|scene| scene.face_count == 1));
    assert!(report.scenes.iter().all(|scene| scene.description.ends_with("1 person")));
}

// ── Failures ──────────────────────────────────────────────────────

#[test]
fn zero_dimensions_make_the_source_unavailable() {
    let video = SyntheticVideo::solid(10.0, 25.0, 0, 0, [0, 0, 0]);
    match Analyzer::new().analyze(&video) {
        Err(ReelscanError::SourceUnavailable(message)) => {
            assert!(message.contains("dimensions"), "{message}");
        }
        other => panic!("Expected SourceUnavailable, got: {other:?}"),
    }
}

#[test]
fn missing_frame_rate_makes_the_source_unavailable() {
    let video = SyntheticVideo::solid(10.0, 0.0, 32, 18, [0, 0, 0]);
    let result = Analyzer::new().analyze(&video);
    assert!(matches!(result, Err(ReelscanError::SourceUnavailable(_))));
}

#[test]
fn invalid_request_is_reported() {
    let request = AnalysisRequest::new().highlight_duration(10.0, 2.0);
    let result = Analyzer::new().with_request(request).analyze(&three_shot_video());
    assert!(matches!(result, Err(ReelscanError::InvalidConfiguration(_))));
}

#[test]
fn cancelled_analysis_returns_error() {
    let token = CancellationToken::new();
    token.cancel();
    let options = AnalysisOptions::new().with_cancellation(token);

    let result = Analyzer::new().analyze_with_options(&three_shot_video(), &options);
    assert!(matches!(result, Err(ReelscanError::Cancelled)));
}

// ── Reports ───────────────────────────────────────────────────────

#[test]
fn report_survives_save_and_load() {
    let report = Analyzer::new()
        .with_request(AnalysisRequest::new().analyze_composition(true))
        .analyze(&three_shot_video())
        .expect("Analysis failed");

    let directory = tempfile::tempdir().expect("Failed to create temp dir");
    let path = directory.path().join("analysis.json");
    report.save(&path).expect("Failed to save report");

    let restored = AnalysisReport::load(&path).expect("Failed to load report");
    assert_eq!(restored, report);
}

#[test]
fn report_json_uses_flat_records() {
    let report = Analyzer::new()
        .analyze(&three_shot_video())
        .expect("Analysis failed");

    let value: serde_json::Value =
        serde_json::from_str(&report.to_json().expect("serialize")).expect("parse");
    assert_eq!(value["scenes"][0]["start"], 0.0);
    assert_eq!(value["boundaries"]["total_duration"], 120.0);
    assert!(value.get("compositions").is_none());
}

#[test]
fn malformed_report_is_a_json_error() {
    let result = AnalysisReport::from_json("{ not json");
    assert!(matches!(result, Err(ReelscanError::JsonError(_))));
}

#[test]
fn missing_report_file_is_an_io_error() {
    let directory = tempfile::tempdir().expect("Failed to create temp dir");
    let result = AnalysisReport::load(directory.path().join("absent.json"));
    assert!(matches!(result, Err(ReelscanError::IoError(_))));
}
