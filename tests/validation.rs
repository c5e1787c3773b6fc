//! Metadata validation tests.

use std::time::Duration;

use reelscan::{
    Severity, SourceDescriptor, SyntheticVideo, ValidationReport, VideoMetadata, validate_metadata,
};

fn metadata(seconds: f64, fps: f64, width: u32, height: u32) -> VideoMetadata {
    VideoMetadata::new(Duration::from_secs_f64(seconds), fps, width, height).with_codec("h264")
}

fn messages(report: &ValidationReport, severity: Severity) -> Vec<&str> {
    report.messages(severity).collect()
}

#[test]
fn validate_normal_video() {
    let report = validate_metadata(&metadata(120.0, 25.0, 1920, 1080));

    assert!(report.is_valid(), "Normal video should be valid");
    assert_eq!(report.issues.len(), 1);
    assert_eq!(
        messages(&report, Severity::Info),
        vec!["Video: h264 1920×1080 @ 25.00 fps, 120.0s, ~3000 frames"]
    );
}

#[test]
fn validate_synthetic_source() {
    let video = SyntheticVideo::solid(10.0, 30.0, 64, 36, [0, 0, 0]);
    let report = validate_metadata(video.source_metadata());
    assert!(report.is_valid());
    assert!(report.issues[0].message.contains("synthetic"));
}

#[test]
fn unrepresentable_synthetic_duration_is_empty() {
    for seconds in [f64::INFINITY, f64::NAN, -5.0] {
        let video = SyntheticVideo::solid(seconds, 25.0, 64, 36, [0, 0, 0]);
        let report = validate_metadata(video.source_metadata());

        assert!(video.source_metadata().duration.is_zero(), "{seconds}");
        assert!(report.is_valid());
        assert_eq!(
            messages(&report, Severity::Warning),
            vec!["Video duration is zero, every detector will return its defaults"]
        );
    }
}

#[test]
fn zero_dimensions_are_an_error() {
    let report = validate_metadata(&metadata(10.0, 25.0, 0, 1080));
    assert!(!report.is_valid());

    let errors = messages(&report, Severity::Error);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("0×1080"), "{}", errors[0]);
}

#[test]
fn missing_frame_rate_is_an_error() {
    let report = validate_metadata(&metadata(10.0, 0.0, 640, 360));
    assert!(!report.is_valid());

    let errors = messages(&report, Severity::Error);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("frame rate"));
}

#[test]
fn nan_frame_rate_is_an_error() {
    let report = validate_metadata(&metadata(10.0, f64::NAN, 640, 360));
    assert!(!report.is_valid());
}

#[test]
fn extreme_frame_rate_is_a_warning() {
    let report = validate_metadata(&metadata(10.0, 1000.0, 640, 360));
    assert!(report.is_valid());

    let warnings = messages(&report, Severity::Warning);
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("high frame rate"));
}

#[test]
fn zero_duration_is_a_warning() {
    let report = validate_metadata(&metadata(0.0, 25.0, 640, 360));
    assert!(report.is_valid());
    assert_eq!(
        messages(&report, Severity::Warning),
        vec!["Video duration is zero, every detector will return its defaults"]
    );
}

#[test]
fn missing_frame_count_is_a_warning() {
    let mut video = metadata(10.0, 25.0, 640, 360);
    video.frame_count = 0;
    let report = validate_metadata(&video);
    assert!(report.is_valid());
    assert!(messages(&report, Severity::Warning)[0].contains("frame count is zero"));
}

#[test]
fn severities_are_ordered() {
    assert!(Severity::Info < Severity::Warning);
    assert!(Severity::Warning < Severity::Error);
}

#[test]
fn report_display() {
    let report = validate_metadata(&metadata(10.0, 0.0, 0, 0));
    let display = report.to_string();

    assert!(display.starts_with("[INFO] Video:"));
    assert!(display.contains("[ERROR] Invalid video dimensions"));
    assert!(display.contains("[WARN] Estimated frame count is zero"));
    // Summary line, two errors and the derived zero frame count.
    assert_eq!(report.issues.len(), 4);
}

#[test]
fn empty_report_display() {
    let report = ValidationReport::default();
    assert!(report.is_valid());
    assert_eq!(report.to_string(), "No issues found.\n");
}
