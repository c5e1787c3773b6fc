//! Source validation.
//!
//! [`validate_metadata`] checks the metadata of a video before any detector
//! runs. Each finding is a [`ValidationIssue`] with a [`Severity`]; a single
//! [`Severity::Error`] makes the source unusable, and
//! [`Analyzer`](crate::Analyzer) then fails fast with
//! [`ReelscanError::SourceUnavailable`](crate::ReelscanError::SourceUnavailable).
//!
//! # Example
//!
//! ```
//! use reelscan::{Severity, SourceDescriptor, SyntheticVideo, validate_metadata};
//!
//! let video = SyntheticVideo::solid(60.0, 25.0, 64, 36, [0, 0, 0]);
//! let report = validate_metadata(video.source_metadata());
//! assert!(report.is_valid());
//! assert_eq!(report.issues[0].severity, Severity::Info);
//! ```

use std::fmt::{Display, Formatter, Result as FmtResult};

use crate::metadata::VideoMetadata;

/// Frame rates above this are flagged as suspicious.
const MAX_PLAUSIBLE_FRAME_RATE: f64 = 240.0;

/// How much a finding matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// A description of the source, not a problem.
    Info,
    /// Detection runs but may be degraded.
    Warning,
    /// Detection cannot run.
    Error,
}

impl Display for Severity {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(match self {
            Severity::Info => "INFO",
            Severity::Warning => "WARN",
            Severity::Error => "ERROR",
        })
    }
}

/// One validation finding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// How much it matters.
    pub severity: Severity,
    /// What was found.
    pub message: String,
}

impl Display for ValidationIssue {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "[{}] {}", self.severity, self.message)
    }
}

/// Findings of [`validate_metadata`], in the order they were made.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// Every finding.
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    fn push(&mut self, severity: Severity, message: String) {
        self.issues.push(ValidationIssue { severity, message });
    }

    /// Messages of the findings with the given severity.
    pub fn messages(&self, severity: Severity) -> impl Iterator<Item = &str> {
        self.issues
            .iter()
            .filter(move |issue| issue.severity == severity)
            .map(|issue| issue.message.as_str())
    }

    /// `true` unless some finding is an [`Severity::Error`].
    pub fn is_valid(&self) -> bool {
        self.messages(Severity::Error).next().is_none()
    }
}

impl Display for ValidationReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        if self.issues.is_empty() {
            return writeln!(f, "No issues found.");
        }
        for issue in &self.issues {
            writeln!(f, "{issue}")?;
        }
        Ok(())
    }
}

/// Check that `metadata` describes a video the detectors can sample.
pub fn validate_metadata(metadata: &VideoMetadata) -> ValidationReport {
    let mut report = ValidationReport::default();

    report.push(
        Severity::Info,
        format!(
            "Video: {} {}×{} @ {:.2} fps, {:.1}s, ~{} frames",
            metadata.codec,
            metadata.width,
            metadata.height,
            metadata.frames_per_second,
            metadata.duration_seconds(),
            metadata.frame_count,
        ),
    );

    if metadata.width == 0 || metadata.height == 0 {
        report.push(
            Severity::Error,
            format!("Invalid video dimensions: {}×{}", metadata.width, metadata.height),
        );
    }

    let fps = metadata.frames_per_second;
    if !(fps > 0.0) {
        report.push(
            Severity::Error,
            format!("Video frame rate is {fps}: frames cannot be addressed by time"),
        );
    } else if fps > MAX_PLAUSIBLE_FRAME_RATE {
        report.push(
            Severity::Warning,
            format!("Unusually high frame rate ({fps:.1} fps), timestamps may map to the wrong frame"),
        );
    }

    if metadata.duration.is_zero() {
        report.push(
            Severity::Warning,
            "Video duration is zero, every detector will return its defaults".to_string(),
        );
    } else if metadata.frame_count == 0 {
        report.push(
            Severity::Warning,
            "Estimated frame count is zero despite non-zero duration".to_string(),
        );
    }

    report
}
