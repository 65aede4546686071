//! Shared types for the vote check pipeline.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::hook::HookParams;

// ── Incoming message ────────────────────────────────────────────────

/// Read-only view of a parsed mail message.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IncomingMessage {
    /// Subject line (empty when the message has none).
    pub subject: String,
    /// Full plain-text body.
    pub full_body: String,
}

impl IncomingMessage {
    pub fn new(subject: impl Into<String>, full_body: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            full_body: full_body.into(),
        }
    }
}

// ── Candidate id ────────────────────────────────────────────────────

/// Numeric release candidate identifier.
///
/// Used as a filesystem path segment and a URL suffix, so it is only ever
/// constructed from a non-empty run of ASCII digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct CandidateId(String);

impl CandidateId {
    pub fn parse(raw: &str) -> Result<Self, PipelineError> {
        if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(raw.to_string()))
        } else {
            Err(PipelineError::InvalidCandidateId(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ── Verification status ─────────────────────────────────────────────

/// Outcome of one processed message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    /// Repository missing or unreachable; verification was not attempted.
    Warn,
    /// Verification ran and reported a failure marker.
    Bad,
    /// Verification ran without a failure marker.
    Good,
    /// The verification script could not be run to completion.
    Error,
}

impl VerificationStatus {
    /// Short label, also used as the display class.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Warn => "warn",
            Self::Bad => "bad",
            Self::Good => "good",
            Self::Error => "error",
        }
    }

    /// Human-readable reason attached to the result.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Warn => "Unable to find release repository",
            Self::Bad => "GPG or checksum validation failed",
            Self::Good => "All checks passed",
            Self::Error => "Verification script could not be executed",
        }
    }
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ── Artifact set ────────────────────────────────────────────────────

/// Destination paths written by one artifact collection, in traversal order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ArtifactSet(Vec<PathBuf>);

impl ArtifactSet {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self(paths)
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Paths re-expressed relative to `root` with a leading separator,
    /// the way attachments are linked from rendered output.
    pub fn relative_to(&self, root: &Path) -> Vec<String> {
        self.0
            .iter()
            .map(|p| match p.strip_prefix(root) {
                Ok(rel) => format!("/{}", rel.to_string_lossy()),
                Err(_) => p.to_string_lossy().to_string(),
            })
            .collect()
    }
}

// ── Pipeline result ─────────────────────────────────────────────────

/// Result of running one admitted message through the pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    pub candidate: Option<CandidateId>,
    pub status: VerificationStatus,
    pub reason: String,
    /// Captured verification output, or the probe diagnostic on `Warn`.
    pub raw_output: String,
    pub artifacts: ArtifactSet,
    /// Display body produced by the configured renderer.
    pub rendered_body: Option<String>,
    pub processed_at: DateTime<Utc>,
}

impl PipelineResult {
    /// Populate a host parameter bag.
    ///
    /// `attachments` is only written when verification ran; paths are made
    /// relative to `output_root`.
    pub fn write_params(&self, params: &mut HookParams, output_root: &Path) {
        params.insert("status".into(), self.status.label().into());
        params.insert("validationResultClass".into(), self.status.label().into());
        params.insert("reason".into(), self.reason.clone().into());
        params.insert("validationResult".into(), self.raw_output.clone().into());
        if self.status != VerificationStatus::Warn {
            params.insert(
                "attachments".into(),
                self.artifacts.relative_to(output_root).into(),
            );
        }
        if let Some(ref body) = self.rendered_body {
            params.insert("htmlMessage".into(), body.clone().into());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidate_id_accepts_digits_only() {
        assert_eq!(CandidateId::parse("1234").unwrap().as_str(), "1234");
        assert!(CandidateId::parse("").is_err());
        assert!(CandidateId::parse("12a4").is_err());
        assert!(CandidateId::parse("../1").is_err());
        assert!(CandidateId::parse("١٢").is_err()); // non-ASCII digits
    }

    #[test]
    fn status_labels_and_reasons() {
        assert_eq!(VerificationStatus::Warn.label(), "warn");
        assert_eq!(VerificationStatus::Bad.label(), "bad");
        assert_eq!(VerificationStatus::Good.label(), "good");
        assert_eq!(VerificationStatus::Error.label(), "error");
        assert_eq!(VerificationStatus::Good.reason(), "All checks passed");
        assert_eq!(
            serde_json::to_value(VerificationStatus::Bad).unwrap(),
            serde_json::json!("bad")
        );
    }

    #[test]
    fn artifact_paths_relative_to_output_root() {
        let set = ArtifactSet::new(vec![
            PathBuf::from("/srv/out/images/42/a.txt"),
            PathBuf::from("/srv/out/images/42/sub/b.txt"),
            PathBuf::from("/elsewhere/c.txt"),
        ]);
        assert_eq!(
            set.relative_to(Path::new("/srv/out")),
            vec![
                "/images/42/a.txt".to_string(),
                "/images/42/sub/b.txt".to_string(),
                "/elsewhere/c.txt".to_string(),
            ]
        );
    }

    fn result(status: VerificationStatus) -> PipelineResult {
        PipelineResult {
            candidate: Some(CandidateId::parse("42").unwrap()),
            status,
            reason: status.reason().to_string(),
            raw_output: "output".into(),
            artifacts: ArtifactSet::new(vec![PathBuf::from("/out/images/42/a.txt")]),
            rendered_body: Some("body<br/>".into()),
            processed_at: Utc::now(),
        }
    }

    #[test]
    fn write_params_good() {
        let mut params = HookParams::new();
        result(VerificationStatus::Good).write_params(&mut params, Path::new("/out"));

        assert_eq!(params["status"], "good");
        assert_eq!(params["validationResultClass"], "good");
        assert_eq!(params["reason"], "All checks passed");
        assert_eq!(params["validationResult"], "output");
        assert_eq!(params["attachments"], serde_json::json!(["/images/42/a.txt"]));
        assert_eq!(params["htmlMessage"], "body<br/>");
    }

    #[test]
    fn write_params_warn_omits_attachments() {
        let mut params = HookParams::new();
        result(VerificationStatus::Warn).write_params(&mut params, Path::new("/out"));

        assert_eq!(params["status"], "warn");
        assert!(params.get("attachments").is_none());
    }
}
