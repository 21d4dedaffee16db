//! Ingestion submissions and their validation rules.
//!
//! A [`TranscriptSubmission`] is the caller-facing input shape for ingestion.
//! Validation is deliberately exhaustive: every violated field is reported in
//! one pass so the caller can fix the whole payload at once, and it runs
//! before any language-model call is made.

use chrono::DateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ─────────────────────────────────────────────────────────────────────────────
// Validation Errors
// ─────────────────────────────────────────────────────────────────────────────

/// A single violated field in a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
    /// Path of the offending field, e.g. `participants[1].email`.
    pub field: String,
    /// Human-readable description of the violation.
    pub message: String,
}

impl FieldViolation {
    /// Create a violation for the given field.
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Malformed caller input. Never retryable; maps to a 400-class response.
#[derive(Debug, Clone, Error)]
#[error("validation failed: {}", .violations.iter().map(|v| v.to_string()).collect::<Vec<_>>().join("; "))]
pub struct ValidationError {
    /// Every violated field, in declaration order.
    pub violations: Vec<FieldViolation>,
}

impl ValidationError {
    /// Create a validation error from collected violations.
    pub fn new(violations: Vec<FieldViolation>) -> Self {
        Self { violations }
    }

    /// Convenience constructor for a single-field failure.
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            violations: vec![FieldViolation::new(field, message)],
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Submission Types
// ─────────────────────────────────────────────────────────────────────────────

/// A meeting participant as supplied by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantSpec {
    /// Display name.
    pub name: String,
    /// Email address; the participant's stable identity across transcripts.
    pub email: String,
    /// Optional role in the meeting (defaults to "participant" at persist time).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// One transcript submitted for ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptSubmission {
    /// Caller-supplied business identifier, unique across both stores.
    pub transcript_id: String,
    /// Meeting title.
    pub title: String,
    /// When the meeting occurred, RFC 3339.
    pub occurred_at: String,
    /// Meeting length in minutes; must be positive.
    pub duration_minutes: f64,
    /// Attendees; at least one is required.
    pub participants: Vec<ParticipantSpec>,
    /// Raw transcript text.
    pub transcript: String,
    /// Free-form caller metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl TranscriptSubmission {
    /// Check the submission shape, collecting every violated field.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut violations = Vec::new();

        if self.transcript_id.trim().is_empty() {
            violations.push(FieldViolation::new("transcript_id", "must not be empty"));
        }
        if self.title.trim().is_empty() {
            violations.push(FieldViolation::new("title", "must not be empty"));
        }
        if DateTime::parse_from_rfc3339(&self.occurred_at).is_err() {
            violations.push(FieldViolation::new(
                "occurred_at",
                "must be an RFC 3339 datetime",
            ));
        }
        if !(self.duration_minutes.is_finite() && self.duration_minutes > 0.0) {
            violations.push(FieldViolation::new("duration_minutes", "must be positive"));
        }
        if self.participants.is_empty() {
            violations.push(FieldViolation::new(
                "participants",
                "at least one participant is required",
            ));
        }
        for (i, p) in self.participants.iter().enumerate() {
            if p.name.trim().is_empty() {
                violations.push(FieldViolation::new(
                    format!("participants[{i}].name"),
                    "must not be empty",
                ));
            }
            if !is_valid_email(&p.email) {
                violations.push(FieldViolation::new(
                    format!("participants[{i}].email"),
                    "must be a valid email address",
                ));
            }
        }
        if self.transcript.trim().is_empty() {
            violations.push(FieldViolation::new("transcript", "must not be empty"));
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::new(violations))
        }
    }
}

/// Minimal email shape check: `local@domain.tld`, no whitespace.
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
        && !domain.contains('@')
}
