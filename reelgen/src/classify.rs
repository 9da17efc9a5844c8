//! Failure classification for refund and retry handling.
//!
//! Maps a [`PipelineError`] onto the reportable taxonomy consumed by the
//! invoking backend: whether the user gets their credits back and whether the
//! request is worth retrying. Typed checks run first; after that the
//! classifier scans the error text against ordered indicator sets. The
//! keyword tables are a best-effort heuristic, not an exhaustive contract:
//! provider error text is not guaranteed stable.

use crate::errors::PipelineError;
use crate::pipeline::StageIndex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reportable failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorType {
    /// Malformed or missing caller input. Not refunded.
    Validation,
    /// Processing exceeded a deadline. Refunded.
    Timeout,
    /// An external AI service failed. Refunded.
    Service,
    /// The caller's content violated a provider policy. Not refunded,
    /// not retryable.
    UserContent,
    /// Anything unmatched: a defect on our side. Refunded.
    System,
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation => write!(f, "VALIDATION"),
            Self::Timeout => write!(f, "TIMEOUT"),
            Self::Service => write!(f, "SERVICE"),
            Self::UserContent => write!(f, "USER_CONTENT"),
            Self::System => write!(f, "SYSTEM"),
        }
    }
}

/// The classification reported to the invoking backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorClassification {
    /// Failure category.
    pub error_type: ErrorType,
    /// Human-readable message suitable for end users.
    pub error_message: String,
    /// Whether the user's credits should be returned.
    pub is_refundable: bool,
    /// Whether retrying the same request can plausibly succeed.
    pub can_retry: bool,
    /// The underlying error text, for operators.
    pub technical_details: String,
}

/// Message fragments indicating bad caller input.
const VALIDATION_INDICATORS: &[&str] = &[
    "validation",
    "invalid",
    "missing required",
    "must be",
    "malformed",
    "unsupported format",
    "invalid format",
    "invalid image",
    "image too large",
    "image too small",
    "invalid dimensions",
    "corrupt",
    "not a valid",
];

/// Message fragments indicating a deadline was exceeded.
const TIMEOUT_INDICATORS: &[&str] = &[
    "timeout",
    "timed out",
    "deadline exceeded",
    "request timeout",
    "connection timeout",
    "read timeout",
];

/// Message fragments indicating an external service failure.
const SERVICE_INDICATORS: &[&str] = &[
    "api error",
    "service unavailable",
    "502",
    "503",
    "504",
    "429",
    "rate limit",
    "quota exceeded",
    "provider error",
    "external service",
    "downstream",
    "failed to generate",
    "generation failed",
    "500 internal server error",
];

/// Message fragments indicating a content-policy rejection.
const CONTENT_INDICATORS: &[&str] = &[
    "nsfw",
    "inappropriate",
    "prohibited content",
    "policy violation",
    "content moderation",
    "restricted content",
    "harmful content",
    "unsafe content",
];

/// Classifies an error for the failure webhook.
///
/// Typed checks (declared validation, declared timeout, HTTP status >= 500 or
/// 429) take precedence over keyword scanning, so a typed timeout classifies
/// as TIMEOUT even when its message happens to contain a validation keyword.
/// Keyword sets are then evaluated in order: validation, timeout, service,
/// user content. Everything unmatched is SYSTEM.
#[must_use]
pub fn classify(error: &PipelineError, stage: Option<StageIndex>) -> ErrorClassification {
    let message = error.to_string();
    let detail = match stage {
        Some(stage) => format!("stage {}: {message}", stage.number()),
        None => message.clone(),
    };
    let lowered = message.to_lowercase();

    // Typed checks first.
    if error.is_validation() {
        return validation_classification(&message, detail);
    }
    if error.is_timeout() {
        return build(ErrorType::Timeout, detail);
    }
    if matches!(error.http_status(), Some(status) if status >= 500 || status == 429) {
        return build(ErrorType::Service, detail);
    }

    // Keyword scan, in taxonomy order.
    if contains_any(&lowered, VALIDATION_INDICATORS) {
        return validation_classification(&message, detail);
    }
    if contains_any(&lowered, TIMEOUT_INDICATORS) {
        return build(ErrorType::Timeout, detail);
    }
    if contains_any(&lowered, SERVICE_INDICATORS) {
        return build(ErrorType::Service, detail);
    }
    if contains_any(&lowered, CONTENT_INDICATORS) {
        return build(ErrorType::UserContent, detail);
    }

    build(ErrorType::System, detail)
}

fn contains_any(haystack: &str, indicators: &[&str]) -> bool {
    indicators.iter().any(|needle| haystack.contains(needle))
}

fn build(error_type: ErrorType, technical_details: String) -> ErrorClassification {
    let (error_message, is_refundable, can_retry) = match error_type {
        ErrorType::Validation => (
            "Please fix the validation errors and try again.",
            false,
            true,
        ),
        ErrorType::Timeout => (
            "Generation took too long and timed out. Your credits will be refunded.",
            true,
            true,
        ),
        ErrorType::Service => (
            "The AI service is temporarily unavailable. Your credits will be refunded.",
            true,
            true,
        ),
        ErrorType::UserContent => (
            "Content violates usage policies. Please try with appropriate content.",
            false,
            false,
        ),
        ErrorType::System => (
            "A system error occurred. Your credits will be refunded automatically.",
            true,
            true,
        ),
    };

    ErrorClassification {
        error_type,
        error_message: error_message.to_string(),
        is_refundable,
        can_retry,
        technical_details,
    }
}

/// Validation messages keep as much of the original detail as possible so
/// the user can actually fix their input.
fn validation_classification(message: &str, detail: String) -> ErrorClassification {
    let lowered = message.to_lowercase();
    let mut classification = build(ErrorType::Validation, detail);
    if lowered.contains("invalid") {
        classification.error_message = format!("Invalid input: {message}");
    } else if lowered.contains("required") {
        classification.error_message = format!("Missing required field: {message}");
    } else if lowered.contains("format") {
        classification.error_message = format!("Invalid format: {message}");
    }
    classification
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn provider_err(detail: &str) -> PipelineError {
        PipelineError::JobFailed {
            job_id: "job-1".to_string(),
            provider: "kie".to_string(),
            detail: detail.to_string(),
        }
    }

    #[test]
    fn test_missing_required_field_is_validation() {
        let classification = classify(&provider_err("missing required field: age"), None);
        assert_eq!(classification.error_type, ErrorType::Validation);
        assert!(!classification.is_refundable);
        assert!(classification.can_retry);
        assert!(classification.error_message.contains("Missing required field"));
    }

    #[test]
    fn test_invalid_indicator_wins_over_required_and_keeps_case() {
        let classification = classify(&provider_err("Invalid value: field Age required"), None);
        assert_eq!(classification.error_type, ErrorType::Validation);
        assert!(classification.error_message.starts_with("Invalid input:"));
        assert!(classification.error_message.contains("field Age required"));
    }

    #[test]
    fn test_typed_timeout_beats_validation_keyword() {
        // Message contains "invalid" but the type wins.
        let err = PipelineError::timeout(
            "poll of invalid-looking job",
            Duration::from_secs(600),
        );
        let classification = classify(&err, None);
        assert_eq!(classification.error_type, ErrorType::Timeout);
        assert!(classification.is_refundable);
    }

    #[test]
    fn test_rate_limit_is_service() {
        let classification = classify(&provider_err("rate limit exceeded (429)"), None);
        assert_eq!(classification.error_type, ErrorType::Service);
        assert!(classification.is_refundable);
        assert!(classification.can_retry);
    }

    #[test]
    fn test_http_5xx_is_service_by_type() {
        let err = PipelineError::Http {
            source_name: "fal".to_string(),
            status: 502,
            message: "bad gateway".to_string(),
        };
        assert_eq!(classify(&err, None).error_type, ErrorType::Service);
    }

    #[test]
    fn test_content_policy_is_not_retryable() {
        let classification = classify(&provider_err("blocked: nsfw content detected"), None);
        assert_eq!(classification.error_type, ErrorType::UserContent);
        assert!(!classification.is_refundable);
        assert!(!classification.can_retry);
    }

    #[test]
    fn test_unmatched_defaults_to_system() {
        let classification = classify(&PipelineError::internal("socket hiccup"), None);
        assert_eq!(classification.error_type, ErrorType::System);
        assert!(classification.is_refundable);
    }

    #[test]
    fn test_missing_result_url_is_system() {
        let err = PipelineError::MissingResultUrl {
            job_id: "job-9".to_string(),
            provider: "fal".to_string(),
        };
        assert_eq!(classify(&err, None).error_type, ErrorType::System);
    }

    #[test]
    fn test_stage_context_prefixes_details() {
        let classification = classify(
            &provider_err("generation failed"),
            Some(StageIndex::Video),
        );
        assert!(classification.technical_details.starts_with("stage 3:"));
    }

    #[test]
    fn test_error_type_serializes_screaming_snake() {
        let json = serde_json::to_string(&ErrorType::UserContent).unwrap();
        assert_eq!(json, r#""USER_CONTENT""#);
        let json = serde_json::to_string(&ErrorType::Validation).unwrap();
        assert_eq!(json, r#""VALIDATION""#);
    }
}
