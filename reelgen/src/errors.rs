//! Error types for the reelgen pipeline engine.
//!
//! Every failure the engine can raise is a [`PipelineError`] variant, so the
//! classifier in [`crate::classify`] can inspect types before falling back to
//! message heuristics.

use std::time::Duration;
use thiserror::Error;

/// The main error type for pipeline operations.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Invalid or missing caller input.
    #[error("invalid input: {0}")]
    Validation(String),

    /// An operation exceeded its wall-clock deadline.
    #[error("{operation} timed out after {seconds:.0}s")]
    Timeout {
        /// Description of the bounded operation.
        operation: String,
        /// The deadline that was exceeded, in seconds.
        seconds: f64,
    },

    /// A collaborator responded with a non-success HTTP status.
    #[error("{source_name} returned HTTP {status}: {message}")]
    Http {
        /// Which collaborator produced the response.
        source_name: String,
        /// The HTTP status code.
        status: u16,
        /// Response detail.
        message: String,
    },

    /// A provider rejected a job submission.
    #[error("{provider} rejected submission: {message}")]
    Submission {
        /// The provider that rejected the job.
        provider: String,
        /// Provider-supplied detail.
        message: String,
    },

    /// A submitted job reached a FAILED terminal state.
    #[error("job {job_id} on {provider} failed: {detail}")]
    JobFailed {
        /// The provider-issued job identifier.
        job_id: String,
        /// The provider running the job.
        provider: String,
        /// Provider-supplied failure text.
        detail: String,
    },

    /// A job reported COMPLETED but carried no result URL.
    #[error("job {job_id} on {provider} completed without a result URL")]
    MissingResultUrl {
        /// The provider-issued job identifier.
        job_id: String,
        /// The provider running the job.
        provider: String,
    },

    /// Both the primary and the fallback provider failed for one stage.
    #[error(
        "all providers failed; primary ({primary}): {primary_error}; \
         fallback ({fallback}): {fallback_error}"
    )]
    AllProvidersFailed {
        /// The primary provider.
        primary: String,
        /// Why the primary attempt was abandoned.
        primary_error: String,
        /// The fallback provider.
        fallback: String,
        /// Why the fallback attempt failed.
        fallback_error: String,
    },

    /// Durable artifact storage failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// An enrichment collaborator failed. Always recovered by the
    /// orchestrator; the typed variant exists for collaborator impls and
    /// logging.
    #[error("enrichment error: {0}")]
    Enrichment(String),

    /// A defect in the engine itself (invalid state transition, broken
    /// collaborator contract).
    #[error("internal error: {0}")]
    Internal(String),
}

impl PipelineError {
    /// Creates a validation error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Creates a timeout error for the given operation and deadline.
    #[must_use]
    pub fn timeout(operation: impl Into<String>, deadline: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            seconds: deadline.as_secs_f64(),
        }
    }

    /// Creates a storage error.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Returns true if this is a typed validation error.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is a typed timeout.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Returns the HTTP status carried by this error, if any.
    #[must_use]
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_display_carries_deadline() {
        let err = PipelineError::timeout("poll of job abc", Duration::from_secs(120));
        assert_eq!(err.to_string(), "poll of job abc timed out after 120s");
        assert!(err.is_timeout());
    }

    #[test]
    fn test_aggregate_display_embeds_both_errors() {
        let err = PipelineError::AllProvidersFailed {
            primary: "kie".to_string(),
            primary_error: "timed out after 60s".to_string(),
            fallback: "fal".to_string(),
            fallback_error: "quota exceeded".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("kie"));
        assert!(text.contains("timed out after 60s"));
        assert!(text.contains("fal"));
        assert!(text.contains("quota exceeded"));
    }

    #[test]
    fn test_http_status_accessor() {
        let err = PipelineError::Http {
            source_name: "kie".to_string(),
            status: 503,
            message: "service unavailable".to_string(),
        };
        assert_eq!(err.http_status(), Some(503));
        assert_eq!(PipelineError::validation("bad").http_status(), None);
    }
}
