//! Provider client abstraction.
//!
//! A provider is an external generative-model service. Each client is a
//! concurrency-safe singleton shared across pipeline invocations; the engine
//! only ever talks to the [`ProviderClient`] trait, so transports live
//! outside this crate.

mod requests;

pub use requests::{
    AspectRatio, ImageEditRequest, ImageToVideoRequest, TextToImageRequest, VideoMode,
};

use crate::errors::PipelineError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Identifies one provider (e.g. `"kie"`, `"fal"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderId(String);

impl ProviderId {
    /// Creates a provider id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProviderId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Opaque handle to a submitted job, used for status polling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobHandle {
    /// Provider-issued job identifier.
    pub job_id: String,
    /// The provider the job was submitted to.
    pub provider: ProviderId,
    /// Provider's estimate of how long generation takes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_duration: Option<Duration>,
}

impl JobHandle {
    /// Creates a handle without a duration estimate.
    #[must_use]
    pub fn new(job_id: impl Into<String>, provider: ProviderId) -> Self {
        Self {
            job_id: job_id.into(),
            provider,
            estimated_duration: None,
        }
    }

    /// Attaches the provider's duration estimate.
    #[must_use]
    pub fn with_estimate(mut self, estimate: Duration) -> Self {
        self.estimated_duration = Some(estimate);
        self
    }
}

/// The lifecycle state a provider reports for a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    /// Queued, not yet started.
    Pending,
    /// Generation in progress.
    Processing,
    /// Finished; a result URL should be present.
    Completed,
    /// Terminal failure on the provider side.
    Failed,
}

impl JobStatus {
    /// Returns true if the status is terminal.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// One status-poll response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    /// Reported lifecycle state.
    pub status: JobStatus,
    /// Result URL, present once completed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_url: Option<String>,
    /// Failure text, present when failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StatusSnapshot {
    /// A pending snapshot.
    #[must_use]
    pub fn pending() -> Self {
        Self {
            status: JobStatus::Pending,
            result_url: None,
            error: None,
        }
    }

    /// A processing snapshot.
    #[must_use]
    pub fn processing() -> Self {
        Self {
            status: JobStatus::Processing,
            result_url: None,
            error: None,
        }
    }

    /// A completed snapshot carrying the result URL.
    #[must_use]
    pub fn completed(result_url: impl Into<String>) -> Self {
        Self {
            status: JobStatus::Completed,
            result_url: Some(result_url.into()),
            error: None,
        }
    }

    /// A completed snapshot with no result URL. Providers do produce these;
    /// the executor treats them as a system defect.
    #[must_use]
    pub fn completed_without_url() -> Self {
        Self {
            status: JobStatus::Completed,
            result_url: None,
            error: None,
        }
    }

    /// A failed snapshot with provider-supplied detail.
    #[must_use]
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: JobStatus::Failed,
            result_url: None,
            error: Some(error.into()),
        }
    }
}

/// Client for one external generative-model provider.
///
/// Submissions are non-blocking: they return a [`JobHandle`] immediately and
/// the caller polls [`ProviderClient::get_status`] until a terminal state.
/// Some providers need a model identifier to disambiguate a status query;
/// `model_hint` carries it when the caller knows which model produced the
/// job.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Returns this provider's identifier.
    fn id(&self) -> ProviderId;

    /// Submits a text-to-image job.
    async fn submit_text_to_image(
        &self,
        request: &TextToImageRequest,
    ) -> Result<JobHandle, PipelineError>;

    /// Submits an image-edit (compositing) job.
    async fn submit_image_edit(
        &self,
        request: &ImageEditRequest,
    ) -> Result<JobHandle, PipelineError>;

    /// Submits an image-to-video job.
    async fn submit_image_to_video(
        &self,
        request: &ImageToVideoRequest,
    ) -> Result<JobHandle, PipelineError>;

    /// Queries the current status of a submitted job.
    async fn get_status(
        &self,
        handle: &JobHandle,
        model_hint: Option<&str>,
    ) -> Result<StatusSnapshot, PipelineError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_id_display_and_eq() {
        let id = ProviderId::new("kie");
        assert_eq!(id.to_string(), "kie");
        assert_eq!(id, ProviderId::from("kie"));
        assert_ne!(id, ProviderId::from("fal"));
    }

    #[test]
    fn test_job_status_terminal() {
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
    }

    #[test]
    fn test_status_snapshot_serializes() {
        let json = serde_json::to_string(&StatusSnapshot::completed("https://cdn/x.png")).unwrap();
        assert!(json.contains(r#""status":"COMPLETED""#));
        assert!(json.contains("https://cdn/x.png"));
    }

    #[test]
    fn test_job_handle_estimate() {
        let handle = JobHandle::new("abc", ProviderId::new("fal"))
            .with_estimate(Duration::from_secs(240));
        assert_eq!(handle.estimated_duration, Some(Duration::from_secs(240)));
    }
}
