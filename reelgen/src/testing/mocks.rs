//! Scripted collaborators for the provider, storage and enrichment seams.

use crate::enrichment::{Enrichment, PromptKind, ReferenceAnalysis};
use crate::errors::PipelineError;
use crate::providers::{
    ImageEditRequest, ImageToVideoRequest, JobHandle, ProviderClient, ProviderId, StatusSnapshot,
    TextToImageRequest,
};
use crate::storage::{ArtifactCategory, ArtifactStore, StoredArtifact};
use crate::utils::{now_utc, Timestamp};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Duration;

/// One recorded provider submission.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedSubmission {
    /// Stage-1 submission.
    TextToImage(TextToImageRequest),
    /// Stage-2 submission.
    ImageEdit(ImageEditRequest),
    /// Stage-3 submission.
    ImageToVideo(ImageToVideoRequest),
}

/// A provider client driven by a script of status snapshots.
///
/// Submissions return sequential job ids and record the request; status
/// polls consume the scripted snapshots in order, repeating the final one
/// once the script is exhausted. An empty script reports PENDING forever.
pub struct ScriptedProviderClient {
    id: ProviderId,
    statuses: Mutex<VecDeque<StatusSnapshot>>,
    submissions: Mutex<Vec<RecordedSubmission>>,
    status_calls: Mutex<usize>,
    required_hint: Option<String>,
    submit_delay: Option<Duration>,
    submit_error: Option<String>,
}

impl ScriptedProviderClient {
    /// Creates a client with an empty script.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: ProviderId::new(id),
            statuses: Mutex::new(VecDeque::new()),
            submissions: Mutex::new(Vec::new()),
            status_calls: Mutex::new(0),
            required_hint: None,
            submit_delay: None,
            submit_error: None,
        }
    }

    /// Sets the status snapshots returned by successive polls.
    #[must_use]
    pub fn with_statuses(self, statuses: Vec<StatusSnapshot>) -> Self {
        *self.statuses.lock() = statuses.into();
        self
    }

    /// Makes status queries fail unless asked about this exact model.
    #[must_use]
    pub fn requiring_model_hint(mut self, hint: impl Into<String>) -> Self {
        self.required_hint = Some(hint.into());
        self
    }

    /// Delays every submission, e.g. to simulate a hung provider.
    #[must_use]
    pub fn with_submit_delay(mut self, delay: Duration) -> Self {
        self.submit_delay = Some(delay);
        self
    }

    /// Makes every submission fail with the given message.
    #[must_use]
    pub fn failing_submissions(mut self, message: impl Into<String>) -> Self {
        self.submit_error = Some(message.into());
        self
    }

    /// Number of status polls received, including ones that errored.
    #[must_use]
    pub fn status_calls(&self) -> usize {
        *self.status_calls.lock()
    }

    /// Every submission received, in order. Failed submissions are recorded
    /// too.
    #[must_use]
    pub fn submissions(&self) -> Vec<RecordedSubmission> {
        self.submissions.lock().clone()
    }

    /// Number of submissions received.
    #[must_use]
    pub fn submission_count(&self) -> usize {
        self.submissions.lock().len()
    }

    async fn submit(&self, submission: RecordedSubmission) -> Result<JobHandle, PipelineError> {
        self.submissions.lock().push(submission);
        if let Some(delay) = self.submit_delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = &self.submit_error {
            return Err(PipelineError::Submission {
                provider: self.id.to_string(),
                message: message.clone(),
            });
        }
        let n = self.submissions.lock().len();
        Ok(JobHandle::new(format!("{}-job-{n}", self.id), self.id.clone()))
    }

    fn next_status(&self) -> StatusSnapshot {
        let mut statuses = self.statuses.lock();
        if statuses.len() > 1 {
            statuses.pop_front().unwrap_or_else(StatusSnapshot::pending)
        } else {
            statuses.front().cloned().unwrap_or_else(StatusSnapshot::pending)
        }
    }
}

#[async_trait]
impl ProviderClient for ScriptedProviderClient {
    fn id(&self) -> ProviderId {
        self.id.clone()
    }

    async fn submit_text_to_image(
        &self,
        request: &TextToImageRequest,
    ) -> Result<JobHandle, PipelineError> {
        self.submit(RecordedSubmission::TextToImage(request.clone())).await
    }

    async fn submit_image_edit(
        &self,
        request: &ImageEditRequest,
    ) -> Result<JobHandle, PipelineError> {
        self.submit(RecordedSubmission::ImageEdit(request.clone())).await
    }

    async fn submit_image_to_video(
        &self,
        request: &ImageToVideoRequest,
    ) -> Result<JobHandle, PipelineError> {
        self.submit(RecordedSubmission::ImageToVideo(request.clone())).await
    }

    async fn get_status(
        &self,
        handle: &JobHandle,
        model_hint: Option<&str>,
    ) -> Result<StatusSnapshot, PipelineError> {
        *self.status_calls.lock() += 1;
        if let Some(required) = &self.required_hint {
            if model_hint != Some(required.as_str()) {
                return Err(PipelineError::Http {
                    source_name: self.id.to_string(),
                    status: 404,
                    message: format!("unknown model for job {}", handle.job_id),
                });
            }
        }
        Ok(self.next_status())
    }
}

/// One recorded artifact upload.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedUpload {
    /// The provider URL the artifact was fetched from.
    pub source_url: String,
    /// Artifact category.
    pub category: ArtifactCategory,
    /// Object key the artifact was stored under.
    pub key: String,
    /// When the upload happened.
    pub stored_at: Timestamp,
}

/// An in-memory artifact store minting `https://store.example/...` URLs.
#[derive(Default)]
pub struct RecordingArtifactStore {
    uploads: Mutex<Vec<RecordedUpload>>,
    fail_with: Option<String>,
}

impl RecordingArtifactStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store whose every upload fails.
    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            uploads: Mutex::new(Vec::new()),
            fail_with: Some(message.into()),
        }
    }

    /// Every upload received, in order.
    #[must_use]
    pub fn uploads(&self) -> Vec<RecordedUpload> {
        self.uploads.lock().clone()
    }
}

#[async_trait]
impl ArtifactStore for RecordingArtifactStore {
    async fn upload_artifact(
        &self,
        source_url: &str,
        category: ArtifactCategory,
        owner_id: &str,
        generation_id: &str,
    ) -> Result<StoredArtifact, PipelineError> {
        if let Some(message) = &self.fail_with {
            return Err(PipelineError::storage(message.clone()));
        }
        let key = category.object_key(owner_id, generation_id);
        self.uploads.lock().push(RecordedUpload {
            source_url: source_url.to_string(),
            category,
            key: key.clone(),
            stored_at: now_utc(),
        });
        Ok(StoredArtifact {
            url: format!("https://store.example/{key}"),
            key,
        })
    }
}

/// An enrichment collaborator scripted to succeed or fail wholesale.
///
/// On success, enhanced prompts are the base prompt with an `[enhanced]`
/// marker so tests can tell enhancement happened.
pub struct ScriptedEnrichment {
    analysis: ReferenceAnalysis,
    fail: bool,
    analyze_calls: Mutex<usize>,
    enhance_calls: Mutex<usize>,
}

impl ScriptedEnrichment {
    /// A collaborator that answers every call.
    #[must_use]
    pub fn succeeding(analysis: ReferenceAnalysis) -> Self {
        Self {
            analysis,
            fail: false,
            analyze_calls: Mutex::new(0),
            enhance_calls: Mutex::new(0),
        }
    }

    /// A collaborator whose every call fails.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            analysis: ReferenceAnalysis::unknown(),
            fail: true,
            analyze_calls: Mutex::new(0),
            enhance_calls: Mutex::new(0),
        }
    }

    /// Number of analysis calls received.
    #[must_use]
    pub fn analyze_calls(&self) -> usize {
        *self.analyze_calls.lock()
    }

    /// Number of enhancement calls received.
    #[must_use]
    pub fn enhance_calls(&self) -> usize {
        *self.enhance_calls.lock()
    }
}

#[async_trait]
impl Enrichment for ScriptedEnrichment {
    async fn analyze_reference(
        &self,
        _image_url: &str,
    ) -> Result<ReferenceAnalysis, PipelineError> {
        *self.analyze_calls.lock() += 1;
        if self.fail {
            return Err(PipelineError::Enrichment(
                "analysis backend offline".to_string(),
            ));
        }
        Ok(self.analysis.clone())
    }

    async fn enhance_prompt(
        &self,
        _kind: PromptKind,
        base_prompt: &str,
        _reference: Option<&ReferenceAnalysis>,
    ) -> Result<String, PipelineError> {
        *self.enhance_calls.lock() += 1;
        if self.fail {
            return Err(PipelineError::Enrichment(
                "enhancement backend offline".to_string(),
            ));
        }
        Ok(format!("{base_prompt} [enhanced]"))
    }
}
