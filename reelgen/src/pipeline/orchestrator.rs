//! Pipeline orchestration: stage sequencing, provider failover, progress
//! reporting.
//!
//! One [`PipelineOrchestrator`] is constructed at startup and shared by
//! reference across every handler; each entry point drives one
//! [`GenerationJob`] through a restricted walk over the stage graph. Stages
//! run strictly sequentially, and stage N always consumes the durable
//! artifact of stage N-1, never a raw provider URL.

use super::job::{
    GenerationJob, PipelineReport, PipelineState, StageIndex, StageReport, StageResult,
};
use crate::classify::classify;
use crate::config::PipelineConfig;
use crate::enrichment::{Enrichment, PromptKind, ReferenceAnalysis};
use crate::errors::PipelineError;
use crate::executor::{wait_for_completion, PollConfig};
use crate::fallback::race_with_fallback;
use crate::prompts::{DefaultPromptBuilder, PersonPromptSpec, PromptBuilder};
use crate::providers::{
    AspectRatio, ImageEditRequest, ImageToVideoRequest, JobHandle, ProviderClient, ProviderId,
    TextToImageRequest, VideoMode,
};
use crate::storage::{ArtifactCategory, ArtifactStore};
use crate::utils::now_utc;
use crate::webhook::{NoOpProgressSink, ProgressSink, WebhookEvent, WebhookStatus};
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{error, info, warn};

/// Stage-1 output resolution, portrait for UGC.
const PERSON_IMAGE_WIDTH: u32 = 1080;
const PERSON_IMAGE_HEIGHT: u32 = 1440;

/// Edit strength for compositing. Low enough to preserve the base image's
/// lighting and subject.
const COMPOSITE_EDIT_STRENGTH: f32 = 0.45;

/// Which provider(s) a stage submits to.
#[derive(Clone)]
pub enum StageBackend {
    /// One fixed provider.
    Single(Arc<dyn ProviderClient>),
    /// A cheaper primary bounded by the fallback timeout, with failover to a
    /// more reliable secondary.
    WithFallback {
        /// Tried first, bounded by [`PipelineConfig::fallback_timeout`].
        primary: Arc<dyn ProviderClient>,
        /// Takes over when the primary times out or errors.
        fallback: Arc<dyn ProviderClient>,
    },
}

impl fmt::Debug for StageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(client) => f.debug_tuple("Single").field(&client.id()).finish(),
            Self::WithFallback { primary, fallback } => f
                .debug_struct("WithFallback")
                .field("primary", &primary.id())
                .field("fallback", &fallback.id())
                .finish(),
        }
    }
}

/// Input for a full three-stage run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FullPipelineRequest {
    /// Caller-supplied id identifying this run.
    pub generation_id: String,
    /// Owner the artifacts are stored under.
    pub owner_id: String,
    /// How to describe the stage-1 person.
    pub person: PersonPromptSpec,
    /// Product reference image composited in stage 2.
    pub product_image_url: String,
    /// Custom compositing instructions; built from the reference analysis
    /// when absent.
    pub composite_prompt: Option<String>,
    /// Raw stage-3 animation prompt.
    pub video_prompt: String,
    /// Video speed/quality mode.
    pub video_mode: VideoMode,
    /// Clip duration in seconds.
    pub video_duration_secs: u32,
    /// Output aspect ratio.
    pub video_aspect_ratio: AspectRatio,
}

/// Input for a stage-1-only run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonStageRequest {
    /// Caller-supplied id identifying this run.
    pub generation_id: String,
    /// Owner the artifact is stored under.
    pub owner_id: String,
    /// How to describe the person.
    pub person: PersonPromptSpec,
}

/// Input for a stage-2-only run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeStageRequest {
    /// Caller-supplied id identifying this run.
    pub generation_id: String,
    /// Owner the artifact is stored under.
    pub owner_id: String,
    /// Durable URL of the person image to edit.
    pub person_image_url: String,
    /// Product reference image to composite in.
    pub product_image_url: String,
    /// Custom compositing instructions.
    pub composite_prompt: Option<String>,
}

/// Input for a stage-3-only run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoStageRequest {
    /// Caller-supplied id identifying this run.
    pub generation_id: String,
    /// Owner the artifact is stored under.
    pub owner_id: String,
    /// Durable URL of the composite image to animate.
    pub composite_image_url: String,
    /// Raw animation prompt.
    pub video_prompt: String,
    /// Speed/quality mode.
    pub mode: VideoMode,
    /// Clip duration in seconds.
    pub duration_secs: u32,
    /// Output aspect ratio.
    pub aspect_ratio: AspectRatio,
    /// Product reference image, for prompt enrichment only.
    pub product_image_url: Option<String>,
}

/// Input for a stages-1-and-2 run (video skipped).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonCompositeRequest {
    /// Caller-supplied id identifying this run.
    pub generation_id: String,
    /// Owner the artifacts are stored under.
    pub owner_id: String,
    /// How to describe the stage-1 person.
    pub person: PersonPromptSpec,
    /// Product reference image composited in stage 2.
    pub product_image_url: String,
    /// Custom compositing instructions.
    pub composite_prompt: Option<String>,
}

/// A job accepted by a provider, carrying what the poll loop needs.
struct SubmittedJob {
    handle: JobHandle,
    client: Arc<dyn ProviderClient>,
    provider_used: ProviderId,
    fallback_triggered: bool,
}

/// Stage-3 parameters shared by the full-run and video-only walks.
struct VideoStageParams<'a> {
    composite_image_url: &'a str,
    raw_prompt: &'a str,
    mode: VideoMode,
    duration_secs: u32,
    aspect_ratio: AspectRatio,
}

/// Builder for [`PipelineOrchestrator`].
///
/// Image and video providers plus an artifact store are required; prompt
/// building defaults to [`DefaultPromptBuilder`], progress to a no-op sink,
/// and timing to [`PipelineConfig::default`]. Enrichment is optional.
#[derive(Default)]
pub struct PipelineOrchestratorBuilder {
    image_backend: Option<StageBackend>,
    video_primary: Option<Arc<dyn ProviderClient>>,
    video_fallback: Option<Arc<dyn ProviderClient>>,
    store: Option<Arc<dyn ArtifactStore>>,
    enrichment: Option<Arc<dyn Enrichment>>,
    prompts: Option<Arc<dyn PromptBuilder>>,
    sink: Option<Arc<dyn ProgressSink>>,
    config: PipelineConfig,
}

impl PipelineOrchestratorBuilder {
    /// Runs the image stages on one fixed provider.
    #[must_use]
    pub fn image_provider(mut self, client: Arc<dyn ProviderClient>) -> Self {
        self.image_backend = Some(StageBackend::Single(client));
        self
    }

    /// Runs the image stages through the fallback coordinator.
    #[must_use]
    pub fn image_providers(
        mut self,
        primary: Arc<dyn ProviderClient>,
        fallback: Arc<dyn ProviderClient>,
    ) -> Self {
        self.image_backend = Some(StageBackend::WithFallback { primary, fallback });
        self
    }

    /// Sets the video-stage providers. The video stage always goes through
    /// the fallback coordinator, so both are required.
    #[must_use]
    pub fn video_providers(
        mut self,
        primary: Arc<dyn ProviderClient>,
        fallback: Arc<dyn ProviderClient>,
    ) -> Self {
        self.video_primary = Some(primary);
        self.video_fallback = Some(fallback);
        self
    }

    /// Sets the durable artifact store.
    #[must_use]
    pub fn artifact_store(mut self, store: Arc<dyn ArtifactStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Enables best-effort prompt enrichment.
    #[must_use]
    pub fn enrichment(mut self, enrichment: Arc<dyn Enrichment>) -> Self {
        self.enrichment = Some(enrichment);
        self
    }

    /// Overrides the prompt builder.
    #[must_use]
    pub fn prompt_builder(mut self, prompts: Arc<dyn PromptBuilder>) -> Self {
        self.prompts = Some(prompts);
        self
    }

    /// Sets the progress sink events are delivered to.
    #[must_use]
    pub fn progress_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Overrides the timing configuration.
    #[must_use]
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds the orchestrator.
    ///
    /// # Errors
    ///
    /// Returns a validation error when a required collaborator is missing;
    /// this surfaces at startup, not on first use.
    pub fn build(self) -> Result<PipelineOrchestrator, PipelineError> {
        let image_backend = self.image_backend.ok_or_else(|| {
            PipelineError::validation("an image-stage provider backend is required")
        })?;
        let video_backend = match (self.video_primary, self.video_fallback) {
            (Some(primary), Some(fallback)) => StageBackend::WithFallback { primary, fallback },
            _ => {
                return Err(PipelineError::validation(
                    "video-stage primary and fallback providers are required",
                ));
            }
        };
        let store = self
            .store
            .ok_or_else(|| PipelineError::validation("an artifact store is required"))?;

        Ok(PipelineOrchestrator {
            image_backend,
            video_backend,
            store,
            enrichment: self.enrichment,
            prompts: self
                .prompts
                .unwrap_or_else(|| Arc::new(DefaultPromptBuilder::new())),
            sink: self.sink.unwrap_or_else(|| Arc::new(NoOpProgressSink)),
            config: self.config,
        })
    }
}

/// Drives generation jobs through the three-stage graph.
///
/// Entry points are restricted walks over the same per-stage logic: full
/// run, person-only, composite-only, video-only, and person-and-composite.
/// Collaborators are concurrency-safe and shared across invocations; the
/// orchestrator itself holds no per-run state.
pub struct PipelineOrchestrator {
    image_backend: StageBackend,
    video_backend: StageBackend,
    store: Arc<dyn ArtifactStore>,
    enrichment: Option<Arc<dyn Enrichment>>,
    prompts: Arc<dyn PromptBuilder>,
    sink: Arc<dyn ProgressSink>,
    config: PipelineConfig,
}

impl fmt::Debug for PipelineOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineOrchestrator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl PipelineOrchestrator {
    /// Starts building an orchestrator.
    #[must_use]
    pub fn builder() -> PipelineOrchestratorBuilder {
        PipelineOrchestratorBuilder::default()
    }

    /// Runs all three stages.
    ///
    /// # Errors
    ///
    /// Re-raises the first stage failure after classifying it and emitting
    /// the failure webhook. The orchestrator never retries; retry/refund
    /// decisions belong to the invocation boundary.
    pub async fn run_full(
        &self,
        request: FullPipelineRequest,
    ) -> Result<PipelineReport, PipelineError> {
        let run_started = Instant::now();
        let mut job = GenerationJob::new(&request.generation_id, &request.owner_id);
        info!(
            generation_id = %request.generation_id,
            owner_id = %request.owner_id,
            video_mode = %request.video_mode,
            "starting full pipeline run"
        );

        match self.drive_full(&mut job, &request, run_started).await {
            Ok(()) => Ok(Self::report(&job, run_started)),
            Err(err) => Err(self.fail_job(&mut job, err).await),
        }
    }

    /// Runs stage 1 only.
    ///
    /// # Errors
    ///
    /// As [`PipelineOrchestrator::run_full`].
    pub async fn generate_person(
        &self,
        request: PersonStageRequest,
    ) -> Result<StageReport, PipelineError> {
        let run_started = Instant::now();
        let mut job = GenerationJob::new(&request.generation_id, &request.owner_id);
        info!(generation_id = %request.generation_id, "starting person-only run");

        match self.drive_person(&mut job, &request).await {
            Ok(result) => Ok(Self::stage_report(&job, result, run_started)),
            Err(err) => Err(self.fail_job(&mut job, err).await),
        }
    }

    /// Runs stage 2 only, consuming an already durable person image.
    ///
    /// # Errors
    ///
    /// As [`PipelineOrchestrator::run_full`].
    pub async fn generate_composite(
        &self,
        request: CompositeStageRequest,
    ) -> Result<StageReport, PipelineError> {
        let run_started = Instant::now();
        let mut job = GenerationJob::new(&request.generation_id, &request.owner_id);
        info!(generation_id = %request.generation_id, "starting composite-only run");

        match self.drive_composite(&mut job, &request).await {
            Ok(result) => Ok(Self::stage_report(&job, result, run_started)),
            Err(err) => Err(self.fail_job(&mut job, err).await),
        }
    }

    /// Runs stage 3 only, consuming an already durable composite image.
    ///
    /// # Errors
    ///
    /// As [`PipelineOrchestrator::run_full`].
    pub async fn generate_video(
        &self,
        request: VideoStageRequest,
    ) -> Result<StageReport, PipelineError> {
        let run_started = Instant::now();
        let mut job = GenerationJob::new(&request.generation_id, &request.owner_id);
        info!(
            generation_id = %request.generation_id,
            video_mode = %request.mode,
            "starting video-only run"
        );

        match self.drive_video(&mut job, &request, run_started).await {
            Ok(result) => Ok(Self::stage_report(&job, result, run_started)),
            Err(err) => Err(self.fail_job(&mut job, err).await),
        }
    }

    /// Runs stages 1 and 2, skipping video.
    ///
    /// # Errors
    ///
    /// As [`PipelineOrchestrator::run_full`].
    pub async fn generate_person_and_composite(
        &self,
        request: PersonCompositeRequest,
    ) -> Result<PipelineReport, PipelineError> {
        let run_started = Instant::now();
        let mut job = GenerationJob::new(&request.generation_id, &request.owner_id);
        info!(
            generation_id = %request.generation_id,
            "starting person-and-composite run"
        );

        match self.drive_person_composite(&mut job, &request).await {
            Ok(()) => Ok(Self::report(&job, run_started)),
            Err(err) => Err(self.fail_job(&mut job, err).await),
        }
    }

    async fn drive_full(
        &self,
        job: &mut GenerationJob,
        request: &FullPipelineRequest,
        run_started: Instant,
    ) -> Result<(), PipelineError> {
        let reference = self.analyze_reference(Some(&request.product_image_url)).await;

        let person = self
            .person_stage(job, &request.person, reference.as_ref())
            .await?;
        let composite = self
            .composite_stage(
                job,
                &person.artifact_url,
                &request.product_image_url,
                request.composite_prompt.as_deref(),
                reference.as_ref(),
            )
            .await?;
        self.video_stage(
            job,
            VideoStageParams {
                composite_image_url: &composite.artifact_url,
                raw_prompt: &request.video_prompt,
                mode: request.video_mode,
                duration_secs: request.video_duration_secs,
                aspect_ratio: request.video_aspect_ratio,
            },
            reference.as_ref(),
            run_started,
        )
        .await?;

        job.finish()?;
        info!(
            generation_id = %job.generation_id(),
            total_time_secs = run_started.elapsed().as_secs_f64(),
            "pipeline run complete"
        );
        Ok(())
    }

    async fn drive_person(
        &self,
        job: &mut GenerationJob,
        request: &PersonStageRequest,
    ) -> Result<StageResult, PipelineError> {
        let result = self.person_stage(job, &request.person, None).await?;
        job.finish()?;
        Ok(result)
    }

    async fn drive_composite(
        &self,
        job: &mut GenerationJob,
        request: &CompositeStageRequest,
    ) -> Result<StageResult, PipelineError> {
        let reference = self.analyze_reference(Some(&request.product_image_url)).await;
        let result = self
            .composite_stage(
                job,
                &request.person_image_url,
                &request.product_image_url,
                request.composite_prompt.as_deref(),
                reference.as_ref(),
            )
            .await?;
        job.finish()?;
        Ok(result)
    }

    async fn drive_video(
        &self,
        job: &mut GenerationJob,
        request: &VideoStageRequest,
        run_started: Instant,
    ) -> Result<StageResult, PipelineError> {
        let reference = self
            .analyze_reference(request.product_image_url.as_deref())
            .await;
        let result = self
            .video_stage(
                job,
                VideoStageParams {
                    composite_image_url: &request.composite_image_url,
                    raw_prompt: &request.video_prompt,
                    mode: request.mode,
                    duration_secs: request.duration_secs,
                    aspect_ratio: request.aspect_ratio,
                },
                reference.as_ref(),
                run_started,
            )
            .await?;
        job.finish()?;
        Ok(result)
    }

    async fn drive_person_composite(
        &self,
        job: &mut GenerationJob,
        request: &PersonCompositeRequest,
    ) -> Result<(), PipelineError> {
        let reference = self.analyze_reference(Some(&request.product_image_url)).await;
        let person = self
            .person_stage(job, &request.person, reference.as_ref())
            .await?;
        self.composite_stage(
            job,
            &person.artifact_url,
            &request.product_image_url,
            request.composite_prompt.as_deref(),
            reference.as_ref(),
        )
        .await?;
        job.finish()?;
        Ok(())
    }

    /// Stage 1: generate the person image.
    async fn person_stage(
        &self,
        job: &mut GenerationJob,
        spec: &PersonPromptSpec,
        reference: Option<&ReferenceAnalysis>,
    ) -> Result<StageResult, PipelineError> {
        job.begin_stage(StageIndex::Person)?;
        let stage_started = Instant::now();
        self.notify_processing(job, StageIndex::Person, "Generating AI person...")
            .await;

        let prompt = self.prompts.person_prompt(spec)?;
        let prompt = self.enhance(PromptKind::Person, prompt, reference).await;
        let request = TextToImageRequest::new(prompt, PERSON_IMAGE_WIDTH, PERSON_IMAGE_HEIGHT)?;

        let submitted = self
            .submit_via(&self.image_backend, move |client| {
                let request = request.clone();
                async move { client.submit_text_to_image(&request).await }.boxed()
            })
            .await?;
        info!(
            generation_id = %job.generation_id(),
            provider = %submitted.provider_used,
            job_id = %submitted.handle.job_id,
            "person job submitted"
        );

        let provider_url = wait_for_completion(
            submitted.client.as_ref(),
            &submitted.handle,
            &self.image_poll_config(self.config.person_timeout),
        )
        .await?;

        let stored = self
            .store
            .upload_artifact(
                &provider_url,
                ArtifactCategory::PersonImage,
                job.owner_id(),
                job.generation_id(),
            )
            .await?;
        info!(generation_id = %job.generation_id(), url = %stored.url, "person artifact stored");

        let result = StageResult {
            stage: StageIndex::Person,
            artifact_url: stored.url,
            storage_key: stored.key,
            provider_used: submitted.provider_used,
            fallback_triggered: submitted.fallback_triggered,
            duration_secs: stage_started.elapsed().as_secs_f64(),
            completed_at: now_utc(),
        };
        job.complete_stage(result.clone())?;

        self.sink
            .notify(
                &WebhookEvent::new(job.generation_id(), WebhookStatus::Completed)
                    .with_stage(StageIndex::Person.number())
                    .with_field("person_url", json!(result.artifact_url)),
            )
            .await;

        Ok(result)
    }

    /// Stage 2: composite the product into the person image.
    async fn composite_stage(
        &self,
        job: &mut GenerationJob,
        person_image_url: &str,
        product_image_url: &str,
        custom_prompt: Option<&str>,
        reference: Option<&ReferenceAnalysis>,
    ) -> Result<StageResult, PipelineError> {
        job.begin_stage(StageIndex::Composite)?;
        let stage_started = Instant::now();
        self.notify_processing(job, StageIndex::Composite, "Compositing product with person...")
            .await;

        let prompt = self.prompts.composite_prompt(reference, custom_prompt);
        let prompt = self.enhance(PromptKind::Composite, prompt, reference).await;
        let request = ImageEditRequest::new(person_image_url, prompt, COMPOSITE_EDIT_STRENGTH)?
            .with_overlay(product_image_url);

        let submitted = self
            .submit_via(&self.image_backend, move |client| {
                let request = request.clone();
                async move { client.submit_image_edit(&request).await }.boxed()
            })
            .await?;
        info!(
            generation_id = %job.generation_id(),
            provider = %submitted.provider_used,
            job_id = %submitted.handle.job_id,
            "composite job submitted"
        );

        let provider_url = wait_for_completion(
            submitted.client.as_ref(),
            &submitted.handle,
            &self.image_poll_config(self.config.composite_timeout),
        )
        .await?;

        let stored = self
            .store
            .upload_artifact(
                &provider_url,
                ArtifactCategory::CompositeImage,
                job.owner_id(),
                job.generation_id(),
            )
            .await?;
        info!(
            generation_id = %job.generation_id(),
            url = %stored.url,
            "composite artifact stored"
        );

        let result = StageResult {
            stage: StageIndex::Composite,
            artifact_url: stored.url,
            storage_key: stored.key,
            provider_used: submitted.provider_used,
            fallback_triggered: submitted.fallback_triggered,
            duration_secs: stage_started.elapsed().as_secs_f64(),
            completed_at: now_utc(),
        };
        job.complete_stage(result.clone())?;

        self.sink
            .notify(
                &WebhookEvent::new(job.generation_id(), WebhookStatus::Completed)
                    .with_stage(StageIndex::Composite.number())
                    .with_field("composite_url", json!(result.artifact_url)),
            )
            .await;

        Ok(result)
    }

    /// Stage 3: animate the composite. Always goes through the fallback
    /// coordinator.
    async fn video_stage(
        &self,
        job: &mut GenerationJob,
        params: VideoStageParams<'_>,
        reference: Option<&ReferenceAnalysis>,
        run_started: Instant,
    ) -> Result<StageResult, PipelineError> {
        job.begin_stage(StageIndex::Video)?;
        let stage_started = Instant::now();
        self.notify_processing(
            job,
            StageIndex::Video,
            &format!("Generating video ({} mode)...", params.mode),
        )
        .await;

        let prompt = self.prompts.video_prompt(params.raw_prompt, reference);
        let prompt = self.enhance(PromptKind::Video, prompt, reference).await;
        let request = ImageToVideoRequest::new(
            params.composite_image_url,
            prompt,
            params.mode,
            params.duration_secs,
            params.aspect_ratio,
        )?;

        let submitted = self
            .submit_via(&self.video_backend, move |client| {
                let request = request.clone();
                async move { client.submit_image_to_video(&request).await }.boxed()
            })
            .await?;
        info!(
            generation_id = %job.generation_id(),
            provider = %submitted.provider_used,
            job_id = %submitted.handle.job_id,
            fallback_triggered = submitted.fallback_triggered,
            "video job submitted"
        );

        let provider_url = wait_for_completion(
            submitted.client.as_ref(),
            &submitted.handle,
            &PollConfig::new(self.config.video_timeout, self.config.video_poll_interval)
                .with_model_hints(self.config.video_model_hints.clone()),
        )
        .await?;

        let stored = self
            .store
            .upload_artifact(
                &provider_url,
                ArtifactCategory::Video,
                job.owner_id(),
                job.generation_id(),
            )
            .await?;
        info!(generation_id = %job.generation_id(), url = %stored.url, "video artifact stored");

        let result = StageResult {
            stage: StageIndex::Video,
            artifact_url: stored.url,
            storage_key: stored.key,
            provider_used: submitted.provider_used,
            fallback_triggered: submitted.fallback_triggered,
            duration_secs: stage_started.elapsed().as_secs_f64(),
            completed_at: now_utc(),
        };
        job.complete_stage(result.clone())?;

        self.sink
            .notify(
                &WebhookEvent::new(job.generation_id(), WebhookStatus::Completed)
                    .with_stage(StageIndex::Video.number())
                    .with_field("video_url", json!(result.artifact_url))
                    .with_field("provider_used", json!(result.provider_used))
                    .with_field("fallback_triggered", json!(result.fallback_triggered))
                    .with_field("total_time", json!(run_started.elapsed().as_secs_f64())),
            )
            .await;

        Ok(result)
    }

    /// Submits through the backend, racing primary against the fallback
    /// timeout when one is configured.
    async fn submit_via<F>(
        &self,
        backend: &StageBackend,
        submit: F,
    ) -> Result<SubmittedJob, PipelineError>
    where
        F: Fn(Arc<dyn ProviderClient>) -> BoxFuture<'static, Result<JobHandle, PipelineError>>,
    {
        match backend {
            StageBackend::Single(client) => {
                let handle = submit(Arc::clone(client)).await?;
                Ok(SubmittedJob {
                    handle,
                    client: Arc::clone(client),
                    provider_used: client.id(),
                    fallback_triggered: false,
                })
            }
            StageBackend::WithFallback { primary, fallback } => {
                let outcome = race_with_fallback(
                    primary.id(),
                    submit(Arc::clone(primary)),
                    fallback.id(),
                    submit(Arc::clone(fallback)),
                    self.config.fallback_timeout,
                )
                .await?;
                let client = if outcome.fallback_triggered {
                    Arc::clone(fallback)
                } else {
                    Arc::clone(primary)
                };
                Ok(SubmittedJob {
                    handle: outcome.value,
                    client,
                    provider_used: outcome.provider_used,
                    fallback_triggered: outcome.fallback_triggered,
                })
            }
        }
    }

    /// Best-effort reference analysis. Absence or failure degrades to
    /// un-enriched prompts.
    async fn analyze_reference(&self, image_url: Option<&str>) -> Option<ReferenceAnalysis> {
        let enrichment = self.enrichment.as_ref()?;
        let image_url = image_url?;
        match enrichment.analyze_reference(image_url).await {
            Ok(analysis) => {
                info!(brand = %analysis.brand, "reference image analyzed");
                Some(analysis)
            }
            Err(err) => {
                warn!(error = %err, "reference analysis failed; proceeding without it");
                None
            }
        }
    }

    /// Best-effort prompt enhancement. Failures degrade to the base prompt.
    async fn enhance(
        &self,
        kind: PromptKind,
        base: String,
        reference: Option<&ReferenceAnalysis>,
    ) -> String {
        let Some(enrichment) = &self.enrichment else {
            return base;
        };
        match enrichment.enhance_prompt(kind, &base, reference).await {
            Ok(enhanced) => enhanced,
            Err(err) => {
                warn!(kind = ?kind, error = %err, "prompt enhancement failed; using base prompt");
                base
            }
        }
    }

    async fn notify_processing(&self, job: &GenerationJob, stage: StageIndex, message: &str) {
        self.sink
            .notify(
                &WebhookEvent::new(job.generation_id(), WebhookStatus::Processing)
                    .with_stage(stage.number())
                    .with_message(message),
            )
            .await;
    }

    /// Classifies a failure, reports it, marks the job failed and hands the
    /// error back for re-raising.
    async fn fail_job(&self, job: &mut GenerationJob, err: PipelineError) -> PipelineError {
        let stage = match job.state() {
            PipelineState::Running(stage) => Some(stage),
            _ => None,
        };
        let classification = classify(&err, stage);
        error!(
            generation_id = %job.generation_id(),
            stage = stage.map(StageIndex::number),
            error_type = %classification.error_type,
            error = %err,
            "pipeline run failed"
        );

        let event = WebhookEvent::failure(
            job.generation_id(),
            stage.map(StageIndex::number),
            &classification,
        );
        self.sink.notify(&event).await;
        job.fail();
        err
    }

    fn image_poll_config(&self, timeout: Duration) -> PollConfig {
        PollConfig::new(timeout, self.config.image_poll_interval)
            .with_model_hints(self.config.image_model_hints.clone())
    }

    fn report(job: &GenerationJob, run_started: Instant) -> PipelineReport {
        PipelineReport {
            generation_id: job.generation_id().to_string(),
            status: job.state().run_status(),
            results: job.results().to_vec(),
            total_time_secs: run_started.elapsed().as_secs_f64(),
        }
    }

    fn stage_report(job: &GenerationJob, result: StageResult, run_started: Instant) -> StageReport {
        StageReport {
            generation_id: job.generation_id().to_string(),
            result,
            total_time_secs: run_started.elapsed().as_secs_f64(),
        }
    }
}
