//! # reelgen
//!
//! Orchestration engine for a three-stage UGC video generation pipeline:
//! person image generation, product compositing, and image-to-video
//! generation.
//!
//! The engine sequences stages, races a cheaper primary provider against a
//! timeout before failing over to a more reliable secondary, classifies
//! failures into a refund/retry taxonomy, and reports progress through
//! best-effort webhooks. Provider transports, durable storage, enrichment
//! backends and the webhook endpoint are collaborator traits implemented
//! outside this crate.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use reelgen::prelude::*;
//!
//! let orchestrator = PipelineOrchestrator::builder()
//!     .image_provider(seedream)
//!     .video_providers(kie, fal)
//!     .artifact_store(s3)
//!     .progress_sink(webhook)
//!     .build()?;
//!
//! let report = orchestrator.run_full(request).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, missing_docs, rust_2018_idioms)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod classify;
pub mod config;
pub mod enrichment;
pub mod errors;
pub mod executor;
pub mod fallback;
pub mod observability;
pub mod pipeline;
pub mod prompts;
pub mod providers;
pub mod storage;
pub mod utils;
pub mod webhook;

#[cfg(test)]
pub(crate) mod testing;

/// Prelude for embedding binaries.
pub mod prelude {
    pub use crate::classify::{classify, ErrorClassification, ErrorType};
    pub use crate::config::PipelineConfig;
    pub use crate::enrichment::{Enrichment, PromptKind, ReferenceAnalysis};
    pub use crate::errors::PipelineError;
    pub use crate::executor::{wait_for_completion, PollConfig};
    pub use crate::fallback::{
        race_with_fallback, AttemptOutcome, FallbackOutcome, ProviderAttempt,
    };
    pub use crate::pipeline::{
        CompositeStageRequest, FullPipelineRequest, GenerationJob, PersonCompositeRequest,
        PersonStageRequest, PipelineOrchestrator, PipelineOrchestratorBuilder, PipelineReport,
        PipelineState, RunStatus, StageBackend, StageIndex, StageReport, StageResult,
        VideoStageRequest,
    };
    pub use crate::prompts::{
        DefaultPromptBuilder, PersonAttributes, PersonPromptSpec, PromptBuilder,
    };
    pub use crate::providers::{
        AspectRatio, ImageEditRequest, ImageToVideoRequest, JobHandle, JobStatus, ProviderClient,
        ProviderId, StatusSnapshot, TextToImageRequest, VideoMode,
    };
    pub use crate::storage::{ArtifactCategory, ArtifactStore, StoredArtifact};
    pub use crate::utils::{generate_uuid, iso_timestamp, now_utc, Timestamp};
    pub use crate::webhook::{
        CollectingProgressSink, HttpWebhookNotifier, NoOpProgressSink, ProgressSink, WebhookEvent,
        WebhookStatus,
    };
}
