//! Generation-job state for one pipeline invocation.
//!
//! A [`GenerationJob`] lives exactly as long as one entry-point call: the
//! orchestrator creates it, walks it through the stage graph, and discards it
//! once the report is returned. Nothing here is persisted across
//! invocations.

use crate::errors::PipelineError;
use crate::providers::ProviderId;
use crate::utils::{now_utc, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The three pipeline stages, in execution order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum StageIndex {
    /// Stage 1: person image generation.
    Person,
    /// Stage 2: product compositing.
    Composite,
    /// Stage 3: image-to-video generation.
    Video,
}

impl StageIndex {
    /// The 1-based stage number used in webhook payloads.
    #[must_use]
    pub fn number(self) -> u8 {
        match self {
            Self::Person => 1,
            Self::Composite => 2,
            Self::Video => 3,
        }
    }

    /// Human-readable stage name.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Person => "person generation",
            Self::Composite => "product compositing",
            Self::Video => "video generation",
        }
    }
}

impl fmt::Display for StageIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Overall status of a pipeline run, as reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    /// Created, no stage started yet.
    Init,
    /// At least one stage started, none failed, not all finished.
    Processing,
    /// Every requested stage finished.
    Complete,
    /// A stage failed terminally.
    Failed,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init => write!(f, "INIT"),
            Self::Processing => write!(f, "PROCESSING"),
            Self::Complete => write!(f, "COMPLETE"),
            Self::Failed => write!(f, "FAILED"),
        }
    }
}

/// Where a run currently is in the stage graph.
///
/// Stage indices progress strictly monotonically: a stage is never
/// re-entered and the walk never goes backwards within one run. `Failed` is
/// reachable from any running state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// No stage started.
    Init,
    /// A stage is executing.
    Running(StageIndex),
    /// A stage finished and its result was recorded.
    StageDone(StageIndex),
    /// The requested walk finished.
    Complete,
    /// A stage failed terminally.
    Failed,
}

impl PipelineState {
    /// Returns true once the run can no longer advance.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }

    /// Maps the state onto the caller-facing run status.
    #[must_use]
    pub fn run_status(self) -> RunStatus {
        match self {
            Self::Init => RunStatus::Init,
            Self::Running(_) | Self::StageDone(_) => RunStatus::Processing,
            Self::Complete => RunStatus::Complete,
            Self::Failed => RunStatus::Failed,
        }
    }
}

/// The outcome of one executed stage. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageResult {
    /// Which stage produced this result.
    pub stage: StageIndex,
    /// Durable, externally fetchable artifact URL.
    pub artifact_url: String,
    /// Storage key within the backing bucket.
    pub storage_key: String,
    /// The provider that actually generated the artifact.
    pub provider_used: ProviderId,
    /// True when the fallback provider produced the artifact.
    pub fallback_triggered: bool,
    /// Wall-clock stage duration.
    pub duration_secs: f64,
    /// When the artifact became durable.
    pub completed_at: Timestamp,
}

/// One pipeline run: identity, state machine and per-stage results.
#[derive(Debug, Clone)]
pub struct GenerationJob {
    generation_id: String,
    owner_id: String,
    state: PipelineState,
    results: Vec<StageResult>,
    started_at: Timestamp,
    finished_at: Option<Timestamp>,
}

impl GenerationJob {
    /// Creates a job in `Init` with the clock started.
    #[must_use]
    pub fn new(generation_id: impl Into<String>, owner_id: impl Into<String>) -> Self {
        Self {
            generation_id: generation_id.into(),
            owner_id: owner_id.into(),
            state: PipelineState::Init,
            results: Vec::new(),
            started_at: now_utc(),
            finished_at: None,
        }
    }

    /// The run this job belongs to.
    #[must_use]
    pub fn generation_id(&self) -> &str {
        &self.generation_id
    }

    /// The owner artifacts are stored under.
    #[must_use]
    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    /// Current position in the stage graph.
    #[must_use]
    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Results recorded so far, in stage order.
    #[must_use]
    pub fn results(&self) -> &[StageResult] {
        &self.results
    }

    /// When the run started.
    #[must_use]
    pub fn started_at(&self) -> Timestamp {
        self.started_at
    }

    /// When the run reached a terminal state, if it has.
    #[must_use]
    pub fn finished_at(&self) -> Option<Timestamp> {
        self.finished_at
    }

    /// The result for a given stage, if that stage has run.
    #[must_use]
    pub fn result_for(&self, stage: StageIndex) -> Option<&StageResult> {
        self.results.iter().find(|result| result.stage == stage)
    }

    /// Enters `Running(stage)`.
    ///
    /// # Errors
    ///
    /// Rejects stage re-entry, backwards walks, and starting a stage while
    /// another is running or after the run is terminal.
    pub fn begin_stage(&mut self, stage: StageIndex) -> Result<(), PipelineError> {
        let allowed = match self.state {
            PipelineState::Init => true,
            PipelineState::StageDone(done) => stage > done,
            PipelineState::Running(_) | PipelineState::Complete | PipelineState::Failed => false,
        };
        if !allowed {
            return Err(PipelineError::internal(format!(
                "cannot start {stage} from state {:?}",
                self.state
            )));
        }
        self.state = PipelineState::Running(stage);
        Ok(())
    }

    /// Records the running stage's result and advances to `StageDone`.
    ///
    /// # Errors
    ///
    /// Rejects a result whose stage does not match the running stage.
    pub fn complete_stage(&mut self, result: StageResult) -> Result<(), PipelineError> {
        match self.state {
            PipelineState::Running(stage) if stage == result.stage => {
                self.state = PipelineState::StageDone(stage);
                self.results.push(result);
                Ok(())
            }
            _ => Err(PipelineError::internal(format!(
                "cannot record a {} result in state {:?}",
                result.stage, self.state
            ))),
        }
    }

    /// Marks the walk complete.
    ///
    /// # Errors
    ///
    /// Rejects completion unless the last requested stage just finished.
    pub fn finish(&mut self) -> Result<(), PipelineError> {
        match self.state {
            PipelineState::StageDone(_) => {
                self.state = PipelineState::Complete;
                self.finished_at = Some(now_utc());
                Ok(())
            }
            _ => Err(PipelineError::internal(format!(
                "cannot complete a run in state {:?}",
                self.state
            ))),
        }
    }

    /// Marks the run failed. Valid from any state; failure always wins.
    pub fn fail(&mut self) {
        self.state = PipelineState::Failed;
        self.finished_at = Some(now_utc());
    }
}

/// Result of a multi-stage entry point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineReport {
    /// The run this report describes.
    pub generation_id: String,
    /// Terminal run status.
    pub status: RunStatus,
    /// One result per executed stage, in stage order.
    pub results: Vec<StageResult>,
    /// Total wall-clock time for the run.
    pub total_time_secs: f64,
}

/// Result of a single-stage entry point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageReport {
    /// The run this report describes.
    pub generation_id: String,
    /// The executed stage's result.
    pub result: StageResult,
    /// Total wall-clock time for the run.
    pub total_time_secs: f64,
}
