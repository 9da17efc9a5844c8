//! Status polling for submitted jobs.
//!
//! [`wait_for_completion`] drives one job from submission to a terminal
//! state. The deadline is a single wall clock measured from loop entry, so
//! transient per-request hiccups can never silently extend the bound.

use crate::errors::PipelineError;
use crate::providers::{JobHandle, JobStatus, ProviderClient, StatusSnapshot};
use std::time::Duration;
use tracing::{debug, warn};

/// Polling parameters for one wait.
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Wall-clock deadline measured from loop entry.
    pub timeout: Duration,
    /// Fixed delay between status checks.
    pub poll_interval: Duration,
    /// Ordered model identifiers to probe when the provider needs one to
    /// disambiguate a status query. Empty means a plain status query.
    pub model_hints: Vec<String>,
}

impl PollConfig {
    /// Creates a poll config with no model hints.
    #[must_use]
    pub fn new(timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            timeout,
            poll_interval,
            model_hints: Vec::new(),
        }
    }

    /// Sets the ordered model hints to probe per poll cycle.
    #[must_use]
    pub fn with_model_hints(mut self, hints: Vec<String>) -> Self {
        self.model_hints = hints;
        self
    }
}

/// Polls a job until it completes, fails, or the deadline expires.
///
/// Each cycle probes the configured model hints in order and takes the first
/// usable response; a cycle in which every probe errors counts as "still
/// pending" and never as job failure. A COMPLETED status without a result
/// URL is a defect on the provider side and is surfaced rather than
/// tolerated.
///
/// # Errors
///
/// - [`PipelineError::Timeout`] when the deadline expires.
/// - [`PipelineError::JobFailed`] when the provider reports failure.
/// - [`PipelineError::MissingResultUrl`] on COMPLETED without a URL.
pub async fn wait_for_completion(
    client: &dyn ProviderClient,
    handle: &JobHandle,
    config: &PollConfig,
) -> Result<String, PipelineError> {
    let deadline = tokio::time::Instant::now() + config.timeout;

    loop {
        if tokio::time::Instant::now() >= deadline {
            return Err(PipelineError::timeout(
                format!("job {} on {}", handle.job_id, handle.provider),
                config.timeout,
            ));
        }

        if let Some(snapshot) = probe_status(client, handle, config).await {
            match snapshot.status {
                JobStatus::Completed => {
                    return snapshot.result_url.ok_or_else(|| {
                        PipelineError::MissingResultUrl {
                            job_id: handle.job_id.clone(),
                            provider: handle.provider.to_string(),
                        }
                    });
                }
                JobStatus::Failed => {
                    return Err(PipelineError::JobFailed {
                        job_id: handle.job_id.clone(),
                        provider: handle.provider.to_string(),
                        detail: snapshot
                            .error
                            .unwrap_or_else(|| "unknown error".to_string()),
                    });
                }
                JobStatus::Pending | JobStatus::Processing => {
                    debug!(
                        job_id = %handle.job_id,
                        provider = %handle.provider,
                        status = ?snapshot.status,
                        "job still in progress"
                    );
                }
            }
        }

        tokio::time::sleep(config.poll_interval).await;
    }
}

/// Probes model hints in order, returning the first usable snapshot.
/// `None` means every probe errored this cycle; the caller waits for the
/// next tick.
async fn probe_status(
    client: &dyn ProviderClient,
    handle: &JobHandle,
    config: &PollConfig,
) -> Option<StatusSnapshot> {
    if config.model_hints.is_empty() {
        return match client.get_status(handle, None).await {
            Ok(snapshot) => Some(snapshot),
            Err(err) => {
                warn!(
                    job_id = %handle.job_id,
                    provider = %handle.provider,
                    error = %err,
                    "status check failed; retrying on next tick"
                );
                None
            }
        };
    }

    for hint in &config.model_hints {
        match client.get_status(handle, Some(hint)).await {
            Ok(snapshot) => return Some(snapshot),
            Err(err) => {
                debug!(
                    job_id = %handle.job_id,
                    model_hint = %hint,
                    error = %err,
                    "status probe failed; trying next hint"
                );
            }
        }
    }
    None
}
