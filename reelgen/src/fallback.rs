//! Timeout-then-failover between a primary and a secondary provider.
//!
//! The primary is the cheaper, variable-latency provider; bounding only the
//! primary attempt keeps the savings on the common path while guaranteeing a
//! bounded worst case before committing to the more expensive fallback.

use crate::errors::PipelineError;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{info, warn};

use crate::providers::ProviderId;

/// How one provider attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttemptOutcome {
    /// The attempt produced a value.
    Success,
    /// The attempt exceeded the coordinator's timeout.
    Timeout,
    /// The attempt raised an error.
    Error,
}

/// Record of a single provider attempt inside the coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderAttempt {
    /// The provider attempted.
    pub provider: ProviderId,
    /// How the attempt ended.
    pub outcome: AttemptOutcome,
    /// Error detail for TIMEOUT / ERROR outcomes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Tagged result of [`race_with_fallback`].
#[derive(Debug, Clone)]
pub struct FallbackOutcome<T> {
    /// The successful attempt's value.
    pub value: T,
    /// The provider that produced the value.
    pub provider_used: ProviderId,
    /// True when the fallback produced the value.
    pub fallback_triggered: bool,
    /// The provider tried first.
    pub primary_provider: ProviderId,
    /// Why the primary attempt was abandoned, when it was.
    pub primary_error: Option<String>,
    primary_outcome: AttemptOutcome,
}

impl<T> FallbackOutcome<T> {
    /// Wraps a value produced without any failover policy, e.g. a stage
    /// configured with a single fixed provider.
    #[must_use]
    pub fn direct(value: T, provider: ProviderId) -> Self {
        Self {
            value,
            provider_used: provider.clone(),
            fallback_triggered: false,
            primary_provider: provider,
            primary_error: None,
            primary_outcome: AttemptOutcome::Success,
        }
    }

    /// Reconstructs the primary attempt record.
    #[must_use]
    pub fn primary_attempt(&self) -> ProviderAttempt {
        ProviderAttempt {
            provider: self.primary_provider.clone(),
            outcome: self.primary_outcome,
            error: self.primary_error.clone(),
        }
    }
}

/// Runs the primary operation bounded by `primary_timeout`, falling over to
/// the fallback operation when the primary times out or errors.
///
/// If the primary resolves within the bound, the fallback is never polled.
/// On expiry the primary attempt is left running detached, abandoned rather
/// than cancelled, because the provider-side job state after cancellation is
/// unspecified. The fallback runs with no timeout from this layer; it is
/// bounded only by its own polling deadline downstream.
///
/// # Errors
///
/// Returns [`PipelineError::AllProvidersFailed`] embedding both failure
/// texts when the fallback also fails; the coordinator never makes a third
/// attempt.
pub async fn race_with_fallback<T, P, F>(
    primary_provider: ProviderId,
    primary_op: P,
    fallback_provider: ProviderId,
    fallback_op: F,
    primary_timeout: Duration,
) -> Result<FallbackOutcome<T>, PipelineError>
where
    T: Send + 'static,
    P: Future<Output = Result<T, PipelineError>> + Send + 'static,
    F: Future<Output = Result<T, PipelineError>> + Send,
{
    // The primary runs on its own task so that dropping the bound below
    // abandons it without cancelling the in-flight call.
    let primary_task = tokio::spawn(primary_op);

    let (primary_error, primary_outcome) =
        match tokio::time::timeout(primary_timeout, primary_task).await {
            Ok(Ok(Ok(value))) => {
                return Ok(FallbackOutcome::direct(value, primary_provider));
            }
            Ok(Ok(Err(err))) => (
                format!("{primary_provider} failed: {err}"),
                AttemptOutcome::Error,
            ),
            Ok(Err(join_err)) => (
                format!("{primary_provider} task aborted: {join_err}"),
                AttemptOutcome::Error,
            ),
            Err(_) => (
                format!(
                    "{primary_provider} did not respond within {}s",
                    primary_timeout.as_secs_f64()
                ),
                AttemptOutcome::Timeout,
            ),
        };

    warn!(
        primary = %primary_provider,
        fallback = %fallback_provider,
        error = %primary_error,
        "primary provider abandoned; falling back"
    );

    match fallback_op.await {
        Ok(value) => {
            info!(
                provider = %fallback_provider,
                "fallback provider succeeded"
            );
            Ok(FallbackOutcome {
                value,
                provider_used: fallback_provider,
                fallback_triggered: true,
                primary_provider,
                primary_error: Some(primary_error),
                primary_outcome,
            })
        }
        Err(fallback_err) => Err(PipelineError::AllProvidersFailed {
            primary: primary_provider.to_string(),
            primary_error,
            fallback: fallback_provider.to_string(),
            fallback_error: fallback_err.to_string(),
        }),
    }
}
