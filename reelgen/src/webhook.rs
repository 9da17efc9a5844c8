//! Best-effort progress and failure notifications.
//!
//! The pipeline's return value (or raised error) is the authoritative
//! outcome; webhooks are an advisory side channel. Delivery is one
//! bounded-timeout POST; non-success responses and transport failures are
//! logged and discarded, never raised, never retried.

use crate::classify::ErrorClassification;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

/// Lifecycle status reported in a webhook payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WebhookStatus {
    /// A stage is running.
    Processing,
    /// A stage (or the whole run) finished.
    Completed,
    /// The run failed.
    Failed,
}

impl fmt::Display for WebhookStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Processing => write!(f, "processing"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// One outbound notification payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookEvent {
    /// The pipeline run this event belongs to.
    pub generation_id: String,
    /// Stage number (1-3) when the event is stage-scoped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<u8>,
    /// Lifecycle status.
    pub status: WebhookStatus,
    /// Optional human-readable progress message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Stage-specific fields (artifact URLs, provider info, error
    /// classification), flattened into the JSON body.
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl WebhookEvent {
    /// Creates an event with no extra fields.
    #[must_use]
    pub fn new(generation_id: impl Into<String>, status: WebhookStatus) -> Self {
        Self {
            generation_id: generation_id.into(),
            stage: None,
            status,
            message: None,
            fields: serde_json::Map::new(),
        }
    }

    /// Sets the stage number.
    #[must_use]
    pub fn with_stage(mut self, stage: u8) -> Self {
        self.stage = Some(stage);
        self
    }

    /// Sets the progress message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Adds one stage-specific field.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    /// Builds the canonical failure payload for a classified error.
    ///
    /// Carries the classification verbatim plus `current_stage` and a
    /// `stageN_error` technical-detail field when the failure is
    /// stage-scoped.
    #[must_use]
    pub fn failure(
        generation_id: impl Into<String>,
        stage: Option<u8>,
        classification: &ErrorClassification,
    ) -> Self {
        let mut event = Self::new(generation_id, WebhookStatus::Failed)
            .with_field(
                "error_type",
                serde_json::json!(classification.error_type),
            )
            .with_field(
                "error_message",
                serde_json::json!(classification.error_message),
            )
            .with_field(
                "is_refundable",
                serde_json::json!(classification.is_refundable),
            )
            .with_field("can_retry", serde_json::json!(classification.can_retry));

        if let Some(stage) = stage {
            event = event
                .with_field("current_stage", serde_json::json!(stage))
                .with_field("progress", serde_json::json!(0))
                .with_field(
                    format!("stage{stage}_error"),
                    serde_json::json!(classification.technical_details),
                );
        }
        event
    }
}

/// Receives pipeline progress events. Implementations must never fail the
/// caller.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    /// Delivers one event, best-effort.
    async fn notify(&self, event: &WebhookEvent);
}

/// A sink that discards all events. The default when no webhook endpoint is
/// configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpProgressSink;

#[async_trait]
impl ProgressSink for NoOpProgressSink {
    async fn notify(&self, _event: &WebhookEvent) {}
}

/// Delivers events as JSON POSTs to a caller-supplied endpoint.
#[derive(Debug, Clone)]
pub struct HttpWebhookNotifier {
    client: reqwest::Client,
    endpoint: String,
    bearer_token: Option<String>,
    timeout: Duration,
}

impl HttpWebhookNotifier {
    /// Creates a notifier for the given endpoint with a 10s delivery
    /// timeout.
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            bearer_token: None,
            timeout: Duration::from_secs(10),
        }
    }

    /// Sets the bearer token sent in the `Authorization` header.
    #[must_use]
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    /// Overrides the delivery timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl ProgressSink for HttpWebhookNotifier {
    async fn notify(&self, event: &WebhookEvent) {
        let mut request = self
            .client
            .post(&self.endpoint)
            .timeout(self.timeout)
            .json(event);
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }

        match request.send().await {
            Ok(response) if response.status().is_success() => {
                debug!(
                    generation_id = %event.generation_id,
                    stage = ?event.stage,
                    status = %event.status,
                    "webhook delivered"
                );
            }
            Ok(response) => {
                warn!(
                    generation_id = %event.generation_id,
                    http_status = %response.status(),
                    "webhook rejected; dropping event"
                );
            }
            Err(err) => {
                warn!(
                    generation_id = %event.generation_id,
                    error = %err,
                    "webhook delivery failed; dropping event"
                );
            }
        }
    }
}

/// A sink that records every event, for tests.
#[derive(Debug, Default)]
pub struct CollectingProgressSink {
    events: parking_lot::RwLock<Vec<WebhookEvent>>,
}

impl CollectingProgressSink {
    /// Creates an empty collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all events received so far, in delivery order.
    #[must_use]
    pub fn events(&self) -> Vec<WebhookEvent> {
        self.events.read().clone()
    }

    /// Returns the number of events received.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Returns true if no events were received.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }
}

#[async_trait]
impl ProgressSink for CollectingProgressSink {
    async fn notify(&self, event: &WebhookEvent) {
        self.events.write().push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{classify, ErrorType};
    use crate::errors::PipelineError;
    use crate::pipeline::StageIndex;

    #[test]
    fn test_event_flattens_stage_fields() {
        let event = WebhookEvent::new("gen-1", WebhookStatus::Completed)
            .with_stage(1)
            .with_field("person_url", serde_json::json!("https://store/p.png"));
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["generation_id"], "gen-1");
        assert_eq!(json["stage"], 1);
        assert_eq!(json["status"], "completed");
        assert_eq!(json["person_url"], "https://store/p.png");
    }

    #[test]
    fn test_failure_event_carries_classification_and_stage_error() {
        let err = PipelineError::timeout("job x", Duration::from_secs(600));
        let classification = classify(&err, Some(StageIndex::Video));
        let event = WebhookEvent::failure("gen-1", Some(3), &classification);

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["error_type"], "TIMEOUT");
        assert_eq!(json["is_refundable"], true);
        assert_eq!(json["can_retry"], true);
        assert_eq!(json["current_stage"], 3);
        assert!(json["stage3_error"].as_str().unwrap().contains("timed out"));
        assert_eq!(classification.error_type, ErrorType::Timeout);
    }

    #[tokio::test]
    async fn test_collecting_sink_preserves_order() {
        let sink = CollectingProgressSink::new();
        sink.notify(&WebhookEvent::new("gen-1", WebhookStatus::Processing))
            .await;
        sink.notify(&WebhookEvent::new("gen-1", WebhookStatus::Completed))
            .await;
        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].status, WebhookStatus::Processing);
        assert_eq!(events[1].status, WebhookStatus::Completed);
    }

    #[tokio::test]
    async fn test_http_notifier_swallows_unreachable_endpoint() {
        // Nothing listens here; notify must still return without error.
        let notifier = HttpWebhookNotifier::new("http://127.0.0.1:1/webhook")
            .with_timeout(Duration::from_millis(200));
        notifier
            .notify(&WebhookEvent::new("gen-1", WebhookStatus::Processing))
            .await;
    }
}
