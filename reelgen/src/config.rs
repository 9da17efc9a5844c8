//! Pipeline timing and polling configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timeouts, poll intervals and status-probe hints for one orchestrator.
///
/// Defaults reflect observed provider behavior: image stages finish within a
/// couple of minutes, video within ten; the cheap video provider gets one
/// minute to accept a job before the coordinator commits to the fallback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Stage 1 polling deadline.
    pub person_timeout: Duration,
    /// Stage 2 polling deadline.
    pub composite_timeout: Duration,
    /// Stage 3 polling deadline.
    pub video_timeout: Duration,
    /// Delay between status checks for image stages.
    pub image_poll_interval: Duration,
    /// Delay between status checks for the video stage.
    pub video_poll_interval: Duration,
    /// Bound on the primary video provider before failing over.
    pub fallback_timeout: Duration,
    /// Ordered model identifiers probed when polling image jobs.
    pub image_model_hints: Vec<String>,
    /// Ordered model identifiers probed when polling video jobs.
    pub video_model_hints: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            person_timeout: Duration::from_secs(120),
            composite_timeout: Duration::from_secs(90),
            video_timeout: Duration::from_secs(600),
            image_poll_interval: Duration::from_secs(5),
            video_poll_interval: Duration::from_secs(30),
            fallback_timeout: Duration::from_secs(60),
            image_model_hints: Vec::new(),
            video_model_hints: Vec::new(),
        }
    }
}

impl PipelineConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the stage-1 polling deadline.
    #[must_use]
    pub fn with_person_timeout(mut self, timeout: Duration) -> Self {
        self.person_timeout = timeout;
        self
    }

    /// Sets the stage-2 polling deadline.
    #[must_use]
    pub fn with_composite_timeout(mut self, timeout: Duration) -> Self {
        self.composite_timeout = timeout;
        self
    }

    /// Sets the stage-3 polling deadline.
    #[must_use]
    pub fn with_video_timeout(mut self, timeout: Duration) -> Self {
        self.video_timeout = timeout;
        self
    }

    /// Sets the image-stage poll interval.
    #[must_use]
    pub fn with_image_poll_interval(mut self, interval: Duration) -> Self {
        self.image_poll_interval = interval;
        self
    }

    /// Sets the video-stage poll interval.
    #[must_use]
    pub fn with_video_poll_interval(mut self, interval: Duration) -> Self {
        self.video_poll_interval = interval;
        self
    }

    /// Sets the primary-provider bound for the video stage.
    #[must_use]
    pub fn with_fallback_timeout(mut self, timeout: Duration) -> Self {
        self.fallback_timeout = timeout;
        self
    }

    /// Sets the model hints probed when polling image jobs.
    #[must_use]
    pub fn with_image_model_hints(mut self, hints: Vec<String>) -> Self {
        self.image_model_hints = hints;
        self
    }

    /// Sets the model hints probed when polling video jobs.
    #[must_use]
    pub fn with_video_model_hints(mut self, hints: Vec<String>) -> Self {
        self.video_model_hints = hints;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.person_timeout, Duration::from_secs(120));
        assert_eq!(config.composite_timeout, Duration::from_secs(90));
        assert_eq!(config.video_timeout, Duration::from_secs(600));
        assert_eq!(config.fallback_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_builder_overrides() {
        let config = PipelineConfig::new()
            .with_video_timeout(Duration::from_secs(300))
            .with_video_poll_interval(Duration::from_secs(10))
            .with_video_model_hints(vec!["veo3".to_string()]);
        assert_eq!(config.video_timeout, Duration::from_secs(300));
        assert_eq!(config.video_poll_interval, Duration::from_secs(10));
        assert_eq!(config.video_model_hints, vec!["veo3".to_string()]);
    }
}
