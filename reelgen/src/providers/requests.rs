//! Typed request structs, one per provider capability.
//!
//! Requests are validated at construction so a malformed payload never
//! reaches a provider; validation failures classify as VALIDATION (no
//! refund) rather than surfacing as provider-side errors.

use crate::errors::PipelineError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Output aspect ratio for video generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    /// 9:16, the UGC default.
    #[default]
    #[serde(rename = "9:16")]
    Portrait,
    /// 16:9.
    #[serde(rename = "16:9")]
    Landscape,
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Portrait => write!(f, "9:16"),
            Self::Landscape => write!(f, "16:9"),
        }
    }
}

/// Generation speed/quality trade-off for the video stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoMode {
    /// Faster, cheaper generation (2-3 min).
    Fast,
    /// Higher quality (4-6 min).
    #[default]
    Standard,
}

impl fmt::Display for VideoMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fast => write!(f, "fast"),
            Self::Standard => write!(f, "standard"),
        }
    }
}

/// Text-to-image request (stage 1: person generation).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextToImageRequest {
    /// Generation prompt.
    pub prompt: String,
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Optional seed for reproducible output.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl TextToImageRequest {
    /// Creates a validated text-to-image request.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an empty prompt or zero dimensions.
    pub fn new(
        prompt: impl Into<String>,
        width: u32,
        height: u32,
    ) -> Result<Self, PipelineError> {
        let prompt = prompt.into();
        if prompt.trim().is_empty() {
            return Err(PipelineError::validation("prompt must not be empty"));
        }
        if width == 0 || height == 0 {
            return Err(PipelineError::validation(format!(
                "invalid dimensions: {width}x{height}"
            )));
        }
        Ok(Self {
            prompt,
            width,
            height,
            seed: None,
        })
    }

    /// Sets a generation seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Image-edit request (stage 2: product compositing).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageEditRequest {
    /// URL of the base image to edit.
    pub base_image_url: String,
    /// Edit instructions.
    pub prompt: String,
    /// Optional overlay image (the product) to blend in.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overlay_image_url: Option<String>,
    /// Edit strength in `[0.0, 1.0]`. Lower preserves more of the base
    /// image's lighting and subject.
    pub strength: f32,
}

impl ImageEditRequest {
    /// Creates a validated image-edit request.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an empty base URL or prompt, or a
    /// strength outside `[0.0, 1.0]`.
    pub fn new(
        base_image_url: impl Into<String>,
        prompt: impl Into<String>,
        strength: f32,
    ) -> Result<Self, PipelineError> {
        let base_image_url = base_image_url.into();
        let prompt = prompt.into();
        if base_image_url.trim().is_empty() {
            return Err(PipelineError::validation("base_image_url must not be empty"));
        }
        if prompt.trim().is_empty() {
            return Err(PipelineError::validation("prompt must not be empty"));
        }
        if !(0.0..=1.0).contains(&strength) {
            return Err(PipelineError::validation(format!(
                "strength must be within [0.0, 1.0], got {strength}"
            )));
        }
        Ok(Self {
            base_image_url,
            prompt,
            overlay_image_url: None,
            strength,
        })
    }

    /// Attaches an overlay (product) image.
    #[must_use]
    pub fn with_overlay(mut self, overlay_image_url: impl Into<String>) -> Self {
        self.overlay_image_url = Some(overlay_image_url.into());
        self
    }
}

/// Image-to-video request (stage 3: video generation).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageToVideoRequest {
    /// URL of the source image to animate.
    pub image_url: String,
    /// Animation prompt.
    pub prompt: String,
    /// Speed/quality mode.
    pub mode: VideoMode,
    /// Clip duration in seconds.
    pub duration_secs: u32,
    /// Output aspect ratio.
    pub aspect_ratio: AspectRatio,
}

impl ImageToVideoRequest {
    /// Creates a validated image-to-video request.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an empty image URL or prompt, or a
    /// zero duration.
    pub fn new(
        image_url: impl Into<String>,
        prompt: impl Into<String>,
        mode: VideoMode,
        duration_secs: u32,
        aspect_ratio: AspectRatio,
    ) -> Result<Self, PipelineError> {
        let image_url = image_url.into();
        let prompt = prompt.into();
        if image_url.trim().is_empty() {
            return Err(PipelineError::validation("image_url must not be empty"));
        }
        if prompt.trim().is_empty() {
            return Err(PipelineError::validation("prompt must not be empty"));
        }
        if duration_secs == 0 {
            return Err(PipelineError::validation("duration_secs must be positive"));
        }
        Ok(Self {
            image_url,
            prompt,
            mode,
            duration_secs,
            aspect_ratio,
        })
    }
}
