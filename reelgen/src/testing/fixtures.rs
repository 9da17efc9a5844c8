//! Shared request fixtures for orchestrator tests.

use crate::enrichment::ReferenceAnalysis;
use crate::pipeline::{
    CompositeStageRequest, FullPipelineRequest, PersonCompositeRequest, PersonStageRequest,
    VideoStageRequest,
};
use crate::prompts::{PersonAttributes, PersonPromptSpec};
use crate::providers::{AspectRatio, VideoMode};
use crate::utils::generate_uuid;

/// Owner used by every fixture.
pub const OWNER_ID: &str = "user-1";

/// Generation id used by the fixed-identity fixtures.
pub const GENERATION_ID: &str = "gen-1";

/// Product reference image used by every fixture.
pub const PRODUCT_IMAGE_URL: &str = "https://store.example/products/user-1/serum.png";

/// A fresh caller-style generation id.
#[must_use]
pub fn fresh_generation_id() -> String {
    generate_uuid().to_string()
}

/// What the analyzer finds in the fixture product image.
#[must_use]
pub fn reference_analysis() -> ReferenceAnalysis {
    ReferenceAnalysis {
        brand: "Glow Labs".to_string(),
        description: "amber glass serum bottle".to_string(),
        colors: vec!["amber".to_string(), "gold".to_string()],
    }
}

/// A complete three-stage request.
#[must_use]
pub fn full_request() -> FullPipelineRequest {
    FullPipelineRequest {
        generation_id: GENERATION_ID.to_string(),
        owner_id: OWNER_ID.to_string(),
        person: PersonPromptSpec::Fields(PersonAttributes::default()),
        product_image_url: PRODUCT_IMAGE_URL.to_string(),
        composite_prompt: None,
        video_prompt: "dialogue: this serum changed my skin".to_string(),
        video_mode: VideoMode::Standard,
        video_duration_secs: 8,
        video_aspect_ratio: AspectRatio::Portrait,
    }
}

/// A stage-1-only request.
#[must_use]
pub fn person_request() -> PersonStageRequest {
    PersonStageRequest {
        generation_id: fresh_generation_id(),
        owner_id: OWNER_ID.to_string(),
        person: PersonPromptSpec::Fields(PersonAttributes::default()),
    }
}

/// A stage-2-only request consuming an already durable person image.
#[must_use]
pub fn composite_request() -> CompositeStageRequest {
    CompositeStageRequest {
        generation_id: GENERATION_ID.to_string(),
        owner_id: OWNER_ID.to_string(),
        person_image_url: "https://store.example/person-images/user-1/gen-0.png".to_string(),
        product_image_url: PRODUCT_IMAGE_URL.to_string(),
        composite_prompt: None,
    }
}

/// A stage-3-only request consuming an already durable composite image.
#[must_use]
pub fn video_request() -> VideoStageRequest {
    VideoStageRequest {
        generation_id: GENERATION_ID.to_string(),
        owner_id: OWNER_ID.to_string(),
        composite_image_url: "https://store.example/composites/user-1/gen-0.png".to_string(),
        video_prompt: "dialogue: this serum changed my skin".to_string(),
        mode: VideoMode::Standard,
        duration_secs: 8,
        aspect_ratio: AspectRatio::Portrait,
        product_image_url: Some(PRODUCT_IMAGE_URL.to_string()),
    }
}

/// A stages-1-and-2 request.
#[must_use]
pub fn person_composite_request() -> PersonCompositeRequest {
    PersonCompositeRequest {
        generation_id: GENERATION_ID.to_string(),
        owner_id: OWNER_ID.to_string(),
        person: PersonPromptSpec::Fields(PersonAttributes::default()),
        product_image_url: PRODUCT_IMAGE_URL.to_string(),
        composite_prompt: None,
    }
}
