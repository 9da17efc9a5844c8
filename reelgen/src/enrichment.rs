//! Optional prompt-enrichment collaborator.
//!
//! Enrichment (reference-image analysis, LLM prompt enhancement) is strictly
//! best-effort: the orchestrator catches every failure here and proceeds
//! with the un-enriched prompt. An enrichment outage must never abort a
//! pipeline.

use crate::errors::PipelineError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// What a reference (product) image was found to contain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceAnalysis {
    /// Brand name, when legible.
    pub brand: String,
    /// Visual description of the item.
    pub description: String,
    /// Dominant colors.
    pub colors: Vec<String>,
}

impl ReferenceAnalysis {
    /// Analysis for a reference the analyzer could not make sense of.
    #[must_use]
    pub fn unknown() -> Self {
        Self {
            brand: "Unknown".to_string(),
            description: "product".to_string(),
            colors: Vec::new(),
        }
    }
}

/// Which stage's prompt is being enhanced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptKind {
    /// Stage 1 person prompt.
    Person,
    /// Stage 2 compositing prompt.
    Composite,
    /// Stage 3 animation prompt.
    Video,
}

/// Reference analysis and prompt enhancement.
#[async_trait]
pub trait Enrichment: Send + Sync {
    /// Analyzes a reference image for brand, description and colors.
    async fn analyze_reference(
        &self,
        image_url: &str,
    ) -> Result<ReferenceAnalysis, PipelineError>;

    /// Rewrites a base prompt using the reference analysis, returning the
    /// enhanced prompt.
    async fn enhance_prompt(
        &self,
        kind: PromptKind,
        base_prompt: &str,
        reference: Option<&ReferenceAnalysis>,
    ) -> Result<String, PipelineError>;
}
