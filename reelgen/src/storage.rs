//! Durable artifact storage collaborator.
//!
//! Stages never hand a raw provider result URL to the next stage; the
//! orchestrator persists every output through an [`ArtifactStore`] and chains
//! the durable URL instead. Implementations (S3 and friends) live outside
//! this crate.

use crate::errors::PipelineError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What kind of artifact is being stored. Determines the key prefix and
/// file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactCategory {
    /// Stage 1 output: the generated person.
    PersonImage,
    /// Stage 2 output: person plus product.
    CompositeImage,
    /// Stage 3 output: the final clip.
    Video,
    /// Caller-supplied product reference image.
    ProductImage,
}

impl ArtifactCategory {
    /// Key prefix under which artifacts of this category are stored.
    #[must_use]
    pub fn key_prefix(self) -> &'static str {
        match self {
            Self::PersonImage => "person-images",
            Self::CompositeImage => "composites",
            Self::Video => "videos",
            Self::ProductImage => "products",
        }
    }

    /// File extension for this category.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Video => "mp4",
            _ => "png",
        }
    }

    /// Builds the object key `prefix/owner_id/generation_id.ext`.
    #[must_use]
    pub fn object_key(self, owner_id: &str, generation_id: &str) -> String {
        format!(
            "{}/{}/{}.{}",
            self.key_prefix(),
            owner_id,
            generation_id,
            self.extension()
        )
    }
}

impl fmt::Display for ArtifactCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PersonImage => write!(f, "person-image"),
            Self::CompositeImage => write!(f, "composite-image"),
            Self::Video => write!(f, "video"),
            Self::ProductImage => write!(f, "product-image"),
        }
    }
}

/// A durably stored artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredArtifact {
    /// Externally fetchable URL.
    pub url: String,
    /// Storage key within the backing bucket.
    pub key: String,
}

/// Durable object storage for generated artifacts.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Downloads `source_url` and persists it, returning the durable URL and
    /// storage key.
    async fn upload_artifact(
        &self,
        source_url: &str,
        category: ArtifactCategory,
        owner_id: &str,
        generation_id: &str,
    ) -> Result<StoredArtifact, PipelineError>;
}
