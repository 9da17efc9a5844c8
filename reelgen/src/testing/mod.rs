//! In-crate test support: scripted collaborator mocks and request fixtures.

pub mod fixtures;
mod mocks;

pub use mocks::{
    RecordedSubmission, RecordedUpload, RecordingArtifactStore, ScriptedEnrichment,
    ScriptedProviderClient,
};
