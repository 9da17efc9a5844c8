//! Tracing initialization helpers.
//!
//! The engine logs through `tracing` everywhere; binaries embedding it call
//! one of these once at startup. Filtering follows `RUST_LOG` with an `info`
//! default.

use tracing_subscriber::{fmt, EnvFilter};

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Installs a compact human-readable subscriber.
///
/// Returns an error string when a global subscriber is already set.
pub fn init_tracing() -> Result<(), String> {
    fmt()
        .with_env_filter(env_filter())
        .compact()
        .try_init()
        .map_err(|err| err.to_string())
}

/// Installs a JSON subscriber for structured log shipping.
///
/// Returns an error string when a global subscriber is already set.
pub fn init_tracing_json() -> Result<(), String> {
    fmt()
        .with_env_filter(env_filter())
        .json()
        .try_init()
        .map_err(|err| err.to_string())
}
