//! Identifier and timestamp helpers.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// UTC timestamp used throughout the engine.
pub type Timestamp = DateTime<Utc>;

/// Returns the current UTC timestamp.
#[must_use]
pub fn now_utc() -> Timestamp {
    Utc::now()
}

/// Generates a v4 UUID, for callers that need a fresh generation id.
#[must_use]
pub fn generate_uuid() -> Uuid {
    Uuid::new_v4()
}

/// Formats a timestamp as RFC 3339 for wire payloads.
#[must_use]
pub fn iso_timestamp(timestamp: Timestamp) -> String {
    timestamp.to_rfc3339()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_uuids_are_unique() {
        assert_ne!(generate_uuid(), generate_uuid());
    }

    #[test]
    fn test_now_utc_is_utc() {
        let ts = now_utc();
        assert_eq!(ts.timezone(), Utc);
    }

    #[test]
    fn test_iso_timestamp_is_rfc3339() {
        let formatted = iso_timestamp(now_utc());
        assert!(DateTime::parse_from_rfc3339(&formatted).is_ok());
    }
}
