use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error body returned by the hotel service on a non-success response.
/// The service is inconsistent about the field name, so both are accepted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ErrorEnvelope {
    pub fn into_message(self) -> Option<String> {
        self.error.or(self.message)
    }
}

/// A malformed record received from the service. Aggregation degrades
/// instead of failing and reports what it saw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DataAnomaly {
    #[error("booking {booking_id} has check-out before check-in")]
    InvertedStay { booking_id: i64 },
    #[error("booking {booking_id} is missing its room reference")]
    MissingRoom { booking_id: i64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_prefers_error_over_message() {
        let envelope: ErrorEnvelope = serde_json::from_value(serde_json::json!({
            "error": "Invalid credentials",
            "message": "Request failed",
        }))
        .expect("envelope");
        assert_eq!(
            envelope.into_message().as_deref(),
            Some("Invalid credentials")
        );
    }

    #[test]
    fn empty_envelope_yields_no_message() {
        let envelope: ErrorEnvelope = serde_json::from_value(serde_json::json!({})).expect("envelope");
        assert_eq!(envelope.into_message(), None);
    }
}
