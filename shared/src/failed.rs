use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An inbound event that failed before a canonical event could be built
/// (unparseable body, unknown platform, translator failure). Kept with its raw
/// payload for manual or offline reprocessing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedEvent {
    pub id: Uuid,
    pub event_id: String,
    pub platform: String,
    pub event_type: String,
    pub correlation_id: String,
    pub reservation_id: String,
    pub raw_payload: String,
    pub error_message: String,
    pub failed_at: DateTime<Utc>,
    pub retry_count: i32,
    pub resolved: bool,
}

impl FailedEvent {
    pub fn new(
        event_id: impl Into<String>,
        platform: impl Into<String>,
        event_type: impl Into<String>,
        correlation_id: impl Into<String>,
        reservation_id: impl Into<String>,
        raw_payload: impl Into<String>,
        error_message: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_id: event_id.into(),
            platform: platform.into(),
            event_type: event_type.into(),
            correlation_id: correlation_id.into(),
            reservation_id: reservation_id.into(),
            raw_payload: raw_payload.into(),
            error_message: error_message.into(),
            failed_at: Utc::now(),
            retry_count: 0,
            resolved: false,
        }
    }

    pub fn resolve(&self) -> Self {
        Self {
            resolved: true,
            ..self.clone()
        }
    }
}
