use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::catalog::Room;
use crate::event::{CanonicalEvent, EventStatus, GuestContact};
use crate::platform::{EventKind, Platform};
use crate::reservation::Reservation;

/// Business-level reasons an event could not be applied to inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureReason {
    UnknownRoom,
    NotAvailable,
    RoomAlreadyBooked,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::UnknownRoom => "UNKNOWN_ROOM",
            FailureReason::NotAvailable => "NOT_AVAILABLE",
            FailureReason::RoomAlreadyBooked => "ROOM_ALREADY_BOOKED",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Durable trace of one canonical event's processing.
///
/// Written unprocessed before any side effect, then replaced by either
/// [`EventAuditRecord::mark_processed`] or [`EventAuditRecord::mark_failed`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventAuditRecord {
    pub event_id: Uuid,
    pub platform: Platform,
    pub platform_reservation_id: Option<String>,
    pub kind: EventKind,
    pub external_room_id: Option<String>,
    pub check_in: Option<NaiveDate>,
    pub check_out: Option<NaiveDate>,
    pub guest: GuestContact,
    pub total_amount: Option<BigDecimal>,
    pub status: EventStatus,
    pub property_name: Option<String>,
    pub property_address: Option<String>,
    pub occurred_at: Option<DateTime<Utc>>,
    pub received_at: DateTime<Utc>,
    pub processed: bool,
    pub processed_at: Option<DateTime<Utc>>,
    pub room_id: Option<Uuid>,
    pub reservation_id: Option<Uuid>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl EventAuditRecord {
    pub fn from_event(event: &CanonicalEvent, now: DateTime<Utc>) -> Self {
        Self {
            event_id: event.event_id,
            platform: event.platform,
            platform_reservation_id: event.platform_reservation_id.clone(),
            kind: event.kind,
            external_room_id: event.external_room_id.clone(),
            check_in: event.check_in,
            check_out: event.check_out,
            guest: event.guest.clone(),
            total_amount: event.total_amount.clone(),
            status: event.status,
            property_name: event.property_name.clone(),
            property_address: event.property_address.clone(),
            occurred_at: event.occurred_at,
            received_at: event.received_at,
            processed: false,
            processed_at: None,
            room_id: None,
            reservation_id: None,
            error_message: None,
            created_at: now,
        }
    }

    pub fn mark_processed(
        &self,
        room_id: Option<Uuid>,
        reservation_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            processed: true,
            processed_at: Some(now),
            room_id,
            reservation_id,
            error_message: None,
            ..self.clone()
        }
    }

    pub fn mark_failed(&self, reason: FailureReason) -> Self {
        Self {
            processed: false,
            processed_at: None,
            error_message: Some(reason.as_str().to_string()),
            ..self.clone()
        }
    }
}

/// Result of applying one canonical event to inventory.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessingOutcome {
    pub success: bool,
    pub failure_reason: Option<FailureReason>,
    pub room: Option<Room>,
    pub reservation: Option<Reservation>,
}

impl ProcessingOutcome {
    pub fn success(room: Option<Room>, reservation: Option<Reservation>) -> Self {
        Self {
            success: true,
            failure_reason: None,
            room,
            reservation,
        }
    }

    pub fn failure(reason: FailureReason) -> Self {
        Self {
            success: false,
            failure_reason: Some(reason),
            room: None,
            reservation: None,
        }
    }
}
