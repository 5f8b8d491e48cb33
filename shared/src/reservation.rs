use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::event::{CanonicalEvent, GuestContact, StayWindow};
use crate::platform::{Platform, UnknownVariant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReservationStatus {
    #[serde(rename = "CONFIRMED")]
    Confirmed,
    #[serde(rename = "CANCELLED")]
    Cancelled,
    #[serde(rename = "COMPLETED")]
    Completed,
    #[serde(rename = "NOSHOW")]
    NoShow,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Confirmed => "CONFIRMED",
            ReservationStatus::Cancelled => "CANCELLED",
            ReservationStatus::Completed => "COMPLETED",
            ReservationStatus::NoShow => "NOSHOW",
        }
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReservationStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CONFIRMED" => Ok(ReservationStatus::Confirmed),
            "CANCELLED" => Ok(ReservationStatus::Cancelled),
            "COMPLETED" => Ok(ReservationStatus::Completed),
            "NOSHOW" => Ok(ReservationStatus::NoShow),
            other => Err(UnknownVariant::new("reservation status", other)),
        }
    }
}

/// Why a canonical event cannot become a reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum IncompleteBooking {
    #[error("booking carries no platform reservation id")]
    MissingReservationId,
    #[error("booking has no valid stay window")]
    InvalidStayWindow,
}

/// A booking held on one room, unique per (platform, platform reservation id).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: Uuid,
    pub room_id: Uuid,
    pub platform: Platform,
    pub platform_reservation_id: String,
    pub window: StayWindow,
    pub guest: GuestContact,
    pub total_amount: Option<BigDecimal>,
    pub status: ReservationStatus,
    pub booked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Reservation {
    /// A new reservation always starts out confirmed.
    pub fn book(
        room_id: Uuid,
        event: &CanonicalEvent,
        now: DateTime<Utc>,
    ) -> Result<Self, IncompleteBooking> {
        let platform_reservation_id = event
            .platform_reservation_id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .ok_or(IncompleteBooking::MissingReservationId)?;
        let window = event.stay_window().ok_or(IncompleteBooking::InvalidStayWindow)?;

        Ok(Self {
            id: Uuid::new_v4(),
            room_id,
            platform: event.platform,
            platform_reservation_id,
            window,
            guest: event.guest.clone(),
            total_amount: event.total_amount.clone(),
            status: ReservationStatus::Confirmed,
            booked_at: event.occurred_at,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn is_confirmed(&self) -> bool {
        self.status == ReservationStatus::Confirmed
    }

    /// True when this reservation already holds exactly the given room and stay.
    pub fn holds(&self, room_id: Uuid, window: &StayWindow) -> bool {
        self.room_id == room_id && &self.window == window
    }

    pub fn cancel(&self, now: DateTime<Utc>) -> Self {
        self.with_status(ReservationStatus::Cancelled, now)
    }

    pub fn complete(&self, now: DateTime<Utc>) -> Self {
        self.with_status(ReservationStatus::Completed, now)
    }

    pub fn mark_no_show(&self, now: DateTime<Utc>) -> Self {
        self.with_status(ReservationStatus::NoShow, now)
    }

    pub fn with_guest(&self, guest: GuestContact, now: DateTime<Utc>) -> Self {
        Self {
            guest,
            updated_at: now,
            ..self.clone()
        }
    }

    fn with_status(&self, status: ReservationStatus, now: DateTime<Utc>) -> Self {
        Self {
            status,
            updated_at: now,
            ..self.clone()
        }
    }
}
