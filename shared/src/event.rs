use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::platform::{EventKind, Platform, UnknownVariant};

/// Reservation status as reported by a platform, after normalisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventStatus {
    #[serde(rename = "CONFIRMED")]
    Confirmed,
    #[serde(rename = "CANCELLED")]
    Cancelled,
    #[serde(rename = "NOSHOW")]
    NoShow,
    #[serde(rename = "PENDING")]
    Pending,
    #[serde(rename = "COMPLETED")]
    Completed,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Confirmed => "CONFIRMED",
            EventStatus::Cancelled => "CANCELLED",
            EventStatus::NoShow => "NOSHOW",
            EventStatus::Pending => "PENDING",
            EventStatus::Completed => "COMPLETED",
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CONFIRMED" => Ok(EventStatus::Confirmed),
            "CANCELLED" => Ok(EventStatus::Cancelled),
            "NOSHOW" => Ok(EventStatus::NoShow),
            "PENDING" => Ok(EventStatus::Pending),
            "COMPLETED" => Ok(EventStatus::Completed),
            other => Err(UnknownVariant::new("event status", other)),
        }
    }
}

/// Half-open stay window `[check_in, check_out)`. Always at least one night.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "StayWindowFields")]
pub struct StayWindow {
    check_in: NaiveDate,
    check_out: NaiveDate,
}

#[derive(Deserialize)]
struct StayWindowFields {
    check_in: NaiveDate,
    check_out: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("check-out {check_out} is not after check-in {check_in}")]
pub struct EmptyStayWindow {
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
}

impl TryFrom<StayWindowFields> for StayWindow {
    type Error = EmptyStayWindow;

    fn try_from(fields: StayWindowFields) -> Result<Self, Self::Error> {
        let StayWindowFields { check_in, check_out } = fields;
        StayWindow::new(check_in, check_out).ok_or(EmptyStayWindow { check_in, check_out })
    }
}

impl StayWindow {
    /// Returns `None` unless `check_in` is strictly before `check_out`.
    pub fn new(check_in: NaiveDate, check_out: NaiveDate) -> Option<Self> {
        (check_in < check_out).then_some(Self { check_in, check_out })
    }

    pub fn check_in(&self) -> NaiveDate {
        self.check_in
    }

    pub fn check_out(&self) -> NaiveDate {
        self.check_out
    }

    pub fn nights(&self) -> i64 {
        (self.check_out - self.check_in).num_days()
    }

    /// Every night of the stay, check-out excluded.
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> {
        let check_out = self.check_out;
        self.check_in.iter_days().take_while(move |d| *d < check_out)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.check_in <= date && date < self.check_out
    }

    pub fn overlaps(&self, other: &StayWindow) -> bool {
        self.check_in < other.check_out && other.check_in < self.check_out
    }
}

impl fmt::Display for StayWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.check_in, self.check_out)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestContact {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

/// Platform-neutral form of one inbound booking or cancellation notification.
///
/// Built once per payload by a translator and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalEvent {
    pub event_id: Uuid,
    pub platform: Platform,
    pub platform_reservation_id: Option<String>,
    pub kind: EventKind,
    /// Platform-scoped room identifier, resolved through a platform listing.
    pub external_room_id: Option<String>,
    pub property_name: Option<String>,
    pub property_address: Option<String>,
    pub check_in: Option<NaiveDate>,
    pub check_out: Option<NaiveDate>,
    pub guest: GuestContact,
    pub total_amount: Option<BigDecimal>,
    pub status: EventStatus,
    pub occurred_at: Option<DateTime<Utc>>,
    pub received_at: DateTime<Utc>,
    pub raw_payload: String,
}

impl CanonicalEvent {
    pub fn stay_window(&self) -> Option<StayWindow> {
        StayWindow::new(self.check_in?, self.check_out?)
    }
}
