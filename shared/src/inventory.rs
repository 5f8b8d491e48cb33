use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::platform::UnknownVariant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InventoryStatus {
    Available,
    Booked,
    Blocked,
}

impl InventoryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InventoryStatus::Available => "AVAILABLE",
            InventoryStatus::Booked => "BOOKED",
            InventoryStatus::Blocked => "BLOCKED",
        }
    }
}

impl FromStr for InventoryStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AVAILABLE" => Ok(InventoryStatus::Available),
            "BOOKED" => Ok(InventoryStatus::Booked),
            "BLOCKED" => Ok(InventoryStatus::Blocked),
            other => Err(UnknownVariant::new("inventory status", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DayState {
    Available,
    Booked { reservation_id: Uuid },
    Blocked { reason: String },
}

impl DayState {
    pub fn status(&self) -> InventoryStatus {
        match self {
            DayState::Available => InventoryStatus::Available,
            DayState::Booked { .. } => InventoryStatus::Booked,
            DayState::Blocked { .. } => InventoryStatus::Blocked,
        }
    }
}

/// Availability of one room on one calendar date.
///
/// Storage is sparse: a missing record means the day is available. Records are
/// only ever replaced by the transition functions below, never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryDay {
    pub room_id: Uuid,
    pub date: NaiveDate,
    pub state: DayState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InventoryDay {
    pub fn available(room_id: Uuid, date: NaiveDate, now: DateTime<Utc>) -> Self {
        Self {
            room_id,
            date,
            state: DayState::Available,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_available(&self) -> bool {
        self.state == DayState::Available
    }

    pub fn reservation_id(&self) -> Option<Uuid> {
        match self.state {
            DayState::Booked { reservation_id } => Some(reservation_id),
            _ => None,
        }
    }

    pub fn book(&self, reservation_id: Uuid, now: DateTime<Utc>) -> Self {
        self.transition(DayState::Booked { reservation_id }, now)
    }

    pub fn release(&self, now: DateTime<Utc>) -> Self {
        self.transition(DayState::Available, now)
    }

    pub fn block(&self, reason: impl Into<String>, now: DateTime<Utc>) -> Self {
        self.transition(DayState::Blocked { reason: reason.into() }, now)
    }

    fn transition(&self, state: DayState, now: DateTime<Utc>) -> Self {
        Self {
            state,
            updated_at: now,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> InventoryDay {
        InventoryDay::available(
            Uuid::new_v4(),
            NaiveDate::from_ymd_opt(2025, 8, 15).unwrap(),
            Utc::now(),
        )
    }

    #[test]
    fn book_then_release_clears_reference() {
        let reservation_id = Uuid::new_v4();
        let booked = day().book(reservation_id, Utc::now());
        assert_eq!(booked.state.status(), InventoryStatus::Booked);
        assert_eq!(booked.reservation_id(), Some(reservation_id));

        let released = booked.release(Utc::now());
        assert!(released.is_available());
        assert_eq!(released.reservation_id(), None);
        assert_eq!(released.created_at, booked.created_at);
    }

    #[test]
    fn block_carries_reason_without_reservation() {
        let blocked = day().block("renovation", Utc::now());
        assert_eq!(
            blocked.state,
            DayState::Blocked {
                reason: "renovation".to_string()
            }
        );
        assert_eq!(blocked.reservation_id(), None);
        assert!(blocked.release(Utc::now()).is_available());
    }

    #[test]
    fn transitions_do_not_touch_the_original() {
        let original = day();
        let _ = original.book(Uuid::new_v4(), Utc::now());
        assert!(original.is_available());
    }
}
