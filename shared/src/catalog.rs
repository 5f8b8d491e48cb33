use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::platform::{Platform, UnknownVariant};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    pub id: Uuid,
    pub name: String,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Property {
    pub fn new(name: impl Into<String>, address: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            address,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoomStatus {
    Active,
    Inactive,
    Maintenance,
}

impl RoomStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoomStatus::Active => "ACTIVE",
            RoomStatus::Inactive => "INACTIVE",
            RoomStatus::Maintenance => "MAINTENANCE",
        }
    }
}

impl FromStr for RoomStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(RoomStatus::Active),
            "INACTIVE" => Ok(RoomStatus::Inactive),
            "MAINTENANCE" => Ok(RoomStatus::Maintenance),
            other => Err(UnknownVariant::new("room status", other)),
        }
    }
}

/// A sellable room. Belongs to exactly one property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: Uuid,
    pub property_id: Uuid,
    pub name: String,
    pub room_type: Option<String>,
    pub capacity: Option<i32>,
    pub status: RoomStatus,
    pub created_at: DateTime<Utc>,
}

impl Room {
    pub fn new(property_id: Uuid, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            property_id,
            name: name.into(),
            room_type: None,
            capacity: None,
            status: RoomStatus::Active,
            created_at: Utc::now(),
        }
    }
}

/// Maps a platform-scoped room id onto an internal room.
///
/// `(platform, platform_room_id)` is unique system-wide and a room has at most
/// one listing per platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformListing {
    pub id: Uuid,
    pub room_id: Uuid,
    pub platform: Platform,
    pub platform_room_id: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl PlatformListing {
    pub fn new(room_id: Uuid, platform: Platform, platform_room_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            room_id,
            platform,
            platform_room_id: platform_room_id.into(),
            active: true,
            created_at: Utc::now(),
        }
    }

    pub fn deactivate(&self) -> Self {
        Self {
            active: false,
            ..self.clone()
        }
    }
}
