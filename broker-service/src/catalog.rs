//! Seeds properties, rooms and platform listings from a JSON catalog file.
//!
//! Seeding is safe to repeat: ids of properties and rooms come from the file,
//! and a listing that is already registered is skipped.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Deserialize;
use shared::{Platform, PlatformListing, Property, Room, RoomStatus};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::CatalogError;
use crate::store::CatalogStore;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogFile {
    pub properties: Vec<PropertySeed>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertySeed {
    pub id: Uuid,
    pub name: String,
    pub address: Option<String>,
    #[serde(default)]
    pub rooms: Vec<RoomSeed>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSeed {
    pub id: Uuid,
    pub name: String,
    pub room_type: Option<String>,
    pub capacity: Option<i32>,
    pub status: Option<RoomStatus>,
    #[serde(default)]
    pub listings: Vec<ListingSeed>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingSeed {
    pub id: Option<Uuid>,
    pub platform: Platform,
    pub platform_room_id: String,
    #[serde(default = "listing_active")]
    pub active: bool,
}

fn listing_active() -> bool {
    true
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    pub properties: usize,
    pub rooms: usize,
    pub listings: usize,
    pub skipped_listings: usize,
}

pub async fn load(path: &Path) -> Result<CatalogFile> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading catalog {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing catalog {}", path.display()))
}

pub async fn seed(store: &dyn CatalogStore, catalog: &CatalogFile) -> Result<SeedSummary> {
    let mut summary = SeedSummary::default();
    let now = Utc::now();

    for property_seed in &catalog.properties {
        let property = Property {
            id: property_seed.id,
            name: property_seed.name.clone(),
            address: property_seed.address.clone(),
            created_at: now,
        };
        store.register_property(&property).await?;
        summary.properties += 1;

        for room_seed in &property_seed.rooms {
            let room = Room {
                id: room_seed.id,
                property_id: property.id,
                name: room_seed.name.clone(),
                room_type: room_seed.room_type.clone(),
                capacity: room_seed.capacity,
                status: room_seed.status.unwrap_or(RoomStatus::Active),
                created_at: now,
            };
            store.register_room(&room).await?;
            summary.rooms += 1;

            for listing_seed in &room_seed.listings {
                let mut listing = PlatformListing::new(room.id, listing_seed.platform, listing_seed.platform_room_id.as_str());
                if let Some(id) = listing_seed.id {
                    listing.id = id;
                }
                if !listing_seed.active {
                    listing = listing.deactivate();
                }

                match store.register_listing(&listing).await {
                    Ok(()) => summary.listings += 1,
                    Err(e @ (CatalogError::DuplicateListing { .. } | CatalogError::RoomAlreadyListed { .. })) => {
                        warn!("Skipping listing of room {}: {}", room.id, e);
                        summary.skipped_listings += 1;
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        }
    }

    info!(
        "Catalog seeded: {} properties, {} rooms, {} listings ({} skipped)",
        summary.properties, summary.rooms, summary.listings, summary.skipped_listings
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use crate::store::{PlatformListingDirectory, ProcessingStore};

    const CATALOG: &str = r#"{
        "properties": [{
            "id": "6f1c2a5e-1111-4a4a-9b9b-000000000001",
            "name": "Seoul Stay",
            "address": "Seoul Jung-gu 1",
            "rooms": [{
                "id": "6f1c2a5e-2222-4a4a-9b9b-000000000001",
                "name": "101",
                "roomType": "DOUBLE",
                "capacity": 2,
                "listings": [
                    { "platform": "YANOLJA", "platformRoomId": "R-101" },
                    { "platform": "AIRBNB", "platformRoomId": "L-778" },
                    { "platform": "YEOGIEOTTAE", "platformRoomId": "RT-5", "active": false }
                ]
            }]
        }]
    }"#;

    #[tokio::test]
    async fn seeded_listings_resolve_to_their_room() {
        let store = MemoryStore::new();
        let catalog: CatalogFile = serde_json::from_str(CATALOG).unwrap();

        let summary = seed(&store, &catalog).await.unwrap();
        assert_eq!(summary.rooms, 1);
        assert_eq!(summary.listings, 3);

        let mut tx = store.begin().await.unwrap();
        let room = tx.find_room(Platform::Airbnb, "L-778").await.unwrap().unwrap();
        assert_eq!(room.name, "101");
        assert_eq!(room.capacity, Some(2));
        assert!(tx.find_room(Platform::Yeogieottae, "RT-5").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn reseeding_skips_duplicate_listings() {
        let store = MemoryStore::new();
        let catalog: CatalogFile = serde_json::from_str(CATALOG).unwrap();

        seed(&store, &catalog).await.unwrap();
        let again = seed(&store, &catalog).await.unwrap();
        assert_eq!(again.listings, 0);
        assert_eq!(again.skipped_listings, 3);
    }
}
