#![allow(dead_code, clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;

use broker_service::ingestion::{EventHeaders, IngestionCoordinator};
use broker_service::processing::ReservationEngine;
use broker_service::store::memory::{MemoryFailedEventSink, MemoryRawStore, MemoryStore};
use broker_service::store::CatalogStore;
use broker_service::translator::{PayloadTranslator, TranslatorRegistry, YanoljaTranslator};
use chrono::NaiveDate;
use serde_json::json;
use shared::{CanonicalEvent, EventKind, Platform, PlatformListing, Property, Room};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Registers one property with one room, listed on every given platform.
pub async fn listed_room(store: &MemoryStore, listings: &[(Platform, &str)]) -> Room {
    let property = Property::new("Seoul Stay", Some("Seoul Jung-gu 1".to_string()));
    store.register_property(&property).await.unwrap();
    let room = Room::new(property.id, "101");
    store.register_room(&room).await.unwrap();
    for (platform, platform_room_id) in listings {
        store
            .register_listing(&PlatformListing::new(room.id, *platform, *platform_room_id))
            .await
            .unwrap();
    }
    room
}

pub fn yanolja_payload(reservation_id: &str, room_id: &str, check_in: &str, check_out: &str) -> serde_json::Value {
    json!({
        "reservationId": reservation_id,
        "roomId": room_id,
        "accommodationName": "Seoul Stay",
        "accommodationAddress": "Seoul Jung-gu 1",
        "checkInDate": check_in,
        "checkOutDate": check_out,
        "guestName": "김민수",
        "guestPhone": "010-1234-5678",
        "totalPrice": 380000,
        "status": "예약완료",
        "bookedAt": "2025-08-01T10:30:00"
    })
}

pub fn yanolja_event(
    kind: EventKind,
    reservation_id: &str,
    room_id: &str,
    check_in: &str,
    check_out: &str,
) -> CanonicalEvent {
    let payload = yanolja_payload(reservation_id, room_id, check_in, check_out);
    YanoljaTranslator.translate(&payload.to_string(), kind).unwrap()
}

/// Request body as a platform posts it.
pub fn envelope(event_id: &str, reservation_id: &str, payload: serde_json::Value) -> String {
    json!({
        "eventId": event_id,
        "reservationId": reservation_id,
        "payload": payload,
    })
    .to_string()
}

pub fn headers(platform: &str, event_type: &str) -> EventHeaders {
    EventHeaders {
        event_id: None,
        platform: Some(platform.to_string()),
        event_type: Some(event_type.to_string()),
        correlation_id: Some("c0ffee00".to_string()),
    }
}

pub struct Broker {
    pub store: MemoryStore,
    pub raw: Arc<MemoryRawStore>,
    pub failed_events: Arc<MemoryFailedEventSink>,
    pub engine: ReservationEngine,
    pub coordinator: IngestionCoordinator,
}

impl Broker {
    pub fn new() -> Self {
        let store = MemoryStore::new();
        let raw = Arc::new(MemoryRawStore::new());
        let failed_events = Arc::new(MemoryFailedEventSink::new(100));
        let engine = ReservationEngine::new(Arc::new(store.clone()));
        let coordinator = IngestionCoordinator::new(
            raw.clone(),
            TranslatorRegistry::standard(),
            engine.clone(),
            failed_events.clone(),
        );
        Self {
            store,
            raw,
            failed_events,
            engine,
            coordinator,
        }
    }
}
