//! Persistence collaborators of the broker.
//!
//! The processing engine talks to storage only through a [`ProcessingTx`]: one
//! unit of work that either commits every write it staged or none of them.
//! Raw capture, failed events and catalog registration sit outside that unit.
//!
//! Two backends implement every trait here: [`memory`] for tests and
//! single-process runs, [`postgres`] for deployments.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use shared::{
    EventAuditRecord, FailedEvent, InventoryDay, Platform, PlatformListing, Property,
    Reservation, Room, StayWindow,
};
use uuid::Uuid;

use crate::error::{CatalogError, StoreError};
use crate::ingestion::EventHeaders;

/// Resolves platform room ids to internal rooms. Only active listings resolve.
#[async_trait]
pub trait PlatformListingDirectory: Send {
    async fn find_room(
        &mut self,
        platform: Platform,
        platform_room_id: &str,
    ) -> Result<Option<Room>, StoreError>;

    async fn find_room_by_id(&mut self, room_id: Uuid) -> Result<Option<Room>, StoreError>;
}

#[async_trait]
pub trait InventoryStore: Send {
    /// Takes the exclusive lock on `(room_id, window)` for the rest of the unit
    /// of work. Waits while an overlapping range on the same room is held.
    async fn lock_range(&mut self, room_id: Uuid, window: StayWindow) -> Result<(), StoreError>;

    /// Stored records inside the window, ordered by date. Dates without a
    /// record are available.
    async fn days_in(
        &mut self,
        room_id: Uuid,
        window: StayWindow,
    ) -> Result<Vec<InventoryDay>, StoreError>;

    async fn upsert_day(&mut self, day: &InventoryDay) -> Result<(), StoreError>;
}

#[async_trait]
pub trait ReservationStore: Send {
    /// Takes the exclusive lock on one platform reservation id for the rest of
    /// the unit of work, whether or not a reservation exists under it yet.
    async fn lock_reservation(
        &mut self,
        platform: Platform,
        platform_reservation_id: &str,
    ) -> Result<(), StoreError>;

    async fn find_reservation(
        &mut self,
        platform: Platform,
        platform_reservation_id: &str,
    ) -> Result<Option<Reservation>, StoreError>;

    async fn upsert_reservation(&mut self, reservation: &Reservation) -> Result<(), StoreError>;
}

#[async_trait]
pub trait AuditStore: Send {
    async fn upsert_audit(&mut self, record: &EventAuditRecord) -> Result<(), StoreError>;
}

/// One atomic unit of processing work.
///
/// Dropping a transaction without calling [`ProcessingTx::commit`] discards
/// its writes and releases its locks.
#[async_trait]
pub trait ProcessingTx: PlatformListingDirectory + InventoryStore + ReservationStore + AuditStore {
    async fn commit(&mut self) -> Result<(), StoreError>;

    async fn rollback(&mut self) -> Result<(), StoreError>;
}

#[async_trait]
pub trait ProcessingStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn ProcessingTx>, StoreError>;
}

/// Append-only capture of every inbound body, taken before any parsing.
#[async_trait]
pub trait RawStore: Send + Sync {
    async fn store(&self, raw_body: &str, headers: &EventHeaders) -> Result<(), StoreError>;
}

/// Events that failed before a canonical event existed.
#[async_trait]
pub trait FailedEventSink: Send + Sync {
    async fn save(&self, event: FailedEvent) -> Result<(), StoreError>;

    /// Newest first.
    async fn recent(&self, limit: usize) -> Result<Vec<FailedEvent>, StoreError>;

    /// Returns false when no entry has that id.
    async fn resolve(&self, id: Uuid) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn register_property(&self, property: &Property) -> Result<(), CatalogError>;

    async fn register_room(&self, room: &Room) -> Result<(), CatalogError>;

    /// Rejects a second listing for the same platform room id, and a second
    /// listing of the same room on one platform.
    async fn register_listing(&self, listing: &PlatformListing) -> Result<(), CatalogError>;
}
