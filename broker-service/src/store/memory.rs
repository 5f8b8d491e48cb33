//! In-memory backend.
//!
//! Writes of a [`MemoryTx`] are staged privately and applied to the shared
//! tables in one step on commit, so readers never see half of a unit of work.
//! Range locks are per room and only overlapping stay windows contend.
//! Reservation locks are per platform reservation id.
//!
//! Not durable: everything is lost when the process exits.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use shared::{
    EventAuditRecord, FailedEvent, InventoryDay, Platform, PlatformListing, Property,
    Reservation, Room, StayWindow,
};
use tokio::sync::Notify;
use tracing::warn;
use uuid::Uuid;

use super::{
    AuditStore, CatalogStore, FailedEventSink, InventoryStore, PlatformListingDirectory,
    ProcessingStore, ProcessingTx, RawStore, ReservationStore,
};
use crate::error::{CatalogError, StoreError};
use crate::ingestion::EventHeaders;

fn poison_err<T>(_: PoisonError<T>) -> StoreError {
    StoreError::Unavailable("lock poisoned".to_string())
}

type DayKey = (Uuid, NaiveDate);
type ReservationKey = (Platform, String);

fn window_keys(room_id: Uuid, window: &StayWindow) -> std::ops::Range<DayKey> {
    (room_id, window.check_in())..(room_id, window.check_out())
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum LockScope {
    Range { room_id: Uuid, window: StayWindow },
    Reservation(ReservationKey),
}

impl LockScope {
    fn contends_with(&self, other: &LockScope) -> bool {
        match (self, other) {
            (
                LockScope::Range { room_id, window },
                LockScope::Range { room_id: other_room, window: other_window },
            ) => room_id == other_room && window.overlaps(other_window),
            (LockScope::Reservation(key), LockScope::Reservation(other_key)) => key == other_key,
            _ => false,
        }
    }
}

#[derive(Debug)]
struct HeldLock {
    id: u64,
    scope: LockScope,
}

/// Exclusive locks on `(room, stay window)` pairs and on platform
/// reservation ids.
#[derive(Debug, Default)]
pub struct TxLocks {
    held: Mutex<Vec<HeldLock>>,
    released: Notify,
    next_id: AtomicU64,
}

impl TxLocks {
    /// Waits until no overlapping range of the same room is held, then takes it.
    pub async fn acquire_range(self: &Arc<Self>, room_id: Uuid, window: StayWindow) -> Result<LockGuard, StoreError> {
        self.acquire(LockScope::Range { room_id, window }).await
    }

    /// Waits until nobody holds the same platform reservation id, then takes it.
    pub async fn acquire_reservation(
        self: &Arc<Self>,
        platform: Platform,
        platform_reservation_id: &str,
    ) -> Result<LockGuard, StoreError> {
        self.acquire(LockScope::Reservation((platform, platform_reservation_id.to_string())))
            .await
    }

    async fn acquire(self: &Arc<Self>, scope: LockScope) -> Result<LockGuard, StoreError> {
        loop {
            // registered before checking so a release in between is not missed
            let released = self.released.notified();
            tokio::pin!(released);
            released.as_mut().enable();

            {
                let mut held = self.held.lock().map_err(poison_err)?;
                if !held.iter().any(|h| h.scope.contends_with(&scope)) {
                    let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                    held.push(HeldLock { id, scope });
                    return Ok(LockGuard {
                        locks: Arc::clone(self),
                        id,
                    });
                }
            }

            released.await;
        }
    }

    pub fn held_count(&self) -> usize {
        self.held
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Releases its lock when dropped.
#[derive(Debug)]
pub struct LockGuard {
    locks: Arc<TxLocks>,
    id: u64,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let mut held = self.locks.held.lock().unwrap_or_else(PoisonError::into_inner);
        held.retain(|h| h.id != self.id);
        drop(held);
        self.locks.released.notify_waiters();
    }
}

#[derive(Debug, Default)]
struct Tables {
    properties: HashMap<Uuid, Property>,
    rooms: HashMap<Uuid, Room>,
    listings: HashMap<Uuid, PlatformListing>,
    days: BTreeMap<DayKey, InventoryDay>,
    reservations: HashMap<ReservationKey, Reservation>,
    audits: HashMap<Uuid, EventAuditRecord>,
}

impl Tables {
    fn room_for_listing(&self, platform: Platform, platform_room_id: &str) -> Option<Room> {
        self.listings
            .values()
            .find(|l| l.active && l.platform == platform && l.platform_room_id == platform_room_id)
            .and_then(|l| self.rooms.get(&l.room_id))
            .cloned()
    }
}

#[derive(Debug, Default)]
struct Staged {
    days: BTreeMap<DayKey, InventoryDay>,
    reservations: HashMap<ReservationKey, Reservation>,
    audits: HashMap<Uuid, EventAuditRecord>,
}

/// Catalog, inventory, reservations and audit records held in process memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
    locks: Arc<TxLocks>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, StoreError> {
        self.tables.read().map_err(poison_err)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, StoreError> {
        self.tables.write().map_err(poison_err)
    }

    pub fn inventory_day(&self, room_id: Uuid, date: NaiveDate) -> Result<Option<InventoryDay>, StoreError> {
        Ok(self.read()?.days.get(&(room_id, date)).cloned())
    }

    pub fn inventory_days(&self, room_id: Uuid) -> Result<Vec<InventoryDay>, StoreError> {
        Ok(self
            .read()?
            .days
            .values()
            .filter(|d| d.room_id == room_id)
            .cloned()
            .collect())
    }

    pub fn reservation(
        &self,
        platform: Platform,
        platform_reservation_id: &str,
    ) -> Result<Option<Reservation>, StoreError> {
        Ok(self
            .read()?
            .reservations
            .get(&(platform, platform_reservation_id.to_string()))
            .cloned())
    }

    pub fn reservation_count(&self) -> Result<usize, StoreError> {
        Ok(self.read()?.reservations.len())
    }

    pub fn audit(&self, event_id: Uuid) -> Result<Option<EventAuditRecord>, StoreError> {
        Ok(self.read()?.audits.get(&event_id).cloned())
    }

    pub fn audits(&self) -> Result<Vec<EventAuditRecord>, StoreError> {
        let mut records: Vec<_> = self.read()?.audits.values().cloned().collect();
        records.sort_by_key(|r| r.created_at);
        Ok(records)
    }

    pub fn held_locks(&self) -> usize {
        self.locks.held_count()
    }
}

#[async_trait]
impl ProcessingStore for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn ProcessingTx>, StoreError> {
        Ok(Box::new(MemoryTx {
            tables: Arc::clone(&self.tables),
            locks: Arc::clone(&self.locks),
            staged: Staged::default(),
            guards: Vec::new(),
        }))
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn register_property(&self, property: &Property) -> Result<(), CatalogError> {
        self.write()?
            .properties
            .entry(property.id)
            .or_insert_with(|| property.clone());
        Ok(())
    }

    async fn register_room(&self, room: &Room) -> Result<(), CatalogError> {
        let mut tables = self.write()?;
        if !tables.properties.contains_key(&room.property_id) {
            return Err(CatalogError::UnknownProperty(room.property_id));
        }
        tables.rooms.entry(room.id).or_insert_with(|| room.clone());
        Ok(())
    }

    async fn register_listing(&self, listing: &PlatformListing) -> Result<(), CatalogError> {
        let mut tables = self.write()?;
        if !tables.rooms.contains_key(&listing.room_id) {
            return Err(CatalogError::UnknownRoom(listing.room_id));
        }
        for existing in tables.listings.values().filter(|l| l.id != listing.id) {
            if existing.platform != listing.platform {
                continue;
            }
            if existing.platform_room_id == listing.platform_room_id {
                return Err(CatalogError::DuplicateListing {
                    platform: listing.platform,
                    platform_room_id: listing.platform_room_id.clone(),
                });
            }
            if existing.room_id == listing.room_id {
                return Err(CatalogError::RoomAlreadyListed {
                    room_id: listing.room_id,
                    platform: listing.platform,
                });
            }
        }
        tables.listings.insert(listing.id, listing.clone());
        Ok(())
    }
}

pub struct MemoryTx {
    tables: Arc<RwLock<Tables>>,
    locks: Arc<TxLocks>,
    staged: Staged,
    guards: Vec<LockGuard>,
}

impl MemoryTx {
    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, StoreError> {
        self.tables.read().map_err(poison_err)
    }
}

#[async_trait]
impl PlatformListingDirectory for MemoryTx {
    async fn find_room(
        &mut self,
        platform: Platform,
        platform_room_id: &str,
    ) -> Result<Option<Room>, StoreError> {
        Ok(self.read()?.room_for_listing(platform, platform_room_id))
    }

    async fn find_room_by_id(&mut self, room_id: Uuid) -> Result<Option<Room>, StoreError> {
        Ok(self.read()?.rooms.get(&room_id).cloned())
    }
}

#[async_trait]
impl InventoryStore for MemoryTx {
    async fn lock_range(&mut self, room_id: Uuid, window: StayWindow) -> Result<(), StoreError> {
        let guard = self.locks.acquire_range(room_id, window).await?;
        self.guards.push(guard);
        Ok(())
    }

    async fn days_in(
        &mut self,
        room_id: Uuid,
        window: StayWindow,
    ) -> Result<Vec<InventoryDay>, StoreError> {
        let mut merged: BTreeMap<DayKey, InventoryDay> = self
            .read()?
            .days
            .range(window_keys(room_id, &window))
            .map(|(k, d)| (*k, d.clone()))
            .collect();
        for (key, day) in self.staged.days.range(window_keys(room_id, &window)) {
            merged.insert(*key, day.clone());
        }
        Ok(merged.into_values().collect())
    }

    async fn upsert_day(&mut self, day: &InventoryDay) -> Result<(), StoreError> {
        self.staged
            .days
            .insert((day.room_id, day.date), day.clone());
        Ok(())
    }
}

#[async_trait]
impl ReservationStore for MemoryTx {
    async fn lock_reservation(
        &mut self,
        platform: Platform,
        platform_reservation_id: &str,
    ) -> Result<(), StoreError> {
        let guard = self.locks.acquire_reservation(platform, platform_reservation_id).await?;
        self.guards.push(guard);
        Ok(())
    }

    async fn find_reservation(
        &mut self,
        platform: Platform,
        platform_reservation_id: &str,
    ) -> Result<Option<Reservation>, StoreError> {
        let key = (platform, platform_reservation_id.to_string());
        if let Some(staged) = self.staged.reservations.get(&key) {
            return Ok(Some(staged.clone()));
        }
        Ok(self.read()?.reservations.get(&key).cloned())
    }

    async fn upsert_reservation(&mut self, reservation: &Reservation) -> Result<(), StoreError> {
        let key = (reservation.platform, reservation.platform_reservation_id.clone());
        self.staged.reservations.insert(key, reservation.clone());
        Ok(())
    }
}

#[async_trait]
impl AuditStore for MemoryTx {
    async fn upsert_audit(&mut self, record: &EventAuditRecord) -> Result<(), StoreError> {
        self.staged.audits.insert(record.event_id, record.clone());
        Ok(())
    }
}

#[async_trait]
impl ProcessingTx for MemoryTx {
    async fn commit(&mut self) -> Result<(), StoreError> {
        let staged = std::mem::take(&mut self.staged);
        {
            let mut tables = self.tables.write().map_err(poison_err)?;
            tables.days.extend(staged.days);
            tables.reservations.extend(staged.reservations);
            tables.audits.extend(staged.audits);
        }
        // locks go only after the writes are visible
        self.guards.clear();
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), StoreError> {
        self.staged = Staged::default();
        self.guards.clear();
        Ok(())
    }
}

/// Bounded failed-event queue. Once full, the oldest entry is evicted.
#[derive(Debug)]
pub struct MemoryFailedEventSink {
    capacity: usize,
    entries: Mutex<VecDeque<FailedEvent>>,
}

impl MemoryFailedEventSink {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
        }
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl FailedEventSink for MemoryFailedEventSink {
    async fn save(&self, event: FailedEvent) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().map_err(poison_err)?;
        if entries.len() >= self.capacity {
            if let Some(evicted) = entries.pop_front() {
                warn!(
                    evicted_id = %evicted.id,
                    evicted_event_id = %evicted.event_id,
                    capacity = self.capacity,
                    "failed event queue full, dropping oldest entry"
                );
            }
        }
        entries.push_back(event);
        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<FailedEvent>, StoreError> {
        let entries = self.entries.lock().map_err(poison_err)?;
        Ok(entries.iter().rev().take(limit).cloned().collect())
    }

    async fn resolve(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut entries = self.entries.lock().map_err(poison_err)?;
        match entries.iter_mut().find(|e| e.id == id) {
            Some(entry) => {
                *entry = entry.resolve();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CapturedBody {
    pub raw_body: String,
    pub headers: EventHeaders,
    pub received_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct MemoryRawStore {
    captured: Mutex<Vec<CapturedBody>>,
}

impl MemoryRawStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn captured(&self) -> Vec<CapturedBody> {
        self.captured
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl RawStore for MemoryRawStore {
    async fn store(&self, raw_body: &str, headers: &EventHeaders) -> Result<(), StoreError> {
        self.captured.lock().map_err(poison_err)?.push(CapturedBody {
            raw_body: raw_body.to_string(),
            headers: headers.clone(),
            received_at: Utc::now(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn window(from: u32, to: u32) -> StayWindow {
        StayWindow::new(
            NaiveDate::from_ymd_opt(2025, 8, from).unwrap(),
            NaiveDate::from_ymd_opt(2025, 8, to).unwrap(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn disjoint_ranges_do_not_contend() {
        let locks = Arc::new(TxLocks::default());
        let room = Uuid::new_v4();
        let _a = locks.acquire_range(room, window(1, 3)).await.unwrap();
        let _b = locks.acquire_range(room, window(3, 5)).await.unwrap();
        let _c = locks.acquire_range(Uuid::new_v4(), window(1, 3)).await.unwrap();
        assert_eq!(locks.held_count(), 3);
    }

    #[tokio::test]
    async fn overlapping_range_waits_for_release() {
        let locks = Arc::new(TxLocks::default());
        let room = Uuid::new_v4();
        let first = locks.acquire_range(room, window(1, 4)).await.unwrap();

        let waiter = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move { locks.acquire_range(room, window(3, 6)).await.map(|_| ()) })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(first);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(locks.held_count(), 0);
    }

    #[tokio::test]
    async fn reservation_id_is_held_until_commit() {
        let store = MemoryStore::new();
        let mut first = store.begin().await.unwrap();
        first.lock_reservation(Platform::Yanolja, "YA-1").await.unwrap();

        let mut other = store.begin().await.unwrap();
        other.lock_reservation(Platform::Airbnb, "YA-1").await.unwrap();
        other.lock_reservation(Platform::Yanolja, "YA-2").await.unwrap();

        let waiter = {
            let store = store.clone();
            tokio::spawn(async move {
                let mut second = store.begin().await.unwrap();
                second.lock_reservation(Platform::Yanolja, "YA-1").await.unwrap();
                second.rollback().await.unwrap();
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        first.commit().await.unwrap();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        other.rollback().await.unwrap();
        assert_eq!(store.held_locks(), 0);
    }

    #[tokio::test]
    async fn uncommitted_writes_stay_private() {
        let store = MemoryStore::new();
        let room = Uuid::new_v4();
        let date = NaiveDate::from_ymd_opt(2025, 8, 1).unwrap();

        let mut tx = store.begin().await.unwrap();
        tx.upsert_day(&InventoryDay::available(room, date, Utc::now()).block("paint", Utc::now()))
            .await
            .unwrap();
        assert_eq!(tx.days_in(room, window(1, 2)).await.unwrap().len(), 1);
        assert_eq!(store.inventory_day(room, date).unwrap(), None);

        tx.rollback().await.unwrap();
        assert_eq!(store.inventory_day(room, date).unwrap(), None);
    }

    #[tokio::test]
    async fn listing_uniqueness_is_enforced() {
        let store = MemoryStore::new();
        let property = Property::new("Seoul Stay", None);
        store.register_property(&property).await.unwrap();
        let room_a = Room::new(property.id, "101");
        let room_b = Room::new(property.id, "102");
        store.register_room(&room_a).await.unwrap();
        store.register_room(&room_b).await.unwrap();

        store
            .register_listing(&PlatformListing::new(room_a.id, Platform::Yanolja, "R-101"))
            .await
            .unwrap();

        let same_id = store
            .register_listing(&PlatformListing::new(room_b.id, Platform::Yanolja, "R-101"))
            .await;
        assert!(matches!(same_id, Err(CatalogError::DuplicateListing { .. })));

        let same_room = store
            .register_listing(&PlatformListing::new(room_a.id, Platform::Yanolja, "R-999"))
            .await;
        assert!(matches!(same_room, Err(CatalogError::RoomAlreadyListed { .. })));

        store
            .register_listing(&PlatformListing::new(room_a.id, Platform::Airbnb, "R-101"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn registering_again_keeps_the_first_record() {
        let store = MemoryStore::new();
        let property = Property::new("Seoul Stay", None);
        store.register_property(&property).await.unwrap();
        let room = Room::new(property.id, "101");
        store.register_room(&room).await.unwrap();
        store
            .register_listing(&PlatformListing::new(room.id, Platform::Yanolja, "R-101"))
            .await
            .unwrap();

        let renamed_property = Property { name: "Busan Stay".to_string(), ..property.clone() };
        store.register_property(&renamed_property).await.unwrap();
        let renamed_room = Room { name: "999".to_string(), capacity: Some(8), ..room.clone() };
        store.register_room(&renamed_room).await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let resolved = tx.find_room(Platform::Yanolja, "R-101").await.unwrap().unwrap();
        assert_eq!(resolved.name, "101");
        assert_eq!(resolved.capacity, room.capacity);
        assert_eq!(store.read().unwrap().properties[&property.id].name, "Seoul Stay");
    }

    #[tokio::test]
    async fn failed_sink_evicts_oldest() {
        let sink = MemoryFailedEventSink::new(2);
        for n in 0..3 {
            sink.save(FailedEvent::new(format!("evt-{n}"), "UNKNOWN", "BOOKING", "c", "", "{}", "bad"))
                .await
                .unwrap();
        }
        let recent = sink.recent(10).await.unwrap();
        let ids: Vec<_> = recent.iter().map(|e| e.event_id.as_str()).collect();
        assert_eq!(ids, vec!["evt-2", "evt-1"]);

        assert!(sink.resolve(recent[0].id).await.unwrap());
        assert!(sink.recent(1).await.unwrap()[0].resolved);
        assert!(!sink.resolve(Uuid::new_v4()).await.unwrap());
    }
}
