//! Applies canonical events to inventory, one atomic unit of work per event.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use shared::{
    CanonicalEvent, DayState, EventAuditRecord, EventKind, FailureReason, InventoryDay,
    ProcessingOutcome, Reservation, Room, StayWindow,
};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::{ProcessingError, StoreError};
use crate::store::{ProcessingStore, ProcessingTx};

#[derive(Clone)]
pub struct ReservationEngine {
    store: Arc<dyn ProcessingStore>,
}

impl ReservationEngine {
    pub fn new(store: Arc<dyn ProcessingStore>) -> Self {
        Self { store }
    }

    /// Business rejections come back as a failed outcome and are committed
    /// together with their audit record. A store error rolls the whole unit
    /// back, audit record included.
    pub async fn process(&self, event: &CanonicalEvent) -> Result<ProcessingOutcome, StoreError> {
        let mut tx = self.store.begin().await?;
        let result = apply(tx.as_mut(), event, Utc::now()).await;
        finish(tx, result).await
    }

    /// Marks every day of the window BLOCKED. Fails with NOT_AVAILABLE when any
    /// day is booked or already blocked.
    pub async fn block(
        &self,
        room_id: Uuid,
        window: StayWindow,
        reason: &str,
    ) -> Result<Vec<InventoryDay>, ProcessingError> {
        let mut tx = self.store.begin().await?;
        let result = block_days(tx.as_mut(), room_id, window, reason, Utc::now()).await;
        finish(tx, result).await
    }

    /// Releases the BLOCKED days of the window. Booked days are left alone.
    pub async fn unblock(
        &self,
        room_id: Uuid,
        window: StayWindow,
    ) -> Result<Vec<InventoryDay>, ProcessingError> {
        let mut tx = self.store.begin().await?;
        let result = unblock_days(tx.as_mut(), room_id, window, Utc::now()).await;
        finish(tx, result).await
    }
}

async fn finish<T, E>(mut tx: Box<dyn ProcessingTx>, result: Result<T, E>) -> Result<T, E>
where
    E: From<StoreError>,
{
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback) = tx.rollback().await {
                error!("Rollback failed: {}", rollback);
            }
            Err(err)
        }
    }
}

async fn apply(
    tx: &mut dyn ProcessingTx,
    event: &CanonicalEvent,
    now: DateTime<Utc>,
) -> Result<ProcessingOutcome, StoreError> {
    let audit = EventAuditRecord::from_event(event, now);
    tx.upsert_audit(&audit).await?;

    let room = match event.external_room_id.as_deref() {
        Some(platform_room_id) => tx.find_room(event.platform, platform_room_id).await?,
        None => None,
    };
    let Some(room) = room else {
        return reject(tx, &audit, FailureReason::UnknownRoom).await;
    };

    match event.kind {
        EventKind::Booking => book(tx, event, &audit, room, now).await,
        EventKind::Cancellation => cancel(tx, event, &audit, room, now).await,
    }
}

async fn reject(
    tx: &mut dyn ProcessingTx,
    audit: &EventAuditRecord,
    reason: FailureReason,
) -> Result<ProcessingOutcome, StoreError> {
    debug!("Event {} rejected: {}", audit.event_id, reason);
    tx.upsert_audit(&audit.mark_failed(reason)).await?;
    Ok(ProcessingOutcome::failure(reason))
}

async fn book(
    tx: &mut dyn ProcessingTx,
    event: &CanonicalEvent,
    audit: &EventAuditRecord,
    room: Room,
    now: DateTime<Utc>,
) -> Result<ProcessingOutcome, StoreError> {
    let reservation = match Reservation::book(room.id, event, now) {
        Ok(reservation) => reservation,
        Err(incomplete) => {
            debug!("Event {} cannot be booked: {}", event.event_id, incomplete);
            return reject(tx, audit, FailureReason::NotAvailable).await;
        }
    };
    let window = reservation.window;

    // key before range; cancellations take them in the same order
    tx.lock_reservation(reservation.platform, &reservation.platform_reservation_id)
        .await?;
    tx.lock_range(room.id, window).await?;

    if let Some(existing) = tx
        .find_reservation(reservation.platform, &reservation.platform_reservation_id)
        .await?
    {
        if existing.is_confirmed() && existing.holds(room.id, &window) {
            info!(
                "Reservation {} already booked for room {}, treating as duplicate delivery",
                existing.platform_reservation_id, room.id
            );
            tx.upsert_audit(&audit.mark_processed(Some(room.id), Some(existing.id), now))
                .await?;
            return Ok(ProcessingOutcome::success(Some(room), Some(existing)));
        }
        return reject(tx, audit, FailureReason::RoomAlreadyBooked).await;
    }

    let stored = tx.days_in(room.id, window).await?;
    if let Some(taken) = stored.iter().find(|d| !d.is_available()) {
        debug!("Room {} is {} on {}", room.id, taken.state.status().as_str(), taken.date);
        return reject(tx, audit, FailureReason::NotAvailable).await;
    }

    tx.upsert_reservation(&reservation).await?;
    let mut stored = by_date(stored);
    for date in window.dates() {
        let day = stored
            .remove(&date)
            .unwrap_or_else(|| InventoryDay::available(room.id, date, now));
        tx.upsert_day(&day.book(reservation.id, now)).await?;
    }
    tx.upsert_audit(&audit.mark_processed(Some(room.id), Some(reservation.id), now))
        .await?;

    info!(
        "Booked room {} for {} ({} nights) under reservation {}",
        room.id,
        window,
        window.nights(),
        reservation.platform_reservation_id
    );
    Ok(ProcessingOutcome::success(Some(room), Some(reservation)))
}

async fn cancel(
    tx: &mut dyn ProcessingTx,
    event: &CanonicalEvent,
    audit: &EventAuditRecord,
    room: Room,
    now: DateTime<Utc>,
) -> Result<ProcessingOutcome, StoreError> {
    let platform_reservation_id = event
        .platform_reservation_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty());

    let existing = match platform_reservation_id {
        Some(id) => {
            tx.lock_reservation(event.platform, id).await?;
            tx.find_reservation(event.platform, id).await?
        }
        None => None,
    };
    let Some(reservation) = existing else {
        // late or duplicate cancellations are expected under at-least-once delivery
        info!(
            "No reservation on file for cancellation {:?}, nothing to release",
            platform_reservation_id
        );
        tx.upsert_audit(&audit.mark_processed(Some(room.id), None, now))
            .await?;
        return Ok(ProcessingOutcome::success(Some(room), None));
    };

    tx.lock_range(reservation.room_id, reservation.window).await?;

    let cancelled = reservation.cancel(now);
    tx.upsert_reservation(&cancelled).await?;

    let mut released = 0;
    for day in tx.days_in(reservation.room_id, reservation.window).await? {
        if day.reservation_id() == Some(reservation.id) {
            tx.upsert_day(&day.release(now)).await?;
            released += 1;
        }
    }
    tx.upsert_audit(&audit.mark_processed(Some(reservation.room_id), Some(reservation.id), now))
        .await?;

    let booked_room = if room.id == reservation.room_id {
        room
    } else {
        warn!(
            "Cancellation names room {} but reservation {} holds room {}",
            room.id, cancelled.platform_reservation_id, reservation.room_id
        );
        tx.find_room_by_id(reservation.room_id).await?.unwrap_or(room)
    };

    info!(
        "Cancelled reservation {}, released {} days of room {}",
        cancelled.platform_reservation_id, released, reservation.room_id
    );
    Ok(ProcessingOutcome::success(Some(booked_room), Some(cancelled)))
}

async fn block_days(
    tx: &mut dyn ProcessingTx,
    room_id: Uuid,
    window: StayWindow,
    reason: &str,
    now: DateTime<Utc>,
) -> Result<Vec<InventoryDay>, ProcessingError> {
    if tx.find_room_by_id(room_id).await?.is_none() {
        return Err(ProcessingError::Rejected(FailureReason::UnknownRoom));
    }
    tx.lock_range(room_id, window).await?;

    let stored = tx.days_in(room_id, window).await?;
    if stored.iter().any(|d| !d.is_available()) {
        return Err(ProcessingError::Rejected(FailureReason::NotAvailable));
    }

    let mut stored = by_date(stored);
    let mut blocked = Vec::new();
    for date in window.dates() {
        let day = stored
            .remove(&date)
            .unwrap_or_else(|| InventoryDay::available(room_id, date, now))
            .block(reason, now);
        tx.upsert_day(&day).await?;
        blocked.push(day);
    }

    info!("Blocked room {} for {}: {}", room_id, window, reason);
    Ok(blocked)
}

async fn unblock_days(
    tx: &mut dyn ProcessingTx,
    room_id: Uuid,
    window: StayWindow,
    now: DateTime<Utc>,
) -> Result<Vec<InventoryDay>, ProcessingError> {
    if tx.find_room_by_id(room_id).await?.is_none() {
        return Err(ProcessingError::Rejected(FailureReason::UnknownRoom));
    }
    tx.lock_range(room_id, window).await?;

    let mut released = Vec::new();
    for day in tx.days_in(room_id, window).await? {
        if matches!(day.state, DayState::Blocked { .. }) {
            let day = day.release(now);
            tx.upsert_day(&day).await?;
            released.push(day);
        }
    }

    info!("Unblocked {} days of room {} in {}", released.len(), room_id, window);
    Ok(released)
}

fn by_date(days: Vec<InventoryDay>) -> HashMap<NaiveDate, InventoryDay> {
    days.into_iter().map(|d| (d.date, d)).collect()
}
