//! PostgreSQL backend over a diesel-async bb8 pool.
//!
//! A [`PgTx`] owns one pooled connection with an open transaction. Range locks
//! are transaction-scoped advisory locks keyed on the room, followed by
//! `FOR UPDATE` on the window's stored rows.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::sql_types::Text;
use diesel_async::pooled_connection::bb8::Pool;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::{AnsiTransactionManager, AsyncPgConnection, RunQueryDsl, TransactionManager};
use shared::{
    EventAuditRecord, FailedEvent, InventoryDay, Platform, PlatformListing, Property,
    Reservation, Room, StayWindow,
};
use tracing::warn;
use uuid::Uuid;

use super::{
    AuditStore, CatalogStore, FailedEventSink, InventoryStore, PlatformListingDirectory,
    ProcessingStore, ProcessingTx, RawStore, ReservationStore,
};
use crate::error::{CatalogError, StoreError};
use crate::ingestion::EventHeaders;
use crate::models::*;
use crate::schema::*;

pub type DbPool = Pool<AsyncPgConnection>;
type OwnedConn = bb8::PooledConnection<'static, AsyncDieselConnectionManager<AsyncPgConnection>>;

fn pool_err(err: impl std::fmt::Display) -> StoreError {
    StoreError::Pool(err.to_string())
}

#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProcessingStore for PgStore {
    async fn begin(&self) -> Result<Box<dyn ProcessingTx>, StoreError> {
        let mut conn = self.pool.get_owned().await.map_err(pool_err)?;
        AnsiTransactionManager::begin_transaction(&mut *conn).await?;
        Ok(Box::new(PgTx { conn, open: true }))
    }
}

pub struct PgTx {
    conn: OwnedConn,
    open: bool,
}

impl Drop for PgTx {
    fn drop(&mut self) {
        if self.open {
            // the pool discards connections still inside a transaction
            warn!("processing transaction dropped without commit or rollback");
        }
    }
}

#[async_trait]
impl PlatformListingDirectory for PgTx {
    async fn find_room(
        &mut self,
        platform: Platform,
        platform_room_id: &str,
    ) -> Result<Option<Room>, StoreError> {
        let row = platform_listings::table
            .inner_join(rooms::table)
            .filter(platform_listings::platform.eq(platform.as_str()))
            .filter(platform_listings::platform_room_id.eq(platform_room_id))
            .filter(platform_listings::active.eq(true))
            .select(rooms::all_columns)
            .first::<DbRoom>(&mut *self.conn)
            .await
            .optional()?;
        row.map(Room::try_from).transpose()
    }

    async fn find_room_by_id(&mut self, room_id: Uuid) -> Result<Option<Room>, StoreError> {
        let row = rooms::table
            .find(room_id)
            .first::<DbRoom>(&mut *self.conn)
            .await
            .optional()?;
        row.map(Room::try_from).transpose()
    }
}

#[async_trait]
impl InventoryStore for PgTx {
    async fn lock_range(&mut self, room_id: Uuid, window: StayWindow) -> Result<(), StoreError> {
        // absent rows cannot be row-locked, so the room itself is the lock key
        diesel::sql_query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind::<Text, _>(room_id.to_string())
            .execute(&mut *self.conn)
            .await?;

        inventory_days::table
            .filter(inventory_days::room_id.eq(room_id))
            .filter(inventory_days::date.ge(window.check_in()))
            .filter(inventory_days::date.lt(window.check_out()))
            .select(inventory_days::date)
            .for_update()
            .load::<NaiveDate>(&mut *self.conn)
            .await?;
        Ok(())
    }

    async fn days_in(
        &mut self,
        room_id: Uuid,
        window: StayWindow,
    ) -> Result<Vec<InventoryDay>, StoreError> {
        inventory_days::table
            .filter(inventory_days::room_id.eq(room_id))
            .filter(inventory_days::date.ge(window.check_in()))
            .filter(inventory_days::date.lt(window.check_out()))
            .order(inventory_days::date.asc())
            .load::<DbInventoryDay>(&mut *self.conn)
            .await?
            .into_iter()
            .map(InventoryDay::try_from)
            .collect()
    }

    async fn upsert_day(&mut self, day: &InventoryDay) -> Result<(), StoreError> {
        let row = DbInventoryDay::from(day);
        diesel::insert_into(inventory_days::table)
            .values(&row)
            .on_conflict((inventory_days::room_id, inventory_days::date))
            .do_update()
            .set(&row)
            .execute(&mut *self.conn)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl ReservationStore for PgTx {
    async fn lock_reservation(
        &mut self,
        platform: Platform,
        platform_reservation_id: &str,
    ) -> Result<(), StoreError> {
        // the two-key form keeps these apart from the room locks
        diesel::sql_query("SELECT pg_advisory_xact_lock(hashtext($1), hashtext($2))")
            .bind::<Text, _>(platform.as_str())
            .bind::<Text, _>(platform_reservation_id)
            .execute(&mut *self.conn)
            .await?;
        Ok(())
    }

    async fn find_reservation(
        &mut self,
        platform: Platform,
        platform_reservation_id: &str,
    ) -> Result<Option<Reservation>, StoreError> {
        let row = reservations::table
            .filter(reservations::platform.eq(platform.as_str()))
            .filter(reservations::platform_reservation_id.eq(platform_reservation_id))
            .first::<DbReservation>(&mut *self.conn)
            .await
            .optional()?;
        row.map(Reservation::try_from).transpose()
    }

    async fn upsert_reservation(&mut self, reservation: &Reservation) -> Result<(), StoreError> {
        let row = DbReservation::from(reservation);
        diesel::insert_into(reservations::table)
            .values(&row)
            .on_conflict(reservations::id)
            .do_update()
            .set(&row)
            .execute(&mut *self.conn)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl AuditStore for PgTx {
    async fn upsert_audit(&mut self, record: &EventAuditRecord) -> Result<(), StoreError> {
        let row = DbEventAudit::from(record);
        diesel::insert_into(event_audit::table)
            .values(&row)
            .on_conflict(event_audit::event_id)
            .do_update()
            .set(&row)
            .execute(&mut *self.conn)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl ProcessingTx for PgTx {
    async fn commit(&mut self) -> Result<(), StoreError> {
        AnsiTransactionManager::commit_transaction(&mut *self.conn).await?;
        self.open = false;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), StoreError> {
        AnsiTransactionManager::rollback_transaction(&mut *self.conn).await?;
        self.open = false;
        Ok(())
    }
}

fn unique_constraint(err: &DieselError) -> Option<&str> {
    match err {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
            Some(info.constraint_name().unwrap_or_default())
        }
        _ => None,
    }
}

fn is_foreign_key_violation(err: &DieselError) -> bool {
    matches!(
        err,
        DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _)
    )
}

#[async_trait]
impl CatalogStore for PgStore {
    async fn register_property(&self, property: &Property) -> Result<(), CatalogError> {
        let mut conn = self.pool.get().await.map_err(pool_err)?;
        diesel::insert_into(properties::table)
            .values(DbProperty::from(property))
            .on_conflict(properties::id)
            .do_nothing()
            .execute(&mut conn)
            .await
            .map_err(StoreError::from)?;
        Ok(())
    }

    async fn register_room(&self, room: &Room) -> Result<(), CatalogError> {
        let mut conn = self.pool.get().await.map_err(pool_err)?;
        let inserted = diesel::insert_into(rooms::table)
            .values(DbRoom::from(room))
            .on_conflict(rooms::id)
            .do_nothing()
            .execute(&mut conn)
            .await;

        match inserted {
            Ok(_) => Ok(()),
            Err(e) if is_foreign_key_violation(&e) => Err(CatalogError::UnknownProperty(room.property_id)),
            Err(e) => Err(StoreError::from(e).into()),
        }
    }

    async fn register_listing(&self, listing: &PlatformListing) -> Result<(), CatalogError> {
        let mut conn = self.pool.get().await.map_err(pool_err)?;
        let inserted = diesel::insert_into(platform_listings::table)
            .values(DbPlatformListing::from(listing))
            .on_conflict(platform_listings::id)
            .do_nothing()
            .execute(&mut conn)
            .await;

        match inserted {
            Ok(_) => Ok(()),
            Err(e) if is_foreign_key_violation(&e) => Err(CatalogError::UnknownRoom(listing.room_id)),
            Err(e) => match unique_constraint(&e) {
                Some("uq_listing_platform_room") => Err(CatalogError::DuplicateListing {
                    platform: listing.platform,
                    platform_room_id: listing.platform_room_id.clone(),
                }),
                Some("uq_listing_room_platform") => Err(CatalogError::RoomAlreadyListed {
                    room_id: listing.room_id,
                    platform: listing.platform,
                }),
                _ => Err(StoreError::from(e).into()),
            },
        }
    }
}

#[async_trait]
impl RawStore for PgStore {
    async fn store(&self, raw_body: &str, headers: &EventHeaders) -> Result<(), StoreError> {
        let mut conn = self.pool.get().await.map_err(pool_err)?;
        let row = NewRawEvent {
            id: Uuid::new_v4(),
            event_id: headers.event_id.clone(),
            platform: headers.platform.clone(),
            event_type: headers.event_type.clone(),
            correlation_id: headers.correlation_id.clone(),
            raw_body: raw_body.to_string(),
            received_at: Utc::now(),
        };
        diesel::insert_into(raw_events::table)
            .values(&row)
            .execute(&mut conn)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl FailedEventSink for PgStore {
    async fn save(&self, event: FailedEvent) -> Result<(), StoreError> {
        let mut conn = self.pool.get().await.map_err(pool_err)?;
        diesel::insert_into(failed_events::table)
            .values(DbFailedEvent::from(event))
            .execute(&mut conn)
            .await?;
        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<FailedEvent>, StoreError> {
        let mut conn = self.pool.get().await.map_err(pool_err)?;
        let rows = failed_events::table
            .order(failed_events::failed_at.desc())
            .limit(i64::try_from(limit).unwrap_or(i64::MAX))
            .load::<DbFailedEvent>(&mut conn)
            .await?;
        Ok(rows.into_iter().map(FailedEvent::from).collect())
    }

    async fn resolve(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut conn = self.pool.get().await.map_err(pool_err)?;
        let updated = diesel::update(failed_events::table.find(id))
            .set(failed_events::resolved.eq(true))
            .execute(&mut conn)
            .await?;
        Ok(updated > 0)
    }
}
