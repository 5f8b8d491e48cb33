use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use shared::*;
use uuid::Uuid;

use crate::error::StoreError;

#[derive(Debug, Clone, Queryable, Insertable)]
#[diesel(table_name = crate::schema::properties)]
pub struct DbProperty {
    pub id: Uuid,
    pub name: String,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Insertable)]
#[diesel(table_name = crate::schema::rooms)]
pub struct DbRoom {
    pub id: Uuid,
    pub property_id: Uuid,
    pub name: String,
    pub room_type: Option<String>,
    pub capacity: Option<i32>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Insertable)]
#[diesel(table_name = crate::schema::platform_listings)]
pub struct DbPlatformListing {
    pub id: Uuid,
    pub room_id: Uuid,
    pub platform: String,
    pub platform_room_id: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Insertable, AsChangeset)]
#[diesel(table_name = crate::schema::reservations, treat_none_as_null = true)]
pub struct DbReservation {
    pub id: Uuid,
    pub room_id: Uuid,
    pub platform: String,
    pub platform_reservation_id: String,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub guest_name: Option<String>,
    pub guest_phone: Option<String>,
    pub guest_email: Option<String>,
    pub total_amount: Option<BigDecimal>,
    pub status: String,
    pub booked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Insertable, AsChangeset)]
#[diesel(table_name = crate::schema::inventory_days, primary_key(room_id, date), treat_none_as_null = true)]
pub struct DbInventoryDay {
    pub room_id: Uuid,
    pub date: NaiveDate,
    pub status: String,
    pub reservation_id: Option<Uuid>,
    pub block_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = crate::schema::event_audit, primary_key(event_id), treat_none_as_null = true)]
pub struct DbEventAudit {
    pub event_id: Uuid,
    pub platform: String,
    pub platform_reservation_id: Option<String>,
    pub event_type: String,
    pub external_room_id: Option<String>,
    pub check_in: Option<NaiveDate>,
    pub check_out: Option<NaiveDate>,
    pub guest_name: Option<String>,
    pub guest_phone: Option<String>,
    pub guest_email: Option<String>,
    pub total_amount: Option<BigDecimal>,
    pub status: String,
    pub property_name: Option<String>,
    pub property_address: Option<String>,
    pub occurred_at: Option<DateTime<Utc>>,
    pub received_at: DateTime<Utc>,
    pub processed: bool,
    pub processed_at: Option<DateTime<Utc>>,
    pub room_id: Option<Uuid>,
    pub reservation_id: Option<Uuid>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Insertable)]
#[diesel(table_name = crate::schema::failed_events)]
pub struct DbFailedEvent {
    pub id: Uuid,
    pub event_id: String,
    pub platform: String,
    pub event_type: String,
    pub correlation_id: String,
    pub reservation_id: String,
    pub raw_payload: String,
    pub error_message: String,
    pub failed_at: DateTime<Utc>,
    pub retry_count: i32,
    pub resolved: bool,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::raw_events)]
pub struct NewRawEvent {
    pub id: Uuid,
    pub event_id: Option<String>,
    pub platform: Option<String>,
    pub event_type: Option<String>,
    pub correlation_id: Option<String>,
    pub raw_body: String,
    pub received_at: DateTime<Utc>,
}

impl From<&Property> for DbProperty {
    fn from(property: &Property) -> Self {
        Self {
            id: property.id,
            name: property.name.clone(),
            address: property.address.clone(),
            created_at: property.created_at,
        }
    }
}

impl From<&Room> for DbRoom {
    fn from(room: &Room) -> Self {
        Self {
            id: room.id,
            property_id: room.property_id,
            name: room.name.clone(),
            room_type: room.room_type.clone(),
            capacity: room.capacity,
            status: room.status.as_str().to_string(),
            created_at: room.created_at,
        }
    }
}

impl TryFrom<DbRoom> for Room {
    type Error = StoreError;

    fn try_from(db_room: DbRoom) -> Result<Self, Self::Error> {
        Ok(Self {
            id: db_room.id,
            property_id: db_room.property_id,
            name: db_room.name,
            room_type: db_room.room_type,
            capacity: db_room.capacity,
            status: db_room.status.parse()?,
            created_at: db_room.created_at,
        })
    }
}

impl From<&PlatformListing> for DbPlatformListing {
    fn from(listing: &PlatformListing) -> Self {
        Self {
            id: listing.id,
            room_id: listing.room_id,
            platform: listing.platform.as_str().to_string(),
            platform_room_id: listing.platform_room_id.clone(),
            active: listing.active,
            created_at: listing.created_at,
        }
    }
}

impl From<&Reservation> for DbReservation {
    fn from(reservation: &Reservation) -> Self {
        Self {
            id: reservation.id,
            room_id: reservation.room_id,
            platform: reservation.platform.as_str().to_string(),
            platform_reservation_id: reservation.platform_reservation_id.clone(),
            check_in: reservation.window.check_in(),
            check_out: reservation.window.check_out(),
            guest_name: reservation.guest.name.clone(),
            guest_phone: reservation.guest.phone.clone(),
            guest_email: reservation.guest.email.clone(),
            total_amount: reservation.total_amount.clone(),
            status: reservation.status.as_str().to_string(),
            booked_at: reservation.booked_at,
            created_at: reservation.created_at,
            updated_at: reservation.updated_at,
        }
    }
}

impl TryFrom<DbReservation> for Reservation {
    type Error = StoreError;

    fn try_from(db_reservation: DbReservation) -> Result<Self, Self::Error> {
        let window = StayWindow::new(db_reservation.check_in, db_reservation.check_out)
            .ok_or_else(|| {
                StoreError::Corrupt(format!(
                    "reservation {} has an empty stay window",
                    db_reservation.id
                ))
            })?;

        Ok(Self {
            id: db_reservation.id,
            room_id: db_reservation.room_id,
            platform: db_reservation.platform.parse()?,
            platform_reservation_id: db_reservation.platform_reservation_id,
            window,
            guest: GuestContact {
                name: db_reservation.guest_name,
                phone: db_reservation.guest_phone,
                email: db_reservation.guest_email,
            },
            total_amount: db_reservation.total_amount,
            status: db_reservation.status.parse()?,
            booked_at: db_reservation.booked_at,
            created_at: db_reservation.created_at,
            updated_at: db_reservation.updated_at,
        })
    }
}

impl From<&InventoryDay> for DbInventoryDay {
    fn from(day: &InventoryDay) -> Self {
        let (reservation_id, block_reason) = match &day.state {
            DayState::Available => (None, None),
            DayState::Booked { reservation_id } => (Some(*reservation_id), None),
            DayState::Blocked { reason } => (None, Some(reason.clone())),
        };

        Self {
            room_id: day.room_id,
            date: day.date,
            status: day.state.status().as_str().to_string(),
            reservation_id,
            block_reason,
            created_at: day.created_at,
            updated_at: day.updated_at,
        }
    }
}

impl TryFrom<DbInventoryDay> for InventoryDay {
    type Error = StoreError;

    fn try_from(db_day: DbInventoryDay) -> Result<Self, Self::Error> {
        let state = match db_day.status.parse::<InventoryStatus>()? {
            InventoryStatus::Available => DayState::Available,
            InventoryStatus::Booked => DayState::Booked {
                reservation_id: db_day.reservation_id.ok_or_else(|| {
                    StoreError::Corrupt(format!(
                        "booked day {} of room {} has no reservation",
                        db_day.date, db_day.room_id
                    ))
                })?,
            },
            InventoryStatus::Blocked => DayState::Blocked {
                reason: db_day.block_reason.unwrap_or_default(),
            },
        };

        Ok(Self {
            room_id: db_day.room_id,
            date: db_day.date,
            state,
            created_at: db_day.created_at,
            updated_at: db_day.updated_at,
        })
    }
}

impl From<&EventAuditRecord> for DbEventAudit {
    fn from(record: &EventAuditRecord) -> Self {
        Self {
            event_id: record.event_id,
            platform: record.platform.as_str().to_string(),
            platform_reservation_id: record.platform_reservation_id.clone(),
            event_type: record.kind.as_str().to_string(),
            external_room_id: record.external_room_id.clone(),
            check_in: record.check_in,
            check_out: record.check_out,
            guest_name: record.guest.name.clone(),
            guest_phone: record.guest.phone.clone(),
            guest_email: record.guest.email.clone(),
            total_amount: record.total_amount.clone(),
            status: record.status.as_str().to_string(),
            property_name: record.property_name.clone(),
            property_address: record.property_address.clone(),
            occurred_at: record.occurred_at,
            received_at: record.received_at,
            processed: record.processed,
            processed_at: record.processed_at,
            room_id: record.room_id,
            reservation_id: record.reservation_id,
            error_message: record.error_message.clone(),
            created_at: record.created_at,
        }
    }
}

impl From<FailedEvent> for DbFailedEvent {
    fn from(event: FailedEvent) -> Self {
        Self {
            id: event.id,
            event_id: event.event_id,
            platform: event.platform,
            event_type: event.event_type,
            correlation_id: event.correlation_id,
            reservation_id: event.reservation_id,
            raw_payload: event.raw_payload,
            error_message: event.error_message,
            failed_at: event.failed_at,
            retry_count: event.retry_count,
            resolved: event.resolved,
        }
    }
}

impl From<DbFailedEvent> for FailedEvent {
    fn from(row: DbFailedEvent) -> Self {
        Self {
            id: row.id,
            event_id: row.event_id,
            platform: row.platform,
            event_type: row.event_type,
            correlation_id: row.correlation_id,
            reservation_id: row.reservation_id,
            raw_payload: row.raw_payload,
            error_message: row.error_message,
            failed_at: row.failed_at,
            retry_count: row.retry_count,
            resolved: row.resolved,
        }
    }
}
