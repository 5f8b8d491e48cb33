use super::{normalize, translate_with, MappedReservation, PayloadTranslator, TranslationError};
use serde::Deserialize;
use shared::{CanonicalEvent, EventKind, EventStatus, GuestContact, Platform};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct YeogieottaePayload {
    order_id: Option<String>,
    accommodation_name: Option<String>,
    accommodation_address: Option<String>,
    room_type_id: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
    buyer_name: Option<String>,
    buyer_tel: Option<String>,
    total_amount: Option<i64>,
    state: Option<i32>,
    registered_ts: Option<i64>,
}

fn status(state: Option<i32>) -> EventStatus {
    match state {
        Some(1) => EventStatus::Confirmed,
        Some(2) => EventStatus::Cancelled,
        Some(3) => EventStatus::Completed,
        Some(4) => EventStatus::NoShow,
        _ => EventStatus::Pending,
    }
}

pub struct YeogieottaeTranslator;

impl PayloadTranslator for YeogieottaeTranslator {
    fn platform(&self) -> Platform {
        Platform::Yeogieottae
    }

    fn translate(&self, raw_payload: &str, kind: EventKind) -> Result<CanonicalEvent, TranslationError> {
        translate_with(self.platform(), raw_payload, kind, |p: YeogieottaePayload, ctx| {
            Ok(MappedReservation {
                platform_reservation_id: normalize::non_blank(p.order_id),
                // the room type, not the accommodation, identifies the sellable room
                external_room_id: normalize::non_blank(p.room_type_id),
                property_name: normalize::non_blank(p.accommodation_name),
                property_address: normalize::non_blank(p.accommodation_address),
                check_in: normalize::compact_date(p.start_date.as_deref())?,
                check_out: normalize::compact_date(p.end_date.as_deref())?,
                guest: GuestContact {
                    name: normalize::non_blank(p.buyer_name),
                    phone: normalize::non_blank(p.buyer_tel),
                    email: None,
                },
                total_amount: normalize::krw(p.total_amount),
                status: status(p.state),
                occurred_at: normalize::epoch_seconds(p.registered_ts, ctx.received_at)?,
            })
        })
    }
}
