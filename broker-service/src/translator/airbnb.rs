use super::{normalize, translate_with, MappedReservation, PayloadTranslator, TranslationError};
use serde::Deserialize;
use shared::{CanonicalEvent, EventKind, EventStatus, GuestContact, Platform};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct AirbnbPayload {
    confirmation_code: Option<String>,
    listing_id: Option<String>,
    listing_name: Option<String>,
    listing_address: Option<String>,
    check_in: Option<String>,
    check_out: Option<String>,
    guest_first_name: Option<String>,
    guest_last_name: Option<String>,
    guest_email: Option<String>,
    total_payout: Option<f64>,
    status: Option<String>,
    created_at: Option<i64>,
}

fn status(code: Option<&str>) -> EventStatus {
    match code.map(str::trim) {
        Some("ACCEPTED") => EventStatus::Confirmed,
        Some("CANCELLED") | Some("DENIED") => EventStatus::Cancelled,
        _ => EventStatus::Pending,
    }
}

pub struct AirbnbTranslator;

impl PayloadTranslator for AirbnbTranslator {
    fn platform(&self) -> Platform {
        Platform::Airbnb
    }

    fn translate(&self, raw_payload: &str, kind: EventKind) -> Result<CanonicalEvent, TranslationError> {
        translate_with(self.platform(), raw_payload, kind, |p: AirbnbPayload, ctx| {
            Ok(MappedReservation {
                platform_reservation_id: normalize::non_blank(p.confirmation_code),
                external_room_id: normalize::non_blank(p.listing_id),
                property_name: normalize::non_blank(p.listing_name),
                property_address: normalize::non_blank(p.listing_address),
                check_in: normalize::iso_date(p.check_in.as_deref())?,
                check_out: normalize::iso_date(p.check_out.as_deref())?,
                guest: GuestContact {
                    name: normalize::full_name(
                        p.guest_first_name.as_deref(),
                        p.guest_last_name.as_deref(),
                    ),
                    phone: None,
                    email: normalize::non_blank(p.guest_email),
                },
                total_amount: normalize::payout(p.total_payout)?,
                status: status(p.status.as_deref()),
                occurred_at: normalize::epoch_millis(p.created_at, ctx.received_at)?,
            })
        })
    }
}
