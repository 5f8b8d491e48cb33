use super::{normalize, translate_with, MappedReservation, PayloadTranslator, TranslationError};
use serde::Deserialize;
use shared::{CanonicalEvent, EventKind, EventStatus, GuestContact, Platform};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct YanoljaPayload {
    reservation_id: Option<String>,
    room_id: Option<String>,
    accommodation_name: Option<String>,
    accommodation_address: Option<String>,
    check_in_date: Option<String>,
    check_out_date: Option<String>,
    guest_name: Option<String>,
    guest_phone: Option<String>,
    total_price: Option<i64>,
    status: Option<String>,
    booked_at: Option<String>,
}

fn status(code: Option<&str>) -> EventStatus {
    match code.map(str::trim) {
        Some("예약완료") => EventStatus::Confirmed,
        Some("취소") => EventStatus::Cancelled,
        Some("노쇼") => EventStatus::NoShow,
        _ => EventStatus::Pending,
    }
}

pub struct YanoljaTranslator;

impl PayloadTranslator for YanoljaTranslator {
    fn platform(&self) -> Platform {
        Platform::Yanolja
    }

    fn translate(&self, raw_payload: &str, kind: EventKind) -> Result<CanonicalEvent, TranslationError> {
        translate_with(self.platform(), raw_payload, kind, |p: YanoljaPayload, ctx| {
            Ok(MappedReservation {
                platform_reservation_id: normalize::non_blank(p.reservation_id),
                external_room_id: normalize::non_blank(p.room_id),
                property_name: normalize::non_blank(p.accommodation_name),
                property_address: normalize::non_blank(p.accommodation_address),
                check_in: normalize::iso_date(p.check_in_date.as_deref())?,
                check_out: normalize::iso_date(p.check_out_date.as_deref())?,
                guest: GuestContact {
                    name: normalize::non_blank(p.guest_name),
                    phone: normalize::non_blank(p.guest_phone),
                    email: None,
                },
                total_amount: normalize::krw(p.total_price),
                status: status(p.status.as_deref()),
                occurred_at: normalize::kst_local_time(p.booked_at.as_deref(), ctx.received_at)?,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;
    use chrono::NaiveDate;

    const BOOKING: &str = r#"{
        "reservationId": "YNJ-12345678",
        "roomId": "R-101",
        "roomName": "Deluxe Double",
        "accommodationName": "Seoul Stay",
        "accommodationAddress": "Seoul Jung-gu 1",
        "checkInDate": "2025-08-15",
        "checkOutDate": "2025-08-18",
        "stayNights": 3,
        "guestName": "김민수",
        "guestPhone": "010-1234-5678",
        "couponCode": "SUMMER",
        "totalPrice": 380000,
        "status": "예약완료",
        "bookedAt": "2025-08-01T10:30:00"
    }"#;

    #[test]
    fn translates_booking() {
        let event = YanoljaTranslator.translate(BOOKING, EventKind::Booking).unwrap();

        assert_eq!(event.platform, Platform::Yanolja);
        assert_eq!(event.platform_reservation_id.as_deref(), Some("YNJ-12345678"));
        assert_eq!(event.external_room_id.as_deref(), Some("R-101"));
        assert_eq!(event.check_in, NaiveDate::from_ymd_opt(2025, 8, 15));
        assert_eq!(event.check_out, NaiveDate::from_ymd_opt(2025, 8, 18));
        assert_eq!(event.guest.name.as_deref(), Some("김민수"));
        assert_eq!(event.guest.phone.as_deref(), Some("010-1234-5678"));
        assert_eq!(event.total_amount, Some(BigDecimal::from(380_000)));
        assert_eq!(event.status, EventStatus::Confirmed);
        assert_eq!(
            event.occurred_at.map(|t| t.to_rfc3339()).as_deref(),
            Some("2025-08-01T01:30:00+00:00")
        );
    }

    #[test]
    fn korean_status_labels() {
        assert_eq!(status(Some("취소")), EventStatus::Cancelled);
        assert_eq!(status(Some("노쇼")), EventStatus::NoShow);
        assert_eq!(status(Some("대기")), EventStatus::Pending);
        assert_eq!(status(None), EventStatus::Pending);
    }

    #[test]
    fn malformed_date_fails() {
        let err = YanoljaTranslator
            .translate(r#"{"reservationId":"YNJ-1","checkInDate":"15/08/2025"}"#, EventKind::Booking)
            .unwrap_err();
        assert_eq!(err.platform, Platform::Yanolja);
    }
}
