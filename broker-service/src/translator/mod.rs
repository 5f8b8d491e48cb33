//! Platform translators: raw platform payload text in, [`CanonicalEvent`] out.
//!
//! Every translator runs the same pipeline through [`translate_with`]: parse the
//! text into the platform's payload shape (unknown fields ignored), hand it to a
//! platform mapping function, then stamp the identifiers common to all
//! platforms. Any failure along the way comes back as a [`TranslationError`]
//! naming the platform.

mod airbnb;
pub mod normalize;
mod registry;
mod yanolja;
mod yeogieottae;

pub use airbnb::AirbnbTranslator;
pub use registry::TranslatorRegistry;
pub use yanolja::YanoljaTranslator;
pub use yeogieottae::YeogieottaeTranslator;

use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use shared::{CanonicalEvent, EventKind, EventStatus, GuestContact, Platform};
use uuid::Uuid;

pub trait PayloadTranslator: Send + Sync {
    fn platform(&self) -> Platform;

    fn translate(&self, raw_payload: &str, kind: EventKind)
        -> Result<CanonicalEvent, TranslationError>;
}

#[derive(Debug, thiserror::Error)]
#[error("{platform} payload translation failed: {message}")]
pub struct TranslationError {
    pub platform: Platform,
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl TranslationError {
    pub fn new(platform: Platform, message: impl Into<String>) -> Self {
        Self {
            platform,
            message: message.into(),
            source: None,
        }
    }

    /// Passes an already-typed translation error through untouched and wraps
    /// anything else.
    pub fn wrap(platform: Platform, err: anyhow::Error) -> Self {
        match err.downcast::<TranslationError>() {
            Ok(typed) => typed,
            Err(other) => Self {
                platform,
                message: format!("{other:#}"),
                source: Some(other.into()),
            },
        }
    }
}

/// What the caller of a mapping function already knows about the event.
#[derive(Debug, Clone, Copy)]
pub struct TranslationContext {
    pub kind: EventKind,
    /// Receipt time; also the fallback for a missing origin timestamp.
    pub received_at: DateTime<Utc>,
}

/// Business fields a platform mapping extracts from its payload.
#[derive(Debug, Clone, PartialEq)]
pub struct MappedReservation {
    pub platform_reservation_id: Option<String>,
    pub external_room_id: Option<String>,
    pub property_name: Option<String>,
    pub property_address: Option<String>,
    pub check_in: Option<NaiveDate>,
    pub check_out: Option<NaiveDate>,
    pub guest: GuestContact,
    pub total_amount: Option<BigDecimal>,
    pub status: EventStatus,
    pub occurred_at: DateTime<Utc>,
}

pub fn translate_with<P, F>(
    platform: Platform,
    raw_payload: &str,
    kind: EventKind,
    map: F,
) -> Result<CanonicalEvent, TranslationError>
where
    P: DeserializeOwned,
    F: FnOnce(P, &TranslationContext) -> anyhow::Result<MappedReservation>,
{
    let ctx = TranslationContext {
        kind,
        received_at: Utc::now(),
    };

    let mapped = serde_json::from_str::<P>(raw_payload)
        .map_err(anyhow::Error::from)
        .and_then(|payload| map(payload, &ctx))
        .map_err(|e| TranslationError::wrap(platform, e))?;

    Ok(CanonicalEvent {
        event_id: Uuid::new_v4(),
        platform,
        platform_reservation_id: mapped.platform_reservation_id,
        kind,
        external_room_id: mapped.external_room_id,
        property_name: mapped.property_name,
        property_address: mapped.property_address,
        check_in: mapped.check_in,
        check_out: mapped.check_out,
        guest: mapped.guest,
        total_amount: mapped.total_amount,
        status: mapped.status,
        occurred_at: Some(mapped.occurred_at),
        received_at: ctx.received_at,
        raw_payload: raw_payload.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Probe {
        id: String,
    }

    fn mapped(id: String, ctx: &TranslationContext) -> MappedReservation {
        MappedReservation {
            platform_reservation_id: Some(id),
            external_room_id: None,
            property_name: None,
            property_address: None,
            check_in: None,
            check_out: None,
            guest: GuestContact::default(),
            total_amount: None,
            status: EventStatus::Pending,
            occurred_at: ctx.received_at,
        }
    }

    #[test]
    fn pipeline_stamps_common_fields() {
        let before = Utc::now();
        let event = translate_with(Platform::Airbnb, r#"{"id":"X-1","extra":true}"#, EventKind::Cancellation, |p: Probe, ctx| {
            Ok(mapped(p.id, ctx))
        })
        .unwrap();

        assert_eq!(event.platform, Platform::Airbnb);
        assert_eq!(event.kind, EventKind::Cancellation);
        assert_eq!(event.platform_reservation_id.as_deref(), Some("X-1"));
        assert!(event.received_at >= before);
        assert_eq!(event.raw_payload, r#"{"id":"X-1","extra":true}"#);
    }

    #[test]
    fn mapping_errors_are_wrapped_with_platform() {
        let err = translate_with(Platform::Yanolja, r#"{"id":"X"}"#, EventKind::Booking, |_: Probe, _| {
            Err(anyhow::anyhow!("bad status"))
        })
        .unwrap_err();

        assert_eq!(err.platform, Platform::Yanolja);
        assert!(err.to_string().contains("YANOLJA"));
        assert!(err.to_string().contains("bad status"));
    }

    #[test]
    fn typed_errors_pass_through() {
        let err = translate_with(Platform::Yanolja, r#"{"id":"X"}"#, EventKind::Booking, |_: Probe, _| {
            Err(TranslationError::new(Platform::Airbnb, "already typed").into())
        })
        .unwrap_err();

        assert_eq!(err.platform, Platform::Airbnb);
        assert_eq!(err.to_string(), "AIRBNB payload translation failed: already typed");
    }

    #[test]
    fn broken_json_is_a_translation_error() {
        let err = translate_with(Platform::Yeogieottae, "{ broken json", EventKind::Booking, |p: Probe, ctx| {
            Ok(mapped(p.id, ctx))
        })
        .unwrap_err();

        assert_eq!(err.platform, Platform::Yeogieottae);
    }
}
