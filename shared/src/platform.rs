use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// External booking platforms the broker accepts events from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Platform {
    Yanolja,
    Airbnb,
    Yeogieottae,
}

impl Platform {
    pub const ALL: [Platform; 3] = [Platform::Yanolja, Platform::Airbnb, Platform::Yeogieottae];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Yanolja => "YANOLJA",
            Platform::Airbnb => "AIRBNB",
            Platform::Yeogieottae => "YEOGIEOTTAE",
        }
    }

    /// Resolves the platform header sent by a platform. Accepts the single-letter
    /// short codes as well as the long names, case-insensitively.
    pub fn from_header(header: &str) -> Option<Self> {
        match header.trim().to_uppercase().as_str() {
            "A" | "YANOLJA" => Some(Platform::Yanolja),
            "B" | "AIRBNB" => Some(Platform::Airbnb),
            "C" | "YEOGIEOTTAE" => Some(Platform::Yeogieottae),
            _ => None,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognised value `{value}` for {kind}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownVariant {
    pub fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

impl FromStr for Platform {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Platform::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| UnknownVariant::new("platform", s))
    }
}

/// Lifecycle event kinds carried by inbound notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    Booking,
    Cancellation,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Booking => "BOOKING",
            EventKind::Cancellation => "CANCELLATION",
        }
    }

    /// `CANCEL` and `CANCELLATION` select a cancellation; anything else,
    /// including a missing header, is a booking.
    pub fn from_header(header: Option<&str>) -> Self {
        match header.map(|h| h.trim().to_uppercase()) {
            Some(h) if h == "CANCEL" || h == "CANCELLATION" => EventKind::Cancellation,
            _ => EventKind::Booking,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BOOKING" => Ok(EventKind::Booking),
            "CANCELLATION" => Ok(EventKind::Cancellation),
            other => Err(UnknownVariant::new("event kind", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_header_aliases() {
        assert_eq!(Platform::from_header("A"), Some(Platform::Yanolja));
        assert_eq!(Platform::from_header("yanolja"), Some(Platform::Yanolja));
        assert_eq!(Platform::from_header("b"), Some(Platform::Airbnb));
        assert_eq!(Platform::from_header("AirBnb"), Some(Platform::Airbnb));
        assert_eq!(Platform::from_header("C"), Some(Platform::Yeogieottae));
        assert_eq!(Platform::from_header("YEOGIEOTTAE"), Some(Platform::Yeogieottae));
        assert_eq!(Platform::from_header("UNKNOWN"), None);
        assert_eq!(Platform::from_header(""), None);
    }

    #[test]
    fn event_kind_defaults_to_booking() {
        assert_eq!(EventKind::from_header(None), EventKind::Booking);
        assert_eq!(EventKind::from_header(Some("BOOKING")), EventKind::Booking);
        assert_eq!(EventKind::from_header(Some("modify")), EventKind::Booking);
        assert_eq!(EventKind::from_header(Some("cancel")), EventKind::Cancellation);
        assert_eq!(EventKind::from_header(Some("CANCELLATION")), EventKind::Cancellation);
    }

    #[test]
    fn platform_round_trips_through_its_name() {
        for platform in Platform::ALL {
            assert_eq!(platform.as_str().parse::<Platform>(), Ok(platform));
        }
        assert!("A".parse::<Platform>().is_err());
    }
}
