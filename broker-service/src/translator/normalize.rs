//! Field normalisers shared by the platform translators. Each one is pure and
//! deterministic apart from the `now` fallback it is handed.

use anyhow::{anyhow, Context, Result};
use bigdecimal::BigDecimal;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use std::str::FromStr;

const ISO_DATE: &str = "%Y-%m-%d";
const COMPACT_DATE: &str = "%Y%m%d";
const LOCAL_DATE_TIME: &str = "%Y-%m-%dT%H:%M:%S";

/// Platforms in Korea report local wall-clock time; Asia/Seoul has no DST.
const KST_OFFSET_SECS: i32 = 9 * 3600;

/// `yyyy-MM-dd`. Blank input means the date is absent.
pub fn iso_date(value: Option<&str>) -> Result<Option<NaiveDate>> {
    parse_date(value, ISO_DATE)
}

/// `yyyyMMdd`. Blank input means the date is absent.
pub fn compact_date(value: Option<&str>) -> Result<Option<NaiveDate>> {
    parse_date(value, COMPACT_DATE)
}

fn parse_date(value: Option<&str>, pattern: &str) -> Result<Option<NaiveDate>> {
    match non_blank_str(value) {
        None => Ok(None),
        Some(text) => NaiveDate::parse_from_str(text, pattern)
            .map(Some)
            .with_context(|| format!("invalid date `{text}`")),
    }
}

/// `yyyy-MM-dd'T'HH:mm:ss` in Korean local time. Blank input falls back to `now`.
pub fn kst_local_time(value: Option<&str>, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let Some(text) = non_blank_str(value) else {
        return Ok(now);
    };
    let local = NaiveDateTime::parse_from_str(text, LOCAL_DATE_TIME)
        .with_context(|| format!("invalid local timestamp `{text}`"))?;
    let kst = FixedOffset::east_opt(KST_OFFSET_SECS).ok_or_else(|| anyhow!("invalid KST offset"))?;
    kst.from_local_datetime(&local)
        .single()
        .map(|t| t.with_timezone(&Utc))
        .ok_or_else(|| anyhow!("ambiguous local timestamp `{text}`"))
}

/// Epoch milliseconds. Absent or zero falls back to `now`.
pub fn epoch_millis(value: Option<i64>, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    match value.filter(|v| *v != 0) {
        None => Ok(now),
        Some(millis) => DateTime::from_timestamp_millis(millis)
            .ok_or_else(|| anyhow!("epoch millis {millis} out of range")),
    }
}

/// Epoch seconds. Absent or zero falls back to `now`.
pub fn epoch_seconds(value: Option<i64>, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    match value.filter(|v| *v != 0) {
        None => Ok(now),
        Some(secs) => DateTime::from_timestamp(secs, 0)
            .ok_or_else(|| anyhow!("epoch seconds {secs} out of range")),
    }
}

/// Whole-won amounts.
pub fn krw(value: Option<i64>) -> Option<BigDecimal> {
    value.map(BigDecimal::from)
}

/// Floating payouts go through their shortest round-trip decimal text so that
/// `350.5` becomes exactly `350.5` rather than its binary expansion.
pub fn payout(value: Option<f64>) -> Result<Option<BigDecimal>> {
    match value {
        None => Ok(None),
        Some(v) if !v.is_finite() => Err(anyhow!("payout {v} is not a finite amount")),
        Some(v) => BigDecimal::from_str(&v.to_string())
            .map(Some)
            .with_context(|| format!("invalid payout {v}")),
    }
}

/// Joins first and last name with a single space, trimmed.
pub fn full_name(first: Option<&str>, last: Option<&str>) -> Option<String> {
    let joined = format!("{} {}", first.unwrap_or_default(), last.unwrap_or_default());
    non_blank(Some(joined.trim().to_string()))
}

pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn non_blank_str(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dates_in_both_patterns() {
        let expected = NaiveDate::from_ymd_opt(2025, 8, 15);
        assert_eq!(iso_date(Some("2025-08-15")).unwrap(), expected);
        assert_eq!(compact_date(Some("20250815")).unwrap(), expected);
        assert_eq!(iso_date(Some("  ")).unwrap(), None);
        assert_eq!(compact_date(None).unwrap(), None);
        assert!(iso_date(Some("20250815")).is_err());
        assert!(compact_date(Some("2025-08-15")).is_err());
    }

    #[test]
    fn kst_is_nine_hours_ahead_of_utc() {
        let parsed = kst_local_time(Some("2025-08-01T10:30:00"), Utc::now()).unwrap();
        assert_eq!(parsed.to_rfc3339(), "2025-08-01T01:30:00+00:00");
    }

    #[test]
    fn missing_timestamps_fall_back_to_now() {
        let now = Utc::now();
        assert_eq!(kst_local_time(None, now).unwrap(), now);
        assert_eq!(epoch_millis(Some(0), now).unwrap(), now);
        assert_eq!(epoch_seconds(None, now).unwrap(), now);
    }

    #[test]
    fn epoch_units_differ() {
        let now = Utc::now();
        let from_millis = epoch_millis(Some(1_723_456_789_000), now).unwrap();
        let from_secs = epoch_seconds(Some(1_723_456_789), now).unwrap();
        assert_eq!(from_millis, from_secs);
    }

    #[test]
    fn payout_keeps_decimal_text() {
        assert_eq!(
            payout(Some(350.5)).unwrap(),
            Some(BigDecimal::from_str("350.5").unwrap())
        );
        assert_eq!(
            payout(Some(0.1)).unwrap().map(|d| d.to_string()),
            Some("0.1".to_string())
        );
        assert!(payout(Some(f64::NAN)).is_err());
        assert_eq!(krw(Some(380_000)), Some(BigDecimal::from(380_000)));
    }

    #[test]
    fn names_are_joined_and_trimmed() {
        assert_eq!(full_name(Some("Minsu"), Some("Kim")), Some("Minsu Kim".to_string()));
        assert_eq!(full_name(Some("Minsu"), None), Some("Minsu".to_string()));
        assert_eq!(full_name(None, None), None);
        assert_eq!(non_blank(Some(" 김민수 ".to_string())), Some("김민수".to_string()));
    }
}
