//! Internal helpers for model validation and conversion.
//!
//! These utilities are **not** part of the public API. They centralize
//! validation and mapping logic so the engine enforces consistent invariants.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use unicode_normalization::UnicodeNormalization;
use uuid::Uuid;

use crate::{EngineError, ResultEngine};

/// Case-insensitive lookup key for user-entered names (accounts, categories).
pub(crate) fn name_key(value: &str) -> String {
    value.nfkc().collect::<String>().trim().to_lowercase()
}

pub(crate) fn normalize_required_name(value: &str, label: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::Validation(format!(
            "{label} name must not be empty"
        )));
    }
    Ok(trimmed.to_string())
}

pub(crate) fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// Parse a UUID from storage and return a labeled error on failure.
pub(crate) fn parse_uuid(value: &str, label: &str) -> ResultEngine<Uuid> {
    Uuid::parse_str(value).map_err(|_| EngineError::InvalidId(format!("invalid {label} id")))
}

/// First instant of `year-month` in UTC.
pub(crate) fn month_start(year: i32, month: u32) -> ResultEngine<DateTime<Utc>> {
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|n| Utc.from_utc_datetime(&n))
        .ok_or_else(|| EngineError::Validation(format!("invalid month {year}-{month}")))
}

/// Inclusive `[start, end]` bounds of a calendar month, `end` being the last
/// second of the month.
pub(crate) fn month_bounds(year: i32, month: u32) -> ResultEngine<(DateTime<Utc>, DateTime<Utc>)> {
    let start = month_start(year, month)?;
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    let end = month_start(next_year, next_month)? - Duration::seconds(1);
    Ok((start, end))
}

pub(crate) fn current_month_bounds(now: DateTime<Utc>) -> ResultEngine<(DateTime<Utc>, DateTime<Utc>)> {
    month_bounds(now.year(), now.month())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_key_folds_case_and_width() {
        assert_eq!(name_key("  Savings "), "savings");
        assert_eq!(name_key("ＷＡＬＬＥＴ"), "wallet");
    }

    #[test]
    fn month_bounds_cover_whole_month() {
        let (start, end) = month_bounds(2024, 2).unwrap();
        assert_eq!(start.to_rfc3339(), "2024-02-01T00:00:00+00:00");
        assert_eq!(end.to_rfc3339(), "2024-02-29T23:59:59+00:00");

        let (_, end) = month_bounds(2024, 12).unwrap();
        assert_eq!(end.to_rfc3339(), "2024-12-31T23:59:59+00:00");
    }

    #[test]
    fn optional_text_drops_blanks() {
        assert_eq!(normalize_optional_text(Some("  ")), None);
        assert_eq!(normalize_optional_text(Some(" cafe ")), Some("cafe".to_string()));
    }
}
