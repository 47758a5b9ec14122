//! Upstream timestamp handling.
//!
//! The API emits RFC 3339 timestamps, occasionally without an offset and
//! occasionally as a bare date. The document only ever carries days.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Parse any of the timestamp shapes the API produces.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    DateTime::parse_from_rfc3339(value)
        .map(|d| d.naive_utc())
        .ok()
        .or_else(|| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f").ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// `YYYY-MM-DD` rendering, or None when the value is unparseable.
pub fn to_day(value: &str) -> Option<String> {
    parse_timestamp(value).map(|d| d.format("%Y-%m-%d").to_string())
}

/// First run of four consecutive digits in a free-text year field.
pub fn extract_year(value: &str) -> Option<&str> {
    let bytes = value.as_bytes();
    let mut run = 0;
    for (i, b) in bytes.iter().enumerate() {
        if b.is_ascii_digit() {
            run += 1;
            if run == 4 {
                return Some(&value[i + 1 - 4..=i]);
            }
        } else {
            run = 0;
        }
    }
    None
}
