use crate::error::{PipelineError, Result};
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};

/// Parse a `YYYY-MM-DD` request date.
pub fn parse_day(field: &str, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        PipelineError::validation(format!("{field} must be a YYYY-MM-DD date, got '{value}'"))
    })
}

/// Parse an RFC 3339 timestamp such as the Data API's `publishedAt`.
pub fn parse_published_at(date_str: &str) -> Option<DateTime<Utc>> {
    if date_str.is_empty() {
        return None;
    }
    date_str.parse::<DateTime<Utc>>().ok()
}

pub fn start_of_day(day: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&day.and_time(NaiveTime::default()))
}

pub fn end_of_day(day: NaiveDate) -> DateTime<Utc> {
    // 23:59:59 is always a valid time of day
    let last_second = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or_default();
    Utc.from_utc_datetime(&day.and_time(last_second))
}

/// Data API timestamps use a literal `Z` suffix.
pub fn format_rfc3339_z(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Split a comma separated setting, dropping blanks.
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Returns `None` for blank input so optional request fields can be sent empty.
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}
