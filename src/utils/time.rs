use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone};

/// This is the standard way of converting a date to a string in steamtally.
pub fn date_to_snapshot_name(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Parses a stored timestamp. Older exports carry a naive ISO-8601 value without an offset, those
/// are read as local time.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Local>> {
    if let Ok(v) = DateTime::parse_from_rfc3339(value) {
        return Some(v.with_timezone(&Local));
    }
    let naive = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f").ok()?;
    Local.from_local_datetime(&naive).earliest()
}
