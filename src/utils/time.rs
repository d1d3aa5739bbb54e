use chrono::{Datelike, Duration, NaiveDate};

/// Format of the time that starts every entry line.
pub const TIME_FORMAT: &str = "%H:%M";

/// Format of the lines that separate days in the ledger.
pub const HEADER_FORMAT: &str = "[%Y-%m-%d]";

/// Returns monday of the week `date` belongs to.
pub fn start_of_week(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

/// Formats a duration as `HH:MM`. Hours are not wrapped at 24.
pub fn format_duration(v: Duration) -> String {
    let minutes = v.num_minutes().max(0);
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}
