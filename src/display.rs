use chrono::{DateTime, TimeZone, Utc};
use std::fmt::Display;

// e.g. `9 Mar 2026 • 05:04 PM`
pub fn format_note_timestamp<Tz>(date: &DateTime<Utc>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let local = date.with_timezone(tz);
    format!("{} • {}", local.format("%-d %b %Y"), local.format("%I:%M %p"))
}
