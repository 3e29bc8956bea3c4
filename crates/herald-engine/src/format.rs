//! Announcement text.

use chrono_tz::Tz;

use crate::occurrence::Occurrence;

const WHEN_FORMAT: &str = "%A %d %B %Y, %H:%M";

/// Render an occurrence as status text, with the start shown in `tz`.
///
/// Blank location and description lines are left out.
pub fn format_announcement(occurrence: &Occurrence, tz: Tz) -> String {
    let when = occurrence.start_instant.with_timezone(&tz).format(WHEN_FORMAT);
    let mut text = format!("📅 {}\n🕒 {}", occurrence.summary.trim(), when);

    if let Some(location) = non_blank(occurrence.location.as_deref()) {
        text.push_str(&format!("\n📍 {}", location));
    }
    if let Some(description) = non_blank(occurrence.description.as_deref()) {
        text.push_str(&format!("\n\n{}", description));
    }
    text
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
