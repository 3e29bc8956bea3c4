//! Best-effort "next occurrence" estimate for display.
//!
//! Independent of the expander: reads the raw rule string and the
//! occurrence's own start, and understands two patterns only:
//!
//! - `FREQ=WEEKLY` with an optional `INTERVAL`
//! - `FREQ=MONTHLY` with a single `BYDAY` weekday and a positive `BYSETPOS`,
//!   always evaluated in the month after the current one
//!
//! Anything else yields `None`. Estimates may disagree with the expander.

use std::collections::HashMap;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::occurrence::Occurrence;

/// Estimate the next occurrence of an occurrence's pattern.
///
/// Wall-clock arithmetic happens in `tz`.
pub fn preview_occurrence(
    occurrence: &Occurrence,
    now: DateTime<Utc>,
    tz: Tz,
) -> Option<DateTime<Utc>> {
    let rule = occurrence.raw_rule.as_deref()?;
    preview_next(rule, occurrence.start_instant, now, tz)
}

/// Estimate the next occurrence after `now` of `rule` anchored at `start`.
pub fn preview_next(
    rule: &str,
    start: DateTime<Utc>,
    now: DateTime<Utc>,
    tz: Tz,
) -> Option<DateTime<Utc>> {
    let parts = rule_parts(rule);
    let start = start.with_timezone(&tz);
    let today = now.with_timezone(&tz).date_naive();

    let next = match parts.get("FREQ").map(String::as_str) {
        Some("WEEKLY") => {
            let interval = match parts.get("INTERVAL") {
                Some(raw) => raw.parse::<i64>().ok().filter(|n| *n >= 1)?,
                None => 1,
            };
            next_weekly(start.date_naive(), today, interval)
        }
        Some("MONTHLY") => {
            let weekday = weekday_index(parts.get("BYDAY")?)?;
            let ordinal = parts.get("BYSETPOS")?.parse::<usize>().ok().filter(|n| *n >= 1)?;
            nth_weekday_of_following_month(today, weekday, ordinal)
        }
        _ => None,
    }?;

    let local: NaiveDateTime = next.and_time(start.time());
    tz.from_local_datetime(&local)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

fn rule_parts(rule: &str) -> HashMap<String, String> {
    let rule = rule.trim();
    let rule = rule.strip_prefix("RRULE:").unwrap_or(rule);
    rule.split(';')
        .filter_map(|part| part.split_once('='))
        .map(|(key, value)| (key.trim().to_ascii_uppercase(), value.trim().to_ascii_uppercase()))
        .collect()
}

/// SU=0 .. SA=6.
fn weekday_index(code: &str) -> Option<u32> {
    match code {
        "SU" => Some(0),
        "MO" => Some(1),
        "TU" => Some(2),
        "WE" => Some(3),
        "TH" => Some(4),
        "FR" => Some(5),
        "SA" => Some(6),
        _ => None,
    }
}

/// First date after `today` on the anchor's weekday, pushed forward whole
/// weeks until it is a multiple of `interval` weeks from the anchor.
fn next_weekly(anchor: NaiveDate, today: NaiveDate, interval: i64) -> Option<NaiveDate> {
    let target = i64::from(anchor.weekday().num_days_from_sunday());
    let current = i64::from(today.weekday().num_days_from_sunday());
    let ahead = match (target - current).rem_euclid(7) {
        0 => 7,
        n => n,
    };
    let mut date = today.checked_add_signed(Duration::days(ahead))?;

    if interval > 1 {
        let weeks = (date - anchor).num_days().div_euclid(7);
        let behind = weeks.rem_euclid(interval);
        if behind != 0 {
            date = date.checked_add_signed(Duration::weeks(interval - behind))?;
        }
    }
    Some(date)
}

fn nth_weekday_of_following_month(
    today: NaiveDate,
    weekday: u32,
    ordinal: usize,
) -> Option<NaiveDate> {
    let (year, month) = match today.month() {
        12 => (today.year() + 1, 1),
        m => (today.year(), m + 1),
    };
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;

    first
        .iter_days()
        .take_while(|d| d.month() == month)
        .filter(|d| d.weekday().num_days_from_sunday() == weekday)
        .nth(ordinal - 1)
}
