//! RRULE expansion -- turns one recurring component into the occurrences that
//! fall inside a [`Window`].
//!
//! Wraps the `rrule` crate. The component's start is the rule anchor; when it
//! carries a `TZID` the rule is evaluated in that zone so weekday and
//! month boundaries follow local time, otherwise it is evaluated in UTC.

use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use rrule::RRuleSet;

use crate::component::CalendarComponent;
use crate::error::{HeraldError, Result};
use crate::occurrence::Occurrence;
use crate::window::Window;

/// Instances requested from the `rrule` crate per query.
const PAGE_SIZE: u16 = 500;

/// Upper bound on instances produced for a single window. Reaching it is
/// logged with the component's uid.
pub const MAX_WINDOW_INSTANCES: usize = 100_000;

const ICAL_DATETIME: &str = "%Y%m%dT%H%M%S";

/// Parsed recurrence rule anchored at its component's start.
///
/// Rebuilt for every expansion call.
#[derive(Debug, Clone)]
pub struct RecurrenceRule {
    uid: String,
    raw: String,
    set: RRuleSet,
}

impl RecurrenceRule {
    /// Parse the component's RRULE and anchor it to the component's start.
    ///
    /// # Errors
    /// `HeraldError::InvalidRule` if the component has no RRULE or it does not
    /// parse; `HeraldError::InvalidTimezone` if its `TZID` is not an IANA zone.
    pub fn for_component(component: &CalendarComponent) -> Result<Self> {
        let raw = component
            .rrule
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .ok_or_else(|| HeraldError::InvalidRule {
                uid: component.uid.clone(),
                reason: "missing RRULE".to_string(),
            })?;

        let zone = resolve_zone(component)?;
        let rule = raw.strip_prefix("RRULE:").unwrap_or(raw);

        let dtstart = match zone {
            Some(tz) => format!(
                "DTSTART;TZID={}:{}",
                tz.name(),
                component.start.instant.with_timezone(&tz).format(ICAL_DATETIME)
            ),
            None => format!(
                "DTSTART:{}Z",
                component.start.instant.format(ICAL_DATETIME)
            ),
        };
        let mut rrule_text = format!("{}\nRRULE:{}", dtstart, normalize_until(rule, zone));
        if !component.exdates.is_empty() {
            rrule_text.push('\n');
            rrule_text.push_str(&exdate_line(&component.exdates, zone));
        }

        let set: RRuleSet = rrule_text.parse().map_err(|e| HeraldError::InvalidRule {
            uid: component.uid.clone(),
            reason: format!("{}", e),
        })?;

        Ok(Self {
            uid: component.uid.clone(),
            raw: raw.to_string(),
            set,
        })
    }

    /// The rule exactly as it appeared on the component.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Instances of this rule inside `window`, in ascending order.
    ///
    /// Queries the rule page by page, resuming after the last instance of a
    /// full page, so dense rules are not cut short.
    pub fn instants_in(&self, window: &Window) -> Vec<DateTime<Utc>> {
        // Pad the crate-side bounds by a second and apply the window's own
        // inclusivity afterwards.
        let padding = Duration::seconds(1);
        let from = window.from.checked_sub_signed(padding).unwrap_or(window.from);
        let to = window.to.checked_add_signed(padding).unwrap_or(window.to);
        let before = to.with_timezone(&rrule::Tz::UTC);

        let mut instants: Vec<DateTime<Utc>> = Vec::new();
        let mut after = from;
        loop {
            let page = self
                .set
                .clone()
                .after(after.with_timezone(&rrule::Tz::UTC))
                .before(before)
                .all(PAGE_SIZE);
            let last_seen = instants.last().copied();
            let before_len = instants.len();
            instants.extend(
                page.dates
                    .into_iter()
                    .map(|dt| dt.with_timezone(&Utc))
                    .filter(|dt| last_seen.is_none_or(|last| *dt > last)),
            );

            let Some(&last) = instants.last() else {
                break;
            };
            if !page.limited || instants.len() == before_len {
                break;
            }
            if instants.len() >= MAX_WINDOW_INSTANCES {
                tracing::warn!(
                    uid = %self.uid,
                    limit = MAX_WINDOW_INSTANCES,
                    "recurrence truncated inside window"
                );
                instants.truncate(MAX_WINDOW_INSTANCES);
                break;
            }
            after = last;
        }

        instants.retain(|dt| window.contains(*dt));
        instants
    }
}

/// Expand a recurring component into the occurrences inside `window`.
///
/// With `keep_rule` set each occurrence carries the raw RRULE, which listing
/// callers need for previews.
///
/// # Errors
/// Propagates [`RecurrenceRule::for_component`] failures. Whether that aborts a
/// batch is up to the caller.
pub fn expand_recurring(
    component: &CalendarComponent,
    window: &Window,
    keep_rule: bool,
) -> Result<Vec<Occurrence>> {
    let rule = RecurrenceRule::for_component(component)?;
    let raw_rule = keep_rule.then(|| rule.raw().to_string());

    Ok(rule
        .instants_in(window)
        .into_iter()
        .map(|start| Occurrence::from_component(component, start, raw_rule.clone()))
        .collect())
}

/// `EXDATE` line in the anchor's zone: `TZID` plus local times for a zoned
/// anchor, `Z` times otherwise.
fn exdate_line(exdates: &[DateTime<Utc>], zone: Option<Tz>) -> String {
    match zone {
        Some(tz) => {
            let locals: Vec<String> = exdates
                .iter()
                .map(|dt| dt.with_timezone(&tz).format(ICAL_DATETIME).to_string())
                .collect();
            format!("EXDATE;TZID={}:{}", tz.name(), locals.join(","))
        }
        None => {
            let utcs: Vec<String> = exdates
                .iter()
                .map(|dt| format!("{}Z", dt.format(ICAL_DATETIME)))
                .collect();
            format!("EXDATE:{}", utcs.join(","))
        }
    }
}

fn resolve_zone(component: &CalendarComponent) -> Result<Option<Tz>> {
    component
        .start
        .tzid
        .as_deref()
        .map(|tzid| {
            tzid.parse::<Tz>().map_err(|_| HeraldError::InvalidTimezone {
                uid: component.uid.clone(),
                tzid: tzid.to_string(),
            })
        })
        .transpose()
}

/// The `rrule` crate wants UNTIL in the same zone as DTSTART: a UTC `Z` value
/// for a UTC anchor, bare local time for a zoned one. Calendar servers always
/// write UTC, so rewrite it to match the anchor.
fn normalize_until(rule: &str, zone: Option<Tz>) -> String {
    rule.split(';')
        .map(|part| {
            let Some((key, value)) = part.split_once('=') else {
                return part.to_string();
            };
            if !key.trim().eq_ignore_ascii_case("UNTIL") || value.len() < 15 {
                return part.to_string();
            }
            let bare = value.trim_end_matches('Z');
            let Ok(naive) = NaiveDateTime::parse_from_str(bare, ICAL_DATETIME) else {
                return part.to_string();
            };
            match zone {
                Some(tz) if value.ends_with('Z') => format!(
                    "UNTIL={}",
                    Utc.from_utc_datetime(&naive)
                        .with_timezone(&tz)
                        .format(ICAL_DATETIME)
                ),
                Some(_) => format!("UNTIL={}", bare),
                None => format!("UNTIL={}Z", bare),
            }
        })
        .collect::<Vec<_>>()
        .join(";")
}
