//! Occurrence selection for each request mode.
//!
//! Every function here takes an already-fetched snapshot of components, builds
//! the mode's windows against `now` and collects the occurrences inside them.
//! Non-recurring components never reach the expander: they yield their own
//! start when it lies inside the window, under the same bounds.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Deserialize;

use crate::component::CalendarComponent;
use crate::dedup::dedup_occurrences;
use crate::error::Result;
use crate::expander::expand_recurring;
use crate::occurrence::Occurrence;
use crate::window::{DayOffsets, Window};

/// What to do when one component's recurrence rule cannot be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleFailurePolicy {
    /// Log the uid and carry on with the remaining components.
    #[default]
    Skip,
    /// Fail the whole selection with the first error.
    Abort,
}

impl FromStr for RuleFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "skip" => Ok(Self::Skip),
            "abort" => Ok(Self::Abort),
            other => Err(format!("unknown rule failure policy '{}' (skip, abort)", other)),
        }
    }
}

impl fmt::Display for RuleFailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Skip => "skip",
            Self::Abort => "abort",
        })
    }
}

/// Occurrences of every component inside `window`, in component order.
///
/// # Errors
/// Only under [`RuleFailurePolicy::Abort`], with the first expansion failure.
pub fn collect_in_window(
    components: &[CalendarComponent],
    window: &Window,
    keep_rule: bool,
    policy: RuleFailurePolicy,
) -> Result<Vec<Occurrence>> {
    let mut occurrences = Vec::new();

    for component in components {
        if !component.is_recurring() {
            if window.contains(component.start.instant) {
                occurrences.push(Occurrence::from_component(
                    component,
                    component.start.instant,
                    None,
                ));
            }
            continue;
        }

        match expand_recurring(component, window, keep_rule) {
            Ok(mut expanded) => occurrences.append(&mut expanded),
            Err(err) if policy == RuleFailurePolicy::Abort => return Err(err),
            Err(err) => {
                tracing::warn!(uid = %component.uid, error = %err, "skipping component");
            }
        }
    }

    Ok(occurrences)
}

/// General-upcoming selection over `(now, now + 360h)`.
pub fn select_upcoming(
    components: &[CalendarComponent],
    now: DateTime<Utc>,
    policy: RuleFailurePolicy,
) -> Result<Vec<Occurrence>> {
    collect_in_window(components, &Window::upcoming(now)?, false, policy)
}

/// Day-targeted selection: one inclusive window per offset, evaluated
/// independently, concatenated in offset order and deduplicated.
pub fn select_days(
    components: &[CalendarComponent],
    now: DateTime<Utc>,
    offsets: &DayOffsets,
    tz: Tz,
    policy: RuleFailurePolicy,
) -> Result<Vec<Occurrence>> {
    let mut occurrences = Vec::new();
    for offset in offsets.as_slice() {
        let window = Window::day(now, *offset, tz)?;
        tracing::debug!(offset, from = %window.from, to = %window.to, "day window");
        occurrences.extend(collect_in_window(components, &window, false, policy)?);
    }
    Ok(dedup_occurrences(occurrences))
}

/// The earliest occurrence strictly after `now` within the next 14 days.
///
/// Equal instants keep the order in which components were supplied.
pub fn select_next(
    components: &[CalendarComponent],
    now: DateTime<Utc>,
    policy: RuleFailurePolicy,
) -> Result<Option<Occurrence>> {
    let candidates = collect_in_window(components, &Window::next_event(now)?, false, policy)?;
    Ok(candidates
        .into_iter()
        .filter(|o| o.start_instant > now)
        .min_by_key(|o| o.start_instant))
}

/// List-range selection over `(now, now + days)`, ascending by start. Recurring
/// occurrences carry their raw rule.
pub fn select_list(
    components: &[CalendarComponent],
    now: DateTime<Utc>,
    days: u32,
    policy: RuleFailurePolicy,
) -> Result<Vec<Occurrence>> {
    let mut occurrences = collect_in_window(components, &Window::list(now, days)?, true, policy)?;
    occurrences.sort_by_key(|o| o.start_instant);
    Ok(occurrences)
}
