//! Whole operations: fetch one snapshot from the provider, then select.
//!
//! Each call fetches exactly once and keeps nothing afterwards.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use crate::component::CalendarComponent;
use crate::error::Result;
use crate::occurrence::{find_occurrence, Occurrence, OccurrenceKey};
use crate::preview::preview_occurrence;
use crate::provider::CalendarProvider;
use crate::selector::{select_days, select_list, select_next, select_upcoming, RuleFailurePolicy};
use crate::window::{DayOffsets, SelectionMode};

/// A list-range entry: the occurrence, its identity, and the preview estimate.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListedOccurrence {
    pub key: OccurrenceKey,
    #[serde(flatten)]
    pub occurrence: Occurrence,
    /// `None` for single events and for patterns the previewer does not handle.
    pub next_estimate: Option<DateTime<Utc>>,
}

async fn fetch<P: CalendarProvider>(
    provider: &P,
    mode: &SelectionMode,
    now: DateTime<Utc>,
    tz: Tz,
) -> Result<Vec<CalendarComponent>> {
    let range = mode.fetch_range(now, tz)?;
    tracing::debug!(start = range.start_epoch(), end = range.end_epoch(), "fetching calendar");
    let components = provider.fetch(&range).await?;
    tracing::debug!(count = components.len(), "fetched components");
    Ok(components)
}

pub async fn upcoming<P: CalendarProvider>(
    provider: &P,
    now: DateTime<Utc>,
    policy: RuleFailurePolicy,
) -> Result<Vec<Occurrence>> {
    let components = fetch(provider, &SelectionMode::Upcoming, now, chrono_tz::UTC).await?;
    select_upcoming(&components, now, policy)
}

/// Fetches once over the widest requested day, then selects per offset.
pub async fn day_targeted<P: CalendarProvider>(
    provider: &P,
    now: DateTime<Utc>,
    offsets: &DayOffsets,
    tz: Tz,
    policy: RuleFailurePolicy,
) -> Result<Vec<Occurrence>> {
    let components = fetch(provider, &SelectionMode::Days(offsets.clone()), now, tz).await?;
    select_days(&components, now, offsets, tz, policy)
}

pub async fn next_event<P: CalendarProvider>(
    provider: &P,
    now: DateTime<Utc>,
    policy: RuleFailurePolicy,
) -> Result<Option<Occurrence>> {
    let components = fetch(provider, &SelectionMode::NextEvent, now, chrono_tz::UTC).await?;
    select_next(&components, now, policy)
}

pub async fn list_range<P: CalendarProvider>(
    provider: &P,
    now: DateTime<Utc>,
    days: u32,
    tz: Tz,
    policy: RuleFailurePolicy,
) -> Result<Vec<ListedOccurrence>> {
    let components = fetch(provider, &SelectionMode::List { days }, now, tz).await?;
    Ok(select_list(&components, now, days, policy)?
        .into_iter()
        .map(|occurrence| ListedOccurrence {
            key: occurrence.key(),
            next_estimate: preview_occurrence(&occurrence, now, tz),
            occurrence,
        })
        .collect())
}

/// Re-run a list-range selection and pick the occurrence with `key`.
///
/// `None` when the occurrence is no longer in the range, e.g. because the
/// calendar changed since the key was handed out.
pub async fn find_listed<P: CalendarProvider>(
    provider: &P,
    now: DateTime<Utc>,
    days: u32,
    key: &OccurrenceKey,
    policy: RuleFailurePolicy,
) -> Result<Option<Occurrence>> {
    let components = fetch(provider, &SelectionMode::List { days }, now, chrono_tz::UTC).await?;
    let occurrences = select_list(&components, now, days, policy)?;
    Ok(find_occurrence(&occurrences, key).cloned())
}
