//! Collapse repeated occurrences.
//!
//! Two occurrences are the same iff `uid` and start instant match. The first
//! one seen wins and relative order is kept.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::occurrence::Occurrence;

pub fn dedup_occurrences(occurrences: impl IntoIterator<Item = Occurrence>) -> Vec<Occurrence> {
    let mut seen: HashSet<(String, DateTime<Utc>)> = HashSet::new();
    occurrences
        .into_iter()
        .filter(|o| seen.insert((o.uid.clone(), o.start_instant)))
        .collect()
}
