//! Concrete occurrences and their identity.
//!
//! One recurring component yields many occurrences sharing a `uid`, so identity
//! is always the `(uid, start_instant)` pair. [`OccurrenceKey`] is that pair in
//! a form that can be handed to a client and passed back later to act on the
//! same occurrence, independent of where it sits in any list.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::component::CalendarComponent;
use crate::error::HeraldError;

/// One concrete instance of an event.
///
/// The source component's `url` is never carried over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Occurrence {
    pub uid: String,
    pub summary: String,
    pub start_instant: DateTime<Utc>,
    pub location: Option<String>,
    pub description: Option<String>,
    /// Raw RRULE of the source component. Only set in listing contexts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_rule: Option<String>,
}

impl Occurrence {
    pub fn from_component(
        component: &CalendarComponent,
        start_instant: DateTime<Utc>,
        raw_rule: Option<String>,
    ) -> Self {
        Self {
            uid: component.uid.clone(),
            summary: component.summary.clone(),
            start_instant,
            location: component.location.clone(),
            description: component.description.clone(),
            raw_rule,
        }
    }

    pub fn key(&self) -> OccurrenceKey {
        OccurrenceKey {
            uid: self.uid.clone(),
            start: self.start_instant,
        }
    }
}

/// Identity of an occurrence, rendered as `<uid>@<RFC 3339 start>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OccurrenceKey {
    pub uid: String,
    pub start: DateTime<Utc>,
}

impl fmt::Display for OccurrenceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{}",
            self.uid,
            self.start.to_rfc3339_opts(SecondsFormat::Secs, true)
        )
    }
}

impl Serialize for OccurrenceKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl FromStr for OccurrenceKey {
    type Err = HeraldError;

    // uids are commonly `something@host`, so split on the last `@`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (uid, start) = s
            .rsplit_once('@')
            .filter(|(uid, _)| !uid.is_empty())
            .ok_or_else(|| HeraldError::InvalidComponent(format!("invalid occurrence key: {s}")))?;
        let start = DateTime::parse_from_rfc3339(start)
            .map_err(|e| HeraldError::InvalidComponent(format!("invalid occurrence key {s}: {e}")))?
            .with_timezone(&Utc);
        Ok(Self {
            uid: uid.to_string(),
            start,
        })
    }
}

/// Look an occurrence up by identity.
pub fn find_occurrence<'a>(
    occurrences: &'a [Occurrence],
    key: &OccurrenceKey,
) -> Option<&'a Occurrence> {
    occurrences
        .iter()
        .find(|o| o.uid == key.uid && o.start_instant == key.start)
}
