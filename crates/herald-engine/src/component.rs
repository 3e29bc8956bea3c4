//! Calendar components as handed over by the calendar provider.
//!
//! The engine only ever reads these. They are fetched fresh for every operation
//! and never cached.

use chrono::{DateTime, Utc};

/// The start-time property of a component: an absolute instant plus the
/// `TZID` it was written in, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct EventStart {
    pub instant: DateTime<Utc>,
    /// IANA identifier from the `TZID` parameter. `None` means UTC or floating.
    pub tzid: Option<String>,
}

/// A single VEVENT from the calendar export.
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarComponent {
    /// Stable per source event. Shared by every occurrence of a recurring event.
    pub uid: String,
    pub summary: String,
    pub location: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub start: EventStart,
    /// Raw RRULE value, e.g. `FREQ=WEEKLY;INTERVAL=2`.
    pub rrule: Option<String>,
    /// Instances removed from the recurrence set: `EXDATE` values plus the
    /// original instants of detached overrides.
    pub exdates: Vec<DateTime<Utc>>,
}

impl CalendarComponent {
    pub fn new(uid: impl Into<String>, summary: impl Into<String>, start: DateTime<Utc>) -> Self {
        Self {
            uid: uid.into(),
            summary: summary.into(),
            location: None,
            description: None,
            url: None,
            start: EventStart {
                instant: start,
                tzid: None,
            },
            rrule: None,
            exdates: Vec::new(),
        }
    }

    pub fn with_rrule(mut self, rrule: impl Into<String>) -> Self {
        self.rrule = Some(rrule.into());
        self
    }

    pub fn with_exdate(mut self, instant: DateTime<Utc>) -> Self {
        self.exdates.push(instant);
        self
    }

    pub fn with_tzid(mut self, tzid: impl Into<String>) -> Self {
        self.start.tzid = Some(tzid.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// A component is recurring when it carries a non-blank RRULE.
    pub fn is_recurring(&self) -> bool {
        self.rrule.as_deref().is_some_and(|r| !r.trim().is_empty())
    }
}
