//! # herald-engine
//!
//! Occurrence resolution for calendar announcements.
//!
//! Takes raw calendar components from a CalDAV export, expands recurrence rules
//! into concrete occurrences inside a request window, removes duplicates, and
//! hands the result to an announcement target.
//!
//! ## Modules
//!
//! - [`component`] — calendar components as fetched from the provider
//! - [`occurrence`] — concrete occurrences and their `(uid, start)` key
//! - [`expander`] — RRULE + component start → occurrences inside a window
//! - [`window`] — windows and fetch ranges for the four request modes
//! - [`selector`] — apply a mode's windows to a component snapshot
//! - [`dedup`] — collapse repeats by `(uid, start)`
//! - [`preview`] — heuristic next-occurrence estimate for display
//! - [`jcal`] — decode the jCal calendar export
//! - [`provider`] — calendar source and announcement target traits
//! - [`format`] — announcement text
//! - [`batch`] — sequential posting with a per-item report
//! - [`runner`] — fetch + select operations over a [`CalendarProvider`]
//! - [`error`] — Error types

pub mod batch;
pub mod component;
pub mod dedup;
pub mod error;
pub mod expander;
pub mod format;
pub mod jcal;
pub mod occurrence;
pub mod preview;
pub mod provider;
pub mod runner;
pub mod selector;
pub mod window;

pub use batch::{post_batch, AnnounceOptions, BatchReport, PostOutcome, PostPolicy};
pub use component::{CalendarComponent, EventStart};
pub use dedup::dedup_occurrences;
pub use error::HeraldError;
pub use expander::{expand_recurring, RecurrenceRule, MAX_WINDOW_INSTANCES};
pub use format::format_announcement;
pub use jcal::parse_jcal;
pub use occurrence::{find_occurrence, Occurrence, OccurrenceKey};
pub use preview::{preview_next, preview_occurrence};
pub use provider::{Announcement, AnnouncementTarget, CalendarProvider, Visibility};
pub use selector::{select_days, select_list, select_next, select_upcoming, RuleFailurePolicy};
pub use window::{Bounds, DayOffsets, FetchRange, SelectionMode, Window};
