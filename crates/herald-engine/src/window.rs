//! Selection windows for the four request modes, and the fetch ranges that
//! back them.
//!
//! | mode            | window                                   | bounds    |
//! |-----------------|------------------------------------------|-----------|
//! | general-upcoming| `(now, now + 360h)`                      | exclusive |
//! | day-targeted    | `[day(now) + d, day(now) + d + 1]` per d | inclusive |
//! | next-event      | `[now, now + 14d]`, then `> now`         | inclusive |
//! | list-range      | `(now, now + D days)`                    | exclusive |

use chrono::{DateTime, Days, Duration, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::{HeraldError, Result};

pub const UPCOMING_HORIZON_HOURS: i64 = 360;
pub const NEXT_EVENT_HORIZON_DAYS: i64 = 14;
pub const MAX_DAY_OFFSET: i64 = 15;
pub const MAX_DAY_OFFSETS: usize = 4;
pub const DEFAULT_DAY_OFFSET: u32 = 1;

/// Whether the window endpoints themselves belong to the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bounds {
    Exclusive,
    Inclusive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub bounds: Bounds,
}

impl Window {
    pub fn exclusive(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self {
            from,
            to,
            bounds: Bounds::Exclusive,
        }
    }

    pub fn inclusive(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self {
            from,
            to,
            bounds: Bounds::Inclusive,
        }
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        match self.bounds {
            Bounds::Exclusive => self.from < instant && instant < self.to,
            Bounds::Inclusive => self.from <= instant && instant <= self.to,
        }
    }

    /// General-upcoming: `(now, now + 360h)`.
    pub fn upcoming(now: DateTime<Utc>) -> Result<Self> {
        Ok(Self::exclusive(
            now,
            shifted(now, Duration::hours(UPCOMING_HORIZON_HOURS))?,
        ))
    }

    /// Day-targeted: the local calendar day `offset` days after today in `tz`,
    /// with both midnights included.
    pub fn day(now: DateTime<Utc>, offset: u32, tz: Tz) -> Result<Self> {
        let today = now.with_timezone(&tz).date_naive();
        let day = days_after(today, offset)?;
        Ok(Self::inclusive(
            local_midnight(tz, day),
            local_midnight(tz, days_after(day, 1)?),
        ))
    }

    /// Next-event: `[now, now + 14d]`. Callers still drop occurrences at `now`.
    pub fn next_event(now: DateTime<Utc>) -> Result<Self> {
        Ok(Self::inclusive(
            now,
            shifted(now, Duration::days(NEXT_EVENT_HORIZON_DAYS))?,
        ))
    }

    /// List-range: `(now, now + days)`.
    ///
    /// # Errors
    /// `HeraldError::InvalidWindow` when the end is past the representable range.
    pub fn list(now: DateTime<Utc>, days: u32) -> Result<Self> {
        Ok(Self::exclusive(
            now,
            shifted(now, Duration::days(i64::from(days)))?,
        ))
    }
}

fn shifted(now: DateTime<Utc>, delta: Duration) -> Result<DateTime<Utc>> {
    now.checked_add_signed(delta)
        .ok_or_else(|| HeraldError::InvalidWindow(format!("{} + {}", now, delta)))
}

fn days_after(date: NaiveDate, days: u32) -> Result<NaiveDate> {
    date.checked_add_days(Days::new(u64::from(days)))
        .ok_or_else(|| HeraldError::InvalidWindow(format!("{} + {} days", date, days)))
}

/// First valid instant of `date` in `tz`.
///
/// A midnight that falls into a DST gap resolves to the first local time after
/// the gap.
pub fn local_midnight(tz: Tz, date: NaiveDate) -> DateTime<Utc> {
    let midnight = date.and_hms_opt(0, 0, 0).unwrap_or_default();
    (0..=180)
        .step_by(15)
        .find_map(|minutes| {
            midnight
                .checked_add_signed(Duration::minutes(minutes))
                .and_then(|local| tz.from_local_datetime(&local).earliest())
        })
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&midnight))
}

/// The date range requested from the calendar provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Ask the server to pre-expand recurrences. The engine expands rules
    /// itself, so selection modes leave this off.
    pub expand: bool,
}

impl FetchRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start,
            end,
            expand: false,
        }
    }

    pub fn start_epoch(&self) -> i64 {
        self.start.timestamp()
    }

    pub fn end_epoch(&self) -> i64 {
        self.end.timestamp()
    }
}

/// Normalised set of day offsets for day-targeted selection.
///
/// Always non-empty, sorted ascending, without duplicates, every value in
/// `0..=15`, at most four values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayOffsets(Vec<u32>);

impl DayOffsets {
    /// Normalise a comma-separated offset list. Never fails: anything that
    /// leaves no usable offset falls back to `{1}`.
    ///
    /// Values outside `0..=15` and non-integers are dropped, the first four
    /// survivors are kept, then duplicates collapse.
    pub fn normalize(raw: &str) -> Self {
        let mut offsets: Vec<u32> = raw
            .split(',')
            .filter_map(|part| part.trim().parse::<i64>().ok())
            .filter(|value| (0..=MAX_DAY_OFFSET).contains(value))
            .filter_map(|value| u32::try_from(value).ok())
            .take(MAX_DAY_OFFSETS)
            .collect();
        offsets.sort_unstable();
        offsets.dedup();

        if offsets.is_empty() {
            return Self::default();
        }
        Self(offsets)
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }

    pub fn max(&self) -> u32 {
        self.0.last().copied().unwrap_or(DEFAULT_DAY_OFFSET)
    }
}

impl Default for DayOffsets {
    fn default() -> Self {
        Self(vec![DEFAULT_DAY_OFFSET])
    }
}

/// The four request modes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionMode {
    Upcoming,
    Days(DayOffsets),
    NextEvent,
    List { days: u32 },
}

impl SelectionMode {
    /// Range to request from the provider so every window of this mode is covered.
    ///
    /// # Errors
    /// `HeraldError::InvalidWindow` when the range end is not representable.
    pub fn fetch_range(&self, now: DateTime<Utc>, tz: Tz) -> Result<FetchRange> {
        let range = match self {
            SelectionMode::Days(offsets) => {
                let today = now.with_timezone(&tz).date_naive();
                let last = days_after(today, offsets.max() + 1)?;
                FetchRange::new(local_midnight(tz, today), local_midnight(tz, last))
            }
            SelectionMode::Upcoming => {
                let window = Window::upcoming(now)?;
                FetchRange::new(window.from, window.to)
            }
            SelectionMode::NextEvent => {
                let window = Window::next_event(now)?;
                FetchRange::new(window.from, window.to)
            }
            SelectionMode::List { days } => {
                let window = Window::list(now, *days)?;
                FetchRange::new(window.from, window.to)
            }
        };
        Ok(range)
    }

    /// Windows evaluated by this mode, in evaluation order.
    pub fn windows(&self, now: DateTime<Utc>, tz: Tz) -> Result<Vec<Window>> {
        match self {
            SelectionMode::Upcoming => Ok(vec![Window::upcoming(now)?]),
            SelectionMode::Days(offsets) => offsets
                .as_slice()
                .iter()
                .map(|offset| Window::day(now, *offset, tz))
                .collect(),
            SelectionMode::NextEvent => Ok(vec![Window::next_event(now)?]),
            SelectionMode::List { days } => Ok(vec![Window::list(now, *days)?]),
        }
    }
}
