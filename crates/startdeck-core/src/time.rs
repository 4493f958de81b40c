//! Time types for calendar events.
//!
//! This module provides [`EventTime`] for representing event start/end times
//! (which may be either a specific datetime or an all-day date), and
//! [`TimeWindow`] for defining CalDAV query ranges.

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Represents the time of a calendar event.
///
/// Calendar events can have two types of times:
/// - **DateTime**: A specific point in time (stored as UTC)
/// - **AllDay**: A date without a specific time (all-day events)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum EventTime {
    /// A specific datetime, stored in UTC.
    DateTime(DateTime<Utc>),
    /// An all-day event date (no specific time).
    AllDay(NaiveDate),
}

impl EventTime {
    /// Creates a new `EventTime::DateTime` from a UTC datetime.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self::DateTime(dt)
    }

    /// Creates a new `EventTime::AllDay` from a date.
    pub fn from_date(date: NaiveDate) -> Self {
        Self::AllDay(date)
    }

    /// Returns `true` if this is an all-day event time.
    pub fn is_all_day(&self) -> bool {
        matches!(self, Self::AllDay(_))
    }

    /// Returns the datetime if this is a `DateTime` variant.
    pub fn as_datetime(&self) -> Option<&DateTime<Utc>> {
        match self {
            Self::DateTime(dt) => Some(dt),
            Self::AllDay(_) => None,
        }
    }

    /// Converts to a UTC datetime for comparison purposes.
    ///
    /// For all-day events, returns midnight UTC on that date.
    pub fn to_utc_datetime(&self) -> DateTime<Utc> {
        match self {
            Self::DateTime(dt) => *dt,
            Self::AllDay(date) => date.and_hms_opt(0, 0, 0).expect("valid time").and_utc(),
        }
    }

    /// Returns the calendar-day portion of this event time.
    ///
    /// Day-bucketing is done at calendar-day granularity with no timezone
    /// arithmetic, so this is the only date accessor bucketing uses.
    pub fn date(&self) -> NaiveDate {
        match self {
            Self::DateTime(dt) => dt.date_naive(),
            Self::AllDay(date) => *date,
        }
    }
}

impl PartialOrd for EventTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EventTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.to_utc_datetime().cmp(&other.to_utc_datetime())
    }
}

/// A UTC time window for CalDAV time-range queries.
///
/// Represents a closed interval `[start, end]` as CalDAV time-range filters
/// are inclusive on both bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Start of the window (inclusive).
    pub start: DateTime<Utc>,
    /// End of the window (inclusive).
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Creates a new time window.
    ///
    /// # Panics
    ///
    /// Panics if `start` is after `end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        assert!(start <= end, "TimeWindow start must be <= end");
        Self { start, end }
    }

    /// Query window for a displayed month: the month plus one month of
    /// slack on each side, so server-side recurrence expansion that lands
    /// just outside the visible grid is still covered.
    ///
    /// Runs from the first day of the previous month at `00:00:00Z` to the
    /// last day of the next month at `23:59:59Z`.
    pub fn month_window(year: i32, month: u32) -> Self {
        let (py, pm) = if month == 1 { (year - 1, 12) } else { (year, month - 1) };
        let (ny, nm) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };

        let start = Utc
            .with_ymd_and_hms(py, pm, 1, 0, 0, 0)
            .single()
            .expect("valid month start");
        let end = Utc
            .with_ymd_and_hms(ny, nm, last_day_of_month(ny, nm), 23, 59, 59)
            .single()
            .expect("valid month end");
        Self { start, end }
    }

    /// Checks if a datetime falls within this window (inclusive bounds).
    pub fn contains(&self, dt: DateTime<Utc>) -> bool {
        self.start <= dt && dt <= self.end
    }

    /// Formats both bounds in CalDAV time-range format (`YYYYMMDDTHHMMSSZ`).
    pub fn to_caldav_range(&self) -> (String, String) {
        (caldav_timestamp(self.start), caldav_timestamp(self.end))
    }
}

/// Formats a UTC datetime for CalDAV time-range filters (`YYYYMMDDTHHMMSSZ`).
pub fn caldav_timestamp(dt: DateTime<Utc>) -> String {
    dt.format("%Y%m%dT%H%M%SZ").to_string()
}

/// Parses a CalDAV time-range timestamp (`YYYYMMDDTHHMMSSZ`) back to UTC.
pub fn parse_caldav_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let naive = chrono::NaiveDateTime::parse_from_str(s, "%Y%m%dT%H%M%SZ").ok()?;
    Some(naive.and_utc())
}

fn last_day_of_month(year: i32, month: u32) -> u32 {
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .expect("valid month");
    next.pred_opt().expect("valid predecessor").day()
}
