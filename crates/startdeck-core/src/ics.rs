//! ICS/iCalendar parsing.
//!
//! A deliberately small subset of RFC 5545: line unfolding, VEVENT
//! delimiters, and the `UID`, `DTSTART`, `DTEND`, `SUMMARY`, `LOCATION`
//! properties. No recurrence expansion and no timezone database; a `TZID`
//! parameter is ignored and the value is read as written.

use chrono::{NaiveDate, NaiveDateTime};
use tracing::trace;

use crate::event::CalendarEvent;
use crate::time::EventTime;

/// Parses ICS text and extracts events.
///
/// Pure and total: malformed input degrades to fewer (or no) events, never
/// an error. Only VEVENTs that reached their `END:VEVENT` with a parseable
/// `DTSTART` are emitted.
pub fn parse_ics(text: &str) -> Vec<CalendarEvent> {
    let mut events = Vec::new();
    let mut in_event = false;
    let mut current: Option<PartialEvent> = None;

    for line in unfold(text) {
        if line.starts_with("BEGIN:VEVENT") {
            // A nested BEGIN restarts the accumulator; the flat state
            // machine does not support nested components.
            in_event = true;
            current = Some(PartialEvent::default());
        } else if line.starts_with("END:VEVENT") {
            if in_event
                && let Some(partial) = current.take()
                && let Some(event) = partial.finish()
            {
                events.push(event);
            }
            in_event = false;
            current = None;
        } else if in_event
            && let Some(ref mut partial) = current
        {
            partial.absorb(&line);
        }
    }

    trace!(count = events.len(), "Parsed ICS events");
    events
}

/// Unfolds ICS physical lines into logical lines.
///
/// A physical line starting with whitespace continues the previous logical
/// line, with the single leading whitespace character stripped. Processed as
/// one left-to-right pass; there is no lookback beyond the line being
/// accumulated.
fn unfold(text: &str) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    for line in text.replace("\r\n", "\n").split('\n') {
        if line.starts_with([' ', '\t']) && !lines.is_empty() {
            let last = lines.last_mut().expect("checked non-empty");
            last.push_str(&line[1..]);
        } else {
            lines.push(line.to_string());
        }
    }
    lines
}

/// Event fields accumulated between BEGIN:VEVENT and END:VEVENT.
#[derive(Debug, Default)]
struct PartialEvent {
    uid: Option<String>,
    start: Option<EventTime>,
    end: Option<EventTime>,
    summary: Option<String>,
    location: Option<String>,
}

impl PartialEvent {
    /// Consumes one logical property line.
    fn absorb(&mut self, line: &str) {
        if line.starts_with("UID") {
            self.uid = property_value(line);
        } else if line.starts_with("DTSTART") {
            self.start = parse_date_value(line);
        } else if line.starts_with("DTEND") {
            self.end = parse_date_value(line);
        } else if line.starts_with("SUMMARY") {
            self.summary = property_value(line);
        } else if line.starts_with("LOCATION") {
            self.location = property_value(line);
        }
    }

    /// Emits the event if a valid start was parsed, otherwise discards.
    fn finish(self) -> Option<CalendarEvent> {
        let start = self.start?;
        Some(CalendarEvent {
            uid: self.uid,
            start,
            end: self.end,
            summary: self.summary,
            location: self.location,
        })
    }
}

/// Extracts the value of a property line: everything after the first `:`.
///
/// `SUMMARY:a:b` yields `a:b`; a line without `:` yields `None`.
fn property_value(line: &str) -> Option<String> {
    line.split_once(':').map(|(_, value)| value.to_string())
}

/// Parses a date property line (`DTSTART...`/`DTEND...`).
///
/// Property parameters before the value colon are ignored, so
/// `DTSTART;TZID=Europe/Paris:...` is treated like `DTSTART:...`.
fn parse_date_value(line: &str) -> Option<EventTime> {
    let raw = property_value(line)?;
    parse_ics_datetime(raw.trim())
}

/// Parses an iCalendar date or date-time value.
///
/// - `YYYYMMDD` is a local calendar date (all-day, no time component)
/// - `YYYYMMDDTHHMMSS[Z]` is a date-time; a trailing `Z` marks UTC, and a
///   value without one is read as UTC-naive
/// - anything else is unparseable and yields `None`
pub fn parse_ics_datetime(raw: &str) -> Option<EventTime> {
    if raw.len() == 8 && raw.bytes().all(|b| b.is_ascii_digit()) {
        let date = NaiveDate::parse_from_str(raw, "%Y%m%d").ok()?;
        return Some(EventTime::from_date(date));
    }

    let stripped = raw.strip_suffix('Z').unwrap_or(raw);
    let dt = NaiveDateTime::parse_from_str(stripped, "%Y%m%dT%H%M%S").ok()?;
    Some(EventTime::from_utc(dt.and_utc()))
}
