//! Calendar event model.

use serde::{Deserialize, Serialize};

use crate::time::EventTime;

/// A single calendar event instance, as parsed from ICS data.
///
/// `start` is the only mandatory field; the ICS parser drops any VEVENT
/// without a parseable start. Events are immutable once parsed and live only
/// for one fetch/parse cycle in widget state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    /// Event UID, when the VEVENT carried one.
    pub uid: Option<String>,
    /// Event start.
    pub start: EventTime,
    /// Event end. Absent for single-point-in-time events.
    pub end: Option<EventTime>,
    /// Event summary. `Some("")` when the property was present but empty,
    /// `None` when absent.
    pub summary: Option<String>,
    /// Event location, with the same present/absent distinction as `summary`.
    pub location: Option<String>,
}

impl CalendarEvent {
    /// Creates an event with only a start time set.
    pub fn new(start: EventTime) -> Self {
        Self {
            uid: None,
            start,
            end: None,
            summary: None,
            location: None,
        }
    }

    /// The effective end of the event: `end` when present, otherwise `start`.
    pub fn effective_end(&self) -> &EventTime {
        self.end.as_ref().unwrap_or(&self.start)
    }

    /// The summary to display; falls back to a generic label.
    pub fn display_summary(&self) -> &str {
        match self.summary.as_deref() {
            Some(s) if !s.is_empty() => s,
            _ => "Event",
        }
    }
}
