//! Calendar widget state machine.
//!
//! The widget loads events for the displayed month plus one month on each
//! side, so paging to an adjacent month renders instantly. Refreshes are
//! stamped with a generation token; when the configuration or the month
//! changes while a fetch is in flight, the stale completion is dropped
//! instead of overwriting the newer state.

use tracing::debug;

use startdeck_config::CalendarWidgetConfig;
use startdeck_core::{CalendarEvent, MonthGrid, TimeWindow, day_buckets};

use crate::source::{EventSource, SourcePlan, WidgetError};

/// Where the widget is in its load cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WidgetState {
    /// Switched off in the configuration.
    Disabled,
    /// A fetch is in flight.
    Loading,
    /// The last refresh failed; carries the message to show.
    Error(String),
    /// Events for the current window.
    Loaded(Vec<CalendarEvent>),
}

/// A refresh in flight: pass `token` back to [`CalendarWidget::complete`].
#[derive(Debug, Clone)]
pub struct RefreshTicket {
    pub token: u64,
    pub source: EventSource,
    pub window: TimeWindow,
}

/// View-model for the month calendar.
#[derive(Debug)]
pub struct CalendarWidget {
    config: CalendarWidgetConfig,
    proxy_endpoint: String,
    state: WidgetState,
    generation: u64,
}

impl CalendarWidget {
    /// Creates a widget; `proxy_endpoint` is the absolute URL of the
    /// dashboard's `/api/caldav` endpoint.
    pub fn new(config: CalendarWidgetConfig, proxy_endpoint: impl Into<String>) -> Self {
        let state = if config.enabled {
            WidgetState::Loading
        } else {
            WidgetState::Disabled
        };
        Self {
            config,
            proxy_endpoint: proxy_endpoint.into(),
            state,
            generation: 0,
        }
    }

    /// The current state.
    pub fn state(&self) -> &WidgetState {
        &self.state
    }

    /// Replaces the configuration. Any in-flight refresh becomes stale and
    /// the widget drops back to Loading (or Disabled/Error) until the next
    /// refresh completes.
    pub fn set_config(&mut self, config: CalendarWidgetConfig) {
        if config == self.config {
            return;
        }
        self.config = config;
        self.generation += 1;
        self.state = match EventSource::resolve(&self.config, &self.proxy_endpoint) {
            SourcePlan::Disabled => WidgetState::Disabled,
            SourcePlan::Invalid(message) => WidgetState::Error(message),
            SourcePlan::Ready(_) => WidgetState::Loading,
        };
    }

    /// Starts a refresh for the month `(year, month)`.
    ///
    /// Returns the ticket to fetch with, or `None` when there is nothing to
    /// fetch (disabled, or the configuration error is already on display).
    pub fn begin_refresh(&mut self, year: i32, month: u32) -> Option<RefreshTicket> {
        self.generation += 1;
        match EventSource::resolve(&self.config, &self.proxy_endpoint) {
            SourcePlan::Disabled => {
                self.state = WidgetState::Disabled;
                None
            }
            SourcePlan::Invalid(message) => {
                debug!(message, "calendar widget misconfigured");
                self.state = WidgetState::Error(message);
                None
            }
            SourcePlan::Ready(source) => {
                self.state = WidgetState::Loading;
                Some(RefreshTicket {
                    token: self.generation,
                    source,
                    window: TimeWindow::month_window(year, month),
                })
            }
        }
    }

    /// Applies a fetch result. Completions whose token is stale are
    /// dropped; returns whether the state changed.
    pub fn complete(
        &mut self,
        token: u64,
        result: Result<Vec<CalendarEvent>, WidgetError>,
    ) -> bool {
        if token != self.generation {
            debug!(token, current = self.generation, "dropping stale refresh");
            return false;
        }
        self.state = match result {
            Ok(events) => WidgetState::Loaded(events),
            Err(err) => WidgetState::Error(err.to_string()),
        };
        true
    }

    /// Begins a refresh, runs the fetch, and applies the result.
    pub async fn refresh(&mut self, year: i32, month: u32) {
        let Some(ticket) = self.begin_refresh(year, month) else {
            return;
        };
        let result = ticket.source.fetch(&ticket.window).await;
        self.complete(ticket.token, result);
    }

    /// The month grid for `(year, month)`, when events are loaded.
    pub fn view(&self, year: i32, month: u32) -> Option<MonthGrid> {
        match &self.state {
            WidgetState::Loaded(events) => {
                let buckets = day_buckets(events);
                MonthGrid::build(year, month, &buckets)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use startdeck_config::{CaldavSettings, CalendarSource};
    use startdeck_core::EventTime;

    const PROXY: &str = "http://localhost:3000/api/caldav";

    fn ics_config(url: &str) -> CalendarWidgetConfig {
        CalendarWidgetConfig {
            enabled: true,
            ics_url: url.to_string(),
            ..Default::default()
        }
    }

    fn event(day: u32, summary: &str) -> CalendarEvent {
        CalendarEvent {
            uid: None,
            start: EventTime::from_utc(Utc.with_ymd_and_hms(2024, 3, day, 10, 0, 0).unwrap()),
            end: None,
            summary: Some(summary.to_string()),
            location: None,
        }
    }

    #[test]
    fn disabled_config_yields_disabled_state() {
        let mut widget = CalendarWidget::new(CalendarWidgetConfig::default(), PROXY);
        assert_eq!(widget.state(), &WidgetState::Disabled);
        assert!(widget.begin_refresh(2024, 3).is_none());
        assert_eq!(widget.state(), &WidgetState::Disabled);
    }

    #[test]
    fn misconfigured_source_errors_without_ticket() {
        let mut widget = CalendarWidget::new(ics_config(""), PROXY);
        assert!(widget.begin_refresh(2024, 3).is_none());
        match widget.state() {
            WidgetState::Error(message) => assert!(message.contains("ICS URL")),
            other => panic!("expected Error, got {other:?}"),
        }
    }

    #[test]
    fn refresh_window_spans_adjacent_months() {
        let mut widget = CalendarWidget::new(ics_config("https://x/cal.ics"), PROXY);
        let ticket = widget.begin_refresh(2024, 3).unwrap();
        assert_eq!(
            ticket.window.start,
            Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(
            ticket.window.end,
            Utc.with_ymd_and_hms(2024, 4, 30, 23, 59, 59).unwrap()
        );
        assert_eq!(widget.state(), &WidgetState::Loading);
    }

    #[test]
    fn stale_completion_does_not_overwrite_newer_state() {
        let mut widget = CalendarWidget::new(ics_config("https://x/cal.ics"), PROXY);

        let old = widget.begin_refresh(2024, 3).unwrap();
        let new = widget.begin_refresh(2024, 4).unwrap();
        assert!(old.token != new.token);

        assert!(widget.complete(new.token, Ok(vec![event(15, "April refresh")])));
        assert!(!widget.complete(old.token, Ok(vec![event(1, "stale March")])));

        match widget.state() {
            WidgetState::Loaded(events) => {
                assert_eq!(events.len(), 1);
                assert_eq!(events[0].summary.as_deref(), Some("April refresh"));
            }
            other => panic!("expected Loaded, got {other:?}"),
        }
    }

    #[test]
    fn config_change_invalidates_inflight_refresh() {
        let mut widget = CalendarWidget::new(ics_config("https://x/cal.ics"), PROXY);
        let ticket = widget.begin_refresh(2024, 3).unwrap();

        widget.set_config(ics_config("https://x/other.ics"));
        assert_eq!(widget.state(), &WidgetState::Loading);
        assert!(!widget.complete(ticket.token, Ok(vec![event(1, "from old url")])));
        assert_eq!(widget.state(), &WidgetState::Loading);
    }

    #[test]
    fn identical_config_does_not_invalidate() {
        let mut widget = CalendarWidget::new(ics_config("https://x/cal.ics"), PROXY);
        let ticket = widget.begin_refresh(2024, 3).unwrap();

        widget.set_config(ics_config("https://x/cal.ics"));
        assert!(widget.complete(ticket.token, Ok(vec![event(15, "kept")])));
    }

    #[test]
    fn switching_to_caldav_without_credentials_shows_config_error() {
        let mut widget = CalendarWidget::new(ics_config("https://x/cal.ics"), PROXY);
        widget.set_config(CalendarWidgetConfig {
            enabled: true,
            source: CalendarSource::Caldav,
            caldav: CaldavSettings::default(),
            ..Default::default()
        });
        match widget.state() {
            WidgetState::Error(message) => assert!(message.contains("username")),
            other => panic!("expected Error, got {other:?}"),
        }
    }

    #[test]
    fn failed_fetch_surfaces_message() {
        let mut widget = CalendarWidget::new(ics_config("https://x/cal.ics"), PROXY);
        let ticket = widget.begin_refresh(2024, 3).unwrap();
        widget.complete(
            ticket.token,
            Err(WidgetError::Fetch("Calendar fetch failed with status 404".to_string())),
        );
        assert_eq!(
            widget.state(),
            &WidgetState::Error("Calendar fetch failed with status 404".to_string())
        );
    }

    #[test]
    fn view_builds_month_grid_from_loaded_events() {
        let mut widget = CalendarWidget::new(ics_config("https://x/cal.ics"), PROXY);
        let ticket = widget.begin_refresh(2024, 3).unwrap();
        widget.complete(ticket.token, Ok(vec![event(15, "Standup")]));

        let grid = widget.view(2024, 3).unwrap();
        let cell = grid
            .cells
            .iter()
            .find(|c| c.date == NaiveDate::from_ymd_opt(2024, 3, 15).unwrap())
            .unwrap();
        assert_eq!(cell.summaries, vec!["Standup"]);

        // Back in Loading there is nothing to render.
        let _ticket = widget.begin_refresh(2024, 5).unwrap();
        assert!(widget.view(2024, 5).is_none());
    }
}
