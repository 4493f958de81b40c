//! Day bucketing and month-grid math for the calendar widget.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate, Weekday};

use crate::event::CalendarEvent;

/// Events grouped by the calendar days they span.
pub type DayBuckets = BTreeMap<NaiveDate, Vec<CalendarEvent>>;

/// Buckets events by calendar day.
///
/// A multi-day event appears in every bucket it spans, inclusive on both
/// ends, at calendar-day granularity with no timezone arithmetic. Order
/// within a bucket is input order.
pub fn day_buckets(events: &[CalendarEvent]) -> DayBuckets {
    let mut buckets = DayBuckets::new();
    for event in events {
        let first = event.start.date();
        let last = event.effective_end().date();
        let mut day = first;
        while day <= last {
            buckets.entry(day).or_default().push(event.clone());
            match day.succ_opt() {
                Some(next) => day = next,
                None => break,
            }
        }
    }
    buckets
}

/// Number of cells in the rendered month grid: 6 full weeks.
pub const GRID_CELLS: usize = 42;

/// How many event summaries a cell lists before collapsing to a count.
pub const CELL_EVENT_LIMIT: usize = 2;

/// One cell of the month grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridCell {
    /// The calendar day this cell shows.
    pub date: NaiveDate,
    /// Whether the day belongs to the displayed month (leading/trailing
    /// cells from the adjacent months are rendered dimmed).
    pub in_month: bool,
    /// Up to [`CELL_EVENT_LIMIT`] event summaries for the day.
    pub summaries: Vec<String>,
    /// How many further events the cell does not list (`+N more`).
    pub overflow: usize,
}

/// Render model for one displayed month: a fixed 42-cell (6-week) grid
/// starting on the Sunday on or before the 1st.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthGrid {
    /// Displayed year.
    pub year: i32,
    /// Displayed month (1-12).
    pub month: u32,
    /// Exactly [`GRID_CELLS`] cells, week by week.
    pub cells: Vec<GridCell>,
}

impl MonthGrid {
    /// Builds the grid for a month from day-bucketed events.
    ///
    /// Returns `None` for an invalid year/month pair.
    pub fn build(year: i32, month: u32, buckets: &DayBuckets) -> Option<Self> {
        let month_start = NaiveDate::from_ymd_opt(year, month, 1)?;
        let lead = month_start.weekday().num_days_from_sunday() as u64;
        let first_cell = month_start - chrono::Days::new(lead);

        let mut cells = Vec::with_capacity(GRID_CELLS);
        let mut day = first_cell;
        for _ in 0..GRID_CELLS {
            let day_events = buckets.get(&day).map(Vec::as_slice).unwrap_or(&[]);
            let summaries: Vec<String> = day_events
                .iter()
                .take(CELL_EVENT_LIMIT)
                .map(|e| e.display_summary().to_string())
                .collect();
            cells.push(GridCell {
                date: day,
                in_month: day.month() == month && day.year() == year,
                overflow: day_events.len().saturating_sub(CELL_EVENT_LIMIT),
                summaries,
            });
            day = day.succ_opt()?;
        }

        Some(Self { year, month, cells })
    }

    /// Whether any listed event falls on a day of the displayed month.
    pub fn has_month_events(&self) -> bool {
        self.cells
            .iter()
            .any(|c| c.in_month && (!c.summaries.is_empty() || c.overflow > 0))
    }

    /// The first cell's weekday, fixed by construction.
    pub fn first_weekday(&self) -> Weekday {
        Weekday::Sun
    }
}
