//! Core types: calendar events, ICS parsing, day buckets, month grid, tracing

pub mod buckets;
pub mod event;
pub mod ics;
pub mod time;
pub mod tracing;

pub use buckets::{CELL_EVENT_LIMIT, DayBuckets, GRID_CELLS, GridCell, MonthGrid, day_buckets};
pub use event::CalendarEvent;
pub use ics::{parse_ics, parse_ics_datetime};
pub use time::{EventTime, TimeWindow, caldav_timestamp, parse_caldav_timestamp};
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
