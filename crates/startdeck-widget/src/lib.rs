//! Calendar widget view-model: resolves the configured event source,
//! fetches events for the displayed month ± 1, and exposes a month grid.

pub mod source;
pub mod widget;

pub use source::{EventSource, SourcePlan, WidgetError};
pub use widget::{CalendarWidget, RefreshTicket, WidgetState};
