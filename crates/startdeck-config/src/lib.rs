//! Per-user dashboard configuration: typed document, validation, and a
//! file-backed store with atomic saves.

pub mod error;
pub mod store;
pub mod types;

pub use error::{ConfigError, ConfigResult};
pub use store::ConfigStore;
pub use types::{
    CONFIG_VERSION, CaldavSettings, CalendarSource, CalendarWidgetConfig, Category, ClockSettings,
    Context, DisplayMode, IframeSettings, Link, PluginSettings, SearchSettings, UserConfig,
    WeatherSettings, WidgetSettings,
};
