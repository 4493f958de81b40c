//! Persisted configuration types.
//!
//! These mirror the JSON documents stored per user. Every field carries a
//! serde default so documents written by older versions (or hand-edited
//! ones with fields removed) still deserialize; in particular the CalDAV
//! settings always come back complete, with empty strings standing in for
//! anything absent.

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Schema version stamped into saved documents.
pub const CONFIG_VERSION: u32 = 1;

/// A single bookmarked link.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Link {
    pub name: String,
    pub url: String,
    pub icon: String,
}

/// How a category's links are rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    Icon,
    #[default]
    List,
}

/// A named group of links.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Category {
    pub name: String,
    pub display_mode: DisplayMode,
    pub links: Vec<Link>,
}

/// A switchable dashboard layout (e.g. "work", "home").
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Context {
    pub id: String,
    pub name: String,
    pub categories: Vec<Category>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WeatherSettings {
    pub enabled: bool,
    pub use_celsius: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClockSettings {
    pub enabled: bool,
    pub show_seconds: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct IframeSettings {
    pub enabled: bool,
    pub url: String,
}

/// Where the calendar widget gets its events from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalendarSource {
    /// A published ICS URL, fetched with a plain GET.
    #[default]
    Ics,
    /// A CalDAV server, queried via REPORT.
    Caldav,
}

/// CalDAV connection settings for the calendar widget.
///
/// Always serialized complete; empty strings mean "not configured".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CaldavSettings {
    pub url: String,
    pub username: String,
    pub password: String,
    /// Route requests through the same-origin proxy instead of talking to
    /// the CalDAV server directly from the browser.
    pub use_proxy: bool,
}

/// Calendar widget configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CalendarWidgetConfig {
    pub enabled: bool,
    pub ics_url: String,
    pub source: CalendarSource,
    pub caldav: CaldavSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WidgetSettings {
    pub weather: WeatherSettings,
    pub clock: ClockSettings,
    pub iframe: IframeSettings,
    pub calendar: CalendarWidgetConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchSettings {
    pub enabled: bool,
    pub engine: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PluginSettings {
    pub search: SearchSettings,
}

/// The whole per-user configuration document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UserConfig {
    pub version: u32,
    pub contexts: Vec<Context>,
    pub active_context: String,
    pub theme: String,
    pub grid_columns: u8,
    pub display_mode: DisplayMode,
    pub show_category_borders: bool,
    pub show_search_bar: bool,
    pub widgets: WidgetSettings,
    pub plugins: PluginSettings,
    pub user: String,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self::default_config("")
    }
}

impl UserConfig {
    /// The canonical defaults for a fresh user.
    pub fn default_config(user: impl Into<String>) -> Self {
        Self {
            version: CONFIG_VERSION,
            contexts: vec![Context {
                id: "default".to_string(),
                name: "Default".to_string(),
                categories: vec![
                    Category {
                        name: "Productivity".to_string(),
                        display_mode: DisplayMode::List,
                        links: vec![
                            Link {
                                name: "Mail".to_string(),
                                url: "https://gmail.com".to_string(),
                                icon: "Mail".to_string(),
                            },
                            Link {
                                name: "Calendar".to_string(),
                                url: "https://calendar.google.com".to_string(),
                                icon: "Calendar".to_string(),
                            },
                        ],
                    },
                    Category {
                        name: "Development".to_string(),
                        display_mode: DisplayMode::List,
                        links: vec![
                            Link {
                                name: "GitHub".to_string(),
                                url: "https://github.com".to_string(),
                                icon: "Github".to_string(),
                            },
                            Link {
                                name: "Stack Overflow".to_string(),
                                url: "https://stackoverflow.com".to_string(),
                                icon: "HelpCircle".to_string(),
                            },
                        ],
                    },
                ],
            }],
            active_context: "default".to_string(),
            theme: "light".to_string(),
            grid_columns: 3,
            display_mode: DisplayMode::List,
            show_category_borders: true,
            show_search_bar: true,
            widgets: WidgetSettings::default(),
            plugins: PluginSettings::default(),
            user: user.into(),
        }
    }

    /// Checks the structural invariants a document must hold before it is
    /// persisted.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.user.is_empty() {
            return Err(ConfigError::invalid("user must not be empty"));
        }
        if !(1..=6).contains(&self.grid_columns) {
            return Err(ConfigError::invalid(format!(
                "gridColumns must be 1..=6, got {}",
                self.grid_columns
            )));
        }
        if !self.contexts.iter().any(|c| c.id == self.active_context) {
            return Err(ConfigError::invalid(format!(
                "activeContext '{}' does not exist",
                self.active_context
            )));
        }
        Ok(())
    }
}
