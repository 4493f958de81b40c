//! Wire types for the `/api/caldav` proxy endpoint.
//!
//! The browser widget posts a [`ProxyRequest`] and receives either a
//! [`ReportResponse`], a [`DiscoverResponse`], or a [`ProxyErrorResponse`]
//! whose [`ErrorDetails`] carry enough of the upstream exchange to debug
//! credential and URL problems without server log access. Everything is
//! camelCase on the wire.

use serde::{Deserialize, Serialize};

/// What the proxy should do upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProxyAction {
    /// Enumerate calendar collections.
    Discover,
    /// Fetch events in a time range via `calendar-query` REPORT.
    Report,
}

/// A request to the proxy endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyRequest {
    pub action: ProxyAction,
    /// CalDAV base URL (discover) or calendar collection URL (report).
    pub url: String,
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Range start, `YYYYMMDDTHHMMSSZ`; required for reports.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    /// Range end, same format.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
    /// When set, the proxy logs this exchange verbosely.
    #[serde(default)]
    pub debug: bool,
}

/// Successful report: one ICS document per calendar object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportResponse {
    pub ics: Vec<String>,
}

/// A calendar collection, as the widget sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarRef {
    /// Absolute collection URL.
    pub href: String,
    /// Display name, falling back to the href.
    pub name: String,
}

/// Successful discovery.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoverResponse {
    pub calendars: Vec<CalendarRef>,
    /// The home (or guessed home) URL the listing ran against; useful as a
    /// base when the user wants to type a collection path by hand.
    pub guess_home: String,
}

/// Error reply from the proxy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyErrorResponse {
    /// Short description, e.g. `"REPORT failed 403"`.
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<ErrorDetails>,
}

/// Diagnostics for a failed upstream exchange.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDetails {
    /// Upstream HTTP status.
    pub status: u16,
    /// `WWW-Authenticate` challenge, empty when the server sent none.
    #[serde(default)]
    pub www_authenticate: String,
    /// First few hundred characters of the upstream body.
    #[serde(default)]
    pub body_snippet: String,
    /// Whether the proxy attached an Authorization header upstream.
    #[serde(default)]
    pub auth_header_present: bool,
    /// The username used, so mismatches are visible at a glance.
    #[serde(default)]
    pub username_hint: String,
    /// Likely misconfiguration, when the proxy can tell.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ProxyErrorResponse {
    /// An error reply without upstream diagnostics.
    pub fn message(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    /// An error reply carrying upstream diagnostics.
    pub fn with_details(error: impl Into<String>, details: ErrorDetails) -> Self {
        Self {
            error: error.into(),
            details: Some(details),
        }
    }
}
