//! Event source resolution and transports.
//!
//! The widget configuration names one of three ways to get events: a
//! published ICS URL, a CalDAV server queried directly, or the same CalDAV
//! server reached through the dashboard's `/api/caldav` proxy. Resolution
//! is pure and flags incomplete configurations before any network request
//! goes out.

use std::time::Duration;

use thiserror::Error;
use tracing::debug;

use startdeck_caldav::{CaldavClient, CaldavConfig, CaldavError, report};
use startdeck_config::{CalendarSource, CalendarWidgetConfig};
use startdeck_core::{CalendarEvent, TimeWindow, parse_ics};
use startdeck_protocol::{ProxyAction, ProxyErrorResponse, ProxyRequest, ReportResponse};

/// A failure the widget turns into a user-visible message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WidgetError {
    /// The configuration is incomplete; no request was made.
    #[error("{0}")]
    Configuration(String),
    /// Fetching or decoding events failed.
    #[error("{0}")]
    Fetch(String),
}

/// What the configuration resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourcePlan {
    /// The widget is switched off.
    Disabled,
    /// Enabled but not usable; carries the message to show.
    Invalid(String),
    /// Ready to fetch.
    Ready(EventSource),
}

/// A concrete way to fetch events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventSource {
    /// Plain GET of a published ICS document.
    Ics { url: String },
    /// `calendar-query` REPORT against the user's CalDAV collection.
    DirectCaldav {
        url: String,
        username: String,
        password: String,
    },
    /// REPORT routed through the dashboard's same-origin proxy.
    ProxyCaldav {
        /// Absolute URL of the `/api/caldav` endpoint.
        endpoint: String,
        url: String,
        username: String,
        password: String,
    },
}

impl EventSource {
    /// Resolves the widget configuration into a fetch plan.
    ///
    /// `proxy_endpoint` is the absolute URL of the dashboard's proxy, used
    /// when the configuration asks for proxied CalDAV access.
    pub fn resolve(config: &CalendarWidgetConfig, proxy_endpoint: &str) -> SourcePlan {
        if !config.enabled {
            return SourcePlan::Disabled;
        }

        match config.source {
            CalendarSource::Ics => {
                if config.ics_url.is_empty() {
                    return SourcePlan::Invalid(
                        "Calendar is enabled but no ICS URL is configured".to_string(),
                    );
                }
                SourcePlan::Ready(EventSource::Ics {
                    url: config.ics_url.clone(),
                })
            }
            CalendarSource::Caldav => {
                let caldav = &config.caldav;
                if caldav.url.is_empty() || caldav.username.is_empty() {
                    return SourcePlan::Invalid(
                        "CalDAV source requires a server URL and username".to_string(),
                    );
                }
                if caldav.use_proxy {
                    SourcePlan::Ready(EventSource::ProxyCaldav {
                        endpoint: proxy_endpoint.to_string(),
                        url: caldav.url.clone(),
                        username: caldav.username.clone(),
                        password: caldav.password.clone(),
                    })
                } else {
                    SourcePlan::Ready(EventSource::DirectCaldav {
                        url: caldav.url.clone(),
                        username: caldav.username.clone(),
                        password: caldav.password.clone(),
                    })
                }
            }
        }
    }

    /// Fetches and parses the events overlapping `window`.
    ///
    /// All three transports run with the same request timeout
    /// ([`CaldavConfig::DEFAULT_TIMEOUT_SECS`]), so a hung upstream cannot
    /// leave the widget loading forever.
    pub async fn fetch(&self, window: &TimeWindow) -> Result<Vec<CalendarEvent>, WidgetError> {
        self.fetch_with_timeout(window, Duration::from_secs(CaldavConfig::DEFAULT_TIMEOUT_SECS))
            .await
    }

    /// Like [`fetch`](Self::fetch), with an explicit request timeout.
    pub async fn fetch_with_timeout(
        &self,
        window: &TimeWindow,
        timeout: Duration,
    ) -> Result<Vec<CalendarEvent>, WidgetError> {
        match self {
            EventSource::Ics { url } => fetch_ics(url, timeout).await,
            EventSource::DirectCaldav {
                url,
                username,
                password,
            } => fetch_direct(url, username, password, window, timeout).await,
            EventSource::ProxyCaldav {
                endpoint,
                url,
                username,
                password,
            } => fetch_via_proxy(endpoint, url, username, password, window, timeout).await,
        }
    }
}

fn http_client(timeout: Duration) -> Result<reqwest::Client, WidgetError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| WidgetError::Fetch(format!("Failed to set up HTTP client: {e}")))
}

async fn fetch_ics(url: &str, timeout: Duration) -> Result<Vec<CalendarEvent>, WidgetError> {
    debug!(url, "fetching ICS document");
    let response = http_client(timeout)?
        .get(url)
        .send()
        .await
        .map_err(|e| WidgetError::Fetch(format!("Failed to fetch calendar: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(WidgetError::Fetch(format!(
            "Calendar fetch failed with status {}",
            status.as_u16()
        )));
    }

    let text = response
        .text()
        .await
        .map_err(|e| WidgetError::Fetch(format!("Failed to read calendar: {e}")))?;
    Ok(parse_ics(&text))
}

async fn fetch_direct(
    url: &str,
    username: &str,
    password: &str,
    window: &TimeWindow,
    timeout: Duration,
) -> Result<Vec<CalendarEvent>, WidgetError> {
    let config = CaldavConfig::new(url)
        .map_err(|e| WidgetError::Configuration(format!("Invalid CalDAV URL: {e}")))?
        .with_credentials(username, password)
        .with_timeout(timeout);
    let client = CaldavClient::new(config)
        .map_err(|e| WidgetError::Fetch(format!("Failed to set up CalDAV client: {e}")))?;

    debug!(url, "running CalDAV report");
    let blocks = report(&client, url, window)
        .await
        .map_err(caldav_error_message)?;

    Ok(parse_blocks(&blocks))
}

async fn fetch_via_proxy(
    endpoint: &str,
    url: &str,
    username: &str,
    password: &str,
    window: &TimeWindow,
    timeout: Duration,
) -> Result<Vec<CalendarEvent>, WidgetError> {
    let (start, end) = window.to_caldav_range();
    let request = ProxyRequest {
        action: ProxyAction::Report,
        url: url.to_string(),
        username: username.to_string(),
        password: password.to_string(),
        start: Some(start),
        end: Some(end),
        debug: false,
    };

    debug!(endpoint, url, "running CalDAV report via proxy");
    let response = http_client(timeout)?
        .post(endpoint)
        .json(&request)
        .send()
        .await
        .map_err(|e| WidgetError::Fetch(format!("Proxy request failed: {e}")))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| WidgetError::Fetch(format!("Failed to read proxy response: {e}")))?;

    if !status.is_success() {
        return Err(WidgetError::Fetch(proxy_error_message(
            status.as_u16(),
            &body,
        )));
    }

    let report: ReportResponse = serde_json::from_str(&body)
        .map_err(|e| WidgetError::Fetch(format!("Unexpected proxy response: {e}")))?;
    Ok(parse_blocks(&report.ics))
}

fn parse_blocks(blocks: &[String]) -> Vec<CalendarEvent> {
    blocks.iter().flat_map(|block| parse_ics(block)).collect()
}

/// Formats a proxy error reply, surfacing auth diagnostics when present.
fn proxy_error_message(status: u16, body: &str) -> String {
    let Ok(reply) = serde_json::from_str::<ProxyErrorResponse>(body) else {
        return format!("Proxy request failed with status {status}");
    };

    let mut message = reply.error;
    if let Some(details) = reply.details {
        if let Some(hint) = details.hint {
            message = format!("{message}. {hint}");
        } else if !details.www_authenticate.is_empty() {
            message = format!(
                "{message}. Server requires authentication ({})",
                details.www_authenticate
            );
        }
    }
    message
}

fn caldav_error_message(err: CaldavError) -> WidgetError {
    let message = match err.diagnostics().and_then(|d| d.hint.clone()) {
        Some(hint) => format!("{err}. {hint}"),
        None => err.to_string(),
    };
    WidgetError::Fetch(message)
}
