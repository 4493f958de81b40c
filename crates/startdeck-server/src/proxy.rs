//! The same-origin CalDAV proxy endpoint.
//!
//! Browsers cannot talk to arbitrary CalDAV servers directly (CORS, and the
//! credentials would leak into frontend request logs), so the widget posts
//! here and the server does the upstream exchange. The endpoint is
//! stateless: every request carries the upstream URL and credentials and
//! gets its own client.
//!
//! The request body is inspected field by field rather than through a
//! strict deserializer so that a malformed `action` still yields the
//! documented `Invalid action` reply instead of a generic parse error.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::Value;
use tracing::{debug, info, warn};

use startdeck_caldav::{CaldavClient, CaldavConfig, CaldavError, discover, report};
use startdeck_core::{TimeWindow, parse_caldav_timestamp};
use startdeck_protocol::{
    CalendarRef, DiscoverResponse, ErrorDetails, ProxyErrorResponse, ReportResponse,
};

use crate::state::AppState;

/// `POST /api/caldav`
pub async fn caldav_proxy(State(state): State<AppState>, Json(body): Json<Value>) -> Response {
    let url = str_field(&body, "url");
    let username = str_field(&body, "username");
    if url.is_empty() || username.is_empty() {
        return plain_error(StatusCode::BAD_REQUEST, "Missing url or username");
    }
    let password = str_field(&body, "password");

    let config = match CaldavConfig::new(&url) {
        Ok(config) => config
            .with_credentials(&username, &password)
            .with_timeout(state.config.upstream_timeout),
        Err(err) => {
            return plain_error(StatusCode::INTERNAL_SERVER_ERROR, err.to_string());
        }
    };
    let client = match CaldavClient::new(config) {
        Ok(client) => client,
        Err(err) => {
            warn!(error = %err, "failed to build upstream client");
            return plain_error(StatusCode::INTERNAL_SERVER_ERROR, err.to_string());
        }
    };

    // The request's debug flag lifts the per-exchange logging to info so a
    // single widget request can be traced without reconfiguring the server.
    let verbose = body.get("debug").and_then(Value::as_bool).unwrap_or(false);

    match body.get("action").and_then(Value::as_str) {
        Some("report") => run_report(&client, &body, &url, &username, verbose).await,
        Some("discover") => run_discover(&client, &username, verbose).await,
        _ => plain_error(StatusCode::BAD_REQUEST, "Invalid action"),
    }
}

async fn run_report(
    client: &CaldavClient,
    body: &Value,
    url: &str,
    username: &str,
    verbose: bool,
) -> Response {
    let start = parse_caldav_timestamp(&str_field(body, "start"));
    let end = parse_caldav_timestamp(&str_field(body, "end"));
    let window = match (start, end) {
        (Some(start), Some(end)) if start <= end => TimeWindow::new(start, end),
        _ => return plain_error(StatusCode::BAD_REQUEST, "Invalid start or end"),
    };

    if verbose {
        info!(url, start = %window.start, end = %window.end, "proxying REPORT");
    } else {
        debug!(url, start = %window.start, end = %window.end, "proxying REPORT");
    }
    match report(client, url, &window).await {
        Ok(ics) => {
            if verbose {
                info!(url, documents = ics.len(), "REPORT succeeded");
            }
            (StatusCode::OK, Json(ReportResponse { ics })).into_response()
        }
        Err(err) => upstream_error(err, username),
    }
}

async fn run_discover(client: &CaldavClient, username: &str, verbose: bool) -> Response {
    if verbose {
        info!(url = client.base_url(), "proxying discovery");
    } else {
        debug!(url = client.base_url(), "proxying discovery");
    }
    match discover(client).await {
        Ok(discovery) => {
            let guess_home = discovery
                .guessed_home
                .map(|u| u.to_string())
                .unwrap_or_else(|| discovery.home_url.to_string());
            let calendars = discovery
                .calendars
                .into_iter()
                .map(|c| CalendarRef {
                    href: c.href,
                    name: c.name,
                })
                .collect();
            (
                StatusCode::OK,
                Json(DiscoverResponse {
                    calendars,
                    guess_home,
                }),
            )
                .into_response()
        }
        Err(err) => upstream_error(err, username),
    }
}

/// Maps a CalDAV failure onto the wire: upstream refusals become 502 with
/// diagnostics, everything else a bare 500.
fn upstream_error(err: CaldavError, username: &str) -> Response {
    match err {
        CaldavError::Upstream {
            operation,
            diagnostics,
        } => {
            let message = format!("{operation} failed {}", diagnostics.status);
            let details = ErrorDetails {
                status: diagnostics.status,
                www_authenticate: diagnostics.www_authenticate.unwrap_or_default(),
                body_snippet: diagnostics.body_snippet,
                auth_header_present: !username.is_empty(),
                username_hint: username.to_string(),
                hint: diagnostics.hint,
            };
            warn!(error = %message, status = details.status, "upstream CalDAV failure");
            (
                StatusCode::BAD_GATEWAY,
                Json(ProxyErrorResponse::with_details(message, details)),
            )
                .into_response()
        }
        other => {
            warn!(error = %other, "CalDAV proxy failure");
            plain_error(StatusCode::INTERNAL_SERVER_ERROR, other.to_string())
        }
    }
}

fn plain_error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ProxyErrorResponse::message(message))).into_response()
}

fn str_field(body: &Value, name: &str) -> String {
    body.get(name)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}
