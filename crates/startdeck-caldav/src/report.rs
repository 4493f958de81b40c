//! `calendar-query` REPORT over a time window.
//!
//! Issues a REPORT against a calendar collection and collects the
//! `calendar-data` blocks (one ICS document each) from the multistatus
//! response. Some servers answer an empty multistatus for collections they
//! would happily serve through their `?export` endpoint, so an empty result
//! triggers a single best-effort GET there before giving up.

use tracing::debug;

use startdeck_core::TimeWindow;

use crate::client::CaldavClient;
use crate::error::{CaldavError, CaldavResult, UpstreamDiagnostics};
use crate::xml::{calendar_query_body, extract_all, text_content};

/// Hint attached to 403 diagnostics; the usual cause is a REPORT aimed at a
/// principal or home collection instead of a calendar.
const REPORT_403_HINT: &str = "REPORT must target a specific calendar collection \
    (e.g., …/caldav/calendars/<user>/<calendar>/). Use discovery or set the \
    collection URL.";

/// Fetches the ICS documents for events overlapping `window`.
///
/// Returns one string per `calendar-data` block. A non-2xx REPORT is an
/// upstream error with diagnostics; failures of the export fallback are
/// swallowed and reported as an empty result.
pub async fn report(
    client: &CaldavClient,
    url: &str,
    window: &TimeWindow,
) -> CaldavResult<Vec<String>> {
    let body = calendar_query_body(window);
    let response = client.report(url, &body).await?;

    if !response.is_success() {
        let mut diagnostics =
            UpstreamDiagnostics::new(response.status, response.www_authenticate, &response.body);
        if response.status == 403 {
            diagnostics = diagnostics.with_hint(REPORT_403_HINT);
        }
        return Err(CaldavError::upstream("REPORT", diagnostics));
    }

    let mut blocks: Vec<String> = extract_all(&response.body, "calendar-data")?
        .iter()
        .map(|block| text_content(block))
        .collect();

    if blocks.is_empty() {
        let export = export_url(url);
        debug!(url = %export, "empty REPORT, trying export fallback");
        match client.get(&export).await {
            Ok(res) if res.is_success() && looks_like_ics(&res.body) => {
                blocks = vec![res.body];
            }
            Ok(res) => {
                debug!(status = res.status, "export fallback returned no calendar");
            }
            Err(err) => {
                debug!(error = %err, "export fallback failed");
            }
        }
    }

    Ok(blocks)
}

/// The `?export` URL for a collection; URLs that already carry a query are
/// used as-is.
fn export_url(url: &str) -> String {
    if url.contains('?') {
        url.to_string()
    } else if url.ends_with('/') {
        format!("{url}?export")
    } else {
        format!("{url}/?export")
    }
}

fn looks_like_ics(body: &str) -> bool {
    body.to_ascii_lowercase().contains("begin:vcalendar")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CaldavConfig;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn window() -> TimeWindow {
        use chrono::{TimeZone, Utc};
        TimeWindow::new(
            Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 4, 30, 23, 59, 59).unwrap(),
        )
    }

    async fn client_for(server: &MockServer) -> CaldavClient {
        let config = CaldavConfig::new(server.uri())
            .unwrap()
            .with_credentials("alice", "s3cret");
        CaldavClient::new(config).unwrap()
    }

    #[tokio::test]
    async fn collects_calendar_data_blocks() {
        let server = MockServer::start().await;

        let body = r#"<?xml version="1.0"?>
<d:multistatus xmlns:d="DAV:" xmlns:c="urn:ietf:params:xml:ns:caldav">
  <d:response><d:propstat><d:prop>
    <c:calendar-data>BEGIN:VCALENDAR
BEGIN:VEVENT
SUMMARY:Planning &amp; Review
END:VEVENT
END:VCALENDAR</c:calendar-data>
  </d:prop></d:propstat></d:response>
  <d:response><d:propstat><d:prop>
    <c:calendar-data><![CDATA[BEGIN:VCALENDAR
END:VCALENDAR]]></c:calendar-data>
  </d:prop></d:propstat></d:response>
</d:multistatus>"#;

        Mock::given(method("REPORT"))
            .and(path("/cal/default/"))
            .and(header("Depth", "1"))
            .respond_with(ResponseTemplate::new(207).set_body_string(body))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let url = format!("{}/cal/default/", server.uri());
        let blocks = report(&client, &url, &window()).await.unwrap();

        assert_eq!(blocks.len(), 2);
        assert!(blocks[0].contains("SUMMARY:Planning & Review"));
        assert!(blocks[1].starts_with("BEGIN:VCALENDAR"));
    }

    #[tokio::test]
    async fn empty_report_falls_back_to_export() {
        let server = MockServer::start().await;

        Mock::given(method("REPORT"))
            .respond_with(ResponseTemplate::new(207).set_body_string(
                r#"<d:multistatus xmlns:d="DAV:"></d:multistatus>"#,
            ))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/cal/default/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("BEGIN:VCALENDAR\nEND:VCALENDAR"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let url = format!("{}/cal/default", server.uri());
        let blocks = report(&client, &url, &window()).await.unwrap();

        assert_eq!(blocks.len(), 1);
        assert!(blocks[0].starts_with("BEGIN:VCALENDAR"));

        let requests = server.received_requests().await.unwrap();
        let export = requests
            .iter()
            .find(|r| r.method.as_str() == "GET")
            .unwrap();
        assert_eq!(export.url.query(), Some("export"));
    }

    #[tokio::test]
    async fn failed_export_fallback_yields_empty_result() {
        let server = MockServer::start().await;

        Mock::given(method("REPORT"))
            .respond_with(ResponseTemplate::new(207).set_body_string(
                r#"<d:multistatus xmlns:d="DAV:"></d:multistatus>"#,
            ))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("not here"))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let url = format!("{}/cal/default/", server.uri());
        let blocks = report(&client, &url, &window()).await.unwrap();
        assert!(blocks.is_empty());
    }

    #[tokio::test]
    async fn export_body_without_vcalendar_is_rejected() {
        let server = MockServer::start().await;

        Mock::given(method("REPORT"))
            .respond_with(ResponseTemplate::new(207).set_body_string(
                r#"<d:multistatus xmlns:d="DAV:"></d:multistatus>"#,
            ))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>login page</html>"))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let url = format!("{}/cal/default/", server.uri());
        let blocks = report(&client, &url, &window()).await.unwrap();
        assert!(blocks.is_empty());
    }

    #[tokio::test]
    async fn forbidden_report_carries_collection_hint() {
        let server = MockServer::start().await;

        Mock::given(method("REPORT"))
            .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let url = format!("{}/caldav/", server.uri());
        let err = report(&client, &url, &window()).await.unwrap_err();

        assert!(err.to_string().contains("REPORT failed 403"));
        let diag = err.diagnostics().unwrap();
        assert!(diag.hint.as_deref().unwrap().contains("calendar collection"));
    }

    #[tokio::test]
    async fn unauthorized_report_has_no_hint() {
        let server = MockServer::start().await;

        Mock::given(method("REPORT"))
            .respond_with(ResponseTemplate::new(401).set_body_string("auth"))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let url = format!("{}/caldav/", server.uri());
        let err = report(&client, &url, &window()).await.unwrap_err();
        assert!(err.diagnostics().unwrap().hint.is_none());
    }

    #[test]
    fn export_url_shapes() {
        assert_eq!(export_url("https://h/cal/"), "https://h/cal/?export");
        assert_eq!(export_url("https://h/cal"), "https://h/cal/?export");
        assert_eq!(export_url("https://h/cal?x=1"), "https://h/cal?x=1");
    }
}
