//! HTTP client for CalDAV operations.
//!
//! Thin wrapper over reqwest that knows the WebDAV verbs (`PROPFIND`,
//! `REPORT`) and sends preemptive Basic authentication. Responses are
//! returned with their status intact rather than mapped to errors here:
//! discovery treats some failures as fallbacks, and the proxy wants the
//! raw status and `WWW-Authenticate` challenge for its diagnostics.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::{Client, Method};
use tracing::{debug, trace};

use crate::config::CaldavConfig;
use crate::error::{CaldavError, CaldavResult, UpstreamDiagnostics};

/// An upstream response with the pieces CalDAV callers care about.
#[derive(Debug, Clone)]
pub struct DavResponse {
    /// HTTP status code.
    pub status: u16,
    /// The `WWW-Authenticate` header, if the server sent one.
    pub www_authenticate: Option<String>,
    /// The response body.
    pub body: String,
}

impl DavResponse {
    /// Returns true for 2xx statuses (200 OK, 207 Multi-Status, ...).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Converts this response into an upstream error for `operation`.
    pub fn into_error(self, operation: impl Into<String>) -> CaldavError {
        CaldavError::upstream(
            operation,
            UpstreamDiagnostics::new(self.status, self.www_authenticate, &self.body),
        )
    }
}

/// HTTP client for CalDAV operations.
pub struct CaldavClient {
    /// The underlying HTTP client.
    client: Client,
    /// Configuration.
    config: CaldavConfig,
}

impl CaldavClient {
    /// Creates a new client with the given configuration.
    pub fn new(config: CaldavConfig) -> CaldavResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self { client, config })
    }

    /// Performs a PROPFIND request with the given `Depth`.
    pub async fn propfind(&self, url: &str, body: &str, depth: u8) -> CaldavResult<DavResponse> {
        self.request(dav_method("PROPFIND"), url, Some(body), Some(depth))
            .await
    }

    /// Performs a REPORT request (Depth 1).
    pub async fn report(&self, url: &str, body: &str) -> CaldavResult<DavResponse> {
        self.request(dav_method("REPORT"), url, Some(body), Some(1))
            .await
    }

    /// Performs a GET request.
    pub async fn get(&self, url: &str) -> CaldavResult<DavResponse> {
        self.request(Method::GET, url, None, None).await
    }

    /// Sends a request and collects the response.
    async fn request(
        &self,
        method: Method,
        url: &str,
        body: Option<&str>,
        depth: Option<u8>,
    ) -> CaldavResult<DavResponse> {
        let mut request = self.client.request(method.clone(), url);

        if body.is_some() {
            request = request.header("Content-Type", "application/xml; charset=utf-8");
        }
        if let Some(d) = depth {
            request = request.header("Depth", d.to_string());
        }
        if self.config.has_credentials() {
            request = request.header("Authorization", self.authorization_header());
        }
        if let Some(b) = body {
            request = request.body(b.to_string());
        }

        trace!(method = %method, url = %url, "sending request");
        let response = request.send().await?;

        let status = response.status().as_u16();
        let www_authenticate = response
            .headers()
            .get("www-authenticate")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let body = response.text().await?;

        debug!(method = %method, url = %url, status, "received response");

        Ok(DavResponse {
            status,
            www_authenticate,
            body,
        })
    }

    /// Preemptive Basic authentication header.
    fn authorization_header(&self) -> String {
        let credentials = format!("{}:{}", self.config.username, self.config.password);
        format!("Basic {}", BASE64.encode(credentials))
    }

    /// Returns the base URL from the configuration.
    pub fn base_url(&self) -> &str {
        self.config.url_str()
    }

    /// Returns the configuration.
    pub fn config(&self) -> &CaldavConfig {
        &self.config
    }
}

/// WebDAV extension methods are not predefined constants in `http`.
fn dav_method(name: &'static str) -> Method {
    Method::from_bytes(name.as_bytes()).expect("valid WebDAV method name")
}
