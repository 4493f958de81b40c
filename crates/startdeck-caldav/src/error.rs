//! Error types for CalDAV operations.

use thiserror::Error;

use crate::xml::XmlError;

/// Maximum number of characters of an upstream body kept for diagnostics.
const BODY_SNIPPET_LEN: usize = 300;

/// A specialized Result type for CalDAV operations.
pub type CaldavResult<T> = Result<T, CaldavError>;

/// An error that occurred while talking to a CalDAV server.
#[derive(Debug, Error)]
pub enum CaldavError {
    /// The upstream server answered a required request with a non-2xx
    /// status. Carries enough of the response to debug credential and URL
    /// problems.
    #[error("{operation} failed {status}", status = diagnostics.status)]
    Upstream {
        /// Which request failed (e.g. "PROPFIND 0", "REPORT").
        operation: String,
        /// Response diagnostics for the failure.
        diagnostics: UpstreamDiagnostics,
    },

    /// The request never produced a response (connect, TLS, timeout).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The upstream returned XML the multistatus extractor could not parse.
    ///
    /// Distinct from a well-formed response with zero matches, which is not
    /// an error.
    #[error(transparent)]
    Xml(#[from] XmlError),

    /// A URL could not be parsed or resolved.
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl CaldavError {
    /// Creates an upstream error from a response.
    pub fn upstream(operation: impl Into<String>, diagnostics: UpstreamDiagnostics) -> Self {
        Self::Upstream {
            operation: operation.into(),
            diagnostics,
        }
    }

    /// Returns the upstream diagnostics, when this is an upstream failure.
    pub fn diagnostics(&self) -> Option<&UpstreamDiagnostics> {
        match self {
            Self::Upstream { diagnostics, .. } => Some(diagnostics),
            _ => None,
        }
    }
}

/// What we keep from a failed upstream response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamDiagnostics {
    /// HTTP status code.
    pub status: u16,
    /// The `WWW-Authenticate` header value, if the server sent one.
    pub www_authenticate: Option<String>,
    /// The first few hundred characters of the response body.
    pub body_snippet: String,
    /// Optional human hint about the likely misconfiguration.
    pub hint: Option<String>,
}

impl UpstreamDiagnostics {
    /// Builds diagnostics from a status, optional auth challenge and body.
    pub fn new(status: u16, www_authenticate: Option<String>, body: &str) -> Self {
        Self {
            status,
            www_authenticate,
            body_snippet: snippet(body),
            hint: None,
        }
    }

    /// Attaches a hint.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Truncates a body to a diagnostic snippet on a char boundary.
fn snippet(body: &str) -> String {
    let mut end = body.len().min(BODY_SNIPPET_LEN);
    while end < body.len() && !body.is_char_boundary(end) {
        end += 1;
    }
    body[..end].to_string()
}
