//! CalDAV client configuration.

use std::time::Duration;
use url::Url;

/// Configuration for talking to a CalDAV server.
#[derive(Debug, Clone)]
pub struct CaldavConfig {
    /// Base URL of the CalDAV server (root, principal or calendar
    /// collection; discovery works out which one it is).
    pub url: Url,

    /// Username for Basic authentication. Empty means anonymous.
    pub username: String,

    /// Password for Basic authentication.
    pub password: String,

    /// Request timeout.
    pub timeout: Duration,

    /// User agent string.
    pub user_agent: String,
}

impl CaldavConfig {
    /// Default timeout in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// Creates a new configuration pointing at the given URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn new(url: impl AsRef<str>) -> Result<Self, url::ParseError> {
        let parsed = Url::parse(url.as_ref())?;
        Ok(Self {
            url: parsed,
            username: String::new(),
            password: String::new(),
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            user_agent: format!("startdeck/{}", env!("CARGO_PKG_VERSION")),
        })
    }

    /// Sets the credentials for Basic authentication.
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the user agent string.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Returns the base URL as a string.
    pub fn url_str(&self) -> &str {
        self.url.as_str()
    }

    /// Returns true if a username is configured.
    ///
    /// Requests go out anonymously otherwise; some servers expose public
    /// calendars that way.
    pub fn has_credentials(&self) -> bool {
        !self.username.is_empty()
    }
}
