//! Server configuration.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Environment variable naming the bind address.
pub const ENV_BIND: &str = "STARTDECK_BIND";
/// Environment variable naming the data directory.
pub const ENV_DATA_DIR: &str = "STARTDECK_DATA_DIR";

/// Failed to assemble a server configuration.
#[derive(Debug, Error)]
pub enum ServerConfigError {
    #[error("invalid {name}: {value:?}")]
    InvalidEnv { name: &'static str, value: String },
}

/// Configuration for the HTTP server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to.
    pub bind_addr: SocketAddr,
    /// Directory holding the per-user config documents.
    pub data_dir: PathBuf,
    /// Timeout for upstream CalDAV requests made by the proxy.
    pub upstream_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            data_dir: PathBuf::from("./data"),
            upstream_timeout: Duration::from_secs(30),
        }
    }
}

impl ServerConfig {
    /// Builds a configuration from the environment, falling back to the
    /// defaults for anything unset.
    pub fn from_env() -> Result<Self, ServerConfigError> {
        let mut config = Self::default();

        if let Ok(bind) = std::env::var(ENV_BIND) {
            config.bind_addr = bind.parse().map_err(|_| ServerConfigError::InvalidEnv {
                name: ENV_BIND,
                value: bind,
            })?;
        }
        if let Ok(dir) = std::env::var(ENV_DATA_DIR) {
            config.data_dir = PathBuf::from(dir);
        }

        Ok(config)
    }

    /// Sets the bind address.
    pub fn with_bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Sets the data directory.
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    /// Sets the upstream timeout.
    pub fn with_upstream_timeout(mut self, timeout: Duration) -> Self {
        self.upstream_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr.port(), 3000);
        assert_eq!(config.upstream_timeout, Duration::from_secs(30));
    }

    #[test]
    fn builder_methods() {
        let config = ServerConfig::default()
            .with_bind_addr(SocketAddr::from(([0, 0, 0, 0], 8080)))
            .with_data_dir("/var/lib/startdeck")
            .with_upstream_timeout(Duration::from_secs(5));

        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/startdeck"));
        assert_eq!(config.upstream_timeout, Duration::from_secs(5));
    }
}
