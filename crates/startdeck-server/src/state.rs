//! Shared application state.

use std::sync::Arc;

use crate::config::ServerConfig;

/// State handed to every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// Wraps a server configuration for sharing.
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}
