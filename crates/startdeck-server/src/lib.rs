//! HTTP server wiring: routes, state and configuration.

pub mod config;
pub mod config_api;
pub mod proxy;
pub mod state;

use axum::Router;
use axum::routing::{get, post};

pub use config::{ENV_BIND, ENV_DATA_DIR, ServerConfig, ServerConfigError};
pub use state::AppState;

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/caldav", post(proxy::caldav_proxy))
        .route(
            "/api/config",
            get(config_api::get_config).put(config_api::put_config),
        )
        .with_state(state)
}
