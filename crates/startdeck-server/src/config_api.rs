//! Configuration endpoints.
//!
//! `GET /api/config?user=` returns the stored document (or the defaults
//! when none exists); `PUT` validates and replaces it wholesale. Session
//! handling lives in front of this server; the `user` parameter is trusted
//! here.

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use startdeck_config::{ConfigError, ConfigStore, UserConfig};

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    #[serde(default)]
    user: String,
}

/// `GET /api/config`
pub async fn get_config(State(state): State<AppState>, Query(query): Query<UserQuery>) -> Response {
    let store = match store_for(&state, &query.user) {
        Ok(store) => store,
        Err(response) => return response,
    };

    match store.load() {
        Ok(config) => (StatusCode::OK, Json(config)).into_response(),
        Err(err) => config_error(err),
    }
}

/// `PUT /api/config`
pub async fn put_config(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
    Json(config): Json<UserConfig>,
) -> Response {
    let store = match store_for(&state, &query.user) {
        Ok(store) => store,
        Err(response) => return response,
    };

    match store.save(&config) {
        Ok(()) => (StatusCode::OK, Json(json!({ "success": true }))).into_response(),
        Err(err) => config_error(err),
    }
}

fn store_for(state: &AppState, user: &str) -> Result<ConfigStore, Response> {
    ConfigStore::new(&state.config.data_dir, user).map_err(config_error)
}

fn config_error(err: ConfigError) -> Response {
    let status = match err {
        ConfigError::Invalid(_) | ConfigError::InvalidUser(_) => StatusCode::BAD_REQUEST,
        _ => {
            warn!(error = %err, "config store failure");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (
        status,
        Json(json!({ "success": false, "error": err.to_string() })),
    )
        .into_response()
}
