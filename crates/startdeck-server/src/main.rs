//! startdeck server binary.

use tower_http::trace::TraceLayer;
use tracing::info;

use startdeck_core::{TracingConfig, init_tracing};
use startdeck_server::{AppState, ServerConfig, router};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing(TracingConfig::server())?;

    let config = ServerConfig::from_env()?;
    let bind_addr = config.bind_addr;
    let app = router(AppState::new(config)).layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!(addr = %bind_addr, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}
