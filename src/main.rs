use anyhow::Context;

use starter_api_rust::app::{router, AppState};
use starter_api_rust::config::AppConfig;
use starter_api_rust::logging::init_tracing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, IDENTITY_*, etc.
    let _ = dotenvy::dotenv();

    let config = AppConfig::from_env();
    init_tracing(if config.is_development() {
        "starter_api_rust=debug,tower_http=debug"
    } else {
        "starter_api_rust=info,tower_http=info"
    });
    config.validate()?;

    tracing::info!("Starting {} in {:?} mode", config.site.name, config.environment);

    let bind_addr = config.bind_addr();
    let state = AppState::from_config(config).await?;
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("Shutdown signal received");
}
