pub mod api;
pub mod catalog;
pub mod config;
pub mod error;
pub mod models;
pub mod openapi;
pub mod router;
pub mod services;
pub mod state;

use std::sync::Arc;

pub use config::Config;
pub use router::create_router;
pub use state::AppState;

use services::SettingsService;

/// Load settings, wire the services and serve until Ctrl-C.
///
/// The scraper cache is flushed to disk once the server has stopped.
pub async fn run_server(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let settings = SettingsService::new(&config).await?;
    let addr = config.listen_addr;
    let state = AppState::new(config, settings)?;
    let cache = Arc::clone(&state.cache);
    let app = create_router(state);

    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    cache.shutdown();
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {}", e);
        return;
    }
    tracing::info!("Shutdown signal received");
}
