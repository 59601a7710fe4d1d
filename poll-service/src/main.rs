use std::net::SocketAddr;

use poll_service::{build_router, config::Config, state::AppState};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting poll service");

    let config = Config::from_env()?;
    info!(
        "Storage backend: {}, anonymous voting: {}",
        config.storage, config.anonymous_voting
    );
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    let state = AppState::from_config(config).await?;
    let app = build_router(state)?;

    info!("Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}
