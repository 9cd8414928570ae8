use std::sync::Arc;

use reelrec_api::{
    api::{create_router, AppState},
    config::Config,
    services::scheduler::spawn_weekly_batch,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "reelrec_api=info,tower_http=info".into()),
        )
        .init();

    // Load configuration and build application state
    let config = Config::from_env()?;
    let state = AppState::new(&config);

    // Weekly full-batch loop runs for the life of the process
    spawn_weekly_batch(Arc::clone(&state.agent));

    // Create the router with all routes
    let app = create_router(state);

    // Start the server
    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port)).await?;
    tracing::info!(host = %config.host, port = config.port, "Server running");
    axum::serve(listener, app).await?;

    Ok(())
}
