use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cipherbox::config::Config;
use cipherbox::{create_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cipherbox=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting cipherbox...");

    // Load configuration; a missing or malformed encryption key stops here
    let config = Config::load()?;
    tracing::info!("Configuration loaded");

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::build(config).await?;

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
