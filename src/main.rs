use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use contact_book::{config::Config, create_app, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "contact_book=debug,server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::load();
    tracing::info!(
        "Starting server in {} mode with {:?} storage",
        config.server.environment,
        config.storage
    );

    let addr = format!("{}:{}", config.server.host, config.server.port);

    // Storage, cache and services
    let state = AppState::connect(config).await?;
    let app = create_app(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
