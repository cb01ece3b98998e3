use anyhow::Result;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use context_bridge_api::{core::config::Settings, create_app};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::new()?;

    info!(
        "Starting context bridge on {}:{} (storage: {:?})",
        settings.server.host, settings.server.port, settings.storage.backend
    );

    let app = create_app(&settings).await?;

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("WebSocket endpoint ready on ws://{}/ws", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
