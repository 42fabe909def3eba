// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc};
use tracing_subscriber::EnvFilter;

use crate::application::measurement_source::MeasurementSource;
use crate::infrastructure::config::load_settings;
use crate::infrastructure::influx_repository::InfluxRepository;
use crate::presentation::app_state::AppState;
use crate::presentation::router::router;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let settings = load_settings()?;

    // Create measurement source (infrastructure layer)
    let source: Arc<dyn MeasurementSource> = Arc::new(InfluxRepository::new(&settings.influx)?);
    if let Err(e) = source.health_check().await {
        tracing::warn!(error = %e, host = %settings.influx.host, "InfluxDB not reachable at startup");
    }

    // Create services (application layer)
    let state = Arc::new(AppState::new(source, settings.analytics.clone()));

    // Build router (presentation layer)
    let router = router(state, settings.server.request_timeout());

    // Start server
    let addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.port).parse()?;
    tracing::info!(%addr, "Starting agro-analytics service");

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}
