mod api;
mod config;

use std::sync::Arc;

use anyhow::Context;
use intake_flow::{
    Controller, HttpRecommendationClient, InMemorySessionStorage, SessionRunner, SessionStorage,
};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    api::{AppState, router},
    config::{Config, LogFormat},
};

const DEFAULT_LOG_FILTER: &str = "intake_service=debug,intake_flow=debug,tower_http=debug";

/// `RUST_LOG` overrides the default per-crate levels.
fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Pretty => registry.with(fmt::layer().pretty()).init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_target(true).with_current_span(true))
            .init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing(LogFormat::from_env());

    let config = Config::from_env()?;
    info!(
        recommendation_url = %config.recommendation_url,
        acknowledgement_delay_ms = config.acknowledgement_delay.as_millis() as u64,
        "Loaded configuration"
    );

    let client = Arc::new(HttpRecommendationClient::new(config.recommendation_url.clone()));
    let controller = Arc::new(
        Controller::new(client).with_acknowledgement_delay(config.acknowledgement_delay),
    );

    // Sessions live for the lifetime of the process only
    let session_storage: Arc<dyn SessionStorage> = Arc::new(InMemorySessionStorage::new());

    let app = router(AppState {
        runner: SessionRunner::new(controller, session_storage),
    });

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;

    info!("Server running on http://{}", config.bind_addr);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
