// Main entry point - Dependency injection and server setup
mod domain;
mod application;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc};
use anyhow::Context;
use tracing_subscriber::EnvFilter;

use crate::application::data_provider::DataProvider;
use crate::application::incubation_api::IncubationApi;
use crate::infrastructure::config::load_console_config;
use crate::infrastructure::http_api::HttpIncubationApi;
use crate::infrastructure::session_store::open_session_store;
use crate::infrastructure::session_sync::SessionSync;
use crate::presentation::app_state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = load_console_config()?;

    // Session store, shared with every other console on this host unless configured in memory
    let session = open_session_store(&config.session)?;

    // Backend client (infrastructure layer)
    let api: Arc<dyn IncubationApi> = Arc::new(HttpIncubationApi::new(&config.api, session.clone())?);

    // Orchestrator (application layer), settled once on start
    let provider = Arc::new(DataProvider::new(
        api.clone(),
        session.clone(),
        config.dashboard.date_range(),
    ));
    provider.settle().await;
    let _sync = SessionSync::spawn(provider.clone(), session, config.session.poll_interval());

    // Build router (presentation layer)
    let state = Arc::new(AppState::new(provider, api, &config.api.base_url));
    let router = presentation::router(state);

    // Start server
    let addr: SocketAddr = config
        .server
        .bind
        .parse()
        .with_context(|| format!("invalid bind address {}", config.server.bind))?;
    tracing::info!(%addr, "starting incubation-console");

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}
