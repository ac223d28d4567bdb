// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava Power API Server
//!
//! Syncs Strava power streams into a local activity store and serves
//! best-effort queries over HTTP.

use std::sync::Arc;
use strava_power::{config::Config, AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(
        port = config.port,
        data_dir = %config.data_dir.display(),
        "Starting Strava Power API"
    );

    let state = Arc::new(AppState::new(config.clone())?);
    tracing::info!(
        stored = state.store.index().ids.len(),
        "Activity store ready"
    );

    // Build router
    let app = strava_power::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("strava_power=debug,info"));

    tracing_subscriber::registry().with(filter).with(format).init();
}
