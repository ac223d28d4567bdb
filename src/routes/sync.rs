// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Sync trigger route.

use crate::error::{AppError, Result};
use crate::services::{run_sync, SyncReport};
use crate::AppState;
use axum::{extract::State, routing::post, Json, Router};
use std::sync::Arc;

/// Sync routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/sync", post(trigger_sync))
}

/// Pull new activities from Strava into the local store.
///
/// Only one sync runs at a time; a concurrent request gets 409.
/// Rate limiting is reported in the body, not as an error.
async fn trigger_sync(State(state): State<Arc<AppState>>) -> Result<Json<SyncReport>> {
    let _guard = state
        .sync_lock
        .try_lock()
        .map_err(|_| AppError::Conflict("Sync already in progress".to_string()))?;

    let report = run_sync(
        &state.strava_service,
        &state.store,
        state.config.sync_max_activities,
    )
    .await?;

    Ok(Json(report))
}
