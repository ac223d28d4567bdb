// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Power analysis query routes.

use crate::error::{AppError, Result};
use crate::models::{ActivityPower, ActivitySummary, PowerEffort};
use crate::services::power::{analyze_activity, WindowLength};
use crate::services::ranking::top_n;
use crate::services::run_blocking;
use crate::time_utils::parse_query_date;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

/// Analysis routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/power/top", get(get_top_efforts))
        .route("/api/activities", get(get_activities_on))
        .route("/api/activities/{id}/power", get(get_activity_power))
}

// ─── Ranking ─────────────────────────────────────────────────

#[derive(Deserialize)]
struct TopQuery {
    /// Window length in seconds
    seconds: i64,
    /// Number of efforts to return
    #[serde(default = "default_top_n")]
    n: usize,
}

fn default_top_n() -> usize {
    5
}

/// Best efforts across every stored activity.
async fn get_top_efforts(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TopQuery>,
) -> Result<Json<Vec<PowerEffort>>> {
    let window = WindowLength::new(params.seconds)?;
    tracing::debug!(window_seconds = window.get(), n = params.n, "Ranking efforts");

    let store = state.store.clone();
    let efforts = run_blocking(move || top_n(&store.all(), window, params.n)).await?;
    Ok(Json(efforts))
}

// ─── Date listing ────────────────────────────────────────────

#[derive(Deserialize)]
struct DateQuery {
    /// Day to list (YYYY-MM-DD)
    date: String,
}

/// Activities stored for one day, ordered by start time.
async fn get_activities_on(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DateQuery>,
) -> Result<Json<Vec<ActivitySummary>>> {
    let date = parse_query_date(&params.date)?;

    let store = state.store.clone();
    let mut records = run_blocking(move || store.list_by_date(date)).await?;
    records.sort_by_key(|r| r.start_time());

    Ok(Json(records.iter().filter_map(|r| r.summary()).collect()))
}

// ─── Single activity ─────────────────────────────────────────

#[derive(Deserialize)]
struct WindowQuery {
    seconds: i64,
}

/// Best rolling average for one stored activity.
async fn get_activity_power(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    Query(params): Query<WindowQuery>,
) -> Result<Json<ActivityPower>> {
    let window = WindowLength::new(params.seconds)?;

    let store = state.store.clone();
    let record = run_blocking(move || store.get(id))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Activity {}", id)))?;

    Ok(Json(analyze_activity(&record, window)))
}
