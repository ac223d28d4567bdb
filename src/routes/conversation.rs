// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Routes driving the date-scoped selection conversation.

use crate::error::{AppError, Result};
use crate::services::conversation::Reply;
use crate::services::run_blocking;
use crate::time_utils::parse_query_date;
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// Conversation routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/conversations", post(start_conversation))
        .route("/api/conversations/{id}/messages", post(post_message))
}

#[derive(Deserialize)]
struct StartRequest {
    /// Day to pick an activity from (YYYY-MM-DD)
    date: String,
}

#[derive(Deserialize)]
struct MessageRequest {
    text: String,
}

/// Reply plus the id to continue with (absent once the conversation ended).
#[derive(Serialize)]
pub struct ConversationResponse {
    pub conversation_id: Option<u64>,
    pub reply: Reply,
}

async fn start_conversation(
    State(state): State<Arc<AppState>>,
    Json(body): Json<StartRequest>,
) -> Result<Json<ConversationResponse>> {
    let date = parse_query_date(&body.date)?;

    let store = state.store.clone();
    let activities = run_blocking(move || store.list_by_date(date)).await?;

    // Opportunistic cleanup of abandoned conversations
    let expired = state.conversations.sweep(Instant::now());
    if expired > 0 {
        tracing::debug!(expired, "Dropped timed out conversations");
    }

    let (conversation_id, reply) = state.conversations.open(activities, Instant::now());
    Ok(Json(ConversationResponse {
        conversation_id,
        reply,
    }))
}

async fn post_message(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    Json(body): Json<MessageRequest>,
) -> Result<Json<ConversationResponse>> {
    let conversations = &state.conversations;
    let reply = conversations
        .reply(id, &body.text, Instant::now())
        .ok_or_else(|| AppError::NotFound(format!("Conversation {}", id)))?;

    let open = !matches!(reply, Reply::Ended { .. });
    Ok(Json(ConversationResponse {
        conversation_id: open.then_some(id),
        reply,
    }))
}
