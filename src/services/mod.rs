// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Business logic services.

pub mod conversation;
pub mod power;
pub mod ranking;
pub mod strava;
pub mod sync;

pub use conversation::{ConversationStore, Timeouts};
pub use power::WindowLength;
pub use strava::{StravaService, TokenStore};
pub use sync::{run_sync, ActivitySource, SyncReport};

use crate::error::{AppError, Result};

/// Run store scans and analysis off the async worker threads.
pub(crate) async fn run_blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Blocking task failed: {}", e)))
}
