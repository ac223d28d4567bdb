// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava power bests: sync power streams from Strava into a local store
//! and rank the best rolling-average efforts.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::ActivityStore;
use services::{ConversationStore, StravaService};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub store: ActivityStore,
    pub strava_service: StravaService,
    pub conversations: ConversationStore,
    /// Held for the duration of a sync; the store supports one writer.
    pub sync_lock: tokio::sync::Mutex<()>,
}

impl AppState {
    /// Build the shared state from configuration.
    pub fn new(config: Config) -> error::Result<Self> {
        let store = ActivityStore::open(&config.data_dir)?;
        let strava_service = StravaService::new(
            config.strava_client_id.clone(),
            config.strava_client_secret.clone(),
            services::TokenStore::new(&config.token_path),
        );
        let conversations = ConversationStore::new(services::Timeouts {
            selection: config.selection_timeout,
            duration: config.duration_timeout,
        });

        Ok(Self {
            config,
            store,
            strava_service,
            conversations,
            sync_lock: tokio::sync::Mutex::new(()),
        })
    }
}
