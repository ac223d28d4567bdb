// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Strava OAuth client ID (public)
    pub strava_client_id: String,
    /// Strava OAuth client secret
    pub strava_client_secret: String,
    /// Directory holding one JSON file per stored activity
    pub data_dir: PathBuf,
    /// Path of the persisted OAuth tokens
    pub token_path: PathBuf,
    /// Server port
    pub port: u16,
    /// Maximum number of remote activities listed per sync
    pub sync_max_activities: usize,
    /// How long a conversation waits for an activity choice
    pub selection_timeout: Duration,
    /// How long a conversation waits for a duration
    pub duration_timeout: Duration,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            strava_client_id: "test_client_id".to_string(),
            strava_client_secret: "test_secret".to_string(),
            data_dir: PathBuf::from("activities/strava_activities"),
            token_path: PathBuf::from("tokens.json"),
            port: 8080,
            sync_max_activities: 1000,
            selection_timeout: Duration::from_secs(30),
            duration_timeout: Duration::from_secs(60),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// A `.env` file in the working directory is loaded first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Ok(Self {
            strava_client_id: env::var("STRAVA_CLIENT_ID")
                .map_err(|_| ConfigError::Missing("STRAVA_CLIENT_ID"))?,
            strava_client_secret: env::var("STRAVA_CLIENT_SECRET")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("STRAVA_CLIENT_SECRET"))?,
            data_dir: env::var("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("activities/strava_activities")),
            token_path: env::var("TOKEN_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("tokens.json")),
            port: parse_or("PORT", 8080)?,
            sync_max_activities: parse_or("SYNC_MAX_ACTIVITIES", 1000)?,
            selection_timeout: Duration::from_secs(parse_or("SELECTION_TIMEOUT_SECS", 30)?),
            duration_timeout: Duration::from_secs(parse_or("DURATION_TIMEOUT_SECS", 60)?),
        })
    }
}

/// Read an optional numeric variable, falling back to `default` when unset.
fn parse_or<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(name)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}
