// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava API client for listing activities and fetching streams.
//!
//! Handles:
//! - Paged activity listing after a timestamp
//! - Power/time stream download
//! - Token refresh when expired (tokens persisted in a JSON file)
//! - Rate limit detection (reported as `AppError::RateLimited`)

use crate::error::AppError;
use crate::services::sync::{
    ActivitySource, RemoteActivity, StreamSet, POWER_STREAM, TIME_STREAM,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Largest page size Strava accepts for activity listings.
const MAX_PER_PAGE: usize = 200;

/// Margin before token expiration when we proactively refresh (5 minutes).
const TOKEN_REFRESH_MARGIN_SECS: i64 = 5 * 60;

/// Strava API client.
#[derive(Clone)]
pub struct StravaClient {
    http: reqwest::Client,
    base_url: String,
    oauth_url: String,
    client_id: String,
    client_secret: String,
}

impl StravaClient {
    /// Create a new Strava client with OAuth credentials.
    pub fn new(client_id: String, client_secret: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: "https://www.strava.com/api/v3".to_string(),
            oauth_url: "https://www.strava.com/oauth/token".to_string(),
            client_id,
            client_secret,
        }
    }

    /// List activities started after `after` (paginated).
    pub async fn list_activities(
        &self,
        access_token: &str,
        after: i64, // Unix timestamp
        page: u32,
        per_page: u32,
    ) -> Result<Vec<StravaActivitySummary>, AppError> {
        let url = format!("{}/athlete/activities", self.base_url);

        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .query(&[
                ("after", after.to_string()),
                ("page", page.to_string()),
                ("per_page", per_page.to_string()),
            ])
            .send()
            .await
            .map_err(|e| AppError::StravaApi(e.to_string()))?;

        check_response_json(response).await
    }

    /// Fetch streams for an activity, keyed by stream type.
    ///
    /// Strava only returns the requested streams that were recorded.
    pub async fn get_streams(
        &self,
        access_token: &str,
        activity_id: u64,
        keys: &[&str],
    ) -> Result<HashMap<String, StravaStream>, AppError> {
        let url = format!("{}/activities/{}/streams", self.base_url, activity_id);

        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .query(&[("keys", keys.join(",")), ("key_by_type", "true".to_string())])
            .send()
            .await
            .map_err(|e| AppError::StravaApi(e.to_string()))?;

        check_response_json(response).await
    }

    /// Refresh an expired access token.
    pub async fn refresh_token(
        &self,
        refresh_token: &str,
    ) -> Result<TokenRefreshResponse, AppError> {
        let response = self
            .http
            .post(&self.oauth_url)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(|e| AppError::StravaApi(format!("Token refresh request failed: {}", e)))?;

        check_response_json(response).await
    }
}

/// Map an unsuccessful Strava HTTP status to an error.
fn status_error(status: reqwest::StatusCode, body: &str) -> AppError {
    // Rate limit - caller stops and keeps what it has
    if status.as_u16() == 429 {
        tracing::warn!("Strava rate limit hit (429)");
        return AppError::RateLimited;
    }

    // Unauthorized - token may be expired or revoked
    if status.as_u16() == 401 {
        return AppError::StravaApi(AppError::STRAVA_TOKEN_ERROR.to_string());
    }

    AppError::StravaApi(format!("HTTP {}: {}", status, body))
}

/// Check response and parse JSON body.
async fn check_response_json<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
) -> Result<T, AppError> {
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(status_error(status, &body));
    }

    response
        .json()
        .await
        .map_err(|e| AppError::StravaApi(format!("JSON parse error: {}", e)))
}

/// Token refresh response from Strava.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenRefreshResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: i64,
}

/// Summary activity for list endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct StravaActivitySummary {
    pub id: u64,
    pub name: String,
    pub start_date: String,
}

impl From<StravaActivitySummary> for RemoteActivity {
    fn from(summary: StravaActivitySummary) -> Self {
        Self {
            id: summary.id,
            name: summary.name,
            start_date: summary.start_date,
        }
    }
}

/// One stream from the streams endpoint (`key_by_type=true`).
#[derive(Debug, Clone, Deserialize)]
pub struct StravaStream {
    #[serde(default)]
    pub data: Vec<Option<f64>>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Token persistence
// ─────────────────────────────────────────────────────────────────────────────

/// OAuth tokens as persisted on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredTokens {
    pub access_token: String,
    pub refresh_token: String,
    /// Unix timestamp
    pub expires_at: i64,
}

impl StoredTokens {
    fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.expires_at, 0).unwrap_or_default()
    }

    /// True if the access token is expired or about to expire.
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(TOKEN_REFRESH_MARGIN_SECS) >= self.expires_at()
    }
}

/// JSON file holding the OAuth tokens.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn load(&self) -> Result<StoredTokens, AppError> {
        let raw = std::fs::read_to_string(&self.path).map_err(|e| {
            AppError::Internal(anyhow::anyhow!(
                "Token file {} not readable ({}); complete the OAuth flow first",
                self.path.display(),
                e
            ))
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            AppError::Internal(anyhow::anyhow!(
                "Token file {} is malformed: {}",
                self.path.display(),
                e
            ))
        })
    }

    pub fn save(&self, tokens: &StoredTokens) -> Result<(), AppError> {
        let body = serde_json::to_string(tokens)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to encode tokens: {}", e)))?;
        std::fs::write(&self.path, body).map_err(|e| {
            AppError::Internal(anyhow::anyhow!(
                "Failed to write token file {}: {}",
                self.path.display(),
                e
            ))
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// StravaService - High-level service with token management
// ─────────────────────────────────────────────────────────────────────────────

/// Cached access token with expiry information.
#[derive(Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

/// High-level Strava service that manages the token lifecycle and
/// implements [`ActivitySource`].
#[derive(Clone)]
pub struct StravaService {
    client: StravaClient,
    tokens: TokenStore,
    /// In-memory copy of the current access token; the lock also
    /// serializes refreshes.
    cache: Arc<Mutex<Option<CachedToken>>>,
    /// Streams fetched by the last availability check, reused by the
    /// content fetch that follows it.
    last_streams: Arc<Mutex<Option<(u64, HashMap<String, StravaStream>)>>>,
}

impl StravaService {
    pub fn new(client_id: String, client_secret: String, tokens: TokenStore) -> Self {
        Self {
            client: StravaClient::new(client_id, client_secret),
            tokens,
            cache: Arc::new(Mutex::new(None)),
            last_streams: Arc::new(Mutex::new(None)),
        }
    }

    /// Get a valid (non-expired) access token, refreshing if needed.
    pub async fn get_valid_access_token(&self) -> Result<String, AppError> {
        let now = Utc::now();
        let margin = Duration::seconds(TOKEN_REFRESH_MARGIN_SECS);

        let mut cache = self.cache.lock().await;
        if let Some(cached) = cache.as_ref() {
            if now + margin < cached.expires_at {
                return Ok(cached.access_token.clone());
            }
        }

        let mut tokens = self.tokens.load()?;
        if tokens.needs_refresh(now) {
            tracing::info!("Access token expired, refreshing");
            let refreshed = self.client.refresh_token(&tokens.refresh_token).await?;
            tokens = StoredTokens {
                access_token: refreshed.access_token,
                refresh_token: refreshed.refresh_token,
                expires_at: refreshed.expires_at,
            };
            self.tokens.save(&tokens)?;
            tracing::info!("Token refreshed and saved");
        }

        *cache = Some(CachedToken {
            access_token: tokens.access_token.clone(),
            expires_at: tokens.expires_at(),
        });
        Ok(tokens.access_token)
    }

    /// Drop the cached access token if Strava rejected it, so the next
    /// call reloads (and if needed refreshes) the stored tokens.
    async fn forget_rejected_token<T>(
        &self,
        result: Result<T, AppError>,
    ) -> Result<T, AppError> {
        let rejected = matches!(&result, Err(e) if e.is_strava_token_error());
        if rejected {
            tracing::warn!("Strava rejected access token, dropping cached copy");
            *self.cache.lock().await = None;
        }
        result
    }

    async fn streams(
        &self,
        activity_id: u64,
        keys: &[&str],
    ) -> Result<HashMap<String, StravaStream>, AppError> {
        let access_token = self.get_valid_access_token().await?;
        let result = self
            .client
            .get_streams(&access_token, activity_id, keys)
            .await;
        self.forget_rejected_token(result).await
    }

    async fn list_after(
        &self,
        after_ts: i64,
        limit: usize,
    ) -> Result<Vec<RemoteActivity>, AppError> {
        let access_token = self.get_valid_access_token().await?;
        let per_page = limit.clamp(1, MAX_PER_PAGE);

        let mut activities = Vec::new();
        let mut page = 1;
        while activities.len() < limit {
            let batch = self
                .client
                .list_activities(&access_token, after_ts, page, per_page as u32)
                .await?;
            let exhausted = batch.len() < per_page;
            activities.extend(batch.into_iter().map(RemoteActivity::from));
            if exhausted {
                break;
            }
            page += 1;
        }
        activities.truncate(limit);
        Ok(activities)
    }
}

impl ActivitySource for StravaService {
    async fn activities_after(
        &self,
        after: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<RemoteActivity>, AppError> {
        let after_ts = after.timestamp().max(0);
        let result = self.list_after(after_ts, limit).await;
        let activities = self.forget_rejected_token(result).await?;

        tracing::info!(count = activities.len(), after = after_ts, "Listed remote activities");
        Ok(activities)
    }

    async fn available_streams(&self, activity_id: u64) -> Result<Vec<String>, AppError> {
        let streams = self.streams(activity_id, &[POWER_STREAM, TIME_STREAM]).await?;
        let available = streams.keys().cloned().collect();
        *self.last_streams.lock().await = Some((activity_id, streams));
        Ok(available)
    }

    async fn fetch_streams(&self, activity_id: u64, keys: &[&str]) -> Result<StreamSet, AppError> {
        let cached = match self.last_streams.lock().await.take() {
            Some((id, streams)) if id == activity_id => Some(streams),
            _ => None,
        };
        let streams = match cached {
            Some(streams) => streams,
            None => self.streams(activity_id, keys).await?,
        };

        Ok(streams
            .into_iter()
            .filter(|(key, _)| keys.contains(&key.as_str()))
            .map(|(key, stream)| (key, stream.data))
            .collect())
    }
}
