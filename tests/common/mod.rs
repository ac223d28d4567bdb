// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use strava_power::config::Config;
use strava_power::error::AppError;
use strava_power::models::ActivityRecord;
use strava_power::routes::create_router;
use strava_power::services::sync::{ActivitySource, RemoteActivity, StreamSet};
use strava_power::time_utils::parse_start_date;
use strava_power::AppState;

/// Build a record with one-second time markers.
#[allow(dead_code)]
pub fn record(id: u64, start_date: &str, power: &[Option<f64>]) -> ActivityRecord {
    ActivityRecord {
        name: format!("Ride {}", id),
        id,
        start_date: start_date.to_string(),
        power: power.to_vec(),
        time: (0..power.len()).map(|t| t as f64).collect(),
    }
}

/// Write raw file content into a store directory.
#[allow(dead_code)]
pub fn write_raw(dir: &Path, file_name: &str, content: &str) {
    std::fs::write(dir.join(file_name), content).expect("Failed to write test file");
}

/// Create a test app backed by a store in `data_dir`.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app(data_dir: &Path) -> (axum::Router, Arc<AppState>) {
    let config = Config {
        data_dir: data_dir.to_path_buf(),
        token_path: data_dir.join("missing-tokens.json"),
        ..Config::default()
    };
    let state = Arc::new(AppState::new(config).expect("Failed to build app state"));
    (create_router(state.clone()), state)
}

/// In-memory stand-in for Strava.
#[derive(Default)]
#[allow(dead_code)]
pub struct FakeSource {
    pub activities: Vec<RemoteActivity>,
    pub streams: HashMap<u64, StreamSet>,
    /// Listing fails with a rate limit
    pub rate_limit_listing: bool,
    /// Stream requests for this activity fail with a rate limit
    pub rate_limit_at: Option<u64>,
    pub stream_requests: AtomicUsize,
}

#[allow(dead_code)]
impl FakeSource {
    /// Add an activity with power and time streams.
    pub fn with_ride(self, id: u64, start_date: &str, power: &[Option<f64>]) -> Self {
        let time = (0..power.len()).map(|t| Some(t as f64)).collect();
        let mut streams = StreamSet::new();
        streams.insert("watts".to_string(), power.to_vec());
        streams.insert("time".to_string(), time);
        self.push(id, start_date, streams)
    }

    /// Add an activity that only has a time stream.
    pub fn with_unpowered_ride(self, id: u64, start_date: &str) -> Self {
        let mut streams = StreamSet::new();
        streams.insert("time".to_string(), vec![Some(0.0), Some(1.0)]);
        self.push(id, start_date, streams)
    }

    fn push(mut self, id: u64, start_date: &str, streams: StreamSet) -> Self {
        self.activities.push(RemoteActivity {
            id,
            name: format!("Remote {}", id),
            start_date: start_date.to_string(),
        });
        self.streams.insert(id, streams);
        self
    }

    pub fn requests(&self) -> usize {
        self.stream_requests.load(Ordering::SeqCst)
    }

    fn check_rate_limit(&self, activity_id: u64) -> Result<(), AppError> {
        self.stream_requests.fetch_add(1, Ordering::SeqCst);
        if self.rate_limit_at == Some(activity_id) {
            return Err(AppError::RateLimited);
        }
        Ok(())
    }
}

impl ActivitySource for FakeSource {
    async fn activities_after(
        &self,
        after: chrono::DateTime<chrono::Utc>,
        limit: usize,
    ) -> Result<Vec<RemoteActivity>, AppError> {
        if self.rate_limit_listing {
            return Err(AppError::RateLimited);
        }
        Ok(self
            .activities
            .iter()
            .filter(|a| parse_start_date(&a.start_date).is_some_and(|t| t > after))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn available_streams(&self, activity_id: u64) -> Result<Vec<String>, AppError> {
        self.check_rate_limit(activity_id)?;
        Ok(self
            .streams
            .get(&activity_id)
            .map(|s| s.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn fetch_streams(&self, activity_id: u64, keys: &[&str]) -> Result<StreamSet, AppError> {
        self.check_rate_limit(activity_id)?;
        let streams = self.streams.get(&activity_id).cloned().unwrap_or_default();
        Ok(streams
            .into_iter()
            .filter(|(k, _)| keys.contains(&k.as_str()))
            .collect())
    }
}
