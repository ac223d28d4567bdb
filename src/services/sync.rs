// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Incremental activity sync.
//!
//! Handles:
//! - Working out which remote activities still need fetching
//! - Skipping activities without a power/time stream pair
//! - Stopping cleanly, keeping completed work, when Strava rate limits us

use crate::db::ActivityStore;
use crate::error::{AppError, Result};
use crate::models::ActivityRecord;
use crate::services::run_blocking;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::future::Future;

/// Strava stream key for power samples.
pub const POWER_STREAM: &str = "watts";
/// Strava stream key for elapsed seconds.
pub const TIME_STREAM: &str = "time";

/// Activity summary from a remote listing.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteActivity {
    pub id: u64,
    pub name: String,
    pub start_date: String,
}

/// Stream content keyed by stream name.
pub type StreamSet = HashMap<String, Vec<Option<f64>>>;

/// Remote service that activities are synced from.
///
/// Implementations must report throttling as [`AppError::RateLimited`].
pub trait ActivitySource {
    /// Up to `limit` activities that started after `after`.
    fn activities_after(
        &self,
        after: DateTime<Utc>,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<RemoteActivity>>> + Send;

    /// Names of the streams recorded for an activity.
    fn available_streams(
        &self,
        activity_id: u64,
    ) -> impl Future<Output = Result<Vec<String>>> + Send;

    /// Content of the requested streams.
    fn fetch_streams(
        &self,
        activity_id: u64,
        keys: &[&str],
    ) -> impl Future<Output = Result<StreamSet>> + Send;
}

/// Outcome of one sync pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub added: usize,
    pub skipped_existing: usize,
    pub skipped_incomplete: usize,
    pub rate_limited: bool,
}

/// Drop listed activities that are already stored or listed earlier.
pub fn plan_fetch(listing: Vec<RemoteActivity>, stored: &BTreeSet<u64>) -> Vec<RemoteActivity> {
    let mut seen = BTreeSet::new();
    listing
        .into_iter()
        .filter(|activity| {
            if stored.contains(&activity.id) {
                tracing::debug!(activity_id = activity.id, "Skipping already stored activity");
                return false;
            }
            if !seen.insert(activity.id) {
                tracing::debug!(activity_id = activity.id, "Skipping repeated listing entry");
                return false;
            }
            true
        })
        .collect()
}

/// Run one sync pass from `source` into `store`.
///
/// Callers must not run two passes against the same store concurrently.
pub async fn run_sync<S: ActivitySource>(
    source: &S,
    store: &ActivityStore,
    max_activities: usize,
) -> Result<SyncReport> {
    let index = {
        let store = store.clone();
        run_blocking(move || store.index()).await?
    };
    tracing::info!(
        watermark = %index.watermark,
        stored = index.ids.len(),
        "Starting activity sync"
    );

    let mut report = SyncReport::default();

    let listing = match source.activities_after(index.watermark, max_activities).await {
        Ok(listing) => listing,
        Err(AppError::RateLimited) => {
            tracing::warn!("Rate limited while listing activities, stopping sync");
            report.rate_limited = true;
            return Ok(report);
        }
        Err(e) => return Err(e),
    };

    let listed = listing.len();
    let to_fetch = plan_fetch(listing, &index.ids);
    report.skipped_existing = listed - to_fetch.len();

    for activity in &to_fetch {
        match fetch_record(source, activity).await {
            Ok(Some(record)) => {
                let samples = record.power.len();
                let store = store.clone();
                run_blocking(move || store.put(&record)).await??;
                report.added += 1;
                tracing::info!(
                    activity_id = activity.id,
                    name = %activity.name,
                    samples,
                    "Activity saved"
                );
            }
            Ok(None) => report.skipped_incomplete += 1,
            Err(AppError::RateLimited) => {
                tracing::warn!(
                    activity_id = activity.id,
                    added = report.added,
                    "Rate limited during sync, stopping"
                );
                report.rate_limited = true;
                break;
            }
            Err(e) => return Err(e),
        }
    }

    tracing::info!(
        added = report.added,
        skipped_existing = report.skipped_existing,
        skipped_incomplete = report.skipped_incomplete,
        rate_limited = report.rate_limited,
        "Activity sync finished"
    );

    Ok(report)
}

/// Fetch one activity's streams, or `None` if power or time is missing.
async fn fetch_record<S: ActivitySource>(
    source: &S,
    activity: &RemoteActivity,
) -> Result<Option<ActivityRecord>> {
    let available = source.available_streams(activity.id).await?;
    let has = |key: &str| available.iter().any(|s| s == key);
    if !has(POWER_STREAM) || !has(TIME_STREAM) {
        tracing::warn!(activity_id = activity.id, "No power/time stream for activity");
        return Ok(None);
    }

    let mut streams = source
        .fetch_streams(activity.id, &[POWER_STREAM, TIME_STREAM])
        .await?;
    let power = streams.remove(POWER_STREAM).unwrap_or_default();
    let time = streams.remove(TIME_STREAM).unwrap_or_default();

    if power.is_empty() || time.is_empty() {
        tracing::warn!(activity_id = activity.id, "Stream data missing for activity");
        return Ok(None);
    }

    Ok(Some(ActivityRecord {
        name: activity.name.clone(),
        id: activity.id,
        start_date: activity.start_date.clone(),
        power,
        time: time.into_iter().map(|t| t.unwrap_or_default()).collect(),
    }))
}
