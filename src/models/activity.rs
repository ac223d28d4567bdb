// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Strava activity model for storage and API.

use crate::time_utils::parse_start_date;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// Stored activity record, one JSON file per activity.
///
/// Every field is required; a file missing any of them does not parse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
    /// Activity name/title
    pub name: String,
    /// Strava activity ID (also used as the file name)
    pub id: u64,
    /// Start date/time as reported by Strava
    pub start_date: String,
    /// Power samples in watts, `null` where the sensor dropped out
    pub power: Vec<Option<f64>>,
    /// Elapsed seconds, parallel to `power`
    pub time: Vec<f64>,
}

impl ActivityRecord {
    /// Parsed start timestamp, keeping the stored offset.
    pub fn start_time(&self) -> Option<DateTime<FixedOffset>> {
        parse_start_date(&self.start_date)
    }

    /// Lightweight listing entry for this record.
    ///
    /// Returns `None` if the start date cannot be parsed.
    pub fn summary(&self) -> Option<ActivitySummary> {
        let start = self.start_time()?;
        Some(ActivitySummary {
            id: self.id,
            name: self.name.clone(),
            start_date: self.start_date.clone(),
            time_of_day: start.format("%H:%M:%S").to_string(),
            samples: self.power.len(),
        })
    }
}

/// Activity listing entry used to disambiguate activities on one day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivitySummary {
    pub id: u64,
    pub name: String,
    pub start_date: String,
    /// Start time formatted as `HH:MM:SS`
    pub time_of_day: String,
    /// Number of power samples stored
    pub samples: usize,
}
