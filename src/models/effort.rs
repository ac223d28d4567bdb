// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Window analysis results.

use serde::Serialize;

/// One entry of a ranked best-effort list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PowerEffort {
    pub activity_id: u64,
    pub name: String,
    pub start_date: String,
    /// Best rolling average in watts, rounded to one decimal
    pub max_average_power: f64,
    pub window_seconds: usize,
}

/// Single-activity analysis result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityPower {
    pub activity_id: u64,
    pub window_seconds: usize,
    /// `None` when the activity is shorter than the window
    pub max_average_power: Option<f64>,
}
