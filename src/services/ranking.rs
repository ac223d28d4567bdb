// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Best-effort ranking across stored activities.

use crate::models::{ActivityRecord, PowerEffort};
use crate::services::power::{clean_power, max_average, round_tenth, WindowLength};

/// Rank activities by their best rolling average for `window`.
///
/// Activities shorter than the window are left out. Sorting uses the
/// unrounded averages; only the returned values are rounded.
pub fn top_n(records: &[ActivityRecord], window: WindowLength, n: usize) -> Vec<PowerEffort> {
    let mut scored: Vec<(f64, &ActivityRecord)> = records
        .iter()
        .filter_map(|record| {
            let cleaned = clean_power(&record.power);
            max_average(&cleaned, window).map(|best| (best, record))
        })
        .collect();

    // Stable: equal averages keep their input order
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    scored.truncate(n);

    tracing::debug!(
        window_seconds = window.get(),
        considered = records.len(),
        returned = scored.len(),
        "Ranked activities"
    );

    scored
        .into_iter()
        .map(|(best, record)| PowerEffort {
            activity_id: record.id,
            name: record.name.clone(),
            start_date: record.start_date.clone(),
            max_average_power: round_tenth(best),
            window_seconds: window.get(),
        })
        .collect()
}
