// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Power stream cleaning and rolling-window analysis.

use crate::error::AppError;
use crate::models::{ActivityPower, ActivityRecord};
use std::num::NonZeroUsize;

/// Rolling window length in seconds (one sample per second).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowLength(NonZeroUsize);

impl WindowLength {
    /// Validate a caller-supplied window length.
    pub fn new(seconds: i64) -> Result<Self, AppError> {
        usize::try_from(seconds)
            .ok()
            .and_then(NonZeroUsize::new)
            .map(Self)
            .ok_or_else(|| {
                AppError::InvalidArgument(format!(
                    "Window length must be a positive number of seconds, got {}",
                    seconds
                ))
            })
    }

    pub fn get(self) -> usize {
        self.0.get()
    }
}

/// Replace sensor dropouts with zero watts.
pub fn clean_power(raw: &[Option<f64>]) -> Vec<f64> {
    raw.iter().map(|p| p.unwrap_or(0.0)).collect()
}

/// Highest mean over every contiguous window of `window` samples.
///
/// Returns `None` when there are fewer samples than the window length.
pub fn max_average(samples: &[f64], window: WindowLength) -> Option<f64> {
    let window_size = window.get();
    if samples.len() < window_size {
        return None;
    }

    let mut sum: f64 = samples[..window_size].iter().sum();
    let mut best = sum;

    // Slide the window one sample at a time
    for end in window_size..samples.len() {
        sum += samples[end] - samples[end - window_size];
        best = best.max(sum);
    }

    Some(best / window_size as f64)
}

/// Round a wattage to one decimal place for display.
pub fn round_tenth(watts: f64) -> f64 {
    (watts * 10.0).round() / 10.0
}

/// Best rolling average for one stored activity.
pub fn analyze_activity(record: &ActivityRecord, window: WindowLength) -> ActivityPower {
    let cleaned = clean_power(&record.power);
    ActivityPower {
        activity_id: record.id,
        window_seconds: window.get(),
        max_average_power: max_average(&cleaned, window).map(round_tenth),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn w(seconds: i64) -> WindowLength {
        WindowLength::new(seconds).unwrap()
    }

    /// Recompute every window from scratch.
    fn brute_force(samples: &[f64], window: usize) -> Option<f64> {
        if samples.len() < window {
            return None;
        }
        samples
            .windows(window)
            .map(|win| win.iter().sum::<f64>() / window as f64)
            .fold(None, |best: Option<f64>, avg| {
                Some(best.map_or(avg, |b| b.max(avg)))
            })
    }

    #[test]
    fn test_clean_replaces_nulls() {
        assert_eq!(
            clean_power(&[Some(1.0), None, Some(3.0)]),
            vec![1.0, 0.0, 3.0]
        );
        assert!(clean_power(&[]).is_empty());
    }

    #[test]
    fn test_clean_does_not_clamp() {
        assert_eq!(clean_power(&[Some(-5.0), Some(2000.0)]), vec![-5.0, 2000.0]);
    }

    #[test]
    fn test_max_average_examples() {
        assert_eq!(max_average(&[1.0, 0.0, 3.0], w(2)), Some(1.5));
        assert_eq!(max_average(&[5.0, 5.0, 5.0, 5.0], w(4)), Some(5.0));
    }

    #[test]
    fn test_max_average_window_longer_than_samples() {
        assert_eq!(max_average(&[1.0, 2.0], w(3)), None);
        assert_eq!(max_average(&[], w(1)), None);
    }

    #[test]
    fn test_max_average_window_of_one_is_max_sample() {
        assert_eq!(max_average(&[3.0, 9.0, 4.0], w(1)), Some(9.0));
    }

    #[test]
    fn test_max_average_matches_brute_force() {
        let samples = [
            120.0, 0.0, 310.0, 305.0, 290.0, 0.0, 0.0, 450.0, 180.0, 175.0, 200.0, 95.0,
        ];
        for window in 1..=samples.len() + 2 {
            let fast = max_average(&samples, w(window as i64));
            let slow = brute_force(&samples, window);
            match (fast, slow) {
                (Some(a), Some(b)) => assert!((a - b).abs() < 1e-9, "window {}", window),
                (None, None) => {}
                other => panic!("window {}: mismatch {:?}", window, other),
            }
        }
    }

    #[test]
    fn test_max_average_is_deterministic() {
        let samples: Vec<f64> = (0..500).map(|i| ((i * 37) % 411) as f64).collect();
        assert_eq!(max_average(&samples, w(30)), max_average(&samples, w(30)));
    }

    #[test]
    fn test_window_length_rejects_non_positive() {
        assert!(matches!(
            WindowLength::new(0),
            Err(AppError::InvalidArgument(_))
        ));
        assert!(matches!(
            WindowLength::new(-20),
            Err(AppError::InvalidArgument(_))
        ));
        assert_eq!(w(60).get(), 60);
    }

    #[test]
    fn test_round_tenth() {
        assert_eq!(round_tenth(251.26), 251.3);
        assert_eq!(round_tenth(251.24), 251.2);
        assert_eq!(round_tenth(0.0), 0.0);
    }

    #[test]
    fn test_analyze_activity_cleans_and_rounds() {
        let record = ActivityRecord {
            name: "Intervals".to_string(),
            id: 9,
            start_date: "2024-01-01T00:00:00Z".to_string(),
            power: vec![Some(100.0), None, Some(101.0), Some(100.0)],
            time: vec![0.0, 1.0, 2.0, 3.0],
        };
        let result = analyze_activity(&record, w(3));
        // windows: [100,0,101]=67.0, [0,101,100]=67.0
        assert_eq!(result.max_average_power, Some(67.0));
        assert_eq!(result.window_seconds, 3);

        let too_long = analyze_activity(&record, w(5));
        assert_eq!(too_long.max_average_power, None);
    }
}
