use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;
use strava_power::models::ActivityRecord;
use strava_power::services::power::{clean_power, max_average};
use strava_power::services::ranking::top_n;
use strava_power::services::WindowLength;

/// Deterministic ride-shaped power trace with occasional dropouts.
fn synthetic_power(samples: usize, seed: u64) -> Vec<Option<f64>> {
    (0..samples)
        .map(|i| {
            let i = i as u64;
            if (i + seed) % 97 == 0 {
                None
            } else {
                let surge = if (i / 300) % 4 == 0 { 150.0 } else { 0.0 };
                Some(180.0 + ((i * 31 + seed * 7) % 80) as f64 + surge)
            }
        })
        .collect()
}

fn synthetic_ride(id: u64, samples: usize) -> ActivityRecord {
    ActivityRecord {
        name: format!("Ride {}", id),
        id,
        start_date: "2024-06-01T08:00:00Z".to_string(),
        power: synthetic_power(samples, id),
        time: (0..samples).map(|t| t as f64).collect(),
    }
}

fn benchmark_max_average(c: &mut Criterion) {
    // Four hour ride at 1 Hz
    let samples = clean_power(&synthetic_power(4 * 3600, 1));

    let mut group = c.benchmark_group("max_average");
    for seconds in [5, 60, 1200, 3600] {
        let window = WindowLength::new(seconds).expect("positive window");
        group.bench_with_input(BenchmarkId::from_parameter(seconds), &window, |b, w| {
            b.iter(|| max_average(black_box(&samples), *w))
        });
    }
    group.finish();
}

fn benchmark_top_n(c: &mut Criterion) {
    let rides: Vec<ActivityRecord> = (0..200).map(|id| synthetic_ride(id, 3600)).collect();
    let window = WindowLength::new(300).expect("positive window");

    c.bench_function("top_5_of_200_rides_300s", |b| {
        b.iter(|| top_n(black_box(&rides), window, 5))
    });
}

criterion_group!(benches, benchmark_max_average, benchmark_top_n);
criterion_main!(benches);
