//! # Scoring Benchmarks
//!
//! Performance benchmarks for the koza-core scorers and the message log.
//!
//! Run with: `cargo bench -p koza-core`

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use koza_core::{
    AgentReport, EnvironmentReport, EnvironmentSample, Level, MemoryLog, MessageLog,
    compute_dashboard_snapshot, compute_environment_stability, compute_quality_score,
    default_thresholds,
};
use serde_json::{Value, json};
use std::hint::black_box;

/// A noisy environment series of `size` readings.
fn create_series(size: usize) -> Vec<EnvironmentSample> {
    (0..size)
        .map(|i| {
            let wobble = (i % 7) as f64 * 0.15;
            EnvironmentSample {
                temperature: Some(23.5 + wobble),
                humidity: Some(71.0 + wobble * 2.0),
                co2_ppm: Some(780.0 + wobble * 40.0),
            }
        })
        .collect()
}

/// A detection payload with `size` cocoons and a few defect labels.
fn create_payload(size: usize) -> Value {
    let mut detections: Vec<Value> = (0..size)
        .map(|i| {
            let x = (i * 12) as f64;
            json!({
                "class": "cocoon",
                "bbox": [x, 10.0, x + 40.0, 42.0],
                "extra": {
                    "size": {"area_ratio": 0.03 + (i % 5) as f64 * 0.004},
                    "color": {"mean_hsv": {"h": 18.0, "s": 95.0, "v": 155.0}}
                }
            })
        })
        .collect();
    detections.push(json!({"class": "stain"}));
    detections.push(json!({"class": "hole"}));
    json!({ "detections": detections })
}

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_stability(c: &mut Criterion) {
    let mut group = c.benchmark_group("environment_stability");
    let thresholds = default_thresholds("larva_4");

    for size in [30, 90, 1000].iter() {
        let series = create_series(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| black_box(compute_environment_stability(&series, Some(&thresholds))));
        });
    }

    group.finish();
}

fn bench_quality(c: &mut Criterion) {
    let mut group = c.benchmark_group("quality_score");

    for size in [1, 20, 200].iter() {
        let payload = create_payload(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| black_box(compute_quality_score(&payload, 72.0)));
        });
    }

    group.finish();
}

fn bench_snapshot(c: &mut Criterion) {
    let mut group = c.benchmark_group("dashboard_snapshot");

    for size in [10, 1000].iter() {
        let mut log = MemoryLog::new();
        for i in 0..*size {
            let report = AgentReport::Environment(EnvironmentReport {
                timestamp: format!("2026-03-01T00:00:{:02}Z", i % 60),
                stage: "larva_4".to_string(),
                temperature: 24.0,
                humidity: 72.0,
                co2_ppm: 800.0,
                stress_level: Level::Medium,
                recommended_action: Vec::new(),
            });
            log.append(report).expect("append");
        }

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let latest = koza_core::LatestReports {
                    environment: log
                        .latest_by_agent(koza_core::AgentKind::Environment)
                        .expect("latest"),
                    ..Default::default()
                };
                black_box(compute_dashboard_snapshot(latest))
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_stability, bench_quality, bench_snapshot);
criterion_main!(benches);
