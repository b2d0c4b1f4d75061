//! # Environmental Stability Scorer
//!
//! Scores a recent environment series 0-100: higher means steadier readings
//! that stay inside the active stage's bands.
//!
//! ## Algorithm
//!
//! 1. Per metric (temperature, humidity, CO2) take the finite samples.
//! 2. Variance/drift penalty: `clamp01(std/std_scale)*std_weight +
//!    clamp01(|slope|/slope_scale)*slope_weight`.
//! 3. Stage penalty (only with thresholds): in-range shortfall plus the
//!    average normalized out-of-band distance across all three metrics.
//! 4. `data_factor = clamp01(samples/90)` blends the result toward a neutral
//!    55 when data is sparse.
//!
//! The scorer is total: empty or degenerate input yields the neutral score.

use crate::config::StageThresholds;
use crate::stats::{clamp01, endpoint_slope, score_0_100, std_dev};
use crate::types::EnvironmentReport;
use serde::{Deserialize, Serialize};

// =============================================================================
// CALIBRATION
// =============================================================================

/// Scales and weights of the variance/drift penalty for one metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricCalibration {
    pub std_scale: f64,
    pub std_weight: f64,
    pub slope_scale: f64,
    pub slope_weight: f64,
}

impl MetricCalibration {
    fn penalty(&self, std: f64, slope: f64) -> f64 {
        clamp01(std / self.std_scale) * self.std_weight
            + clamp01(slope.abs() / self.slope_scale) * self.slope_weight
    }
}

/// Tunable constants of the stability score.
///
/// `Default` reproduces the reference calibration; changing any value changes
/// the scores produced for the same data.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilityCalibration {
    pub temperature: MetricCalibration,
    pub humidity: MetricCalibration,
    pub co2: MetricCalibration,
    /// Average out-of-band ratio at which the overshoot penalty saturates.
    pub out_ratio_scale: f64,
    pub out_ratio_weight: f64,
    /// In-range shortfall at which the shortfall penalty saturates.
    pub shortfall_scale: f64,
    pub shortfall_weight: f64,
    /// Sample count (all metrics combined) at which data is fully trusted.
    pub full_data_samples: f64,
    pub blend_gain: f64,
    pub blend_offset: f64,
    /// Score reported when there is no data at all.
    pub neutral_score: f64,
}

impl Default for StabilityCalibration {
    fn default() -> Self {
        Self {
            temperature: MetricCalibration {
                std_scale: 1.5,
                std_weight: 40.0,
                slope_scale: 0.08,
                slope_weight: 10.0,
            },
            humidity: MetricCalibration {
                std_scale: 5.0,
                std_weight: 35.0,
                slope_scale: 0.25,
                slope_weight: 10.0,
            },
            co2: MetricCalibration {
                std_scale: 220.0,
                std_weight: 30.0,
                slope_scale: 8.0,
                slope_weight: 10.0,
            },
            out_ratio_scale: 0.35,
            out_ratio_weight: 35.0,
            shortfall_scale: 0.35,
            shortfall_weight: 35.0,
            full_data_samples: 90.0,
            blend_gain: 0.65,
            blend_offset: 35.0,
            neutral_score: 55.0,
        }
    }
}

// =============================================================================
// INPUT / OUTPUT TYPES
// =============================================================================

/// One environment reading. Any field may be missing; missing or non-finite
/// values are dropped per metric, not per sample.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentSample {
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub co2_ppm: Option<f64>,
}

impl From<&EnvironmentReport> for EnvironmentSample {
    fn from(report: &EnvironmentReport) -> Self {
        Self {
            temperature: Some(report.temperature),
            humidity: Some(report.humidity),
            co2_ppm: Some(report.co2_ppm),
        }
    }
}

/// A value per metric.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PerMetric<T> {
    pub temperature: T,
    pub humidity: T,
    pub co2_ppm: T,
}

/// Threshold bands echoed into the debug output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandSummary {
    pub t_min: f64,
    pub t_max: f64,
    pub h_min: f64,
    pub h_max: f64,
    pub co2_min: f64,
    pub co2_max: f64,
}

impl From<&StageThresholds> for BandSummary {
    fn from(t: &StageThresholds) -> Self {
        Self {
            t_min: t.t_min,
            t_max: t.t_max,
            h_min: t.h_min,
            h_max: t.h_max,
            co2_min: t.co2_min,
            co2_max: t.co2_max,
        }
    }
}

/// Stage-compliance part of the score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StageCompliance {
    pub thresholds: Option<BandSummary>,
    /// In-range samples over all samples; `None` without thresholds or data.
    pub in_range_ratio: Option<f64>,
    /// Mean of the per-metric average out-of-band distances, in band widths.
    pub avg_out_ratio: Option<f64>,
    pub stage_penalty: f64,
}

/// Intermediate values, for display and troubleshooting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StabilityDebug {
    pub samples: PerMetric<usize>,
    pub std: PerMetric<f64>,
    pub slope: PerMetric<f64>,
    pub penalty: PerMetric<f64>,
    pub stage: StageCompliance,
    pub data_factor: f64,
}

/// Stability score plus its derivation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StabilityReport {
    pub score: u8,
    pub debug: StabilityDebug,
}

// =============================================================================
// SCORING
// =============================================================================

/// Score a series with the default calibration.
///
/// `series` is in whatever order the log returned it (newest first); the
/// slope is taken between its endpoints in that order.
#[must_use]
pub fn compute_environment_stability(
    series: &[EnvironmentSample],
    thresholds: Option<&StageThresholds>,
) -> StabilityReport {
    compute_environment_stability_with(series, thresholds, &StabilityCalibration::default())
}

/// Score a series with an explicit calibration.
#[must_use]
pub fn compute_environment_stability_with(
    series: &[EnvironmentSample],
    thresholds: Option<&StageThresholds>,
    calibration: &StabilityCalibration,
) -> StabilityReport {
    let temps = finite(series.iter().map(|s| s.temperature));
    let hums = finite(series.iter().map(|s| s.humidity));
    let co2s = finite(series.iter().map(|s| s.co2_ppm));

    let std = PerMetric {
        temperature: std_dev(&temps),
        humidity: std_dev(&hums),
        co2_ppm: std_dev(&co2s),
    };
    let slope = PerMetric {
        temperature: endpoint_slope(&temps),
        humidity: endpoint_slope(&hums),
        co2_ppm: endpoint_slope(&co2s),
    };
    let penalty = PerMetric {
        temperature: calibration.temperature.penalty(std.temperature, slope.temperature),
        humidity: calibration.humidity.penalty(std.humidity, slope.humidity),
        co2_ppm: calibration.co2.penalty(std.co2_ppm, slope.co2_ppm),
    };

    let stage = match thresholds {
        Some(t) => stage_compliance(&temps, &hums, &co2s, t, calibration),
        None => StageCompliance::default(),
    };

    let total_samples = temps.len() + hums.len() + co2s.len();
    let data_factor = clamp01(total_samples as f64 / calibration.full_data_samples);
    let base = 100.0
        - (penalty.temperature + penalty.humidity + penalty.co2_ppm + stage.stage_penalty);
    let blended = (base * calibration.blend_gain + calibration.blend_offset) * data_factor
        + (1.0 - data_factor) * calibration.neutral_score;

    StabilityReport {
        score: score_0_100(blended),
        debug: StabilityDebug {
            samples: PerMetric {
                temperature: temps.len(),
                humidity: hums.len(),
                co2_ppm: co2s.len(),
            },
            std,
            slope,
            penalty,
            stage,
            data_factor,
        },
    }
}

fn finite(values: impl Iterator<Item = Option<f64>>) -> Vec<f64> {
    values.flatten().filter(|v| v.is_finite()).collect()
}

struct SeriesCompliance {
    in_range: usize,
    total: usize,
    out_ratio_avg: f64,
}

fn series_compliance(xs: &[f64], min: f64, max: f64) -> SeriesCompliance {
    if xs.is_empty() {
        return SeriesCompliance {
            in_range: 0,
            total: 0,
            out_ratio_avg: 0.0,
        };
    }

    let width = (max - min).max(1e-6);
    let mut in_range = 0;
    let mut out_sum = 0.0;
    for &x in xs {
        if x >= min && x <= max {
            in_range += 1;
        } else {
            let dist = if x < min { min - x } else { x - max };
            out_sum += dist / width;
        }
    }

    SeriesCompliance {
        in_range,
        total: xs.len(),
        out_ratio_avg: out_sum / xs.len() as f64,
    }
}

fn stage_compliance(
    temps: &[f64],
    hums: &[f64],
    co2s: &[f64],
    t: &StageThresholds,
    calibration: &StabilityCalibration,
) -> StageCompliance {
    let parts = [
        series_compliance(temps, t.t_min, t.t_max),
        series_compliance(hums, t.h_min, t.h_max),
        series_compliance(co2s, t.co2_min, t.co2_max),
    ];

    let total: usize = parts.iter().map(|p| p.total).sum();
    let (in_range_ratio, avg_out_ratio) = if total == 0 {
        (None, None)
    } else {
        let in_range: usize = parts.iter().map(|p| p.in_range).sum();
        let out: f64 = parts.iter().map(|p| p.out_ratio_avg).sum();
        (Some(in_range as f64 / total as f64), Some(out / 3.0))
    };

    let out_penalty = avg_out_ratio
        .map(|r| clamp01(r / calibration.out_ratio_scale) * calibration.out_ratio_weight)
        .unwrap_or(0.0);
    let shortfall_penalty = in_range_ratio
        .map(|r| clamp01((1.0 - r) / calibration.shortfall_scale) * calibration.shortfall_weight)
        .unwrap_or(0.0);

    StageCompliance {
        thresholds: Some(BandSummary::from(t)),
        in_range_ratio,
        avg_out_ratio,
        stage_penalty: out_penalty + shortfall_penalty,
    }
}

// =============================================================================
// TESTS
// =============================================================================
