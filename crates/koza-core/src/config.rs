//! # Device Configuration
//!
//! Per-stage threshold bands, the active stage and the auto-stage marker.
//!
//! The configuration is passive data: the core reads it to select thresholds
//! for the stability scorer and never writes it. Validation happens here, at
//! the configuration boundary, so the scorers can stay total.

use crate::KozaError;
use crate::stability::StabilityCalibration;
use crate::system::{StageSchedule, compute_auto_stage};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Stage used when no active stage is configured.
pub const DEFAULT_ACTIVE_STAGE: &str = "larva_4";

/// Stage auto-progression starts from when none is configured.
pub const DEFAULT_AUTO_START_STAGE: &str = "larva_1";

// =============================================================================
// STAGE THRESHOLDS
// =============================================================================

/// Target bands for one life-cycle stage.
///
/// Invariant (checked by [`StageThresholds::validate`]): `min <= opt <= max`
/// for temperature (°C), relative humidity (%) and CO2 (ppm).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StageThresholds {
    pub t_min: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t_opt: Option<f64>,
    pub t_max: f64,
    pub h_min: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub h_opt: Option<f64>,
    pub h_max: f64,
    pub co2_min: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub co2_opt: Option<f64>,
    pub co2_max: f64,
}

impl StageThresholds {
    /// Check `min <= opt <= max` per dimension and that every bound is finite.
    pub fn validate(&self, stage: &str) -> Result<(), KozaError> {
        let dims = [
            ("temperature", self.t_min, self.t_opt, self.t_max),
            ("humidity", self.h_min, self.h_opt, self.h_max),
            ("co2", self.co2_min, self.co2_opt, self.co2_max),
        ];

        for (name, min, opt, max) in dims {
            let invalid = |reason: String| KozaError::InvalidThresholds {
                stage: stage.to_string(),
                reason,
            };

            if !min.is_finite() || !max.is_finite() || opt.is_some_and(|o| !o.is_finite()) {
                return Err(invalid(format!("{} bounds must be finite", name)));
            }
            if min > max {
                return Err(invalid(format!("{} min {} > max {}", name, min, max)));
            }
            if let Some(o) = opt {
                if o < min || o > max {
                    return Err(invalid(format!(
                        "{} opt {} outside [{}, {}]",
                        name, o, min, max
                    )));
                }
            }
        }
        Ok(())
    }

    /// Optimal temperature, or the band midpoint when unset.
    #[must_use]
    pub fn t_opt_or_mid(&self) -> f64 {
        opt_or_mid(self.t_opt, self.t_min, self.t_max)
    }

    /// Optimal humidity, or the band midpoint when unset.
    #[must_use]
    pub fn h_opt_or_mid(&self) -> f64 {
        opt_or_mid(self.h_opt, self.h_min, self.h_max)
    }

    /// Optimal CO2, or the band midpoint when unset.
    #[must_use]
    pub fn co2_opt_or_mid(&self) -> f64 {
        opt_or_mid(self.co2_opt, self.co2_min, self.co2_max)
    }

    /// Set points a controller should steer toward.
    #[must_use]
    pub fn targets(&self) -> StageTargets {
        StageTargets {
            temperature: self.t_opt_or_mid(),
            humidity: self.h_opt_or_mid(),
            co2_ppm: self.co2_opt_or_mid(),
        }
    }
}

/// Per-dimension set points of a stage: the optimum, or the band midpoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StageTargets {
    pub temperature: f64,
    pub humidity: f64,
    pub co2_ppm: f64,
}

fn opt_or_mid(opt: Option<f64>, min: f64, max: f64) -> f64 {
    match opt {
        Some(o) if o.is_finite() => o,
        _ => (min + max) / 2.0,
    }
}

/// Built-in bands for the eight default stages. Unknown stages get the
/// cocoon band.
#[must_use]
pub fn default_thresholds(stage: &str) -> StageThresholds {
    #[allow(clippy::type_complexity)]
    let (t, h, c): ((f64, f64, f64), (f64, f64, f64), (f64, f64, f64)) = match stage {
        "egg_incubation" => ((24.0, 25.5, 27.0), (80.0, 85.0, 90.0), (400.0, 600.0, 1000.0)),
        "adaptation_0_1" => ((27.0, 28.0, 29.0), (88.0, 90.0, 92.0), (400.0, 600.0, 800.0)),
        "larva_1" => ((26.0, 27.0, 28.0), (85.0, 88.0, 90.0), (400.0, 650.0, 900.0)),
        "larva_2" => ((25.0, 26.0, 27.0), (80.0, 83.0, 85.0), (400.0, 700.0, 1000.0)),
        "larva_3" => ((24.0, 25.0, 26.0), (75.0, 78.0, 80.0), (400.0, 750.0, 1100.0)),
        "larva_4" => ((23.0, 24.0, 25.0), (70.0, 73.0, 75.0), (400.0, 800.0, 1200.0)),
        "larva_5" => ((23.0, 24.0, 25.0), (65.0, 68.0, 70.0), (400.0, 800.0, 1200.0)),
        _ => ((22.0, 24.0, 25.0), (60.0, 65.0, 70.0), (400.0, 600.0, 1000.0)),
    };

    StageThresholds {
        t_min: t.0,
        t_opt: Some(t.1),
        t_max: t.2,
        h_min: h.0,
        h_opt: Some(h.1),
        h_max: h.2,
        co2_min: c.0,
        co2_opt: Some(c.1),
        co2_max: c.2,
    }
}

/// Normalize a stage key: trim, lowercase, whitespace runs to `_`.
#[must_use]
pub fn normalize_stage_key(stage: &str) -> String {
    stage
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase()
}

// =============================================================================
// DEVICE CONFIG
// =============================================================================

/// Auto-stage marker: the stage the batch started in and when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoStageConfig {
    pub enabled: bool,
    pub start_stage: String,
    /// ISO-8601 start time. `None` means "now", i.e. no elapsed days.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_at: Option<String>,
}

impl Default for AutoStageConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            start_stage: DEFAULT_AUTO_START_STAGE.to_string(),
            start_at: None,
        }
    }
}

/// Complete device configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub active_stage: String,
    pub auto_stage: AutoStageConfig,
    pub stages: BTreeMap<String, StageThresholds>,
    pub calibration: StabilityCalibration,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            active_stage: DEFAULT_ACTIVE_STAGE.to_string(),
            auto_stage: AutoStageConfig::default(),
            stages: BTreeMap::new(),
            calibration: StabilityCalibration::default(),
        }
        .with_defaults()
    }
}

impl DeviceConfig {
    /// Fill in any default stage missing from `stages` and an empty active stage.
    #[must_use]
    pub fn with_defaults(mut self) -> Self {
        for stage in StageSchedule::default().order() {
            self.stages
                .entry(stage.clone())
                .or_insert_with(|| default_thresholds(stage));
        }
        if self.active_stage.trim().is_empty() {
            self.active_stage = DEFAULT_ACTIVE_STAGE.to_string();
        }
        if self.auto_stage.start_stage.trim().is_empty() {
            self.auto_stage.start_stage = DEFAULT_AUTO_START_STAGE.to_string();
        }
        self
    }

    /// Validate every stage band.
    pub fn validate(&self) -> Result<(), KozaError> {
        for (stage, thresholds) in &self.stages {
            thresholds.validate(stage)?;
        }
        Ok(())
    }

    /// Thresholds for a stage: exact key first, then normalized key match.
    #[must_use]
    pub fn thresholds_for(&self, stage: &str) -> Option<&StageThresholds> {
        if let Some(t) = self.stages.get(stage) {
            return Some(t);
        }
        let wanted = normalize_stage_key(stage);
        self.stages
            .iter()
            .find(|(key, _)| normalize_stage_key(key) == wanted)
            .map(|(_, t)| t)
    }

    /// The stage currently in force: auto-progressed when enabled, else the
    /// configured active stage.
    #[must_use]
    pub fn effective_stage(&self, now_ms: i64, schedule: &StageSchedule) -> String {
        if !self.auto_stage.enabled {
            return self.active_stage.clone();
        }
        match &self.auto_stage.start_at {
            Some(start_at) => compute_auto_stage(
                &self.auto_stage.start_stage,
                start_at,
                now_ms,
                schedule.order(),
                schedule.durations(),
            ),
            None => self.auto_stage.start_stage.clone(),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
