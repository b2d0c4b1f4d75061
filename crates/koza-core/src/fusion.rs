//! # Status Fusion
//!
//! Fuses the latest environment and predictive-risk reports into one
//! operational status for the dashboard.
//!
//! ## Rules
//!
//! - Severity rank: high = 3, medium = 2, low = 1. An absent report ranks low.
//! - `critical` if the highest rank is 3, `warning` if 2, else `ok`. A single
//!   high signal is enough; levels are never averaged.
//! - Reasons: one line per present signal, predictive first.
//! - Actions: predictive prevention then environment actions, de-duplicated
//!   in first-seen order.
//! - Human approval is required whenever the status is not `ok`.
//!
//! Vision and quality reports are passed through for display only.

use crate::types::{EnvironmentReport, Level, PredictiveReport, StoredReport};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// DECISION TYPES
// =============================================================================

/// Overall facility status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallStatus {
    Ok,
    Warning,
    Critical,
}

impl OverallStatus {
    /// Map the highest severity rank to a status.
    #[must_use]
    pub const fn from_rank(rank: u8) -> Self {
        if rank >= 3 {
            OverallStatus::Critical
        } else if rank == 2 {
            OverallStatus::Warning
        } else {
            OverallStatus::Ok
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            OverallStatus::Ok => "ok",
            OverallStatus::Warning => "warning",
            OverallStatus::Critical => "critical",
        }
    }
}

impl fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The orchestrator's fused verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchestratorDecision {
    pub overall_status: OverallStatus,
    pub reason: Vec<String>,
    pub actions_required: Vec<String>,
    pub human_approval_required: bool,
}

/// Latest stored report per agent. Any slot may be empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LatestReports {
    pub environment: Option<StoredReport>,
    pub vision: Option<StoredReport>,
    pub predictive: Option<StoredReport>,
    pub quality: Option<StoredReport>,
}

/// Everything the dashboard needs in one payload. Derived on every request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    pub latest: LatestReports,
    pub orchestrator: OrchestratorDecision,
    /// Actuators requested by the latest environment report.
    pub actuators: ActuatorPlan,
}

// =============================================================================
// FUSION
// =============================================================================

/// Fuse the two status-bearing signals into a decision.
#[must_use]
pub fn fuse_status(
    environment: Option<&EnvironmentReport>,
    predictive: Option<&PredictiveReport>,
) -> OrchestratorDecision {
    let mut reason = Vec::new();
    let mut actions: IndexSet<&'static str> = IndexSet::new();

    if let Some(p) = predictive {
        reason.push(format!("Disease risk: {} ({})", p.risk_level, p.risk_score));
        actions.extend(p.recommended_prevention.iter().map(|a| a.as_str()));
    }
    if let Some(e) = environment {
        reason.push(format!("Environment stress: {}", e.stress_level));
        actions.extend(e.recommended_action.iter().map(|a| a.as_str()));
    }

    let risk = predictive.map_or(Level::Low, |p| p.risk_level);
    let stress = environment.map_or(Level::Low, |e| e.stress_level);
    let overall_status =
        OverallStatus::from_rank(risk.severity_rank().max(stress.severity_rank()));

    OrchestratorDecision {
        overall_status,
        reason,
        actions_required: actions.into_iter().map(str::to_string).collect(),
        human_approval_required: overall_status != OverallStatus::Ok,
    }
}

/// Build the dashboard snapshot from the latest report per agent.
///
/// A report sitting in the wrong slot (e.g. a vision report in
/// `environment`) is treated as absent.
#[must_use]
pub fn compute_dashboard_snapshot(latest: LatestReports) -> DashboardSnapshot {
    let environment = latest
        .environment
        .as_ref()
        .and_then(|s| s.report.as_environment());
    let predictive = latest
        .predictive
        .as_ref()
        .and_then(|s| s.report.as_predictive());

    let orchestrator = fuse_status(environment, predictive);
    let actuators = environment
        .map(|e| ActuatorPlan::from_actions(e.recommended_action.iter().map(|a| a.as_str())))
        .unwrap_or_default();

    DashboardSnapshot {
        latest,
        orchestrator,
        actuators,
    }
}

// =============================================================================
// ACTUATOR PLAN
// =============================================================================

/// Which actuators the recommended actions ask to switch on.
///
/// The snapshot derives the plan from the latest environment report, whose
/// actions are the closed [`EnvironmentAction`](crate::EnvironmentAction)
/// set. That set has no lighting or heating token, so in a snapshot only
/// `ventilation` and `humidifier` can be true. The lighting and heater
/// tokens are matched for free-form action lists passed to
/// [`ActuatorPlan::from_actions`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActuatorPlan {
    pub ventilation: bool,
    pub lighting: bool,
    pub heater: bool,
    pub humidifier: bool,
}

const VENTILATION_TOKENS: [&str; 1] = ["increase_ventilation"];
const LIGHTING_TOKENS: [&str; 3] = ["increase_lighting", "turn_on_lights", "lights_on"];
const HEATER_TOKENS: [&str; 3] = ["increase_heating", "turn_on_heater", "heater_on"];
const HUMIDIFIER_TOKENS: [&str; 3] = ["increase_humidity", "turn_on_humidifier", "humidifier_on"];

impl ActuatorPlan {
    /// Derive the plan from free-form action tokens.
    #[must_use]
    pub fn from_actions<'a>(actions: impl IntoIterator<Item = &'a str>) -> Self {
        let normalized: Vec<String> = actions.into_iter().map(normalize_action).collect();

        Self {
            ventilation: requested(&normalized, &VENTILATION_TOKENS),
            lighting: requested(&normalized, &LIGHTING_TOKENS),
            heater: requested(&normalized, &HEATER_TOKENS),
            humidifier: requested(&normalized, &HUMIDIFIER_TOKENS),
        }
    }

    /// True if any actuator is requested.
    #[must_use]
    pub fn any(&self) -> bool {
        self.ventilation || self.lighting || self.heater || self.humidifier
    }
}

fn requested(normalized: &[String], tokens: &[&str]) -> bool {
    normalized.iter().any(|a| tokens.contains(&a.as_str()))
}

/// Normalize an action token: trim, lowercase, then whitespace runs and
/// hyphen runs each collapse to `_`.
#[must_use]
pub fn normalize_action(action: &str) -> String {
    let spaced = collapse_runs(&action.trim().to_lowercase(), char::is_whitespace);
    collapse_runs(&spaced, |c| c == '-')
}

fn collapse_runs(s: &str, matches: impl Fn(char) -> bool) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_run = false;
    for c in s.chars() {
        if matches(c) {
            if !in_run {
                out.push('_');
            }
            in_run = true;
        } else {
            out.push(c);
            in_run = false;
        }
    }
    out
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AgentReport, EnvironmentAction, PreventionAction, VisionReport};

    fn env(level: Level, actions: Vec<EnvironmentAction>) -> EnvironmentReport {
        EnvironmentReport {
            timestamp: "2026-03-01T10:00:00Z".to_string(),
            stage: "larva_4".to_string(),
            temperature: 24.0,
            humidity: 72.0,
            co2_ppm: 800.0,
            stress_level: level,
            recommended_action: actions,
        }
    }

    fn pred(level: Level, score: f64, actions: Vec<PreventionAction>) -> PredictiveReport {
        PredictiveReport {
            timestamp: "2026-03-01T10:00:00Z".to_string(),
            risk_score: score,
            risk_level: level,
            predicted_disease: "grasserie".to_string(),
            time_horizon_hours: 48.0,
            recommended_prevention: actions,
        }
    }

    #[test]
    fn all_absent_is_ok() {
        let snapshot = compute_dashboard_snapshot(LatestReports::default());
        assert_eq!(snapshot.orchestrator.overall_status, OverallStatus::Ok);
        assert!(snapshot.orchestrator.reason.is_empty());
        assert!(snapshot.orchestrator.actions_required.is_empty());
        assert!(!snapshot.orchestrator.human_approval_required);
        assert!(!snapshot.actuators.any());
    }

    #[test]
    fn single_high_signal_is_critical() {
        let e = env(Level::Low, vec![]);
        let p = pred(Level::High, 0.91, vec![]);
        let decision = fuse_status(Some(&e), Some(&p));
        assert_eq!(decision.overall_status, OverallStatus::Critical);
        assert!(decision.human_approval_required);
    }

    #[test]
    fn medium_is_warning() {
        let e = env(Level::Medium, vec![]);
        let decision = fuse_status(Some(&e), None);
        assert_eq!(decision.overall_status, OverallStatus::Warning);
        assert_eq!(decision.reason, vec!["Environment stress: medium"]);
    }

    #[test]
    fn reasons_are_predictive_first() {
        let e = env(Level::Low, vec![]);
        let p = pred(Level::Low, 0.12, vec![]);
        let decision = fuse_status(Some(&e), Some(&p));
        assert_eq!(
            decision.reason,
            vec!["Disease risk: low (0.12)", "Environment stress: low"]
        );
        assert_eq!(decision.overall_status, OverallStatus::Ok);
    }

    #[test]
    fn actions_are_deduplicated_in_order() {
        let e = env(
            Level::Medium,
            vec![
                EnvironmentAction::IncreaseVentilation,
                EnvironmentAction::DecreaseHumidity,
            ],
        );
        let p = pred(
            Level::Medium,
            0.5,
            vec![
                PreventionAction::ReduceHumidity,
                PreventionAction::IncreaseVentilation,
                PreventionAction::ReduceHumidity,
            ],
        );
        let decision = fuse_status(Some(&e), Some(&p));
        assert_eq!(
            decision.actions_required,
            vec!["reduce_humidity", "increase_ventilation", "decrease_humidity"]
        );
    }

    #[test]
    fn misplaced_report_is_ignored() {
        let vision = StoredReport::received_now(AgentReport::Vision(VisionReport {
            timestamp: "2026-03-01T10:00:00Z".to_string(),
            movement_index: 0.4,
            size_change_ratio: 1.1,
            texture_anomaly: false,
            confidence: 0.8,
        }));
        let latest = LatestReports {
            environment: Some(vision),
            ..LatestReports::default()
        };
        let snapshot = compute_dashboard_snapshot(latest);
        assert!(snapshot.orchestrator.reason.is_empty());
        assert!(snapshot.latest.environment.is_some());
    }

    #[test]
    fn snapshot_carries_actuator_plan() {
        let e = env(Level::High, vec![EnvironmentAction::IncreaseHumidity]);
        let latest = LatestReports {
            environment: Some(StoredReport::received_now(AgentReport::Environment(e))),
            ..LatestReports::default()
        };
        let snapshot = compute_dashboard_snapshot(latest);
        assert!(snapshot.actuators.humidifier);
        assert!(!snapshot.actuators.ventilation);
    }

    #[test]
    fn action_tokens_are_normalized() {
        assert_eq!(normalize_action("  Turn On-Lights "), "turn_on_lights");
        assert_eq!(normalize_action("heater--on"), "heater_on");
        assert_eq!(normalize_action("a - b"), "a___b");

        let plan = ActuatorPlan::from_actions(["Lights On", "increase-heating", "noop"]);
        assert!(plan.lighting);
        assert!(plan.heater);
        assert!(!plan.ventilation);
        assert!(!plan.humidifier);
    }

    #[test]
    fn snapshot_plan_never_requests_lighting_or_heat() {
        let every_action = vec![
            EnvironmentAction::IncreaseVentilation,
            EnvironmentAction::DecreaseVentilation,
            EnvironmentAction::IncreaseHumidity,
            EnvironmentAction::DecreaseHumidity,
            EnvironmentAction::IncreaseTemperature,
            EnvironmentAction::DecreaseTemperature,
        ];
        let e = env(Level::Medium, every_action);
        let latest = LatestReports {
            environment: Some(StoredReport::received_now(AgentReport::Environment(e))),
            ..LatestReports::default()
        };
        let plan = compute_dashboard_snapshot(latest).actuators;
        assert!(plan.ventilation);
        assert!(plan.humidifier);
        assert!(!plan.lighting);
        assert!(!plan.heater);
    }

    #[test]
    fn status_serializes_lowercase() {
        let value = serde_json::to_value(OverallStatus::Critical).expect("serialize");
        assert_eq!(value, "critical");
    }
}
