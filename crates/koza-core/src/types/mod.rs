//! # Core Type Definitions
//!
//! The shared vocabulary between agents, the message log and the scorers:
//! - Agent identifiers (`AgentKind`)
//! - Enumerated report fields (`Level`, `EnvironmentAction`, `PreventionAction`, `Grade`)
//! - Per-agent report shapes and the tagged `AgentReport` union
//! - The ingested form (`StoredReport`)
//! - Error types (`KozaError`)
//!
//! ## Wire Shape
//!
//! Reports are discriminated by the `agent` field:
//!
//! ```json
//! {"agent": "environment", "timestamp": "...", "stage": "larva_4", ...}
//! ```

use crate::primitives::{MAX_ACTIONS_PER_REPORT, MAX_LABEL_LENGTH, MAX_TIMESTAMP_LENGTH};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// =============================================================================
// AGENT IDENTIFIERS
// =============================================================================

/// One of the four independent telemetry/analysis sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    Environment,
    Vision,
    PredictiveAi,
    Quality,
}

impl AgentKind {
    /// All agents, in dashboard order.
    pub const ALL: [AgentKind; 4] = [
        AgentKind::Environment,
        AgentKind::Vision,
        AgentKind::PredictiveAi,
        AgentKind::Quality,
    ];

    /// Wire name of the agent.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            AgentKind::Environment => "environment",
            AgentKind::Vision => "vision",
            AgentKind::PredictiveAi => "predictive_ai",
            AgentKind::Quality => "quality",
        }
    }

    /// Compact code used as the storage index prefix.
    #[must_use]
    pub const fn code(&self) -> u8 {
        match self {
            AgentKind::Environment => 0,
            AgentKind::Vision => 1,
            AgentKind::PredictiveAi => 2,
            AgentKind::Quality => 3,
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentKind {
    type Err = KozaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AgentKind::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| KozaError::InvalidAgent(s.to_string()))
    }
}

// =============================================================================
// ENUMERATED REPORT FIELDS
// =============================================================================

/// Stress level (environment) or risk level (predictive model).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Low,
    Medium,
    High,
}

impl Level {
    /// Severity rank used by status fusion: high=3, medium=2, low=1.
    #[must_use]
    pub const fn severity_rank(self) -> u8 {
        match self {
            Level::High => 3,
            Level::Medium => 2,
            Level::Low => 1,
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Level::Low => "low",
            Level::Medium => "medium",
            Level::High => "high",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Corrective action recommended by the environment agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvironmentAction {
    IncreaseVentilation,
    DecreaseVentilation,
    IncreaseHumidity,
    DecreaseHumidity,
    IncreaseTemperature,
    DecreaseTemperature,
}

impl EnvironmentAction {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            EnvironmentAction::IncreaseVentilation => "increase_ventilation",
            EnvironmentAction::DecreaseVentilation => "decrease_ventilation",
            EnvironmentAction::IncreaseHumidity => "increase_humidity",
            EnvironmentAction::DecreaseHumidity => "decrease_humidity",
            EnvironmentAction::IncreaseTemperature => "increase_temperature",
            EnvironmentAction::DecreaseTemperature => "decrease_temperature",
        }
    }
}

/// Preventive action recommended by the predictive-risk model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreventionAction {
    ReduceHumidity,
    IncreaseVentilation,
    ReduceTemperature,
    IncreaseTemperature,
}

impl PreventionAction {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            PreventionAction::ReduceHumidity => "reduce_humidity",
            PreventionAction::IncreaseVentilation => "increase_ventilation",
            PreventionAction::ReduceTemperature => "reduce_temperature",
            PreventionAction::IncreaseTemperature => "increase_temperature",
        }
    }
}

/// Cocoon quality grade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
}

impl Grade {
    /// A if score >= 85, B if >= 70, else C.
    #[must_use]
    pub const fn from_score(score: u8) -> Self {
        if score >= 85 {
            Grade::A
        } else if score >= 70 {
            Grade::B
        } else {
            Grade::C
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// PER-AGENT REPORTS
// =============================================================================

/// Periodic environment reading with the agent's own stress assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentReport {
    pub timestamp: String,
    pub stage: String,
    pub temperature: f64,
    pub humidity: f64,
    pub co2_ppm: f64,
    pub stress_level: Level,
    #[serde(default)]
    pub recommended_action: Vec<EnvironmentAction>,
}

/// Larva behaviour metrics from the vision pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisionReport {
    pub timestamp: String,
    pub movement_index: f64,
    pub size_change_ratio: f64,
    pub texture_anomaly: bool,
    pub confidence: f64,
}

/// Disease-risk forecast from the predictive model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictiveReport {
    pub timestamp: String,
    pub risk_score: f64,
    pub risk_level: Level,
    pub predicted_disease: String,
    pub time_horizon_hours: f64,
    #[serde(default)]
    pub recommended_prevention: Vec<PreventionAction>,
}

/// Quality verdict published by the quality scorer agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub timestamp: String,
    pub quality_score: f64,
    pub grade: Grade,
    pub market_recommendation: String,
}

// =============================================================================
// AGENT REPORT (TAGGED UNION)
// =============================================================================

/// A report from exactly one agent, discriminated by `agent`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "agent", rename_all = "snake_case")]
pub enum AgentReport {
    Environment(EnvironmentReport),
    Vision(VisionReport),
    PredictiveAi(PredictiveReport),
    Quality(QualityReport),
}

impl AgentReport {
    /// The agent that produced this report.
    #[must_use]
    pub const fn agent(&self) -> AgentKind {
        match self {
            AgentReport::Environment(_) => AgentKind::Environment,
            AgentReport::Vision(_) => AgentKind::Vision,
            AgentReport::PredictiveAi(_) => AgentKind::PredictiveAi,
            AgentReport::Quality(_) => AgentKind::Quality,
        }
    }

    /// Client-supplied timestamp. Informational only; never used for ordering.
    #[must_use]
    pub fn timestamp(&self) -> &str {
        match self {
            AgentReport::Environment(r) => &r.timestamp,
            AgentReport::Vision(r) => &r.timestamp,
            AgentReport::PredictiveAi(r) => &r.timestamp,
            AgentReport::Quality(r) => &r.timestamp,
        }
    }

    #[must_use]
    pub fn as_environment(&self) -> Option<&EnvironmentReport> {
        match self {
            AgentReport::Environment(r) => Some(r),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_predictive(&self) -> Option<&PredictiveReport> {
        match self {
            AgentReport::PredictiveAi(r) => Some(r),
            _ => None,
        }
    }

    /// Validate a parsed report before it is stored.
    ///
    /// Serde already guarantees the variant shape and enumerated tokens;
    /// this adds what the type system cannot: finite numbers and bounded strings.
    pub fn validate(&self) -> Result<(), KozaError> {
        validate_timestamp(self.timestamp())?;

        match self {
            AgentReport::Environment(r) => {
                validate_label("stage", &r.stage)?;
                require_finite("temperature", r.temperature)?;
                require_finite("humidity", r.humidity)?;
                require_finite("co2_ppm", r.co2_ppm)?;
                validate_action_count(r.recommended_action.len())
            }
            AgentReport::Vision(r) => {
                require_finite("movement_index", r.movement_index)?;
                require_finite("size_change_ratio", r.size_change_ratio)?;
                require_finite("confidence", r.confidence)
            }
            AgentReport::PredictiveAi(r) => {
                require_finite("risk_score", r.risk_score)?;
                require_finite("time_horizon_hours", r.time_horizon_hours)?;
                validate_label("predicted_disease", &r.predicted_disease)?;
                validate_action_count(r.recommended_prevention.len())
            }
            AgentReport::Quality(r) => {
                require_finite("quality_score", r.quality_score)?;
                validate_label("market_recommendation", &r.market_recommendation)
            }
        }
    }
}

fn validate_timestamp(ts: &str) -> Result<(), KozaError> {
    if ts.trim().is_empty() {
        return Err(KozaError::InvalidReport("timestamp is empty".to_string()));
    }
    if ts.len() > MAX_TIMESTAMP_LENGTH {
        return Err(KozaError::InvalidReport(format!(
            "timestamp length {} exceeds maximum {}",
            ts.len(),
            MAX_TIMESTAMP_LENGTH
        )));
    }
    Ok(())
}

fn validate_label(field: &str, value: &str) -> Result<(), KozaError> {
    if value.len() > MAX_LABEL_LENGTH {
        return Err(KozaError::InvalidReport(format!(
            "{} length {} exceeds maximum {}",
            field,
            value.len(),
            MAX_LABEL_LENGTH
        )));
    }
    Ok(())
}

fn validate_action_count(count: usize) -> Result<(), KozaError> {
    if count > MAX_ACTIONS_PER_REPORT {
        return Err(KozaError::InvalidReport(format!(
            "{} actions exceed maximum {}",
            count, MAX_ACTIONS_PER_REPORT
        )));
    }
    Ok(())
}

fn require_finite(field: &str, value: f64) -> Result<(), KozaError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(KozaError::InvalidReport(format!("{} must be finite", field)))
    }
}

// =============================================================================
// STORED REPORT
// =============================================================================

/// A report as held by the message log: the original payload plus the
/// server-assigned ingestion time. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredReport {
    #[serde(flatten)]
    pub report: AgentReport,
    pub received_at: DateTime<Utc>,
}

impl StoredReport {
    #[must_use]
    pub fn new(report: AgentReport, received_at: DateTime<Utc>) -> Self {
        Self {
            report,
            received_at,
        }
    }

    /// Stamp a report with the current wall-clock time.
    #[must_use]
    pub fn received_now(report: AgentReport) -> Self {
        Self::new(report, Utc::now())
    }

    #[must_use]
    pub const fn agent(&self) -> AgentKind {
        self.report.agent()
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in KozaTakip core operations.
///
/// Scorers never return these: they are total over their input domain.
/// Errors only arise at the validation, configuration and storage boundaries.
#[derive(Debug, Error)]
pub enum KozaError {
    /// A report failed validation and must not be stored.
    #[error("Invalid report: {0}")]
    InvalidReport(String),

    /// An agent name outside the four known agents.
    #[error("Unknown agent: {0}")]
    InvalidAgent(String),

    /// An actuator name outside the known actuators.
    #[error("Unknown actuator: {0}")]
    InvalidActuator(String),

    /// Stage thresholds violate min <= opt <= max.
    #[error("Invalid thresholds for stage '{stage}': {reason}")]
    InvalidThresholds { stage: String, reason: String },

    /// A serialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// A deserialization error occurred.
    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    /// An I/O or storage error occurred.
    #[error("I/O error: {0}")]
    IoError(String),

    /// Device configuration could not be loaded or saved.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

// =============================================================================
// TESTS
// =============================================================================
