//! # API Request/Response Types
//!
//! JSON structures for the HTTP API that are not core types. Reports, the
//! dashboard snapshot, the stability report and the quality result are
//! serialized as-is from `koza-core`.

use koza_core::{
    Actuator, AgentKind, KozaError, StageProgress, StageTargets, primitives::DEFAULT_LIST_LIMIT,
};
use serde::{Deserialize, Serialize};

// =============================================================================
// HEALTH RESPONSE
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

// =============================================================================
// ERROR RESPONSE
// =============================================================================

/// Body of every non-2xx response produced by a handler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(msg: impl Into<String>) -> Self {
        Self { error: msg.into() }
    }
}

// =============================================================================
// QUERY PARAMETERS
// =============================================================================

/// `GET /messages` query string.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessagesQuery {
    pub agent: Option<String>,
    pub limit: Option<usize>,
}

impl MessagesQuery {
    /// Parse the agent filter. An empty value means "all agents".
    pub fn agent(&self) -> Result<Option<AgentKind>, KozaError> {
        match self.agent.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(name) => name.parse().map(Some),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_LIST_LIMIT)
    }
}

/// `GET /actuators/audit` query string.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditQuery {
    pub actuator: Option<String>,
    pub limit: Option<usize>,
}

impl AuditQuery {
    /// Parse the actuator filter. An empty value means "all actuators".
    pub fn actuator(&self) -> Result<Option<Actuator>, KozaError> {
        match self.actuator.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(name) => name.parse().map(Some),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_LIST_LIMIT)
    }
}

/// `GET /environment/stability` query string.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StabilityQuery {
    /// Number of recent environment reports to score.
    pub limit: Option<usize>,
}

/// `POST /quality/score` query string.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QualityQuery {
    /// Also append the result to the log as a quality report.
    #[serde(default)]
    pub publish: bool,
}

// =============================================================================
// STAGE RESPONSE
// =============================================================================

/// Stage currently in force.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageResponse {
    /// Effective stage (auto-progressed or manual).
    pub stage: String,
    /// Set points of the effective stage, if it has a threshold band.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub targets: Option<StageTargets>,
    pub active_stage: String,
    pub auto_enabled: bool,
    pub start_stage: String,
    pub start_at: Option<String>,
    /// Present only when auto-stage runs from a start marker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<StageProgress>,
}
