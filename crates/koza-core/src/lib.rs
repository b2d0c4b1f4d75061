//! # koza-core
//!
//! The orchestration and scoring core of KozaTakip - THE LOGIC.
//!
//! Agents monitoring a silkworm-rearing room (environment sensors, a vision
//! pipeline, a predictive disease-risk model and a quality scorer) post
//! reports; this crate turns them into one operational status and scores the
//! environment and the cocoon harvest.
//!
//! ## Modules
//!
//! - `types`: agent reports, stored reports, errors
//! - `fusion`: dashboard snapshot, status fusion, actuator plan
//! - `stability`: environmental stability score
//! - `quality`: cocoon quality score from vision detections
//! - `system`: life-cycle stage schedule and auto-stage progression
//! - `config`: per-stage threshold bands and device configuration
//! - `audit`: actuator switch audit trail
//! - `log`, `storage`, `session`: the message log and its backends
//!
//! ## Architectural Constraints
//!
//! - Every derivation is a pure function of its inputs
//! - The scorers are total: sparse or degenerate input degrades to a
//!   neutral score, never to an error
//! - NO async, NO network dependencies (pure Rust)

// =============================================================================
// MODULES
// =============================================================================

pub mod audit;
pub mod config;
pub mod fusion;
pub mod log;
pub mod primitives;
pub mod quality;
pub mod session;
pub mod stability;
pub mod stats;
pub mod storage;
pub mod system;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    AgentKind, AgentReport, EnvironmentAction, EnvironmentReport, Grade, KozaError, Level,
    PredictiveReport, PreventionAction, QualityReport, StoredReport, VisionReport,
};

// =============================================================================
// RE-EXPORTS: Orchestration and Scoring
// =============================================================================

pub use fusion::{
    ActuatorPlan, DashboardSnapshot, LatestReports, OrchestratorDecision, OverallStatus,
    compute_dashboard_snapshot, fuse_status,
};
pub use quality::{
    Detection, MarketRecommendation, QualityResult, compute_quality_score, normalize_detections,
};
pub use stability::{
    EnvironmentSample, StabilityCalibration, StabilityReport, compute_environment_stability,
    compute_environment_stability_with,
};

// =============================================================================
// RE-EXPORTS: Configuration, Storage and System
// =============================================================================

pub use audit::{Actuator, ActuatorCommand, ActuatorMode, AuditEntry};
pub use config::{
    DeviceConfig, StageTargets, StageThresholds, default_thresholds, normalize_stage_key,
};
pub use log::{MemoryLog, MessageLog};
pub use session::{Session, StorageBackend};
pub use storage::RedbLog;
pub use system::{StageProgress, StageSchedule, compute_auto_stage};
