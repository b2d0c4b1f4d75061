//! # Session Module
//!
//! A Session owns one message-log backend and answers every read the
//! orchestrator surfaces need: the dashboard snapshot, the environment series
//! behind the stability score, filtered message lists and the actuator audit
//! trail.
//!
//! ## Storage Backends
//!
//! - `InMemory`: `MemoryLog` (fast, volatile)
//! - `Persistent`: `RedbLog` for disk-backed ACID storage
//!
//! ## Degraded Reads
//!
//! Derived views (snapshot, stability, quality) treat a failing read as
//! missing data: the error is logged and the scorers see the cold-start
//! state. Writes and explicit list queries propagate errors.

use crate::audit::{Actuator, AuditEntry};
use crate::config::DeviceConfig;
use crate::fusion::{DashboardSnapshot, LatestReports, compute_dashboard_snapshot};
use crate::log::{MemoryLog, MessageLog};
use crate::primitives::bounded_limit;
use crate::quality::{QualityResult, compute_quality_score};
use crate::stability::{EnvironmentSample, StabilityReport, compute_environment_stability_with};
use crate::storage::RedbLog;
use crate::system::StageSchedule;
use crate::{AgentKind, AgentReport, KozaError, StoredReport};
use std::path::Path;

// =============================================================================
// ERROR LOGGING HELPERS
// =============================================================================

/// Log a storage error and convert Result to Option.
#[inline]
fn log_and_convert<T>(result: Result<T, KozaError>, context: &str) -> Option<T> {
    match result {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!(context, error = %e, "storage read failed");
            None
        }
    }
}

/// Log a storage error and fall back to the default value.
#[inline]
fn log_and_default<T: Default>(result: Result<T, KozaError>, context: &str) -> T {
    log_and_convert(result, context).unwrap_or_default()
}

/// Storage backend for a Session.
#[derive(Debug)]
pub enum StorageBackend {
    /// In-memory log (fast, volatile).
    InMemory(MemoryLog),
    /// Disk-backed log using redb (ACID, persistent).
    Persistent(RedbLog),
}

impl Default for StorageBackend {
    fn default() -> Self {
        Self::InMemory(MemoryLog::new())
    }
}

/// The orchestrator's view of the message log.
#[derive(Debug, Default)]
pub struct Session {
    backend: StorageBackend,
}

impl Session {
    /// Create a new empty session with in-memory storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session with persistent redb storage.
    ///
    /// Opens or creates a redb database at the given path.
    pub fn with_redb(path: impl AsRef<Path>) -> Result<Self, KozaError> {
        Ok(Self {
            backend: StorageBackend::Persistent(RedbLog::open(path)?),
        })
    }

    /// Check if using persistent storage.
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        matches!(self.backend, StorageBackend::Persistent(_))
    }

    fn log(&self) -> &dyn MessageLog {
        match &self.backend {
            StorageBackend::InMemory(log) => log,
            StorageBackend::Persistent(log) => log,
        }
    }

    fn log_mut(&mut self) -> &mut dyn MessageLog {
        match &mut self.backend {
            StorageBackend::InMemory(log) => log,
            StorageBackend::Persistent(log) => log,
        }
    }

    // =========================================================================
    // WRITES
    // =========================================================================

    /// Validate and append a report.
    pub fn ingest(&mut self, report: AgentReport) -> Result<StoredReport, KozaError> {
        report.validate()?;
        let stored = self.log_mut().append(report)?;
        tracing::debug!(
            agent = %stored.agent(),
            received_at = %stored.received_at,
            "report ingested"
        );
        Ok(stored)
    }

    /// Validate and append a batch. Stops at the first invalid report;
    /// reports before it stay appended.
    pub fn ingest_all(
        &mut self,
        reports: impl IntoIterator<Item = AgentReport>,
    ) -> Result<Vec<StoredReport>, KozaError> {
        reports.into_iter().map(|r| self.ingest(r)).collect()
    }

    /// Record an actuator switch in the audit trail.
    pub fn record_actuator(&mut self, entry: AuditEntry) -> Result<AuditEntry, KozaError> {
        let entry = self.log_mut().append_audit(entry)?;
        tracing::debug!(
            actuator = %entry.actuator(),
            mode = %entry.command.mode,
            state = entry.command.state,
            "actuator switch recorded"
        );
        Ok(entry)
    }

    // =========================================================================
    // READS
    // =========================================================================

    /// Newest-first audit entries, optionally for one actuator. The limit is capped.
    pub fn actuator_audit(
        &self,
        actuator: Option<Actuator>,
        limit: usize,
    ) -> Result<Vec<AuditEntry>, KozaError> {
        self.log().list_audit(actuator, bounded_limit(limit))
    }

    /// Newest-first messages, optionally for one agent. The limit is capped.
    pub fn messages(
        &self,
        agent: Option<AgentKind>,
        limit: usize,
    ) -> Result<Vec<StoredReport>, KozaError> {
        let limit = bounded_limit(limit);
        match agent {
            Some(agent) => self.log().list_by_agent(agent, limit),
            None => self.log().list(limit),
        }
    }

    /// Total stored reports, 0 if the count cannot be read.
    #[must_use]
    pub fn message_count(&self) -> usize {
        log_and_default(self.log().len(), "message_count")
    }

    /// Latest stored report for every agent.
    #[must_use]
    pub fn latest_reports(&self) -> LatestReports {
        let latest = |agent: AgentKind| {
            log_and_convert(self.log().latest_by_agent(agent), "latest_by_agent").flatten()
        };

        LatestReports {
            environment: latest(AgentKind::Environment),
            vision: latest(AgentKind::Vision),
            predictive: latest(AgentKind::PredictiveAi),
            quality: latest(AgentKind::Quality),
        }
    }

    /// Fused dashboard snapshot over the latest reports.
    #[must_use]
    pub fn dashboard_snapshot(&self) -> DashboardSnapshot {
        compute_dashboard_snapshot(self.latest_reports())
    }

    /// Most recent environment readings, newest first.
    #[must_use]
    pub fn environment_series(&self, lookback: usize) -> Vec<EnvironmentSample> {
        let reports = log_and_default(
            self.log()
                .list_by_agent(AgentKind::Environment, bounded_limit(lookback)),
            "environment_series",
        );
        reports
            .iter()
            .filter_map(|s| s.report.as_environment())
            .map(EnvironmentSample::from)
            .collect()
    }

    /// Stability of the recent environment against the effective stage.
    #[must_use]
    pub fn environment_stability(
        &self,
        config: &DeviceConfig,
        now_ms: i64,
        lookback: usize,
    ) -> StabilityReport {
        let stage = config.effective_stage(now_ms, &StageSchedule::default());
        let series = self.environment_series(lookback);
        compute_environment_stability_with(
            &series,
            config.thresholds_for(&stage),
            &config.calibration,
        )
    }

    /// Score a vision payload against the current stability score.
    #[must_use]
    pub fn quality_score(
        &self,
        payload: &serde_json::Value,
        config: &DeviceConfig,
        now_ms: i64,
        lookback: usize,
    ) -> QualityResult {
        let stability = self.environment_stability(config, now_ms, lookback);
        compute_quality_score(payload, f64::from(stability.score))
    }
}

// =============================================================================
// TESTS
// =============================================================================
