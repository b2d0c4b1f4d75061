//! # Message Log
//!
//! Append-only history of agent reports and of actuator switches.
//!
//! This module defines the `MessageLog` trait and the in-memory backend.
//! "Latest" always means most recently appended, never the report's own
//! `timestamp` field: delivery order wins over device clocks.

use crate::audit::{Actuator, AuditEntry};
use crate::{AgentKind, AgentReport, KozaError, StoredReport};

// =============================================================================
// MESSAGELOG TRAIT
// =============================================================================

/// The MessageLog trait defines the storage operations the orchestrator needs.
///
/// All lists are newest-first and bounded by the caller's limit.
///
/// All fallible operations return `Result<T, KozaError>` so in-memory and
/// persistent backends can be used uniformly.
pub trait MessageLog {
    /// Append an already-stamped report. Durable before returning.
    fn append_stored(&mut self, stored: StoredReport) -> Result<StoredReport, KozaError>;

    /// Stamp a report with the current time and append it.
    fn append(&mut self, report: AgentReport) -> Result<StoredReport, KozaError> {
        self.append_stored(StoredReport::received_now(report))
    }

    /// Most recent reports across all agents.
    fn list(&self, limit: usize) -> Result<Vec<StoredReport>, KozaError>;

    /// Most recent reports from one agent.
    fn list_by_agent(&self, agent: AgentKind, limit: usize)
    -> Result<Vec<StoredReport>, KozaError>;

    /// The most recently appended report from one agent.
    fn latest_by_agent(&self, agent: AgentKind) -> Result<Option<StoredReport>, KozaError> {
        Ok(self.list_by_agent(agent, 1)?.into_iter().next())
    }

    /// Total number of stored reports.
    fn len(&self) -> Result<usize, KozaError>;

    fn is_empty(&self) -> Result<bool, KozaError> {
        Ok(self.len()? == 0)
    }

    /// Append an actuator audit entry.
    fn append_audit(&mut self, entry: AuditEntry) -> Result<AuditEntry, KozaError>;

    /// Most recent audit entries, optionally for one actuator.
    fn list_audit(
        &self,
        actuator: Option<Actuator>,
        limit: usize,
    ) -> Result<Vec<AuditEntry>, KozaError>;
}

// =============================================================================
// IN-MEMORY BACKEND
// =============================================================================

/// Volatile log backed by `Vec`s in append order.
#[derive(Debug, Clone, Default)]
pub struct MemoryLog {
    entries: Vec<StoredReport>,
    audit: Vec<AuditEntry>,
}

impl MemoryLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl MessageLog for MemoryLog {
    fn append_stored(&mut self, stored: StoredReport) -> Result<StoredReport, KozaError> {
        self.entries.push(stored.clone());
        Ok(stored)
    }

    fn list(&self, limit: usize) -> Result<Vec<StoredReport>, KozaError> {
        Ok(self.entries.iter().rev().take(limit).cloned().collect())
    }

    fn list_by_agent(
        &self,
        agent: AgentKind,
        limit: usize,
    ) -> Result<Vec<StoredReport>, KozaError> {
        Ok(self
            .entries
            .iter()
            .rev()
            .filter(|s| s.agent() == agent)
            .take(limit)
            .cloned()
            .collect())
    }

    fn latest_by_agent(&self, agent: AgentKind) -> Result<Option<StoredReport>, KozaError> {
        Ok(self.entries.iter().rev().find(|s| s.agent() == agent).cloned())
    }

    fn len(&self) -> Result<usize, KozaError> {
        Ok(self.entries.len())
    }

    fn append_audit(&mut self, entry: AuditEntry) -> Result<AuditEntry, KozaError> {
        self.audit.push(entry.clone());
        Ok(entry)
    }

    fn list_audit(
        &self,
        actuator: Option<Actuator>,
        limit: usize,
    ) -> Result<Vec<AuditEntry>, KozaError> {
        Ok(self
            .audit
            .iter()
            .rev()
            .filter(|e| actuator.is_none_or(|a| e.actuator() == a))
            .take(limit)
            .cloned()
            .collect())
    }
}

// =============================================================================
// TESTS
// =============================================================================
