//! # redb-backed Message Log
//!
//! A disk-backed `MessageLog` using the redb embedded database.
//!
//! ## Layout
//!
//! - `messages`: sequence number -> JSON-encoded `StoredReport`
//! - `agent_index`: (agent code, sequence number) -> sequence number
//! - `actuator_audit`: audit sequence number -> JSON-encoded `AuditEntry`
//! - `metadata`: `next_seq` and `next_audit_seq` counters
//!
//! Sequence numbers are assigned at append time and define recency, so every
//! "latest" and "list" query is a reverse range scan.

use crate::audit::{Actuator, AuditEntry};
use crate::log::MessageLog;
use crate::{AgentKind, KozaError, StoredReport};
use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use std::path::Path;

/// Table for messages: seq(u64) -> serialized StoredReport bytes
const MESSAGES: TableDefinition<u64, &[u8]> = TableDefinition::new("messages");

/// Table for the per-agent index: (agent code, seq) -> seq
const AGENT_INDEX: TableDefinition<(u8, u64), u64> = TableDefinition::new("agent_index");

/// Table for the actuator audit trail: audit seq(u64) -> serialized AuditEntry bytes
const ACTUATOR_AUDIT: TableDefinition<u64, &[u8]> = TableDefinition::new("actuator_audit");

/// Table for metadata: key string -> value u64
const METADATA: TableDefinition<&str, u64> = TableDefinition::new("metadata");

const NEXT_SEQ_KEY: &str = "next_seq";
const NEXT_AUDIT_SEQ_KEY: &str = "next_audit_seq";

fn io_err(e: impl std::fmt::Display) -> KozaError {
    KozaError::IoError(e.to_string())
}

/// A disk-backed message log using redb.
pub struct RedbLog {
    /// The redb database handle.
    db: Database,
    /// Next sequence number to assign.
    next_seq: u64,
    /// Next audit sequence number to assign.
    next_audit_seq: u64,
}

impl std::fmt::Debug for RedbLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbLog")
            .field("next_seq", &self.next_seq)
            .field("next_audit_seq", &self.next_audit_seq)
            .finish_non_exhaustive()
    }
}

impl RedbLog {
    /// Open or create a log database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, KozaError> {
        let db = Database::create(path.as_ref()).map_err(io_err)?;

        // Initialize tables if they don't exist
        {
            let write_txn = db.begin_write().map_err(io_err)?;
            let _ = write_txn.open_table(MESSAGES).map_err(io_err)?;
            let _ = write_txn.open_table(AGENT_INDEX).map_err(io_err)?;
            let _ = write_txn.open_table(ACTUATOR_AUDIT).map_err(io_err)?;
            let _ = write_txn.open_table(METADATA).map_err(io_err)?;
            write_txn.commit().map_err(io_err)?;
        }

        let (next_seq, next_audit_seq) = {
            let read_txn = db.begin_read().map_err(io_err)?;
            let table = read_txn.open_table(METADATA).map_err(io_err)?;
            let counter = |key: &str| -> Result<u64, KozaError> {
                Ok(table.get(key).map_err(io_err)?.map(|v| v.value()).unwrap_or(0))
            };
            (counter(NEXT_SEQ_KEY)?, counter(NEXT_AUDIT_SEQ_KEY)?)
        };

        Ok(Self {
            db,
            next_seq,
            next_audit_seq,
        })
    }

    fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T, KozaError> {
        serde_json::from_slice(bytes).map_err(|e| KozaError::DeserializationError(e.to_string()))
    }
}

impl MessageLog for RedbLog {
    fn append_stored(&mut self, stored: StoredReport) -> Result<StoredReport, KozaError> {
        let bytes = serde_json::to_vec(&stored)
            .map_err(|e| KozaError::SerializationError(e.to_string()))?;
        let seq = self.next_seq;
        let next = seq.checked_add(1).ok_or_else(|| io_err("sequence exhausted"))?;

        let write_txn = self.db.begin_write().map_err(io_err)?;
        {
            let mut messages = write_txn.open_table(MESSAGES).map_err(io_err)?;
            let mut index = write_txn.open_table(AGENT_INDEX).map_err(io_err)?;
            let mut meta = write_txn.open_table(METADATA).map_err(io_err)?;

            messages.insert(seq, bytes.as_slice()).map_err(io_err)?;
            index
                .insert((stored.agent().code(), seq), seq)
                .map_err(io_err)?;
            meta.insert(NEXT_SEQ_KEY, next).map_err(io_err)?;
        }
        write_txn.commit().map_err(io_err)?;

        // Only advance once the transaction is durable.
        self.next_seq = next;
        Ok(stored)
    }

    fn list(&self, limit: usize) -> Result<Vec<StoredReport>, KozaError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let messages = read_txn.open_table(MESSAGES).map_err(io_err)?;

        let mut out = Vec::with_capacity(limit.min(64));
        for entry in messages.iter().map_err(io_err)?.rev().take(limit) {
            let (_seq, value) = entry.map_err(io_err)?;
            out.push(Self::decode(value.value())?);
        }
        Ok(out)
    }

    fn list_by_agent(
        &self,
        agent: AgentKind,
        limit: usize,
    ) -> Result<Vec<StoredReport>, KozaError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let index = read_txn.open_table(AGENT_INDEX).map_err(io_err)?;
        let messages = read_txn.open_table(MESSAGES).map_err(io_err)?;

        let code = agent.code();
        let mut out = Vec::with_capacity(limit.min(64));
        for entry in index
            .range((code, 0u64)..=(code, u64::MAX))
            .map_err(io_err)?
            .rev()
            .take(limit)
        {
            let (_key, seq) = entry.map_err(io_err)?;
            let seq = seq.value();
            let bytes = messages
                .get(seq)
                .map_err(io_err)?
                .ok_or_else(|| io_err(format!("index points at missing message {}", seq)))?;
            out.push(Self::decode(bytes.value())?);
        }
        Ok(out)
    }

    fn len(&self) -> Result<usize, KozaError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let messages = read_txn.open_table(MESSAGES).map_err(io_err)?;
        Ok(messages.len().map_err(io_err)? as usize)
    }

    fn append_audit(&mut self, entry: AuditEntry) -> Result<AuditEntry, KozaError> {
        let bytes = serde_json::to_vec(&entry)
            .map_err(|e| KozaError::SerializationError(e.to_string()))?;
        let seq = self.next_audit_seq;
        let next = seq
            .checked_add(1)
            .ok_or_else(|| io_err("audit sequence exhausted"))?;

        let write_txn = self.db.begin_write().map_err(io_err)?;
        {
            let mut audit = write_txn.open_table(ACTUATOR_AUDIT).map_err(io_err)?;
            let mut meta = write_txn.open_table(METADATA).map_err(io_err)?;
            audit.insert(seq, bytes.as_slice()).map_err(io_err)?;
            meta.insert(NEXT_AUDIT_SEQ_KEY, next).map_err(io_err)?;
        }
        write_txn.commit().map_err(io_err)?;

        self.next_audit_seq = next;
        Ok(entry)
    }

    fn list_audit(
        &self,
        actuator: Option<Actuator>,
        limit: usize,
    ) -> Result<Vec<AuditEntry>, KozaError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let audit = read_txn.open_table(ACTUATOR_AUDIT).map_err(io_err)?;

        let mut out = Vec::with_capacity(limit.min(64));
        for entry in audit.iter().map_err(io_err)?.rev() {
            if out.len() >= limit {
                break;
            }
            let (_seq, value) = entry.map_err(io_err)?;
            let decoded: AuditEntry = Self::decode(value.value())?;
            if actuator.is_none_or(|a| decoded.actuator() == a) {
                out.push(decoded);
            }
        }
        Ok(out)
    }
}
