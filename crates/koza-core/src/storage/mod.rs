//! # Storage Module
//!
//! Persistent message-log backends.

mod redb_log;

pub use redb_log::RedbLog;
