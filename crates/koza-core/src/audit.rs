//! # Actuator Audit Trail
//!
//! Every actuator switch issued by the dashboard or a device is recorded
//! with who asked for it. The trail is append-only and independent of the
//! agent reports: the orchestrator recommends, the audit records what was
//! actually switched.
//!
//! ## Wire Shape
//!
//! ```json
//! {"actuator": "heater", "mode": "manual", "state": true, "payload": {"source": "panel"}}
//! ```

use crate::KozaError;
use crate::fusion::ActuatorPlan;
use crate::primitives::{MAX_CLIENT_IP_LENGTH, MAX_USER_AGENT_LENGTH};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

// =============================================================================
// ACTUATORS
// =============================================================================

/// A switchable device in the rearing room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Actuator {
    Ventilation,
    Lighting,
    Heater,
    Humidifier,
}

impl Actuator {
    pub const ALL: [Actuator; 4] = [
        Actuator::Ventilation,
        Actuator::Lighting,
        Actuator::Heater,
        Actuator::Humidifier,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Actuator::Ventilation => "ventilation",
            Actuator::Lighting => "lighting",
            Actuator::Heater => "heater",
            Actuator::Humidifier => "humidifier",
        }
    }

    /// Whether the orchestrator's plan asks for this actuator to be on.
    #[must_use]
    pub const fn planned_in(&self, plan: &ActuatorPlan) -> bool {
        match self {
            Actuator::Ventilation => plan.ventilation,
            Actuator::Lighting => plan.lighting,
            Actuator::Heater => plan.heater,
            Actuator::Humidifier => plan.humidifier,
        }
    }
}

impl fmt::Display for Actuator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Actuator {
    type Err = KozaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Actuator::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| KozaError::InvalidActuator(s.to_string()))
    }
}

/// Who drove the switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActuatorMode {
    Auto,
    Manual,
}

impl ActuatorMode {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ActuatorMode::Auto => "auto",
            ActuatorMode::Manual => "manual",
        }
    }
}

impl fmt::Display for ActuatorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// COMMANDS AND ENTRIES
// =============================================================================

/// An actuator command as posted by a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActuatorCommand {
    pub actuator: Actuator,
    pub mode: ActuatorMode,
    pub state: bool,
    /// Free-form context. Only JSON objects are kept.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

/// One row of the audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    #[serde(flatten)]
    pub command: ActuatorCommand,
    #[serde(default)]
    pub client_ip: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AuditEntry {
    /// Build an entry stamped with `created_at`.
    ///
    /// Non-object payloads are dropped; blank client fields become `None`
    /// and long ones are cut to their column limits.
    #[must_use]
    pub fn new(
        mut command: ActuatorCommand,
        client_ip: Option<&str>,
        user_agent: Option<&str>,
        created_at: DateTime<Utc>,
    ) -> Self {
        if !command.payload.as_ref().is_some_and(Value::is_object) {
            command.payload = None;
        }
        Self {
            command,
            client_ip: client_field(client_ip, MAX_CLIENT_IP_LENGTH),
            user_agent: client_field(user_agent, MAX_USER_AGENT_LENGTH),
            created_at,
        }
    }

    /// Stamp an entry with the current wall-clock time.
    #[must_use]
    pub fn recorded_now(
        command: ActuatorCommand,
        client_ip: Option<&str>,
        user_agent: Option<&str>,
    ) -> Self {
        Self::new(command, client_ip, user_agent, Utc::now())
    }

    #[must_use]
    pub const fn actuator(&self) -> Actuator {
        self.command.actuator
    }
}

fn client_field(value: Option<&str>, max_chars: usize) -> Option<String> {
    let trimmed = value.map(str::trim).filter(|v| !v.is_empty())?;
    Some(trimmed.chars().take(max_chars).collect())
}

// =============================================================================
// TESTS
// =============================================================================
