//! # API Endpoint Handlers
//!
//! Every handler reads the clock once, takes the locks it needs and delegates
//! to `koza-core`. Errors are rendered as `{"error": "..."}`.

use super::{
    AppState,
    types::{
        AuditQuery, ErrorResponse, HealthResponse, MessagesQuery, QualityQuery, StabilityQuery,
        StageResponse,
    },
};
use crate::device_config::save_device_config;
use axum::{
    Json,
    extract::{
        ConnectInfo, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{Extensions, HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use koza_core::{
    ActuatorCommand, AgentReport, AuditEntry, DashboardSnapshot, DeviceConfig, KozaError,
    QualityResult, StabilityReport, StageSchedule, StageThresholds, StoredReport,
    primitives::STABILITY_LOOKBACK,
};
use serde_json::Value;
use std::net::SocketAddr;

// =============================================================================
// ERROR MAPPING
// =============================================================================

/// A handler failure: status code plus message.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<KozaError> for ApiError {
    fn from(err: KozaError) -> Self {
        let status = match err {
            KozaError::InvalidReport(_)
            | KozaError::InvalidAgent(_)
            | KozaError::InvalidActuator(_)
            | KozaError::InvalidThresholds { .. }
            | KozaError::DeserializationError(_)
            | KozaError::ConfigError(_) => StatusCode::BAD_REQUEST,
            KozaError::SerializationError(_) | KozaError::IoError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, error = %self.message, "request failed");
        }
        (self.status, Json(ErrorResponse::new(self.message))).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

// =============================================================================
// HEALTH HANDLER
// =============================================================================

/// Health check endpoint.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

// =============================================================================
// MESSAGE HANDLERS
// =============================================================================

/// Validate and append one agent report.
pub async fn ingest_handler(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<StoredReport>)> {
    let Json(value) = payload?;
    let report: AgentReport = serde_json::from_value(value)
        .map_err(|e| ApiError::bad_request(format!("Invalid report: {}", e)))?;

    let mut session = state.session.write().await;
    let stored = session.ingest(report)?;
    tracing::info!(
        event = "ingest",
        agent = %stored.agent(),
        timestamp = stored.report.timestamp(),
        "report stored"
    );

    Ok((StatusCode::CREATED, Json(stored)))
}

/// Newest-first message list, optionally for one agent.
pub async fn list_messages_handler(
    State(state): State<AppState>,
    query: Result<Query<MessagesQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<StoredReport>>> {
    let Query(query) = query?;
    let agent = query.agent()?;
    let session = state.session.read().await;
    Ok(Json(session.messages(agent, query.limit())?))
}

// =============================================================================
// DERIVED VIEWS
// =============================================================================

/// Fused status over the latest report of every agent.
pub async fn snapshot_handler(State(state): State<AppState>) -> Json<DashboardSnapshot> {
    let session = state.session.read().await;
    Json(session.dashboard_snapshot())
}

/// Stability of the recent environment against the effective stage.
pub async fn stability_handler(
    State(state): State<AppState>,
    query: Result<Query<StabilityQuery>, QueryRejection>,
) -> ApiResult<Json<StabilityReport>> {
    let Query(query) = query?;
    let config = state.config.read().await.clone();
    let session = state.session.read().await;
    let lookback = query.limit.unwrap_or(STABILITY_LOOKBACK);
    Ok(Json(session.environment_stability(&config, now_ms(), lookback)))
}

/// Score a raw vision payload. With `?publish=true` an applicable result is
/// also stored as a quality report.
pub async fn quality_handler(
    State(state): State<AppState>,
    query: Result<Query<QualityQuery>, QueryRejection>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<QualityResult>> {
    let Query(query) = query?;
    let Json(payload) = payload?;
    let config = state.config.read().await.clone();
    let now = now_ms();

    if !query.publish {
        let session = state.session.read().await;
        return Ok(Json(session.quality_score(
            &payload,
            &config,
            now,
            STABILITY_LOOKBACK,
        )));
    }

    let mut session = state.session.write().await;
    let result = session.quality_score(&payload, &config, now, STABILITY_LOOKBACK);
    if let Some(report) = result.to_report(Utc::now().to_rfc3339()) {
        let stored = session.ingest(AgentReport::Quality(report))?;
        tracing::info!(
            event = "quality_published",
            grade = %result.grade,
            score = result.quality_score,
            received_at = %stored.received_at,
            "quality result stored"
        );
    }
    Ok(Json(result))
}

// =============================================================================
// ACTUATOR AUDIT
// =============================================================================

/// Client address: first `x-forwarded-for` hop, then `x-real-ip`, then the
/// socket peer.
fn client_addr(headers: &HeaderMap, extensions: &Extensions) -> Option<String> {
    let header_value = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|raw| raw.split(',').map(str::trim).find(|part| !part.is_empty()))
            .map(str::to_string)
    };

    header_value("x-forwarded-for")
        .or_else(|| header_value("x-real-ip"))
        .or_else(|| {
            extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ci| ci.0.ip().to_string())
        })
}

/// Record an actuator switch.
pub async fn record_actuator_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    extensions: Extensions,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<AuditEntry>)> {
    let Json(value) = payload?;
    let command: ActuatorCommand = serde_json::from_value(value)
        .map_err(|e| ApiError::bad_request(format!("Invalid actuator command: {}", e)))?;

    let client_ip = client_addr(&headers, &extensions);
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok());
    let entry = AuditEntry::recorded_now(command, client_ip.as_deref(), user_agent);

    let mut session = state.session.write().await;
    let planned = entry
        .actuator()
        .planned_in(&session.dashboard_snapshot().actuators);
    let entry = session.record_actuator(entry)?;
    tracing::info!(
        event = "actuator_switch",
        actuator = %entry.actuator(),
        mode = %entry.command.mode,
        state = entry.command.state,
        planned,
        client_ip = entry.client_ip.as_deref().unwrap_or("-"),
        "actuator switch recorded"
    );

    Ok((StatusCode::CREATED, Json(entry)))
}

/// Newest-first audit trail, optionally for one actuator.
pub async fn list_actuator_audit_handler(
    State(state): State<AppState>,
    query: Result<Query<AuditQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<AuditEntry>>> {
    let Query(query) = query?;
    let actuator = query.actuator()?;
    let session = state.session.read().await;
    Ok(Json(session.actuator_audit(actuator, query.limit())?))
}

// =============================================================================
// STAGE AND CONFIGURATION
// =============================================================================

/// Stage currently in force.
pub async fn stage_handler(State(state): State<AppState>) -> Json<StageResponse> {
    let config = state.config.read().await;
    let schedule = StageSchedule::default();
    let now = now_ms();

    let progress = match (&config.auto_stage.start_at, config.auto_stage.enabled) {
        (Some(start_at), true) => {
            Some(schedule.progress(&config.auto_stage.start_stage, start_at, now))
        }
        _ => None,
    };

    let stage = config.effective_stage(now, &schedule);
    let targets = config.thresholds_for(&stage).map(StageThresholds::targets);

    Json(StageResponse {
        stage,
        targets,
        active_stage: config.active_stage.clone(),
        auto_enabled: config.auto_stage.enabled,
        start_stage: config.auto_stage.start_stage.clone(),
        start_at: config.auto_stage.start_at.clone(),
        progress,
    })
}

/// Current device configuration.
pub async fn get_config_handler(State(state): State<AppState>) -> Json<DeviceConfig> {
    Json(state.config.read().await.clone())
}

/// Replace the device configuration. Missing stages are filled from the
/// defaults; the result is validated and, if the server has a config file,
/// written back before it takes effect.
pub async fn put_config_handler(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<DeviceConfig>> {
    let Json(value) = payload?;
    let config: DeviceConfig = serde_json::from_value(value)
        .map_err(|e| ApiError::bad_request(format!("Invalid config: {}", e)))?;
    let config = config.with_defaults();
    config.validate()?;

    let mut current = state.config.write().await;
    if let Some(path) = state.config_path.as_deref() {
        save_device_config(path, &config)?;
    }
    *current = config.clone();
    tracing::info!(
        event = "config_updated",
        active_stage = %config.active_stage,
        auto_stage = config.auto_stage.enabled,
        "device config replaced"
    );

    Ok(Json(config))
}
