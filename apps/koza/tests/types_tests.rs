//! Unit tests for API types serialization/deserialization.

#![allow(clippy::unwrap_used, clippy::panic)]

use koza::api::{
    AuditQuery, ErrorResponse, HealthResponse, MessagesQuery, QualityQuery, StabilityQuery,
    StageResponse,
};
use koza_core::{AgentKind, KozaError, StageProgress, default_thresholds};

// =============================================================================
// HEALTH RESPONSE TESTS
// =============================================================================

#[test]
fn test_health_response_default() {
    let health = HealthResponse::default();
    assert_eq!(health.status, "ok");
    assert!(!health.version.is_empty());
}

#[test]
fn test_health_response_serialization() {
    let health = HealthResponse {
        status: "ok".to_string(),
        version: "0.4.2".to_string(),
    };

    let json = serde_json::to_string(&health).unwrap();
    assert!(json.contains("\"status\":\"ok\""));
    assert!(json.contains("\"version\":\"0.4.2\""));
}

// =============================================================================
// ERROR RESPONSE TESTS
// =============================================================================

#[test]
fn test_error_response_shape() {
    let json = serde_json::to_value(ErrorResponse::new("Unknown agent: weather")).unwrap();
    assert_eq!(json, serde_json::json!({"error": "Unknown agent: weather"}));
}

// =============================================================================
// QUERY PARAMETER TESTS
// =============================================================================

#[test]
fn test_messages_query_defaults() {
    let query: MessagesQuery = serde_json::from_str("{}").unwrap();
    assert_eq!(query.limit(), 50);
    assert!(query.agent().unwrap().is_none());
}

#[test]
fn test_messages_query_agent_parsing() {
    let query = MessagesQuery {
        agent: Some("predictive_ai".to_string()),
        limit: Some(5),
    };
    assert_eq!(query.agent().unwrap(), Some(AgentKind::PredictiveAi));
    assert_eq!(query.limit(), 5);

    let blank = MessagesQuery {
        agent: Some("  ".to_string()),
        limit: None,
    };
    assert!(blank.agent().unwrap().is_none());

    let unknown = MessagesQuery {
        agent: Some("Vision".to_string()),
        limit: None,
    };
    assert!(matches!(unknown.agent(), Err(KozaError::InvalidAgent(_))));
}

#[test]
fn test_quality_query_publish_defaults_false() {
    let query: QualityQuery = serde_json::from_str("{}").unwrap();
    assert!(!query.publish);
}

#[test]
fn test_stability_query_limit_optional() {
    let query: StabilityQuery = serde_json::from_str(r#"{"limit": 12}"#).unwrap();
    assert_eq!(query.limit, Some(12));
}

// =============================================================================
// STAGE RESPONSE TESTS
// =============================================================================

#[test]
fn test_stage_response_omits_missing_progress() {
    let response = StageResponse {
        stage: "larva_4".to_string(),
        targets: None,
        active_stage: "larva_4".to_string(),
        auto_enabled: false,
        start_stage: "larva_1".to_string(),
        start_at: None,
        progress: None,
    };

    let json = serde_json::to_value(&response).unwrap();
    assert!(json.get("progress").is_none());
    assert!(json.get("targets").is_none());
    assert!(json["start_at"].is_null());
}

#[test]
fn test_stage_response_round_trip_with_progress() {
    let response = StageResponse {
        stage: "larva_2".to_string(),
        targets: Some(default_thresholds("larva_2").targets()),
        active_stage: "larva_4".to_string(),
        auto_enabled: true,
        start_stage: "larva_1".to_string(),
        start_at: Some("2026-03-01T00:00:00Z".to_string()),
        progress: Some(StageProgress {
            stage: "larva_2".to_string(),
            elapsed_days: Some(4),
            day_in_stage: 1,
            stage_days: Some(3),
        }),
    };

    let json = serde_json::to_string(&response).unwrap();
    let back: StageResponse = serde_json::from_str(&json).unwrap();
    assert_eq!(back.progress, response.progress);
    assert_eq!(back.targets, response.targets);
    assert_eq!(back.start_at.as_deref(), Some("2026-03-01T00:00:00Z"));
}

// =============================================================================
// AUDIT QUERY TESTS
// =============================================================================

#[test]
fn test_audit_query_defaults() {
    let query: AuditQuery = serde_json::from_str("{}").unwrap();
    assert_eq!(query.actuator().unwrap(), None);
    assert_eq!(query.limit(), 50);
}

#[test]
fn test_audit_query_parses_actuator() {
    let query = AuditQuery {
        actuator: Some(" humidifier ".to_string()),
        limit: Some(5),
    };
    assert_eq!(query.actuator().unwrap(), Some(koza_core::Actuator::Humidifier));
    assert_eq!(query.limit(), 5);

    let blank = AuditQuery {
        actuator: Some(String::new()),
        limit: None,
    };
    assert_eq!(blank.actuator().unwrap(), None);

    let unknown = AuditQuery {
        actuator: Some("window".to_string()),
        limit: None,
    };
    assert!(matches!(unknown.actuator(), Err(KozaError::InvalidActuator(_))));
}
