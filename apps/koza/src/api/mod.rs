//! # KozaTakip HTTP API Module
//!
//! The REST API used by the agents (to post reports) and by the dashboard
//! (to read the fused status and the scores).
//!
//! ## Endpoints
//!
//! - `GET /health` - Health check (never authenticated)
//! - `POST /messages` - Ingest one agent report
//! - `GET /messages?agent=&limit=` - Newest-first reports
//! - `GET /dashboard/snapshot` - Latest reports, fused status, actuator plan
//! - `GET /environment/stability?limit=` - Environmental stability score
//! - `POST /quality/score?publish=` - Score a vision payload
//! - `POST /actuators/audit` - Record an actuator switch
//! - `GET /actuators/audit?actuator=&limit=` - Newest-first actuator switches
//! - `GET /stage` - Stage currently in force and its set points
//! - `GET /config`, `PUT /config` - Device configuration
//!
//! ## Security Configuration (Environment Variables)
//!
//! - `KOZA_CORS_ORIGINS`: Comma-separated list of allowed origins, or "*" for all (default: localhost only)
//! - `KOZA_RATE_LIMIT`: Requests per second (default: 100, 0 to disable)
//! - `KOZA_API_KEY`: If set, requires `Authorization: Bearer <key>` or `x-api-key: <key>`

mod auth;
mod handlers;
mod middleware;
mod types;

pub use auth::get_api_key_from_env;
pub use handlers::ApiError;
pub use middleware::{create_rate_limiter, get_rate_limit_from_env};
pub use types::{
    AuditQuery, ErrorResponse, HealthResponse, MessagesQuery, QualityQuery, StabilityQuery,
    StageResponse,
};

use axum::{
    Router,
    http::{HeaderName, HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::{get, post},
};
use koza_core::{DeviceConfig, KozaError, Session};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Request body limit for every route.
const BODY_LIMIT_BYTES: usize = 2 * 1024 * 1024;

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state: the message log and the device configuration.
#[derive(Clone)]
pub struct AppState {
    pub session: Arc<RwLock<Session>>,
    pub config: Arc<RwLock<DeviceConfig>>,
    /// Where `PUT /config` writes back. `None` keeps changes in memory.
    pub config_path: Option<Arc<PathBuf>>,
}

impl AppState {
    /// App state with the default device configuration and no config file.
    #[must_use]
    pub fn new(session: Session) -> Self {
        Self::with_config(session, DeviceConfig::default(), None)
    }

    #[must_use]
    pub fn with_config(
        session: Session,
        config: DeviceConfig,
        config_path: Option<PathBuf>,
    ) -> Self {
        Self {
            session: Arc::new(RwLock::new(session)),
            config: Arc::new(RwLock::new(config)),
            config_path: config_path.map(Arc::new),
        }
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

const CORS_METHODS: [Method; 4] = [Method::GET, Method::POST, Method::PUT, Method::OPTIONS];

fn cors_headers() -> [HeaderName; 3] {
    [
        header::CONTENT_TYPE,
        header::AUTHORIZATION,
        HeaderName::from_static(auth::API_KEY_HEADER),
    ]
}

/// Build CORS layer from `KOZA_CORS_ORIGINS`:
/// - `*`: allow all origins (development only)
/// - unset: localhost only
/// - otherwise: comma-separated list of allowed origins
fn build_cors_layer() -> CorsLayer {
    let origins_env = std::env::var("KOZA_CORS_ORIGINS").ok();

    match origins_env.as_deref() {
        Some("*") => {
            tracing::warn!(
                "CORS: Allowing ALL origins (KOZA_CORS_ORIGINS=*). This is insecure for production!"
            );
            CorsLayer::permissive()
        }
        Some(origins) => {
            let allowed_origins: Vec<HeaderValue> = origins
                .split(',')
                .filter_map(|s| {
                    let trimmed = s.trim();
                    match trimmed.parse::<HeaderValue>() {
                        Ok(hv) => {
                            tracing::info!("CORS: Allowing origin: {}", trimmed);
                            Some(hv)
                        }
                        Err(e) => {
                            tracing::warn!("CORS: Invalid origin '{}': {}", trimmed, e);
                            None
                        }
                    }
                })
                .collect();

            if allowed_origins.is_empty() {
                tracing::warn!(
                    "CORS: No valid origins in KOZA_CORS_ORIGINS, defaulting to localhost only"
                );
                build_localhost_cors()
            } else {
                CorsLayer::new()
                    .allow_origin(allowed_origins)
                    .allow_methods(CORS_METHODS)
                    .allow_headers(cors_headers())
            }
        }
        None => {
            tracing::info!("CORS: No KOZA_CORS_ORIGINS set, defaulting to localhost only");
            build_localhost_cors()
        }
    }
}

/// Localhost origins of the dashboard dev server and the API itself.
fn build_localhost_cors() -> CorsLayer {
    let origins: Vec<HeaderValue> = [
        "http://localhost:5173",
        "http://localhost:8080",
        "http://127.0.0.1:5173",
        "http://127.0.0.1:8080",
    ]
    .into_iter()
    .filter_map(|o| o.parse::<HeaderValue>().ok())
    .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(CORS_METHODS)
        .allow_headers(cors_headers())
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the axum router with all endpoints and middleware.
///
/// Middleware stack (outer to inner):
/// 1. Tracing - logs all requests
/// 2. CORS - handles preflight requests
/// 3. Body limit
/// 4. Rate Limiting - if enabled
/// 5. Authentication - if `KOZA_API_KEY` is set
pub fn create_router(state: AppState) -> Router {
    let cors = build_cors_layer();

    let rate_limit = get_rate_limit_from_env();
    let rate_limiter = if rate_limit > 0 {
        tracing::info!("Rate limiting enabled: {} requests/second", rate_limit);
        Some(create_rate_limiter(rate_limit))
    } else {
        tracing::info!("Rate limiting disabled");
        None
    };

    let has_auth = get_api_key_from_env().is_some();
    if has_auth {
        tracing::info!("API key authentication enabled");
    } else {
        tracing::warn!(
            "API key authentication DISABLED - all endpoints are publicly accessible! \
             Set KOZA_API_KEY to enable authentication."
        );
    }

    let mut router = Router::new()
        .route("/health", get(handlers::health_handler))
        .route(
            "/messages",
            post(handlers::ingest_handler).get(handlers::list_messages_handler),
        )
        .route("/dashboard/snapshot", get(handlers::snapshot_handler))
        .route("/environment/stability", get(handlers::stability_handler))
        .route("/quality/score", post(handlers::quality_handler))
        .route(
            "/actuators/audit",
            post(handlers::record_actuator_handler).get(handlers::list_actuator_audit_handler),
        )
        .route("/stage", get(handlers::stage_handler))
        .route(
            "/config",
            get(handlers::get_config_handler).put(handlers::put_config_handler),
        );

    if has_auth {
        router = router.layer(axum_middleware::from_fn(auth::api_key_auth_middleware));
    }

    if let Some(limiter) = rate_limiter {
        router = router.layer(axum_middleware::from_fn_with_state(
            limiter,
            middleware::rate_limit_middleware,
        ));
    }

    router
        .layer(axum::extract::DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Start the HTTP server and serve until Ctrl+C.
pub async fn run_server(addr: &str, state: AppState) -> Result<(), KozaError> {
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| KozaError::IoError(format!("Bind failed: {}", e)))?;

    tracing::info!("KozaTakip HTTP server listening on {}", addr);

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(|e| KozaError::IoError(format!("Server error: {}", e)))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
