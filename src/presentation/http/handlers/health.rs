//! Health Check Handlers
//!
//! Provides health check endpoints for Kubernetes-style liveness and readiness probes.
//!
//! # Endpoints
//! - `GET /health` - Basic health check
//! - `GET /health/live` - Liveness probe (is the server running?)
//! - `GET /health/ready` - Readiness probe (can the server accept traffic?)

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::Serialize;
use std::time::Instant;

use crate::infrastructure::{cache, database};
use crate::startup::AppState;

/// Server start time for uptime calculation
static SERVER_START: Lazy<Instant> = Lazy::new(Instant::now);
static SERVER_START_TIME: Lazy<DateTime<Utc>> = Lazy::new(Utc::now);

/// Initialize the server start time (call during startup)
pub fn init_server_start() {
    Lazy::force(&SERVER_START);
    Lazy::force(&SERVER_START_TIME);
}

/// Basic health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Detailed health check response
#[derive(Debug, Serialize)]
pub struct DetailedHealthResponse {
    pub status: HealthStatus,
    pub version: &'static str,
    pub uptime_seconds: u64,
    pub started_at: String,
    pub storage_backend: &'static str,
    pub checks: HealthChecks,
}

/// Individual service health checks. Services that are not configured
/// are omitted.
#[derive(Debug, Serialize)]
pub struct HealthChecks {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<ServiceHealth>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redis: Option<ServiceHealth>,
    pub websocket: WebSocketHealth,
}

/// Health status for individual services
#[derive(Debug, Serialize)]
pub struct ServiceHealth {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// WebSocket gateway health
#[derive(Debug, Serialize)]
pub struct WebSocketHealth {
    pub status: HealthStatus,
    pub active_connections: usize,
}

/// Overall health status
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Simple liveness response
#[derive(Debug, Serialize)]
pub struct LivenessResponse {
    pub status: &'static str,
}

/// Basic health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Liveness probe - checks if the server is running
pub async fn liveness() -> Json<LivenessResponse> {
    Json(LivenessResponse { status: "alive" })
}

/// Readiness probe - checks if the server can accept traffic
/// Returns 200 if ready, 503 if the message store is unavailable
pub async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    let database = match &state.db {
        Some(pool) => Some(check_database(pool).await),
        None => None,
    };
    let redis = match &state.redis {
        Some(conn) => Some(check_redis(conn).await),
        None => None,
    };

    let websocket = WebSocketHealth {
        status: if state.hub.is_accepting() {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy
        },
        active_connections: state.hub.connection_count(),
    };

    let overall_status =
        determine_overall_status(database.as_ref(), redis.as_ref(), websocket.status);

    let response = DetailedHealthResponse {
        status: overall_status,
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: SERVER_START.elapsed().as_secs(),
        started_at: SERVER_START_TIME.to_rfc3339(),
        storage_backend: state.settings.storage.backend.as_str(),
        checks: HealthChecks {
            database,
            redis,
            websocket,
        },
    };

    let status_code = match overall_status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(response))
}

/// Check database connectivity and latency
async fn check_database(pool: &sqlx::PgPool) -> ServiceHealth {
    let start = Instant::now();
    match database::ping(pool).await {
        Ok(()) => timed_health(start, 100),
        Err(e) => ServiceHealth {
            status: HealthStatus::Unhealthy,
            latency_ms: None,
            message: Some(format!("Database connection failed: {}", e)),
        },
    }
}

/// Check Redis connectivity and latency
async fn check_redis(conn: &redis::aio::ConnectionManager) -> ServiceHealth {
    let start = Instant::now();
    match cache::ping(conn).await {
        Ok(()) => timed_health(start, 50),
        Err(e) => ServiceHealth {
            status: HealthStatus::Unhealthy,
            latency_ms: None,
            message: Some(format!("Redis connection failed: {}", e)),
        },
    }
}

fn timed_health(start: Instant, degraded_after_ms: u64) -> ServiceHealth {
    let latency = start.elapsed().as_millis() as u64;
    ServiceHealth {
        status: if latency < degraded_after_ms {
            HealthStatus::Healthy
        } else {
            HealthStatus::Degraded
        },
        latency_ms: Some(latency),
        message: None,
    }
}

/// Determine overall health based on individual checks.
/// The message store and the gateway are critical; Redis only degrades.
fn determine_overall_status(
    db: Option<&ServiceHealth>,
    redis: Option<&ServiceHealth>,
    gateway: HealthStatus,
) -> HealthStatus {
    let db_status = db.map(|h| h.status).unwrap_or(HealthStatus::Healthy);
    let redis_status = redis.map(|h| h.status).unwrap_or(HealthStatus::Healthy);

    if db_status == HealthStatus::Unhealthy || gateway == HealthStatus::Unhealthy {
        return HealthStatus::Unhealthy;
    }

    if db_status == HealthStatus::Degraded || redis_status != HealthStatus::Healthy {
        return HealthStatus::Degraded;
    }

    HealthStatus::Healthy
}
