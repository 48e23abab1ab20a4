//! Route Configuration
//!
//! Configures all HTTP routes for the API.

use axum::{
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use tower_http::compression::CompressionLayer;

use super::handlers;
use crate::infrastructure::metrics;
use crate::presentation::middleware::{auth_middleware, gateway_auth_middleware, track_metrics};
use crate::presentation::websocket::ws_handler;
use crate::startup::AppState;

/// Create the main API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api", api_routes(state.clone()))
        // Health check endpoints
        .route("/health", get(handlers::health::health_check))
        .route("/health/live", get(handlers::health::liveness))
        .route("/health/ready", get(handlers::health::readiness))
        // Prometheus metrics endpoint
        .route("/metrics", get(metrics_handler))
        .route_layer(middleware::from_fn(track_metrics))
        .with_state(state)
}

/// Prometheus metrics endpoint handler
async fn metrics_handler() -> impl IntoResponse {
    let metrics = metrics::gather_metrics();
    (
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        metrics,
    )
}

/// Authenticated API routes
fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/chatrooms",
            get(handlers::chatroom::list_chatrooms).post(handlers::chatroom::create_chatroom),
        )
        .route(
            "/chatrooms/{chatroom_id}/join",
            post(handlers::chatroom::join_chatroom),
        )
        .route(
            "/chatrooms/{chatroom_id}/messages",
            get(handlers::message::get_messages).post(handlers::message::send_message),
        )
        .route(
            "/users/{user_id}/status",
            get(handlers::presence::get_user_status),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        // Only the REST routes above are compressed
        .layer(CompressionLayer::new())
        // WebSocket gateway endpoint
        .route(
            "/ws",
            get(ws_handler).route_layer(middleware::from_fn_with_state(
                state,
                gateway_auth_middleware,
            )),
        )
}
