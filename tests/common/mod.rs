//! Common Test Utilities
//!
//! Shared helpers, fixtures, and test infrastructure. Every test app runs on
//! the in-process storage backend, so no database or Redis is needed.

use axum_test::TestServer;
use chatroom_server::config::Settings;
use chatroom_server::infrastructure::identity::Claims;
use chatroom_server::startup::{build_router, AppState};
use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};

pub const JWT_SECRET: &str = "integration-test-secret-0123456789abcdef";

/// Settings for an isolated in-process app bound to a free local port
pub fn test_settings() -> Settings {
    let builder = Settings::defaults("test")
        .and_then(|b| b.set_override("storage.backend", "memory"))
        .and_then(|b| b.set_override("jwt.secret", JWT_SECRET))
        .and_then(|b| b.set_override("server.host", "127.0.0.1"))
        .and_then(|b| b.set_override("server.port", 0))
        .expect("test settings");
    Settings::from_builder(builder).expect("valid test settings")
}

/// Mint an access token the way the external auth service would
pub fn token_for(user_id: u64, username: &str) -> String {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: user_id.to_string(),
        username: username.to_string(),
        exp: now + 3600,
        iat: now,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("encode token")
}

/// Test application builder
pub struct TestApp {
    pub server: TestServer,
    pub state: AppState,
}

impl TestApp {
    pub async fn new() -> Self {
        let state = AppState::build(test_settings())
            .await
            .expect("build app state");
        let server = TestServer::new(build_router(state.clone())).expect("start test server");
        Self { server, state }
    }

    /// Create a room as `user_id` and return its id
    pub async fn create_room(&self, user_id: u64, name: &str) -> String {
        let response = self
            .server
            .post("/api/chatrooms")
            .authorization_bearer(token_for(user_id, &username(user_id)))
            .json(&json!({ "name": name }))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);
        response.json::<Value>()["chatroom"]["id"]
            .as_str()
            .expect("room id")
            .to_string()
    }

    pub async fn join_room(&self, user_id: u64, room_id: &str) {
        self.server
            .post(&format!("/api/chatrooms/{}/join", room_id))
            .authorization_bearer(token_for(user_id, &username(user_id)))
            .await
            .assert_status_ok();
    }

    pub async fn send_text(&self, user_id: u64, room_id: &str, text: &str) -> axum_test::TestResponse {
        self.server
            .post(&format!("/api/chatrooms/{}/messages", room_id))
            .authorization_bearer(token_for(user_id, &username(user_id)))
            .json(&json!({ "message_type": "text", "text_content": text }))
            .await
    }
}

pub fn username(user_id: u64) -> String {
    format!("user{}", user_id)
}
