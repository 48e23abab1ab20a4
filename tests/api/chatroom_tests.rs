//! Chatroom API Tests

use axum::http::StatusCode;
use fake::{faker::lorem::en::Word, Fake};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use crate::common::{token_for, TestApp};

fn room_name() -> String {
    format!("{}-{}", Word().fake::<String>(), uuid::Uuid::new_v4().simple())
}

#[tokio::test]
async fn test_requests_without_token_are_rejected() {
    let app = TestApp::new().await;

    app.server
        .get("/api/chatrooms")
        .await
        .assert_status_unauthorized();

    app.server
        .get("/api/chatrooms")
        .authorization_bearer("not-a-jwt")
        .await
        .assert_status_unauthorized();
}

#[tokio::test]
async fn test_query_token_is_only_accepted_by_the_gateway() {
    let app = TestApp::new().await;

    app.server
        .get("/api/chatrooms")
        .add_query_param("token", token_for(1, "alice"))
        .await
        .assert_status_unauthorized();
}

#[tokio::test]
async fn test_create_chatroom_adds_creator_as_member() {
    let app = TestApp::new().await;
    let name = room_name();

    let response = app
        .server
        .post("/api/chatrooms")
        .authorization_bearer(token_for(1, "alice"))
        .json(&json!({ "name": name }))
        .await;

    response.assert_status(StatusCode::CREATED);
    let room = &response.json::<Value>()["chatroom"];
    assert_eq!(room["name"], name.as_str());
    assert_eq!(room["created_by"], 1);
    assert_eq!(room["members"].as_array().unwrap().len(), 1);
    assert_eq!(room["members"][0]["username"], "alice");
    assert!(room["id"].as_str().unwrap().parse::<i64>().is_ok());
}

#[tokio::test]
async fn test_duplicate_name_conflicts() {
    let app = TestApp::new().await;
    let name = room_name();
    app.create_room(1, &name).await;

    let response = app
        .server
        .post("/api/chatrooms")
        .authorization_bearer(token_for(2, "bob"))
        .json(&json!({ "name": name }))
        .await;

    response.assert_status_conflict();
}

#[tokio::test]
async fn test_invalid_names_are_rejected() {
    let app = TestApp::new().await;

    for body in [json!({ "name": "ab" }), json!({ "name": "x".repeat(101) }), json!({})] {
        let response = app
            .server
            .post("/api/chatrooms")
            .authorization_bearer(token_for(1, "alice"))
            .json(&body)
            .await;
        response.assert_status_bad_request();
        assert_eq!(response.json::<Value>()["code"], 10007);
    }
}

#[tokio::test]
async fn test_list_chatrooms_in_creation_order() {
    let app = TestApp::new().await;
    let first = app.create_room(1, "lobby").await;
    let second = app.create_room(2, "random").await;

    let response = app
        .server
        .get("/api/chatrooms")
        .authorization_bearer(token_for(3, "carol"))
        .await;

    response.assert_status_ok();
    let ids: Vec<String> = response.json::<Value>()["chatrooms"]
        .as_array()
        .unwrap()
        .iter()
        .map(|room| room["id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(ids, vec![first, second]);
}

#[tokio::test]
async fn test_join_chatroom() {
    let app = TestApp::new().await;
    let room_id = app.create_room(1, "general").await;

    let response = app
        .server
        .post(&format!("/api/chatrooms/{}/join", room_id))
        .authorization_bearer(token_for(2, "bob"))
        .await;

    response.assert_status_ok();
    let json: Value = response.json();
    assert_eq!(json["message"], "Joined chatroom successfully");
    let members = json["chatroom"]["members"].as_array().unwrap();
    assert_eq!(members.len(), 2);
    assert_eq!(members[1]["user_id"], 2);

    // Second join by the same user
    app.server
        .post(&format!("/api/chatrooms/{}/join", room_id))
        .authorization_bearer(token_for(2, "bob"))
        .await
        .assert_status_conflict();
}

#[tokio::test]
async fn test_join_unknown_or_malformed_room() {
    let app = TestApp::new().await;

    app.server
        .post("/api/chatrooms/123456789/join")
        .authorization_bearer(token_for(2, "bob"))
        .await
        .assert_status_not_found();

    let response = app
        .server
        .post("/api/chatrooms/not-an-id/join")
        .authorization_bearer(token_for(2, "bob"))
        .await;
    response.assert_status_bad_request();
    assert_eq!(response.json::<Value>()["message"], "Invalid chatroom ID");
}
