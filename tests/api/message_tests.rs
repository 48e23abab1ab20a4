//! Message API Tests

use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use test_case::test_case;

use crate::common::{token_for, TestApp};

fn texts(response: &axum_test::TestResponse) -> Vec<String> {
    response.json::<Value>()["messages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["text_content"].as_str().unwrap_or_default().to_string())
        .collect()
}

#[tokio::test]
async fn test_general_room_scenario() {
    let app = TestApp::new().await;
    let room_id = app.create_room(1, "general").await;
    app.join_room(2, &room_id).await;

    let sent = app.send_text(2, &room_id, "hi").await;
    sent.assert_status(StatusCode::CREATED);
    let message = &sent.json::<Value>()["message"];
    assert_eq!(message["sender_id"], 2);
    assert_eq!(message["sender_name"], "user2");
    assert_eq!(message["message_type"], "text");
    assert_eq!(message["chatroom_id"], room_id.as_str());

    let listed = app
        .server
        .get(&format!("/api/chatrooms/{}/messages", room_id))
        .add_query_param("limit", 50)
        .authorization_bearer(token_for(2, "user2"))
        .await;
    listed.assert_status_ok();
    assert_eq!(texts(&listed), vec!["hi".to_string()]);

    // User 3 never joined
    app.server
        .get(&format!("/api/chatrooms/{}/messages", room_id))
        .authorization_bearer(token_for(3, "user3"))
        .await
        .assert_status_forbidden();
}

#[tokio::test]
async fn test_non_member_send_is_forbidden_and_stores_nothing() {
    let app = TestApp::new().await;
    let room_id = app.create_room(1, "general").await;

    app.send_text(9, &room_id, "intruder").await.assert_status_forbidden();

    let listed = app
        .server
        .get(&format!("/api/chatrooms/{}/messages", room_id))
        .authorization_bearer(token_for(1, "user1"))
        .await;
    assert!(texts(&listed).is_empty());
}

#[tokio::test]
async fn test_history_is_newest_first_and_limited() {
    let app = TestApp::new().await;
    let room_id = app.create_room(1, "general").await;
    for text in ["t1", "t2", "t3"] {
        app.send_text(1, &room_id, text).await.assert_status(StatusCode::CREATED);
    }

    let limited = app
        .server
        .get(&format!("/api/chatrooms/{}/messages", room_id))
        .add_query_param("limit", 2)
        .authorization_bearer(token_for(1, "user1"))
        .await;
    assert_eq!(texts(&limited), vec!["t3".to_string(), "t2".to_string()]);

    // A non-numeric limit falls back to the default page size
    let unparsable = app
        .server
        .get(&format!("/api/chatrooms/{}/messages", room_id))
        .add_query_param("limit", "lots")
        .authorization_bearer(token_for(1, "user1"))
        .await;
    unparsable.assert_status_ok();
    assert_eq!(texts(&unparsable).len(), 3);
}

#[test_case(json!({ "message_type": "text" }) ; "text without text")]
#[test_case(json!({ "message_type": "text", "text_content": "   " }) ; "whitespace text")]
#[test_case(json!({ "message_type": "picture", "text_content": "hi" }) ; "picture without url")]
#[test_case(json!({ "message_type": "text", "text_content": "hi", "media_url": "https://x.io/a.png" }) ; "text with url")]
#[test_case(json!({ "message_type": "sticker", "text_content": "hi" }) ; "unknown type")]
#[test_case(json!({ "message_type": "video", "media_url": "not a url" }) ; "malformed url")]
#[tokio::test]
async fn test_invalid_payloads_are_rejected(body: Value) {
    let app = TestApp::new().await;
    let room_id = app.create_room(1, "general").await;

    let response = app
        .server
        .post(&format!("/api/chatrooms/{}/messages", room_id))
        .authorization_bearer(token_for(1, "user1"))
        .json(&body)
        .await;

    response.assert_status_bad_request();
}

#[tokio::test]
async fn test_media_message_round_trip() {
    let app = TestApp::new().await;
    let room_id = app.create_room(1, "general").await;

    let response = app
        .server
        .post(&format!("/api/chatrooms/{}/messages", room_id))
        .authorization_bearer(token_for(1, "user1"))
        .json(&json!({
            "message_type": "text_and_picture",
            "text_content": "look",
            "media_url": "https://cdn.example.com/cat.png"
        }))
        .await;
    response.assert_status(StatusCode::CREATED);

    let listed = app
        .server
        .get(&format!("/api/chatrooms/{}/messages", room_id))
        .authorization_bearer(token_for(1, "user1"))
        .await;
    let message = &listed.json::<Value>()["messages"][0];
    assert_eq!(message["message_type"], "text_and_picture");
    assert_eq!(message["text_content"], "look");
    assert_eq!(message["media_url"], "https://cdn.example.com/cat.png");
}

#[tokio::test]
async fn test_messages_of_unknown_room() {
    let app = TestApp::new().await;

    app.send_text(1, "987654321", "hello").await.assert_status_not_found();
    app.send_text(1, "0", "hello").await.assert_status_bad_request();
}

#[tokio::test]
async fn test_offline_user_status() {
    let app = TestApp::new().await;

    let response = app
        .server
        .get("/api/users/42/status")
        .authorization_bearer(token_for(1, "user1"))
        .await;

    response.assert_status_ok();
    assert_eq!(response.json::<Value>(), json!({ "user_id": 42, "status": "offline" }));
}
