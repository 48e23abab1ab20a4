//! WebSocket Gateway Tests
//!
//! Runs the server on a real socket and drives it with reqwest and
//! tokio-tungstenite.

use std::net::SocketAddr;
use std::time::Duration;

use chatroom_server::startup::Application;
use futures::{SinkExt, StreamExt};
use reqwest::Client;
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};
use tokio_tungstenite::{
    connect_async, tungstenite::Message as WsMessage, MaybeTlsStream, WebSocketStream,
};

use crate::common::{test_settings, token_for};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn spawn_app() -> SocketAddr {
    let app = Application::build(test_settings()).await.expect("build app");
    let addr = app.local_addr().expect("addr");
    tokio::spawn(app.run_until_stopped());
    addr
}

/// Next text frame as JSON, failing the test after five seconds
async fn next_frame(ws: &mut Socket) -> Value {
    loop {
        let message = timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("frame within timeout")
            .expect("stream open")
            .expect("valid frame");
        if let WsMessage::Text(text) = message {
            return serde_json::from_str(text.as_str()).expect("json frame");
        }
    }
}

async fn status_of(client: &Client, addr: SocketAddr, user_id: u64) -> String {
    let body: Value = client
        .get(format!("http://{}/api/users/{}/status", addr, user_id))
        .bearer_auth(token_for(1, "user1"))
        .send()
        .await
        .expect("status request")
        .json()
        .await
        .expect("status json");
    body["status"].as_str().unwrap_or_default().to_string()
}

#[tokio::test]
async fn test_connected_member_receives_live_events() {
    let addr = spawn_app().await;
    let base = format!("http://{}", addr);
    let client = Client::new();

    let room: Value = client
        .post(format!("{}/api/chatrooms", base))
        .bearer_auth(token_for(1, "user1"))
        .json(&json!({ "name": "general" }))
        .send()
        .await
        .expect("create room")
        .json()
        .await
        .expect("room json");
    let room_id = room["chatroom"]["id"].as_str().expect("room id").to_string();

    client
        .post(format!("{}/api/chatrooms/{}/join", base, room_id))
        .bearer_auth(token_for(2, "user2"))
        .send()
        .await
        .expect("join room");

    let ws_url = format!("ws://{}/api/ws?token={}", addr, token_for(2, "user2"));
    let (mut ws, _) = connect_async(ws_url).await.expect("ws connect");

    let hello = next_frame(&mut ws).await;
    assert_eq!(hello["op"], 10);
    assert_eq!(hello["d"]["heartbeat_interval"], 45000);

    let ready = next_frame(&mut ws).await;
    assert_eq!(ready["op"], 0);
    assert_eq!(ready["t"], "READY");
    assert_eq!(ready["s"], 1);
    assert_eq!(ready["d"]["user"]["id"], 2);

    assert_eq!(status_of(&client, addr, 2).await, "online");

    // Another user joins the room
    client
        .post(format!("{}/api/chatrooms/{}/join", base, room_id))
        .bearer_auth(token_for(3, "user3"))
        .send()
        .await
        .expect("join room");

    let member_add = next_frame(&mut ws).await;
    assert_eq!(member_add["t"], "CHATROOM_MEMBER_ADD");
    assert_eq!(member_add["s"], 2);
    assert_eq!(member_add["d"]["member"]["user_id"], 3);

    // A member sends over HTTP
    let sent = client
        .post(format!("{}/api/chatrooms/{}/messages", base, room_id))
        .bearer_auth(token_for(1, "user1"))
        .json(&json!({ "message_type": "text", "text_content": "hello" }))
        .send()
        .await
        .expect("send message");
    assert_eq!(sent.status(), reqwest::StatusCode::CREATED);

    let created = next_frame(&mut ws).await;
    assert_eq!(created["t"], "MESSAGE_CREATE");
    assert_eq!(created["s"], 3);
    assert_eq!(created["d"]["text_content"], "hello");
    assert_eq!(created["d"]["chatroom_id"], room_id.as_str());

    // Heartbeat
    ws.send(WsMessage::text(r#"{"op":1}"#))
        .await
        .expect("send heartbeat");
    let ack = next_frame(&mut ws).await;
    assert_eq!(ack["op"], 11);

    ws.close(None).await.expect("close");

    let mut status = String::new();
    for _ in 0..50 {
        status = status_of(&client, addr, 2).await;
        if status == "offline" {
            break;
        }
        sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(status, "offline");
}

#[tokio::test]
async fn test_upgrade_without_token_is_rejected() {
    let addr = spawn_app().await;

    let result = connect_async(format!("ws://{}/api/ws", addr)).await;

    match result {
        Err(tokio_tungstenite::tungstenite::Error::Http(response)) => {
            assert_eq!(response.status(), 401);
        }
        other => panic!("expected 401 rejection, got {:?}", other.map(|_| ())),
    }
}
