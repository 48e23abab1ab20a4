//! Chatroom Handlers

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};

use super::parse_room_id;
use crate::application::dto::request::CreateChatroomRequest;
use crate::application::dto::response::{
    ChatroomEnvelope, ChatroomListResponse, ChatroomResponse, JoinChatroomResponse,
};
use crate::domain::{Activity, ActivityKind};
use crate::presentation::http::extractors::{ClientInfo, ValidatedJson};
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::startup::AppState;

/// Create a chatroom with the caller as its first member
pub async fn create_chatroom(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ClientInfo(client): ClientInfo,
    ValidatedJson(body): ValidatedJson<CreateChatroomRequest>,
) -> Result<(StatusCode, Json<ChatroomEnvelope>), AppError> {
    let room = state.messaging.create_room(&auth.identity, &body.name).await?;

    state.activity.record(Activity::now(
        auth.identity.user_id,
        ActivityKind::ChatroomCreated,
        client,
    ));

    Ok((
        StatusCode::CREATED,
        Json(ChatroomEnvelope {
            chatroom: ChatroomResponse::from(room),
        }),
    ))
}

/// List all chatrooms
pub async fn list_chatrooms(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ClientInfo(client): ClientInfo,
) -> Result<Json<ChatroomListResponse>, AppError> {
    let rooms = state.messaging.list_rooms().await?;

    state.activity.record(Activity::now(
        auth.identity.user_id,
        ActivityKind::ChatroomsListed,
        client,
    ));

    Ok(Json(ChatroomListResponse {
        chatrooms: rooms.into_iter().map(ChatroomResponse::from).collect(),
    }))
}

/// Join a chatroom
pub async fn join_chatroom(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ClientInfo(client): ClientInfo,
    Path(chatroom_id): Path<String>,
) -> Result<Json<JoinChatroomResponse>, AppError> {
    let room_id = parse_room_id(&chatroom_id)?;
    let room = state.messaging.join_room(room_id, &auth.identity).await?;

    state.activity.record(Activity::now(
        auth.identity.user_id,
        ActivityKind::ChatroomJoined,
        client,
    ));

    Ok(Json(JoinChatroomResponse {
        message: "Joined chatroom successfully".into(),
        chatroom: ChatroomResponse::from(room),
    }))
}
