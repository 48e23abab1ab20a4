//! Message Handlers

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};

use super::parse_room_id;
use crate::application::dto::request::{MessageQueryParams, SendMessageRequest};
use crate::application::dto::response::{MessageEnvelope, MessageListResponse, MessageResponse};
use crate::domain::{Activity, ActivityKind};
use crate::infrastructure::metrics;
use crate::presentation::http::extractors::{ClientInfo, ValidatedJson};
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::startup::AppState;

/// Get the newest messages of a chatroom
pub async fn get_messages(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ClientInfo(client): ClientInfo,
    Path(chatroom_id): Path<String>,
    Query(query): Query<MessageQueryParams>,
) -> Result<Json<MessageListResponse>, AppError> {
    let room_id = parse_room_id(&chatroom_id)?;

    let messages = state
        .messaging
        .list_messages(room_id, auth.identity.user_id, query.limit())
        .await?;

    state.activity.record(Activity::now(
        auth.identity.user_id,
        ActivityKind::MessagesListed,
        client,
    ));

    Ok(Json(MessageListResponse {
        messages: messages.iter().map(MessageResponse::from).collect(),
    }))
}

/// Send message to chatroom
pub async fn send_message(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ClientInfo(client): ClientInfo,
    Path(chatroom_id): Path<String>,
    ValidatedJson(body): ValidatedJson<SendMessageRequest>,
) -> Result<(StatusCode, Json<MessageEnvelope>), AppError> {
    let room_id = parse_room_id(&chatroom_id)?;

    let message = state
        .messaging
        .send_message(room_id, &auth.identity, body.into())
        .await?;

    metrics::record_message_sent(message.message_type.as_str());
    state.activity.record(Activity::now(
        auth.identity.user_id,
        ActivityKind::MessageSent,
        client,
    ));

    Ok((
        StatusCode::CREATED,
        Json(MessageEnvelope {
            message: MessageResponse::from(&message),
        }),
    ))
}
