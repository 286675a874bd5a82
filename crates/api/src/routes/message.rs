use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use nexmeet_db::models::{MeetingMessage, MessageType};
use nexmeet_services::{dao::LimitOffset, lifecycle::guard_chat};
use serde::{Deserialize, Serialize};

use super::{load_meeting, meeting_id, require_member, rfc3339};
use crate::{
    error::ApiError,
    extractors::{
        auth::AuthUser,
        json::{ApiJson, ApiQuery},
    },
    state::AppState,
};

const MAX_MESSAGE_CHARS: usize = 2000;

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub message: Option<String>,
    #[serde(default)]
    pub message_type: MessageType,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub id: String,
    pub meeting_id: String,
    pub user_id: String,
    pub author_name: String,
    pub message: String,
    pub message_type: MessageType,
    pub created_at: String,
}

#[derive(Debug, Serialize)]
pub struct MessageListResponse {
    pub messages: Vec<MessageResponse>,
    pub has_more: bool,
}

fn to_response(message: MeetingMessage) -> MessageResponse {
    MessageResponse {
        id: message.id.map(|id| id.to_hex()).unwrap_or_default(),
        meeting_id: message.meeting_id.to_hex(),
        user_id: message.user_id.to_hex(),
        author_name: message.author_name,
        message: message.message,
        message_type: message.message_type,
        created_at: rfc3339(message.created_at),
    }
}

pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
    ApiQuery(window): ApiQuery<LimitOffset>,
) -> Result<Json<MessageListResponse>, ApiError> {
    let meeting = load_meeting(&state, &id).await?;
    require_member(&state, &meeting, auth.user_id).await?;

    let window = window.clamped();
    let messages = state.messages.list(meeting_id(&meeting)?, window).await?;
    let has_more = messages.len() as u64 == window.limit;

    Ok(Json(MessageListResponse {
        messages: messages.into_iter().map(to_response).collect(),
        has_more,
    }))
}

pub async fn send(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<SendMessageRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    let text = body.message.as_deref().map(str::trim).unwrap_or_default();
    if text.is_empty() {
        return Err(ApiError::BadRequest("Message is required".to_string()));
    }
    if text.chars().count() > MAX_MESSAGE_CHARS {
        return Err(ApiError::BadRequest(format!(
            "Message must be at most {MAX_MESSAGE_CHARS} characters"
        )));
    }

    let meeting = load_meeting(&state, &id).await?;
    require_member(&state, &meeting, auth.user_id).await?;
    guard_chat(&meeting)?;

    let message = state
        .messages
        .create(
            meeting_id(&meeting)?,
            auth.user_id,
            auth.name.clone(),
            text.to_string(),
            body.message_type,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(to_response(message))))
}
