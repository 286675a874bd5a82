use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, header},
};
use nexmeet_services::{
    lifecycle::guard_media_access,
    livekit::{VideoGrant, guest_identity},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{load_meeting_by_room, require_member};
use crate::{
    error::ApiError,
    extractors::{auth::AuthUser, json::ApiJson},
    state::AppState,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRequest {
    pub room_name: Option<String>,
    pub participant_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
    pub url: String,
    pub identity: String,
}

fn required_room(body: &TokenRequest) -> Result<&str, ApiError> {
    body.room_name
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Room name is required".to_string()))
}

// ---- POST /api/livekit/token ---------------------------------------------

pub async fn token(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(body): ApiJson<TokenRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let room_name = required_room(&body)?;
    let meeting = load_meeting_by_room(&state, room_name).await?;
    require_member(&state, &meeting, auth.user_id).await?;
    guard_media_access(&meeting)?;

    let is_host = meeting.is_host(auth.user_id);
    let identity = auth.user_id.to_hex();
    let name = body
        .participant_name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(&auth.name);

    let token = state.livekit.issue_token(
        &identity,
        name,
        VideoGrant::participant(&meeting.room_name, is_host),
    )?;
    debug!(room_name = %meeting.room_name, %identity, is_host, "Issued SFU token");

    Ok(Json(TokenResponse {
        token,
        url: state.livekit.url().to_string(),
        identity,
    }))
}

// ---- POST /api/livekit/guest-token (no auth) -----------------------------

pub async fn guest_token(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<TokenRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let room_name = required_room(&body)?;
    let name = body
        .participant_name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Participant name is required".to_string()))?;

    let meeting = load_meeting_by_room(&state, room_name).await?;
    guard_media_access(&meeting)?;

    let identity = guest_identity();
    let token = state.livekit.issue_token(
        &identity,
        name,
        VideoGrant::participant(&meeting.room_name, false),
    )?;
    info!(room_name = %meeting.room_name, %identity, "Issued guest SFU token");

    Ok(Json(TokenResponse {
        token,
        url: state.livekit.url().to_string(),
        identity,
    }))
}

// ---- POST /api/livekit/webhook (no auth, raw body) -----------------------

pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>, ApiError> {
    let signature = headers
        .get(header::AUTHORIZATION)
        .or_else(|| headers.get("livekit-signature"))
        .and_then(|v| v.to_str().ok());

    let event = state.livekit.verify_webhook(signature, &body)?;
    info!(event = %event.event, room_name = ?event.room_name(), "LiveKit webhook received");

    state.relay.dispatch(&event).await;

    Ok(Json(serde_json::json!({ "success": true })))
}
