use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use tracing::debug;

use super::{load_meeting, meeting_id, require_member, rfc3339};
use crate::{
    error::ApiError,
    extractors::{auth::AuthUser, json::ApiJson},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct SaveWhiteboardRequest {
    pub data: Option<serde_json::Value>,
    #[serde(default)]
    pub is_auto_save: bool,
}

pub async fn save(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<SaveWhiteboardRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let data = body
        .data
        .filter(|d| !d.is_null())
        .ok_or_else(|| ApiError::BadRequest("Whiteboard data is required".to_string()))?;

    let meeting = load_meeting(&state, &id).await?;
    require_member(&state, &meeting, auth.user_id).await?;

    let snapshot = state
        .whiteboards
        .save(meeting_id(&meeting)?, auth.user_id, data)
        .await?;
    debug!(room_name = %meeting.room_name, auto = body.is_auto_save, "Whiteboard saved");

    Ok(Json(serde_json::json!({
        "success": true,
        "snapshot_id": snapshot.id.map(|id| id.to_hex()),
        "saved_at": rfc3339(snapshot.created_at),
    })))
}

pub async fn load(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let meeting = load_meeting(&state, &id).await?;
    require_member(&state, &meeting, auth.user_id).await?;

    let response = match state.whiteboards.latest(meeting_id(&meeting)?).await? {
        Some(snapshot) => serde_json::json!({
            "data": snapshot.data,
            "preview_url": snapshot.preview_url,
            "last_modified": rfc3339(snapshot.created_at),
        }),
        None => serde_json::json!({ "data": null, "last_modified": null }),
    };
    Ok(Json(response))
}
