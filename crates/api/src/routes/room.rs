use axum::{
    Json,
    extract::{Path, State},
};

use super::{
    load_meeting_by_room, meeting::to_response, participant::participant_views, require_member,
};
use crate::{error::ApiError, extractors::auth::AuthUser, state::AppState};

/// Room page payload: the meeting plus who is in it, for members only.
pub async fn get(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(room_name): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let meeting = load_meeting_by_room(&state, &room_name).await?;
    require_member(&state, &meeting, auth.user_id).await?;

    let participants = participant_views(&state, &meeting).await?;
    let is_host = meeting.is_host(auth.user_id);
    Ok(Json(serde_json::json!({
        "meeting": to_response(meeting),
        "participants": participants,
        "is_host": is_host,
        "livekit_url": state.livekit.url(),
    })))
}
