use axum::{Json, extract::State};
use nexmeet_services::pipeline::SummaryTarget;
use serde::Deserialize;

use super::{
    load_meeting, parse_oid,
    transcription::{load_recording, require_recording_host},
};
use crate::{
    error::ApiError,
    extractors::{auth::AuthUser, json::ApiJson},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct SummarizeRequest {
    pub recording_id: Option<String>,
    pub meeting_id: Option<String>,
}

// ---- POST /api/ai/summarize ----------------------------------------------

pub async fn summarize(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(body): ApiJson<SummarizeRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let recording_id = body.recording_id.as_deref().filter(|s| !s.trim().is_empty());
    let meeting_id = body.meeting_id.as_deref().filter(|s| !s.trim().is_empty());

    let target = match (recording_id, meeting_id) {
        (Some(rid), _) => {
            let rid = parse_oid(rid, "recording_id")?;
            let recording = load_recording(&state, rid).await?;
            require_recording_host(&state, &recording, auth.user_id).await?;
            SummaryTarget::Recording(rid)
        }
        (None, Some(mid)) => {
            let meeting = load_meeting(&state, mid).await?;
            if !meeting.is_host(auth.user_id) {
                return Err(ApiError::Forbidden(
                    "Only the host can process recordings".to_string(),
                ));
            }
            SummaryTarget::Meeting(super::meeting_id(&meeting)?)
        }
        (None, None) => {
            return Err(ApiError::BadRequest(
                "Recording ID or meeting ID is required".to_string(),
            ));
        }
    };

    let analysis = state.pipeline.summarize(target).await?;
    Ok(Json(serde_json::json!({
        "success": true,
        "analysis": analysis,
    })))
}
