use axum::{Json, extract::State};
use bson::oid::ObjectId;
use nexmeet_db::models::MeetingRecording;
use nexmeet_services::{
    dao::DaoError,
    pipeline::{SummaryTarget, TranscriptionOutcome},
};
use serde::Deserialize;
use tracing::warn;

use super::parse_oid;
use crate::{
    error::ApiError,
    extractors::{auth::AuthUser, json::ApiJson},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct StartTranscriptionRequest {
    pub recording_id: Option<String>,
    pub recording_url: Option<String>,
}

pub(crate) async fn load_recording(
    state: &AppState,
    recording_id: ObjectId,
) -> Result<MeetingRecording, ApiError> {
    match state.recordings.base.find_by_id(recording_id).await {
        Ok(recording) => Ok(recording),
        Err(DaoError::NotFound) => Err(ApiError::NotFound("Recording not found".to_string())),
        Err(e) => Err(e.into()),
    }
}

/// The caller must host the meeting the recording belongs to.
pub(crate) async fn require_recording_host(
    state: &AppState,
    recording: &MeetingRecording,
    user_id: ObjectId,
) -> Result<(), ApiError> {
    let meeting = match state.meetings.base.find_by_id(recording.meeting_id).await {
        Ok(meeting) => meeting,
        Err(DaoError::NotFound) => {
            return Err(ApiError::NotFound("Meeting not found".to_string()));
        }
        Err(e) => return Err(e.into()),
    };
    if !meeting.is_host(user_id) {
        return Err(ApiError::Forbidden(
            "Only the host can process recordings".to_string(),
        ));
    }
    Ok(())
}

// ---- POST /api/transcription/start ---------------------------------------

pub async fn start(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(body): ApiJson<StartTranscriptionRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let (Some(recording_id), Some(recording_url)) = (
        body.recording_id.as_deref().filter(|s| !s.trim().is_empty()),
        body.recording_url.as_deref().map(str::trim).filter(|s| !s.is_empty()),
    ) else {
        return Err(ApiError::BadRequest(
            "Recording ID and URL are required".to_string(),
        ));
    };

    let rid = parse_oid(recording_id, "recording_id")?;
    let recording = load_recording(&state, rid).await?;
    require_recording_host(&state, &recording, auth.user_id).await?;

    match state.pipeline.start_transcription(rid, recording_url).await? {
        TranscriptionOutcome::AlreadyProcessed(status) => Ok(Json(serde_json::json!({
            "message": "Transcription already processed",
            "status": status,
        }))),
        TranscriptionOutcome::Completed { transcript_id } => {
            let pipeline = state.pipeline.clone();
            tokio::spawn(async move {
                if let Err(e) = pipeline.summarize(SummaryTarget::Recording(rid)).await {
                    warn!(recording_id = %rid, error = %e, "Analysis after transcription failed");
                }
            });

            Ok(Json(serde_json::json!({
                "success": true,
                "transcript_id": transcript_id,
            })))
        }
    }
}
