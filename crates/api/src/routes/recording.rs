use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use bson::oid::ObjectId;
use nexmeet_db::models::{
    ActionItem, Chapter, Highlight, Meeting, MeetingRecording, TranscriptionStatus, Utterance,
};
use serde::Serialize;
use tracing::info;

use super::{load_meeting, meeting_id, require_member, rfc3339, rfc3339_opt};
use crate::{error::ApiError, extractors::auth::AuthUser, state::AppState};

#[derive(Debug, Serialize)]
pub struct RecordingResponse {
    pub id: String,
    pub meeting_id: String,
    pub egress_id: Option<String>,
    pub recording_url: Option<String>,
    pub audio_url: Option<String>,
    pub duration_seconds: Option<u32>,
    pub file_size_mb: Option<f64>,
    pub transcription_status: TranscriptionStatus,
    pub transcription: Option<String>,
    pub speakers: Vec<Utterance>,
    pub chapters: Vec<Chapter>,
    pub highlights: Vec<Highlight>,
    pub summary: Option<String>,
    pub key_points: Vec<String>,
    pub decisions: Vec<String>,
    pub action_items: Vec<ActionItem>,
    pub next_steps: Vec<String>,
    pub open_topics: Vec<String>,
    pub sentiment: Option<String>,
    pub error: Option<String>,
    pub processed_at: Option<String>,
    pub created_at: String,
}

pub(crate) fn to_response(recording: MeetingRecording) -> RecordingResponse {
    RecordingResponse {
        id: recording.id.map(|id| id.to_hex()).unwrap_or_default(),
        meeting_id: recording.meeting_id.to_hex(),
        egress_id: recording.egress_id,
        recording_url: recording.recording_url,
        audio_url: recording.audio_url,
        duration_seconds: recording.duration_seconds,
        file_size_mb: recording.file_size_mb,
        transcription_status: recording.transcription_status,
        transcription: recording.transcription,
        speakers: recording.speakers,
        chapters: recording.chapters,
        highlights: recording.highlights,
        summary: recording.summary,
        key_points: recording.key_points,
        decisions: recording.decisions,
        action_items: recording.action_items,
        next_steps: recording.next_steps,
        open_topics: recording.open_topics,
        sentiment: recording.sentiment,
        error: recording.error,
        processed_at: rfc3339_opt(recording.processed_at),
        created_at: rfc3339(recording.created_at),
    }
}

fn require_host(meeting: &Meeting, user_id: ObjectId, action: &str) -> Result<(), ApiError> {
    if meeting.is_host(user_id) {
        Ok(())
    } else {
        Err(ApiError::Forbidden(format!("Only the host can {action} recording")))
    }
}

pub async fn start(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let meeting = load_meeting(&state, &id).await?;
    require_host(&meeting, auth.user_id, "start")?;
    if !meeting.is_recording {
        return Err(ApiError::BadRequest(
            "Recording is not enabled for this meeting".to_string(),
        ));
    }

    let mid = meeting_id(&meeting)?;
    if let Some(existing) = state.recordings.find_by_meeting(mid).await? {
        return Ok((
            StatusCode::OK,
            Json(serde_json::json!({
                "message": "Recording already in progress",
                "recording": to_response(existing),
            })),
        ));
    }

    let recording = state.recordings.create_placeholder(mid).await?;
    info!(meeting_id = %mid, egress_id = ?recording.egress_id, "Recording requested");

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "message": "Recording started",
            "recording": to_response(recording),
        })),
    ))
}

pub async fn stop(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let meeting = load_meeting(&state, &id).await?;
    require_host(&meeting, auth.user_id, "stop")?;

    Ok(Json(serde_json::json!({
        "message": "Recording will stop when the meeting ends",
    })))
}

pub async fn get(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<RecordingResponse>, ApiError> {
    let meeting = load_meeting(&state, &id).await?;
    require_member(&state, &meeting, auth.user_id).await?;

    let recording = state
        .recordings
        .find_by_meeting(meeting_id(&meeting)?)
        .await?
        .ok_or_else(|| ApiError::NotFound("Recording not found".to_string()))?;

    Ok(Json(to_response(recording)))
}
