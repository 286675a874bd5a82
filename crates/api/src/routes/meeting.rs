use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use bson::DateTime;
use chrono::Utc;
use nexmeet_db::models::{Meeting, MeetingPhase};
use nexmeet_services::{
    dao::NewMeeting,
    lifecycle::{EndOutcome, StartOutcome, validate_new_meeting},
};
use serde::{Deserialize, Serialize};

use super::{
    load_meeting, load_meeting_by_room, parse_oid,
    participant::{ParticipantResponse, participant_views},
    require_member, rfc3339, rfc3339_opt,
};
use crate::{
    error::ApiError,
    extractors::{auth::AuthUser, json::ApiJson},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct CreateMeetingRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub scheduled_at: Option<String>,
    #[serde(default = "default_true")]
    pub is_recording: bool,
    pub room_style: Option<String>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Serialize)]
pub struct MeetingResponse {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub room_name: String,
    pub host_id: String,
    pub status: &'static str,
    pub scheduled_at: String,
    pub started_at: Option<String>,
    pub ended_at: Option<String>,
    pub is_recording: bool,
    pub room_style: String,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub participants: Option<Vec<ParticipantResponse>>,
}

pub(crate) fn status_label(meeting: &Meeting) -> &'static str {
    match meeting.phase() {
        MeetingPhase::Scheduled => "scheduled",
        MeetingPhase::Started => "started",
        MeetingPhase::Ended => "ended",
    }
}

pub(crate) fn to_response(meeting: Meeting) -> MeetingResponse {
    MeetingResponse {
        id: meeting.id.map(|id| id.to_hex()).unwrap_or_default(),
        status: status_label(&meeting),
        title: meeting.title,
        description: meeting.description,
        room_name: meeting.room_name,
        host_id: meeting.host_id.to_hex(),
        scheduled_at: rfc3339(meeting.scheduled_at),
        started_at: rfc3339_opt(meeting.started_at),
        ended_at: rfc3339_opt(meeting.ended_at),
        is_recording: meeting.is_recording,
        room_style: meeting.room_style,
        created_at: rfc3339(meeting.created_at),
        participants: None,
    }
}

async fn with_participants(
    state: &AppState,
    meeting: Meeting,
) -> Result<MeetingResponse, ApiError> {
    let participants = participant_views(state, &meeting).await?;
    let mut response = to_response(meeting);
    response.participants = Some(participants);
    Ok(response)
}

pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<MeetingResponse>>, ApiError> {
    let meetings = state.meetings.list_for_user(auth.user_id).await?;

    let mut response = Vec::with_capacity(meetings.len());
    for meeting in meetings {
        response.push(with_participants(&state, meeting).await?);
    }
    Ok(Json(response))
}

pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(body): ApiJson<CreateMeetingRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let (title, scheduled_at) = validate_new_meeting(
        body.title.as_deref(),
        body.scheduled_at.as_deref(),
        Utc::now(),
    )?;

    let input = NewMeeting {
        title,
        description: body
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty()),
        scheduled_at: DateTime::from_chrono(scheduled_at),
        is_recording: body.is_recording,
        room_style: body.room_style,
    };
    let meeting = state.lifecycle.create(auth.user_id, input).await?;

    let join_url = format!(
        "{}/room/{}",
        state.settings.app.public_url.trim_end_matches('/'),
        meeting.room_name
    );
    let room_code = meeting.room_name.clone();
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "meeting": to_response(meeting),
            "room_code": room_code,
            "join_url": join_url,
        })),
    ))
}

pub async fn get(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<MeetingResponse>, ApiError> {
    let meeting = load_meeting(&state, &id).await?;
    require_member(&state, &meeting, auth.user_id).await?;
    Ok(Json(with_participants(&state, meeting).await?))
}

pub async fn delete(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let mid = parse_oid(&id, "meeting id")?;
    state.lifecycle.delete(mid, auth.user_id).await?;
    Ok(Json(serde_json::json!({ "success": true })))
}

pub async fn start(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let mid = parse_oid(&id, "meeting id")?;
    let response = match state.lifecycle.start(mid, auth.user_id).await? {
        StartOutcome::Started(meeting) => serde_json::json!({
            "message": "Meeting started",
            "started_at": rfc3339_opt(meeting.started_at),
        }),
        StartOutcome::AlreadyStarted(meeting) => serde_json::json!({
            "message": "Meeting already started",
            "started_at": rfc3339_opt(meeting.started_at),
        }),
    };
    Ok(Json(response))
}

pub async fn end(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let mid = parse_oid(&id, "meeting id")?;
    let outcome = state.lifecycle.end(mid, auth.user_id).await?;
    let message = match outcome {
        EndOutcome::Ended(_) => "Meeting ended",
        EndOutcome::AlreadyEnded(_) => "Meeting already ended",
    };
    Ok(Json(serde_json::json!({
        "message": message,
        "ended_at": rfc3339_opt(outcome.meeting().ended_at),
    })))
}

pub async fn leave(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let mid = parse_oid(&id, "meeting id")?;
    let closed = state.lifecycle.leave(mid, auth.user_id).await?;
    Ok(Json(serde_json::json!({ "success": true, "closed": closed })))
}

/// Join-screen lookup by room code. Any signed-in user may call it.
pub async fn info(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(room_name): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let meeting = load_meeting_by_room(&state, &room_name).await?;

    let host = state.users.find_by_id(meeting.host_id).await.ok();
    let host_info = host.map(|h| {
        serde_json::json!({
            "id": meeting.host_id.to_hex(),
            "display_name": h.display_name(),
            "avatar_url": h.avatar_url,
        })
    });

    Ok(Json(serde_json::json!({
        "meeting": to_response(meeting),
        "host": host_info,
    })))
}

pub async fn public_info(
    State(state): State<AppState>,
    Path(room_name): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let meeting = load_meeting_by_room(&state, &room_name).await?;

    Ok(Json(serde_json::json!({
        "title": meeting.title,
        "room_name": meeting.room_name,
        "status": status_label(&meeting),
        "scheduled_at": rfc3339(meeting.scheduled_at),
        "started_at": rfc3339_opt(meeting.started_at),
        "ended_at": rfc3339_opt(meeting.ended_at),
    })))
}
