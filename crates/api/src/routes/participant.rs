use std::collections::HashMap;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use bson::oid::ObjectId;
use nexmeet_db::models::{Meeting, MeetingParticipant};
use nexmeet_services::lifecycle::guard_join;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{load_meeting, meeting_id, parse_oid, require_member, rfc3339, rfc3339_opt};
use crate::{
    error::ApiError,
    extractors::{auth::AuthUser, json::ApiJson},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct AddParticipantRequest {
    pub user_id: Option<String>,
    pub guest_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ParticipantResponse {
    pub id: String,
    pub user_id: Option<String>,
    pub guest_name: Option<String>,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub is_host: bool,
    pub joined_at: String,
    pub left_at: Option<String>,
    pub speaking_duration_seconds: u32,
}

fn to_response(
    meeting: &Meeting,
    participant: MeetingParticipant,
    names: &HashMap<ObjectId, (String, Option<String>)>,
) -> ParticipantResponse {
    let (display_name, avatar_url) = match participant.user_id.and_then(|id| names.get(&id)) {
        Some((name, avatar)) => (name.clone(), avatar.clone()),
        None => (
            participant
                .guest_name
                .clone()
                .unwrap_or_else(|| "Guest".to_string()),
            None,
        ),
    };

    ParticipantResponse {
        id: participant.id.map(|id| id.to_hex()).unwrap_or_default(),
        user_id: participant.user_id.map(|id| id.to_hex()),
        is_host: participant.user_id == Some(meeting.host_id),
        guest_name: participant.guest_name,
        display_name,
        avatar_url,
        joined_at: rfc3339(participant.joined_at),
        left_at: rfc3339_opt(participant.left_at),
        speaking_duration_seconds: participant.speaking_duration_seconds,
    }
}

/// Participants ordered by join time, with user display info resolved.
pub(crate) async fn participant_views(
    state: &AppState,
    meeting: &Meeting,
) -> Result<Vec<ParticipantResponse>, ApiError> {
    let mid = meeting_id(meeting)?;
    let participants = state.meetings.list_participants(mid).await?;

    let user_ids: Vec<ObjectId> = participants.iter().filter_map(|p| p.user_id).collect();
    let names: HashMap<ObjectId, (String, Option<String>)> = state
        .users
        .find_many_by_ids(&user_ids)
        .await?
        .into_iter()
        .filter_map(|u| {
            let id = u.id?;
            Some((id, (u.display_name(), u.avatar_url)))
        })
        .collect();

    Ok(participants
        .into_iter()
        .map(|p| to_response(meeting, p, &names))
        .collect())
}

pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Vec<ParticipantResponse>>, ApiError> {
    let meeting = load_meeting(&state, &id).await?;
    require_member(&state, &meeting, auth.user_id).await?;
    Ok(Json(participant_views(&state, &meeting).await?))
}

pub async fn add(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<AddParticipantRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let guest_name = body
        .guest_name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());
    let user_id = body
        .user_id
        .as_deref()
        .map(|u| parse_oid(u, "user_id"))
        .transpose()?;
    if user_id.is_none() && guest_name.is_none() {
        return Err(ApiError::BadRequest(
            "Either user_id or guest_name is required".to_string(),
        ));
    }

    let meeting = load_meeting(&state, &id).await?;
    let mid = meeting_id(&meeting)?;
    guard_join(&meeting)?;

    if let Some(uid) = user_id {
        if let Some(existing) = state.meetings.find_participant(mid, uid).await? {
            return Ok((
                StatusCode::OK,
                Json(serde_json::json!({
                    "message": "User is already a participant",
                    "participant_id": existing.id.map(|id| id.to_hex()),
                })),
            ));
        }
    }

    let participant = state
        .meetings
        .add_participant(mid, user_id, if user_id.is_some() { None } else { guest_name })
        .await?;
    info!(meeting_id = %mid, participant_id = ?participant.id, "Participant added");

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "participant": {
                "id": participant.id.map(|id| id.to_hex()),
                "user_id": participant.user_id.map(|id| id.to_hex()),
                "guest_name": participant.guest_name,
                "joined_at": rfc3339(participant.joined_at),
            }
        })),
    ))
}
