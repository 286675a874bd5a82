pub mod auth;
pub mod livekit;
pub mod meeting;
pub mod message;
pub mod participant;
pub mod recording;
pub mod room;
pub mod summary;
pub mod transcription;
pub mod whiteboard;

use bson::{DateTime, oid::ObjectId};
use nexmeet_db::models::Meeting;
use nexmeet_services::dao::DaoError;

use crate::{error::ApiError, state::AppState};

// ---- Helpers -------------------------------------------------------------

pub(crate) fn parse_oid(s: &str, what: &str) -> Result<ObjectId, ApiError> {
    ObjectId::parse_str(s.trim()).map_err(|_| ApiError::BadRequest(format!("Invalid {what}")))
}

pub(crate) async fn load_meeting(state: &AppState, meeting_id: &str) -> Result<Meeting, ApiError> {
    let id = parse_oid(meeting_id, "meeting id")?;
    match state.meetings.base.find_by_id(id).await {
        Ok(meeting) => Ok(meeting),
        Err(DaoError::NotFound) => Err(ApiError::NotFound("Meeting not found".to_string())),
        Err(e) => Err(e.into()),
    }
}

pub(crate) async fn load_meeting_by_room(
    state: &AppState,
    room_name: &str,
) -> Result<Meeting, ApiError> {
    match state.meetings.find_by_room_name(room_name).await {
        Ok(meeting) => Ok(meeting),
        Err(DaoError::NotFound) => Err(ApiError::NotFound("Meeting not found".to_string())),
        Err(e) => Err(e.into()),
    }
}

/// Host or participant, otherwise 403.
pub(crate) async fn require_member(
    state: &AppState,
    meeting: &Meeting,
    user_id: ObjectId,
) -> Result<(), ApiError> {
    if state.meetings.is_member(meeting, user_id).await? {
        Ok(())
    } else {
        Err(ApiError::Forbidden("Not authorized for this meeting".to_string()))
    }
}

pub(crate) fn meeting_id(meeting: &Meeting) -> Result<ObjectId, ApiError> {
    meeting
        .id
        .ok_or_else(|| ApiError::Internal("Meeting without id".to_string()))
}

pub(crate) fn rfc3339(dt: DateTime) -> String {
    dt.to_chrono().to_rfc3339()
}

pub(crate) fn rfc3339_opt(dt: Option<DateTime>) -> Option<String> {
    dt.map(rfc3339)
}
