//! Meeting state machine: Scheduled -> Started -> Ended, or Scheduled -> Deleted.
//!
//! The phase is never stored; it is derived from `started_at`/`ended_at`.
//! Guards are pure functions over a loaded [`Meeting`]. The orchestrator
//! applies each transition as one conditional update whose filter restates
//! the pre-state, and re-runs the guard against a fresh read when the update
//! matches nothing.

use std::sync::Arc;

use bson::{doc, oid::ObjectId, DateTime};
use chrono::{DateTime as ChronoDateTime, NaiveDateTime, Utc};
use nexmeet_db::models::{Meeting, MeetingPhase};
use thiserror::Error;
use tracing::{info, warn};

use crate::dao::{DaoError, MeetingDao, MessageDao, NewMeeting, RecordingDao, WhiteboardDao};

/// Attempts per transition before giving up on a contended row.
const MAX_ATTEMPTS: usize = 3;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Title and scheduled time are required")]
    MissingFields,
    #[error("Invalid scheduled time")]
    InvalidSchedule,
    #[error("Scheduled time must be in the future")]
    ScheduleInPast,
    #[error("Only the host can start the meeting")]
    NotHostStart,
    #[error("Only the host can end the meeting")]
    NotHostEnd,
    #[error("Only the host can delete the meeting")]
    NotHostDelete,
    #[error("Cannot start an ended meeting")]
    StartEnded,
    #[error("Cannot delete a meeting that has already started")]
    DeleteStarted,
    #[error("Cannot join an ended meeting")]
    JoinEnded,
    #[error("Meeting has ended")]
    MeetingEnded,
    #[error("Cannot send messages to ended meeting")]
    ChatEnded,
    #[error("Meeting was modified concurrently, please retry")]
    Conflict,
    #[error(transparent)]
    Dao(#[from] DaoError),
}

impl LifecycleError {
    pub fn is_forbidden(&self) -> bool {
        matches!(
            self,
            Self::NotHostStart | Self::NotHostEnd | Self::NotHostDelete
        )
    }
}

/// What a guard decided for a transition that passed its checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Apply,
    AlreadyDone,
}

#[derive(Debug, Clone)]
pub enum StartOutcome {
    Started(Meeting),
    AlreadyStarted(Meeting),
}

#[derive(Debug, Clone)]
pub enum EndOutcome {
    Ended(Meeting),
    AlreadyEnded(Meeting),
}

impl EndOutcome {
    pub fn meeting(&self) -> &Meeting {
        match self {
            Self::Ended(m) | Self::AlreadyEnded(m) => m,
        }
    }
}

/// Offset-less forms sent by `datetime-local` inputs, read as UTC.
const LOCAL_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S"];

fn parse_schedule(raw: &str) -> Option<ChronoDateTime<Utc>> {
    if let Ok(when) = ChronoDateTime::parse_from_rfc3339(raw) {
        return Some(when.with_timezone(&Utc));
    }
    LOCAL_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Validates a create request and returns the trimmed title and parsed time.
pub fn validate_new_meeting(
    title: Option<&str>,
    scheduled_at: Option<&str>,
    now: ChronoDateTime<Utc>,
) -> Result<(String, ChronoDateTime<Utc>), LifecycleError> {
    let title = title.map(str::trim).unwrap_or_default();
    let scheduled_at = scheduled_at.map(str::trim).unwrap_or_default();
    if title.is_empty() || scheduled_at.is_empty() {
        return Err(LifecycleError::MissingFields);
    }

    let when = parse_schedule(scheduled_at).ok_or(LifecycleError::InvalidSchedule)?;
    if when <= now {
        return Err(LifecycleError::ScheduleInPast);
    }

    Ok((title.to_string(), when))
}

pub fn guard_start(meeting: &Meeting, caller: ObjectId) -> Result<Transition, LifecycleError> {
    if !meeting.is_host(caller) {
        return Err(LifecycleError::NotHostStart);
    }
    match meeting.phase() {
        MeetingPhase::Ended => Err(LifecycleError::StartEnded),
        MeetingPhase::Started => Ok(Transition::AlreadyDone),
        MeetingPhase::Scheduled => Ok(Transition::Apply),
    }
}

/// `caller` is `None` for SFU-driven ends, which skip the host check.
pub fn guard_end(meeting: &Meeting, caller: Option<ObjectId>) -> Result<Transition, LifecycleError> {
    if let Some(caller) = caller {
        if !meeting.is_host(caller) {
            return Err(LifecycleError::NotHostEnd);
        }
    }
    match meeting.phase() {
        MeetingPhase::Ended => Ok(Transition::AlreadyDone),
        MeetingPhase::Started | MeetingPhase::Scheduled => Ok(Transition::Apply),
    }
}

pub fn guard_delete(meeting: &Meeting, caller: ObjectId) -> Result<Transition, LifecycleError> {
    if !meeting.is_host(caller) {
        return Err(LifecycleError::NotHostDelete);
    }
    if meeting.started_at.is_some() {
        return Err(LifecycleError::DeleteStarted);
    }
    Ok(Transition::Apply)
}

/// Adding a participant row.
pub fn guard_join(meeting: &Meeting) -> Result<(), LifecycleError> {
    match meeting.phase() {
        MeetingPhase::Ended => Err(LifecycleError::JoinEnded),
        _ => Ok(()),
    }
}

/// Issuing SFU access tokens.
pub fn guard_media_access(meeting: &Meeting) -> Result<(), LifecycleError> {
    match meeting.phase() {
        MeetingPhase::Ended => Err(LifecycleError::MeetingEnded),
        _ => Ok(()),
    }
}

pub fn guard_chat(meeting: &Meeting) -> Result<(), LifecycleError> {
    match meeting.phase() {
        MeetingPhase::Ended => Err(LifecycleError::ChatEnded),
        _ => Ok(()),
    }
}

/// Applies lifecycle transitions against the store.
pub struct MeetingLifecycle {
    meetings: Arc<MeetingDao>,
    messages: Arc<MessageDao>,
    whiteboards: Arc<WhiteboardDao>,
    recordings: Arc<RecordingDao>,
}

impl MeetingLifecycle {
    pub fn new(
        meetings: Arc<MeetingDao>,
        messages: Arc<MessageDao>,
        whiteboards: Arc<WhiteboardDao>,
        recordings: Arc<RecordingDao>,
    ) -> Self {
        Self {
            meetings,
            messages,
            whiteboards,
            recordings,
        }
    }

    pub async fn create(&self, host_id: ObjectId, input: NewMeeting) -> Result<Meeting, LifecycleError> {
        let meeting = self.meetings.create(host_id, input).await?;
        let meeting_id = meeting.id.ok_or(DaoError::NotFound)?;

        if let Err(e) = self
            .meetings
            .add_participant(meeting_id, Some(host_id), None)
            .await
        {
            warn!(%meeting_id, error = %e, "Failed to add host as participant");
        }

        info!(%meeting_id, room_name = %meeting.room_name, "Meeting created");
        Ok(meeting)
    }

    pub async fn start(&self, meeting_id: ObjectId, caller: ObjectId) -> Result<StartOutcome, LifecycleError> {
        for _ in 0..MAX_ATTEMPTS {
            let meeting = self.meetings.base.find_by_id(meeting_id).await?;
            match guard_start(&meeting, caller)? {
                Transition::AlreadyDone => return Ok(StartOutcome::AlreadyStarted(meeting)),
                Transition::Apply => {
                    if let Some(started) = self.meetings.mark_started(meeting_id).await? {
                        info!(%meeting_id, "Meeting started");
                        return Ok(StartOutcome::Started(started));
                    }
                    warn!(%meeting_id, "Start lost a concurrent update, re-evaluating");
                }
            }
        }
        Err(LifecycleError::Conflict)
    }

    /// Host-initiated end.
    pub async fn end(&self, meeting_id: ObjectId, caller: ObjectId) -> Result<EndOutcome, LifecycleError> {
        self.end_matching(doc! { "_id": meeting_id }, Some(caller)).await
    }

    /// End driven by the SFU reporting the room closed.
    pub async fn end_room(&self, room_name: &str) -> Result<EndOutcome, LifecycleError> {
        self.end_matching(doc! { "room_name": room_name }, None).await
    }

    async fn end_matching(
        &self,
        filter: bson::Document,
        caller: Option<ObjectId>,
    ) -> Result<EndOutcome, LifecycleError> {
        for _ in 0..MAX_ATTEMPTS {
            let meeting = self
                .meetings
                .base
                .find_one(filter.clone())
                .await?
                .ok_or(DaoError::NotFound)?;
            let meeting_id = meeting.id.ok_or(DaoError::NotFound)?;

            match guard_end(&meeting, caller)? {
                Transition::AlreadyDone => return Ok(EndOutcome::AlreadyEnded(meeting)),
                Transition::Apply => {
                    if meeting.started_at.is_none() {
                        warn!(%meeting_id, "Ending a meeting that never started");
                    }
                    let ended_at = DateTime::now();
                    let Some(ended) = self
                        .meetings
                        .mark_ended(doc! { "_id": meeting_id }, ended_at)
                        .await?
                    else {
                        warn!(%meeting_id, "End lost a concurrent update, re-evaluating");
                        continue;
                    };

                    match self.meetings.close_open_participants(meeting_id, ended_at).await {
                        Ok(closed) => info!(%meeting_id, closed, "Meeting ended"),
                        Err(e) => warn!(%meeting_id, error = %e, "Failed to close participant rows"),
                    }
                    return Ok(EndOutcome::Ended(ended));
                }
            }
        }
        Err(LifecycleError::Conflict)
    }

    /// Hard-deletes a meeting that never started, with every dependent row.
    pub async fn delete(&self, meeting_id: ObjectId, caller: ObjectId) -> Result<(), LifecycleError> {
        for _ in 0..MAX_ATTEMPTS {
            let meeting = self.meetings.base.find_by_id(meeting_id).await?;
            guard_delete(&meeting, caller)?;

            if self.meetings.delete_unstarted(meeting_id).await? {
                self.messages.delete_for_meeting(meeting_id).await?;
                self.whiteboards.delete_for_meeting(meeting_id).await?;
                self.recordings.delete_for_meeting(meeting_id).await?;
                info!(%meeting_id, "Meeting deleted");
                return Ok(());
            }
            warn!(%meeting_id, "Delete lost a concurrent update, re-evaluating");
        }
        Err(LifecycleError::Conflict)
    }

    /// Closes the caller's open participant rows. Leaving twice is a no-op.
    pub async fn leave(&self, meeting_id: ObjectId, caller: ObjectId) -> Result<u64, LifecycleError> {
        self.meetings.base.find_by_id(meeting_id).await?;
        Ok(self.meetings.leave(meeting_id, caller).await?)
    }
}
