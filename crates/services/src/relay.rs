use std::sync::Arc;

use nexmeet_db::models::JobType;
use tracing::{debug, error, info, warn};

use crate::dao::{DaoError, FinishedRecording, MeetingDao, RecordingDao};
use crate::lifecycle::{EndOutcome, MeetingLifecycle};
use crate::livekit::WebhookEvent;
use crate::pipeline::RecordingPipeline;

/// SFU events the relay acts on.
#[derive(Debug, Clone, PartialEq)]
pub enum RelayAction {
    RoomStarted { room: String, sid: Option<String> },
    RoomFinished { room: String },
    RecordingFinished { room: String, output: FinishedRecording },
    RecordingFailed { room: String, error: String },
    /// Known event lacking what we need, or an event we do not handle.
    Ignore { event: String, reason: &'static str },
}

impl RelayAction {
    pub fn from_event(event: &WebhookEvent) -> Self {
        let ignore = |reason| RelayAction::Ignore {
            event: event.event.clone(),
            reason,
        };
        let Some(room) = event.room_name().map(str::to_string) else {
            return ignore("no room name");
        };

        match event.event.as_str() {
            "room_started" => RelayAction::RoomStarted {
                room,
                sid: event.room_sid().map(str::to_string),
            },
            "room_finished" => RelayAction::RoomFinished { room },
            "recording_finished" | "egress_ended" => {
                let Some(egress) = &event.egress_info else {
                    return ignore("no egress info");
                };
                if egress.is_failed() {
                    return RelayAction::RecordingFailed {
                        room,
                        error: egress.error.clone().unwrap_or_else(|| "egress failed".to_string()),
                    };
                }
                match egress.finished_recording() {
                    Some(output) => RelayAction::RecordingFinished { room, output },
                    None => ignore("no mp4 file result"),
                }
            }
            "recording_failed" => RelayAction::RecordingFailed {
                room,
                error: event
                    .egress_info
                    .as_ref()
                    .and_then(|e| e.error.clone())
                    .filter(|e| !e.is_empty())
                    .unwrap_or_else(|| "recording failed".to_string()),
            },
            _ => ignore("unhandled event"),
        }
    }
}

/// Applies verified SFU webhooks to stored meetings and recordings.
pub struct WebhookRelay {
    meetings: Arc<MeetingDao>,
    recordings: Arc<RecordingDao>,
    lifecycle: Arc<MeetingLifecycle>,
    pipeline: Arc<RecordingPipeline>,
}

impl WebhookRelay {
    pub fn new(
        meetings: Arc<MeetingDao>,
        recordings: Arc<RecordingDao>,
        lifecycle: Arc<MeetingLifecycle>,
        pipeline: Arc<RecordingPipeline>,
    ) -> Self {
        Self {
            meetings,
            recordings,
            lifecycle,
            pipeline,
        }
    }

    /// Handles one event. Failures are logged, never returned, so the SFU
    /// always sees the delivery acknowledged.
    pub async fn dispatch(&self, event: &WebhookEvent) {
        let action = RelayAction::from_event(event);
        debug!(event = %event.event, ?action, "Webhook received");

        let result = match action {
            RelayAction::RoomStarted { room, sid } => self.room_started(&room, sid.as_deref()).await,
            RelayAction::RoomFinished { room } => self.room_finished(&room).await,
            RelayAction::RecordingFinished { room, output } => {
                self.recording_finished(&room, output).await
            }
            RelayAction::RecordingFailed { room, error } => {
                self.recording_failed(&room, &error).await
            }
            RelayAction::Ignore { event, reason } => {
                info!(%event, reason, "Webhook event ignored");
                Ok(())
            }
        };

        if let Err(e) = result {
            error!(event = %event.event, error = %e, "Webhook handling failed");
        }
    }

    async fn room_started(&self, room: &str, sid: Option<&str>) -> Result<(), DaoError> {
        match self.meetings.mark_started_by_room(room, sid).await? {
            Some(meeting) => info!(room_name = %room, meeting_id = ?meeting.id, "Room started"),
            None => debug!(room_name = %room, "Room start ignored, meeting unknown or already started"),
        }
        Ok(())
    }

    async fn room_finished(&self, room: &str) -> Result<(), DaoError> {
        match self.lifecycle.end_room(room).await {
            Ok(EndOutcome::Ended(meeting)) => {
                info!(room_name = %room, meeting_id = ?meeting.id, "Room finished, meeting ended")
            }
            Ok(EndOutcome::AlreadyEnded(_)) => {
                debug!(room_name = %room, "Room finished, meeting already ended")
            }
            Err(e) => warn!(room_name = %room, error = %e, "Could not end meeting for room"),
        }
        Ok(())
    }

    async fn recording_finished(&self, room: &str, output: FinishedRecording) -> Result<(), DaoError> {
        let meeting = self.meetings.find_by_room_name(room).await?;
        let meeting_id = meeting.id.ok_or(DaoError::NotFound)?;

        let recording = self.recordings.upsert_finished(meeting_id, &output).await?;
        let recording_id = recording.id.ok_or(DaoError::NotFound)?;
        self.recordings
            .enqueue_job(meeting_id, JobType::Transcription)
            .await?;

        info!(
            %meeting_id,
            %recording_id,
            duration_seconds = output.duration_seconds,
            file_size_mb = output.file_size_mb,
            "Recording saved, starting pipeline"
        );

        let pipeline = self.pipeline.clone();
        let url = output.recording_url;
        tokio::spawn(async move {
            pipeline.run(recording_id, &url).await;
        });
        Ok(())
    }

    async fn recording_failed(&self, room: &str, error: &str) -> Result<(), DaoError> {
        warn!(room_name = %room, error, "Recording failed");
        let meeting = self.meetings.find_by_room_name(room).await?;
        let meeting_id = meeting.id.ok_or(DaoError::NotFound)?;
        if self.recordings.fail_open_for_meeting(meeting_id, error).await? {
            info!(%meeting_id, "Recording marked failed");
        }
        Ok(())
    }
}
