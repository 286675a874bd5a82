use std::sync::Arc;

use bson::oid::ObjectId;
use nexmeet_db::models::{JobStatus, JobType, MeetingRecording, TranscriptionStatus};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::dao::{DaoError, MeetingDao, RecordingDao};
use crate::summary::{MeetingAnalysis, Summarizer, SummaryRequest};
use crate::transcription::Transcriber;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Recording not found")]
    RecordingNotFound,
    #[error("Meeting not found")]
    MeetingNotFound,
    #[error("No transcription available for analysis")]
    NoTranscript,
    #[error("Transcription failed: {0}")]
    Transcription(String),
    #[error("AI analysis failed: {0}")]
    Summary(String),
    #[error(transparent)]
    Dao(#[from] DaoError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum TranscriptionOutcome {
    Completed { transcript_id: String },
    /// The row had already left `pending`; nothing was submitted.
    AlreadyProcessed(TranscriptionStatus),
}

/// Which recording to analyse.
#[derive(Debug, Clone, Copy)]
pub enum SummaryTarget {
    Recording(ObjectId),
    Meeting(ObjectId),
}

/// Recording -> transcript -> analysis, linear and without retries.
pub struct RecordingPipeline {
    meetings: Arc<MeetingDao>,
    recordings: Arc<RecordingDao>,
    transcriber: Arc<dyn Transcriber>,
    summarizer: Arc<dyn Summarizer>,
}

impl RecordingPipeline {
    pub fn new(
        meetings: Arc<MeetingDao>,
        recordings: Arc<RecordingDao>,
        transcriber: Arc<dyn Transcriber>,
        summarizer: Arc<dyn Summarizer>,
    ) -> Self {
        Self {
            meetings,
            recordings,
            transcriber,
            summarizer,
        }
    }

    async fn load(&self, recording_id: ObjectId) -> Result<MeetingRecording, PipelineError> {
        match self.recordings.base.find_by_id(recording_id).await {
            Ok(recording) => Ok(recording),
            Err(DaoError::NotFound) => Err(PipelineError::RecordingNotFound),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn start_transcription(
        &self,
        recording_id: ObjectId,
        recording_url: &str,
    ) -> Result<TranscriptionOutcome, PipelineError> {
        let recording = self.load(recording_id).await?;
        if recording.transcription_status != TranscriptionStatus::Pending {
            return Ok(TranscriptionOutcome::AlreadyProcessed(
                recording.transcription_status,
            ));
        }

        if self.recordings.try_mark_processing(recording_id).await?.is_none() {
            let current = self.load(recording_id).await?;
            return Ok(TranscriptionOutcome::AlreadyProcessed(
                current.transcription_status,
            ));
        }

        info!(%recording_id, backend = self.transcriber.name(), "Transcription started");
        let transcript = match self.transcriber.transcribe(recording_url).await {
            Ok(transcript) => transcript,
            Err(e) => {
                let message = e.to_string();
                error!(%recording_id, error = %message, "Transcription failed");
                self.fail_transcription(&recording, &message).await?;
                return Err(PipelineError::Transcription(message));
            }
        };

        if let Err(e) = self.recordings.store_transcript(recording_id, &transcript).await {
            let message = format!("Storing transcript failed: {e}");
            error!(%recording_id, error = %message, "Transcription failed");
            self.fail_transcription(&recording, &message).await?;
            return Err(PipelineError::Transcription(message));
        }
        self.recordings
            .settle_jobs(recording.meeting_id, JobType::Transcription, JobStatus::Completed)
            .await?;
        self.recordings
            .enqueue_job(recording.meeting_id, JobType::Summary)
            .await?;

        info!(
            %recording_id,
            transcript_id = %transcript.id,
            utterances = transcript.utterances.len(),
            "Transcription completed"
        );
        Ok(TranscriptionOutcome::Completed {
            transcript_id: transcript.id,
        })
    }

    /// Marks the row and its pending transcription jobs `failed`.
    async fn fail_transcription(
        &self,
        recording: &MeetingRecording,
        message: &str,
    ) -> Result<(), PipelineError> {
        let recording_id = recording.id.ok_or(PipelineError::RecordingNotFound)?;
        self.recordings.mark_failed(recording_id, message).await?;
        self.recordings
            .settle_jobs(recording.meeting_id, JobType::Transcription, JobStatus::Failed)
            .await?;
        Ok(())
    }

    pub async fn summarize(&self, target: SummaryTarget) -> Result<MeetingAnalysis, PipelineError> {
        let recording = match target {
            SummaryTarget::Recording(id) => self.load(id).await?,
            SummaryTarget::Meeting(meeting_id) => self
                .recordings
                .find_by_meeting(meeting_id)
                .await?
                .ok_or(PipelineError::RecordingNotFound)?,
        };
        let recording_id = recording.id.ok_or(PipelineError::RecordingNotFound)?;

        let transcript = recording
            .transcription
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or(PipelineError::NoTranscript)?;

        let meeting = match self.meetings.base.find_by_id(recording.meeting_id).await {
            Ok(meeting) => meeting,
            Err(DaoError::NotFound) => return Err(PipelineError::MeetingNotFound),
            Err(e) => return Err(e.into()),
        };

        let request = SummaryRequest {
            title: &meeting.title,
            description: meeting.description.as_deref(),
            transcript,
        };
        let analysis = match self.summarizer.summarize(request).await {
            Ok(analysis) => analysis,
            Err(e) => {
                error!(%recording_id, error = %e, "AI analysis failed");
                self.recordings
                    .settle_jobs(recording.meeting_id, JobType::Summary, JobStatus::Failed)
                    .await?;
                return Err(PipelineError::Summary(e.to_string()));
            }
        };

        self.recordings.store_analysis(recording_id, &analysis).await?;
        self.recordings
            .settle_jobs(recording.meeting_id, JobType::Summary, JobStatus::Completed)
            .await?;

        info!(%recording_id, key_points = analysis.key_points.len(), "AI analysis stored");
        Ok(analysis)
    }

    /// Full chain for a freshly finished recording. Every failure is logged
    /// and ends the chain.
    pub async fn run(&self, recording_id: ObjectId, recording_url: &str) {
        match self.start_transcription(recording_id, recording_url).await {
            Ok(TranscriptionOutcome::Completed { .. }) => {}
            Ok(TranscriptionOutcome::AlreadyProcessed(status)) => {
                info!(%recording_id, ?status, "Recording already processed, skipping");
                return;
            }
            Err(e) => {
                warn!(%recording_id, error = %e, "Recording pipeline stopped at transcription");
                return;
            }
        }

        if let Err(e) = self.summarize(SummaryTarget::Recording(recording_id)).await {
            warn!(%recording_id, error = %e, "Recording pipeline stopped at analysis");
        }
    }
}
