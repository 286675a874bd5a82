use bson::{doc, oid::ObjectId, DateTime};
use mongodb::{Database, options::ReturnDocument};
use nexmeet_db::models::{
    JobStatus, JobType, MeetingRecording, ProcessingJob, TranscriptionStatus,
};
use tracing::debug;

use super::base::{BaseDao, DaoError, DaoResult};
use crate::summary::MeetingAnalysis;
use crate::transcription::Transcript;

/// Output of a finished egress, as reported by the SFU.
#[derive(Debug, Clone, PartialEq)]
pub struct FinishedRecording {
    pub egress_id: Option<String>,
    pub recording_url: String,
    pub audio_url: Option<String>,
    pub duration_seconds: u32,
    pub file_size_mb: f64,
}

pub struct RecordingDao {
    pub base: BaseDao<MeetingRecording>,
    pub jobs: BaseDao<ProcessingJob>,
}

impl RecordingDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, MeetingRecording::COLLECTION),
            jobs: BaseDao::new(db, ProcessingJob::COLLECTION),
        }
    }

    pub async fn find_by_meeting(&self, meeting_id: ObjectId) -> DaoResult<Option<MeetingRecording>> {
        self.base.find_one(doc! { "meeting_id": meeting_id }).await
    }

    /// Row created when the host asks to record before the SFU reports any
    /// output. Returns the existing row on a concurrent insert.
    pub async fn create_placeholder(&self, meeting_id: ObjectId) -> DaoResult<MeetingRecording> {
        let now = DateTime::now();
        let recording = MeetingRecording {
            id: None,
            meeting_id,
            egress_id: Some(format!("manual_{}", now.timestamp_millis())),
            recording_url: None,
            audio_url: None,
            duration_seconds: None,
            file_size_mb: None,
            transcript_id: None,
            transcription_status: TranscriptionStatus::Pending,
            transcription: None,
            speakers: Vec::new(),
            chapters: Vec::new(),
            highlights: Vec::new(),
            summary: None,
            key_points: Vec::new(),
            decisions: Vec::new(),
            action_items: Vec::new(),
            next_steps: Vec::new(),
            open_topics: Vec::new(),
            sentiment: None,
            error: None,
            processed_at: None,
            created_at: now,
            updated_at: now,
        };

        match self.base.insert_one(&recording).await {
            Ok(id) => self.base.find_by_id(id).await,
            Err(DaoError::DuplicateKey(_)) => self
                .find_by_meeting(meeting_id)
                .await?
                .ok_or(DaoError::NotFound),
            Err(e) => Err(e),
        }
    }

    /// Creates or refreshes the meeting's recording row with the egress
    /// output and resets it to `pending`.
    pub async fn upsert_finished(
        &self,
        meeting_id: ObjectId,
        finished: &FinishedRecording,
    ) -> DaoResult<MeetingRecording> {
        let now = DateTime::now();
        let mut set = doc! {
            "recording_url": finished.recording_url.as_str(),
            "audio_url": finished.audio_url.as_deref(),
            "duration_seconds": finished.duration_seconds as i64,
            "file_size_mb": finished.file_size_mb,
            "transcription_status": bson::to_bson(&TranscriptionStatus::Pending)?,
            "error": bson::Bson::Null,
            "updated_at": now,
        };
        if let Some(egress_id) = &finished.egress_id {
            set.insert("egress_id", egress_id.as_str());
        }

        self.base
            .collection()
            .find_one_and_update(
                doc! { "meeting_id": meeting_id },
                doc! {
                    "$set": set,
                    "$setOnInsert": { "meeting_id": meeting_id, "created_at": now },
                },
            )
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await?
            .ok_or(DaoError::NotFound)
    }

    /// Moves a `pending` row to `processing`; `None` when some other run
    /// already claimed it.
    pub async fn try_mark_processing(&self, id: ObjectId) -> DaoResult<Option<MeetingRecording>> {
        self.base
            .find_one_and_update(
                doc! {
                    "_id": id,
                    "transcription_status": bson::to_bson(&TranscriptionStatus::Pending)?,
                },
                doc! {
                    "$set": {
                        "transcription_status": bson::to_bson(&TranscriptionStatus::Processing)?,
                    }
                },
            )
            .await
    }

    pub async fn mark_failed(&self, id: ObjectId, error: &str) -> DaoResult<bool> {
        self.base
            .update_by_id(
                id,
                doc! {
                    "$set": {
                        "transcription_status": bson::to_bson(&TranscriptionStatus::Failed)?,
                        "error": error,
                        "processed_at": DateTime::now(),
                    }
                },
            )
            .await
    }

    /// Fails whatever is still pending or processing for the meeting.
    pub async fn fail_open_for_meeting(&self, meeting_id: ObjectId, error: &str) -> DaoResult<bool> {
        let open = [TranscriptionStatus::Pending, TranscriptionStatus::Processing]
            .iter()
            .map(bson::to_bson)
            .collect::<Result<Vec<_>, _>>()?;
        self.base
            .update_one(
                doc! { "meeting_id": meeting_id, "transcription_status": { "$in": open } },
                doc! {
                    "$set": {
                        "transcription_status": bson::to_bson(&TranscriptionStatus::Failed)?,
                        "error": error,
                        "processed_at": DateTime::now(),
                    }
                },
            )
            .await
    }

    pub async fn store_transcript(&self, id: ObjectId, transcript: &Transcript) -> DaoResult<bool> {
        self.base
            .update_by_id(
                id,
                doc! {
                    "$set": {
                        "transcript_id": transcript.id.as_str(),
                        "transcription": transcript.text.as_str(),
                        "speakers": bson::to_bson(&transcript.utterances)?,
                        "chapters": bson::to_bson(&transcript.chapters)?,
                        "highlights": bson::to_bson(&transcript.highlights)?,
                        "transcription_status": bson::to_bson(&TranscriptionStatus::Completed)?,
                        "error": bson::Bson::Null,
                        "processed_at": DateTime::now(),
                    }
                },
            )
            .await
    }

    pub async fn store_analysis(&self, id: ObjectId, analysis: &MeetingAnalysis) -> DaoResult<bool> {
        self.base
            .update_by_id(
                id,
                doc! {
                    "$set": {
                        "summary": analysis.executive_summary.as_str(),
                        "key_points": bson::to_bson(&analysis.key_points)?,
                        "decisions": bson::to_bson(&analysis.decisions)?,
                        "action_items": bson::to_bson(&analysis.action_items)?,
                        "next_steps": bson::to_bson(&analysis.next_steps)?,
                        "open_topics": bson::to_bson(&analysis.open_topics)?,
                        "sentiment": analysis.sentiment.as_str(),
                        "processed_at": DateTime::now(),
                    }
                },
            )
            .await
    }

    pub async fn delete_for_meeting(&self, meeting_id: ObjectId) -> DaoResult<u64> {
        let recordings = self.base.hard_delete(doc! { "meeting_id": meeting_id }).await?;
        let jobs = self.jobs.hard_delete(doc! { "meeting_id": meeting_id }).await?;
        debug!(%meeting_id, recordings, jobs, "Removed recording rows");
        Ok(recordings + jobs)
    }

    pub async fn enqueue_job(&self, meeting_id: ObjectId, job_type: JobType) -> DaoResult<ProcessingJob> {
        let now = DateTime::now();
        let job = ProcessingJob {
            id: None,
            meeting_id,
            job_type,
            status: JobStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        let id = self.jobs.insert_one(&job).await?;
        self.jobs.find_by_id(id).await
    }

    /// Settles every pending job of `job_type` for the meeting.
    pub async fn settle_jobs(
        &self,
        meeting_id: ObjectId,
        job_type: JobType,
        status: JobStatus,
    ) -> DaoResult<u64> {
        self.jobs
            .update_many(
                doc! {
                    "meeting_id": meeting_id,
                    "job_type": bson::to_bson(&job_type)?,
                    "status": bson::to_bson(&JobStatus::Pending)?,
                },
                doc! { "$set": { "status": bson::to_bson(&status)? } },
            )
            .await
    }
}
