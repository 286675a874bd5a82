use bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeetingRecording {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub meeting_id: ObjectId,
    pub egress_id: Option<String>,
    pub recording_url: Option<String>,
    pub audio_url: Option<String>,
    pub duration_seconds: Option<u32>,
    pub file_size_mb: Option<f64>,
    pub transcript_id: Option<String>,
    #[serde(default)]
    pub transcription_status: TranscriptionStatus,
    pub transcription: Option<String>,
    #[serde(default)]
    pub speakers: Vec<Utterance>,
    #[serde(default)]
    pub chapters: Vec<Chapter>,
    #[serde(default)]
    pub highlights: Vec<Highlight>,
    pub summary: Option<String>,
    #[serde(default)]
    pub key_points: Vec<String>,
    #[serde(default)]
    pub decisions: Vec<String>,
    #[serde(default)]
    pub action_items: Vec<ActionItem>,
    #[serde(default)]
    pub next_steps: Vec<String>,
    #[serde(default)]
    pub open_topics: Vec<String>,
    pub sentiment: Option<String>,
    pub error: Option<String>,
    pub processed_at: Option<DateTime>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TranscriptionStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Utterance {
    pub speaker: String,
    pub text: String,
    /// Milliseconds from the start of the recording.
    pub start: u64,
    pub end: u64,
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chapter {
    pub headline: String,
    pub gist: Option<String>,
    pub summary: Option<String>,
    pub start: u64,
    pub end: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Highlight {
    pub text: String,
    pub count: u32,
    pub rank: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ActionItem {
    pub task: String,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
}

impl MeetingRecording {
    pub const COLLECTION: &'static str = "meeting_recordings";
}
