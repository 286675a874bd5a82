use bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meeting {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub title: String,
    pub description: Option<String>,
    pub room_name: String,
    pub host_id: ObjectId,
    pub scheduled_at: DateTime,
    pub started_at: Option<DateTime>,
    pub ended_at: Option<DateTime>,
    #[serde(default = "bool_true")]
    pub is_recording: bool,
    #[serde(default = "default_room_style")]
    pub room_style: String,
    pub sfu_room_sid: Option<String>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

/// Lifecycle position derived from the row's timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeetingPhase {
    Scheduled,
    Started,
    Ended,
}

impl Meeting {
    pub const COLLECTION: &'static str = "meetings";

    pub fn phase(&self) -> MeetingPhase {
        if self.ended_at.is_some() {
            MeetingPhase::Ended
        } else if self.started_at.is_some() {
            MeetingPhase::Started
        } else {
            MeetingPhase::Scheduled
        }
    }

    pub fn is_host(&self, user_id: ObjectId) -> bool {
        self.host_id == user_id
    }
}

fn bool_true() -> bool {
    true
}

fn default_room_style() -> String {
    "futuristic".to_string()
}
