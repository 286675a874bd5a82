use bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeetingParticipant {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub meeting_id: ObjectId,
    pub user_id: Option<ObjectId>,
    pub guest_name: Option<String>,
    pub joined_at: DateTime,
    pub left_at: Option<DateTime>,
    #[serde(default)]
    pub speaking_duration_seconds: u32,
}

impl MeetingParticipant {
    pub const COLLECTION: &'static str = "meeting_participants";
}
