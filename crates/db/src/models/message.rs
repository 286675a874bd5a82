use bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeetingMessage {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub meeting_id: ObjectId,
    pub user_id: ObjectId,
    pub author_name: String,
    pub message: String,
    #[serde(default)]
    pub message_type: MessageType,
    pub created_at: DateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    #[default]
    Text,
    System,
    Emoji,
}

impl MeetingMessage {
    pub const COLLECTION: &'static str = "meeting_messages";
}
