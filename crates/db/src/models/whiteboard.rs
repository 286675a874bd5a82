use bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhiteboardSnapshot {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub meeting_id: ObjectId,
    /// Canvas state as produced by the client; stored as-is.
    pub data: serde_json::Value,
    pub preview_url: Option<String>,
    pub created_by: ObjectId,
    pub created_at: DateTime,
}

impl WhiteboardSnapshot {
    pub const COLLECTION: &'static str = "whiteboard_snapshots";
}
