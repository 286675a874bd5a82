use bson::{doc, oid::ObjectId, DateTime};
use mongodb::Database;
use nexmeet_db::models::{MeetingMessage, MessageType};

use super::base::{BaseDao, DaoResult, LimitOffset};

pub struct MessageDao {
    pub base: BaseDao<MeetingMessage>,
}

impl MessageDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, MeetingMessage::COLLECTION).without_timestamps(),
        }
    }

    pub async fn create(
        &self,
        meeting_id: ObjectId,
        user_id: ObjectId,
        author_name: String,
        message: String,
        message_type: MessageType,
    ) -> DaoResult<MeetingMessage> {
        let message = MeetingMessage {
            id: None,
            meeting_id,
            user_id,
            author_name,
            message,
            message_type,
            created_at: DateTime::now(),
        };

        let id = self.base.insert_one(&message).await?;
        self.base.find_by_id(id).await
    }

    /// Oldest first.
    pub async fn list(
        &self,
        meeting_id: ObjectId,
        window: LimitOffset,
    ) -> DaoResult<Vec<MeetingMessage>> {
        self.base
            .find_window(
                doc! { "meeting_id": meeting_id },
                doc! { "created_at": 1, "_id": 1 },
                window,
            )
            .await
    }

    pub async fn delete_for_meeting(&self, meeting_id: ObjectId) -> DaoResult<u64> {
        self.base.hard_delete(doc! { "meeting_id": meeting_id }).await
    }
}
