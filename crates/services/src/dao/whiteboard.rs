use bson::{doc, oid::ObjectId, DateTime};
use mongodb::Database;
use nexmeet_db::models::WhiteboardSnapshot;

use super::base::{BaseDao, DaoResult, LimitOffset};

pub struct WhiteboardDao {
    pub base: BaseDao<WhiteboardSnapshot>,
}

impl WhiteboardDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, WhiteboardSnapshot::COLLECTION).without_timestamps(),
        }
    }

    pub async fn save(
        &self,
        meeting_id: ObjectId,
        created_by: ObjectId,
        data: serde_json::Value,
    ) -> DaoResult<WhiteboardSnapshot> {
        let snapshot = WhiteboardSnapshot {
            id: None,
            meeting_id,
            data,
            preview_url: None,
            created_by,
            created_at: DateTime::now(),
        };

        let id = self.base.insert_one(&snapshot).await?;
        self.base.find_by_id(id).await
    }

    pub async fn latest(&self, meeting_id: ObjectId) -> DaoResult<Option<WhiteboardSnapshot>> {
        let mut newest = self
            .base
            .find_window(
                doc! { "meeting_id": meeting_id },
                doc! { "created_at": -1, "_id": -1 },
                LimitOffset { limit: 1, offset: 0 },
            )
            .await?;
        Ok(newest.pop())
    }

    pub async fn delete_for_meeting(&self, meeting_id: ObjectId) -> DaoResult<u64> {
        self.base.hard_delete(doc! { "meeting_id": meeting_id }).await
    }
}
