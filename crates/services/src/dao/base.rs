use bson::{doc, oid::ObjectId, Document};
use futures::TryStreamExt;
use mongodb::{Collection, Database, options::ReturnDocument};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum DaoError {
    #[error("MongoDB error: {0}")]
    Mongo(#[from] mongodb::error::Error),
    #[error("BSON serialization error: {0}")]
    BsonSer(#[from] bson::ser::Error),
    #[error("BSON deserialization error: {0}")]
    BsonDe(#[from] bson::de::Error),
    #[error("Entity not found")]
    NotFound,
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),
}

pub type DaoResult<T> = Result<T, DaoError>;

/// Window over an ordered result set, as used by chat history.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LimitOffset {
    #[serde(default = "default_limit")]
    pub limit: u64,
    #[serde(default)]
    pub offset: u64,
}

impl LimitOffset {
    pub const MAX_LIMIT: u64 = 100;

    /// Caps the limit at [`Self::MAX_LIMIT`] and keeps it at least 1.
    pub fn clamped(self) -> Self {
        Self {
            limit: self.limit.clamp(1, Self::MAX_LIMIT),
            offset: self.offset,
        }
    }
}

impl Default for LimitOffset {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            offset: 0,
        }
    }
}

fn default_limit() -> u64 {
    50
}

pub struct BaseDao<T: Send + Sync> {
    collection: Collection<T>,
    timestamps: bool,
}

impl<T> BaseDao<T>
where
    T: Serialize + for<'de> Deserialize<'de> + Unpin + Send + Sync,
{
    pub fn new(db: &Database, collection_name: &str) -> Self {
        Self {
            collection: db.collection::<T>(collection_name),
            timestamps: true,
        }
    }

    /// For append-only collections whose documents carry no `updated_at`.
    pub fn without_timestamps(mut self) -> Self {
        self.timestamps = false;
        self
    }

    pub fn collection(&self) -> &Collection<T> {
        &self.collection
    }

    pub async fn find_by_id(&self, id: ObjectId) -> DaoResult<T> {
        self.collection
            .find_one(doc! { "_id": id })
            .await?
            .ok_or(DaoError::NotFound)
    }

    pub async fn find_one(&self, filter: Document) -> DaoResult<Option<T>> {
        Ok(self.collection.find_one(filter).await?)
    }

    pub async fn find_many(
        &self,
        filter: Document,
        sort: Option<Document>,
    ) -> DaoResult<Vec<T>> {
        let cursor = if let Some(sort) = sort {
            self.collection.find(filter).sort(sort).await?
        } else {
            self.collection.find(filter).await?
        };

        Ok(cursor.try_collect().await?)
    }

    pub async fn find_window(
        &self,
        filter: Document,
        sort: Document,
        window: LimitOffset,
    ) -> DaoResult<Vec<T>> {
        let cursor = self
            .collection
            .find(filter)
            .sort(sort)
            .skip(window.offset)
            .limit(window.limit as i64)
            .await?;

        Ok(cursor.try_collect().await?)
    }

    pub async fn insert_one(&self, doc: &T) -> DaoResult<ObjectId> {
        let result = self.collection.insert_one(doc).await.map_err(|e| {
            if let mongodb::error::ErrorKind::Write(mongodb::error::WriteFailure::WriteError(
                ref write_error,
            )) = *e.kind
            {
                if write_error.code == 11000 {
                    return DaoError::DuplicateKey(write_error.message.clone());
                }
            }
            DaoError::Mongo(e)
        })?;

        let id = result
            .inserted_id
            .as_object_id()
            .ok_or(DaoError::NotFound)?;
        debug!(?id, "Inserted document");
        Ok(id)
    }

    /// Applies `update` to the first match; returns whether anything matched.
    pub async fn update_one(&self, filter: Document, update: Document) -> DaoResult<bool> {
        let update = self.stamp(update);
        let result = self.collection.update_one(filter, update).await?;
        Ok(result.matched_count > 0)
    }

    pub async fn update_many(&self, filter: Document, update: Document) -> DaoResult<u64> {
        let update = self.stamp(update);
        let result = self.collection.update_many(filter, update).await?;
        Ok(result.modified_count)
    }

    pub async fn update_by_id(&self, id: ObjectId, update: Document) -> DaoResult<bool> {
        self.update_one(doc! { "_id": id }, update).await
    }

    /// Conditional update returning the post-image, or `None` when the
    /// filter no longer matches.
    pub async fn find_one_and_update(
        &self,
        filter: Document,
        update: Document,
    ) -> DaoResult<Option<T>> {
        let update = self.stamp(update);
        Ok(self
            .collection
            .find_one_and_update(filter, update)
            .return_document(ReturnDocument::After)
            .await?)
    }

    pub async fn hard_delete(&self, filter: Document) -> DaoResult<u64> {
        let result = self.collection.delete_many(filter).await?;
        Ok(result.deleted_count)
    }

    fn stamp(&self, mut update: Document) -> Document {
        if !self.timestamps {
            return update;
        }
        let now = bson::DateTime::now();
        match update.get_document_mut("$set") {
            Ok(set_doc) => {
                set_doc.insert("updated_at", now);
            }
            Err(_) => {
                update.insert("$set", doc! { "updated_at": now });
            }
        }
        update
    }
}
