use bson::{doc, oid::ObjectId, DateTime};
use mongodb::Database;
use nexmeet_db::models::{User, UserRole, UserStatus};

use super::base::{BaseDao, DaoError, DaoResult};

pub struct UserDao {
    pub base: BaseDao<User>,
}

impl UserDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, User::COLLECTION),
        }
    }

    pub async fn create(
        &self,
        email: &str,
        full_name: Option<String>,
        password_hash: String,
    ) -> DaoResult<User> {
        let now = DateTime::now();
        let user = User {
            id: None,
            email: email.trim().to_lowercase(),
            full_name,
            avatar_url: None,
            password_hash: Some(password_hash),
            role: UserRole::default(),
            status: UserStatus::default(),
            created_at: now,
            updated_at: now,
        };

        let id = self.base.insert_one(&user).await?;
        self.base.find_by_id(id).await
    }

    pub async fn find_by_email(&self, email: &str) -> DaoResult<User> {
        self.base
            .find_one(doc! { "email": email.trim().to_lowercase() })
            .await?
            .ok_or(DaoError::NotFound)
    }

    pub async fn find_by_id(&self, user_id: ObjectId) -> DaoResult<User> {
        self.base.find_by_id(user_id).await
    }

    pub async fn find_many_by_ids(&self, ids: &[ObjectId]) -> DaoResult<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.base
            .find_many(doc! { "_id": { "$in": ids.to_vec() } }, None)
            .await
    }

    pub async fn set_status(&self, user_id: ObjectId, status: UserStatus) -> DaoResult<bool> {
        self.base
            .update_by_id(
                user_id,
                doc! { "$set": { "status": bson::to_bson(&status)? } },
            )
            .await
    }
}
