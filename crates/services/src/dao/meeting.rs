use std::collections::HashSet;

use bson::{doc, oid::ObjectId, DateTime};
use mongodb::Database;
use nexmeet_db::models::{Meeting, MeetingParticipant};
use rand::Rng;
use tracing::debug;

use super::base::{BaseDao, DaoError, DaoResult};

const ROOM_CODE_ATTEMPTS: usize = 5;

const ADJECTIVES: &[&str] = &[
    "cosmic", "stellar", "quantum", "cyber", "neural", "digital", "fusion", "matrix",
];
const NOUNS: &[&str] = &[
    "nexus", "sphere", "portal", "chamber", "dome", "hub", "core", "zone",
];

/// Fields supplied by the host when scheduling.
#[derive(Debug, Clone)]
pub struct NewMeeting {
    pub title: String,
    pub description: Option<String>,
    pub scheduled_at: DateTime,
    pub is_recording: bool,
    pub room_style: Option<String>,
}

pub struct MeetingDao {
    pub base: BaseDao<Meeting>,
    pub participants: BaseDao<MeetingParticipant>,
}

impl MeetingDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, Meeting::COLLECTION),
            participants: BaseDao::new(db, MeetingParticipant::COLLECTION).without_timestamps(),
        }
    }

    /// Inserts the meeting under a fresh room code, drawing a new code when
    /// the unique index reports a collision.
    pub async fn create(&self, host_id: ObjectId, input: NewMeeting) -> DaoResult<Meeting> {
        let now = DateTime::now();
        let mut meeting = Meeting {
            id: None,
            title: input.title,
            description: input.description,
            room_name: String::new(),
            host_id,
            scheduled_at: input.scheduled_at,
            started_at: None,
            ended_at: None,
            is_recording: input.is_recording,
            room_style: input.room_style.unwrap_or_else(|| "futuristic".to_string()),
            sfu_room_sid: None,
            created_at: now,
            updated_at: now,
        };

        let mut last_err = None;
        for attempt in 1..=ROOM_CODE_ATTEMPTS {
            meeting.room_name = generate_room_code();
            match self.base.insert_one(&meeting).await {
                Ok(id) => return self.base.find_by_id(id).await,
                Err(DaoError::DuplicateKey(msg)) => {
                    debug!(attempt, room_name = %meeting.room_name, "Room code collision");
                    last_err = Some(DaoError::DuplicateKey(msg));
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_err.unwrap_or(DaoError::NotFound))
    }

    pub async fn find_by_room_name(&self, room_name: &str) -> DaoResult<Meeting> {
        self.base
            .find_one(doc! { "room_name": room_name })
            .await?
            .ok_or(DaoError::NotFound)
    }

    /// Stamps `started_at` only while the meeting is still scheduled.
    pub async fn mark_started(&self, meeting_id: ObjectId) -> DaoResult<Option<Meeting>> {
        self.base
            .find_one_and_update(
                doc! { "_id": meeting_id, "started_at": null, "ended_at": null },
                doc! { "$set": { "started_at": DateTime::now() } },
            )
            .await
    }

    pub async fn mark_started_by_room(
        &self,
        room_name: &str,
        sfu_room_sid: Option<&str>,
    ) -> DaoResult<Option<Meeting>> {
        self.base
            .find_one_and_update(
                doc! { "room_name": room_name, "started_at": null, "ended_at": null },
                doc! {
                    "$set": {
                        "started_at": DateTime::now(),
                        "sfu_room_sid": sfu_room_sid,
                    }
                },
            )
            .await
    }

    /// Stamps `ended_at` once; `None` means another writer got there first.
    pub async fn mark_ended(
        &self,
        filter: bson::Document,
        ended_at: DateTime,
    ) -> DaoResult<Option<Meeting>> {
        let mut filter = filter;
        filter.insert("ended_at", bson::Bson::Null);
        self.base
            .find_one_and_update(filter, doc! { "$set": { "ended_at": ended_at } })
            .await
    }

    pub async fn close_open_participants(
        &self,
        meeting_id: ObjectId,
        left_at: DateTime,
    ) -> DaoResult<u64> {
        self.participants
            .update_many(
                doc! { "meeting_id": meeting_id, "left_at": null },
                doc! { "$set": { "left_at": left_at } },
            )
            .await
    }

    /// Removes the meeting row while it has not started. Returns whether a
    /// row was deleted.
    pub async fn delete_unstarted(&self, meeting_id: ObjectId) -> DaoResult<bool> {
        let deleted = self
            .base
            .hard_delete(doc! { "_id": meeting_id, "started_at": null })
            .await?;
        if deleted > 0 {
            self.participants
                .hard_delete(doc! { "meeting_id": meeting_id })
                .await?;
        }
        Ok(deleted > 0)
    }

    pub async fn add_participant(
        &self,
        meeting_id: ObjectId,
        user_id: Option<ObjectId>,
        guest_name: Option<String>,
    ) -> DaoResult<MeetingParticipant> {
        let participant = MeetingParticipant {
            id: None,
            meeting_id,
            user_id,
            guest_name,
            joined_at: DateTime::now(),
            left_at: None,
            speaking_duration_seconds: 0,
        };

        let id = self.participants.insert_one(&participant).await?;
        self.participants.find_by_id(id).await
    }

    pub async fn find_participant(
        &self,
        meeting_id: ObjectId,
        user_id: ObjectId,
    ) -> DaoResult<Option<MeetingParticipant>> {
        self.participants
            .find_one(doc! { "meeting_id": meeting_id, "user_id": user_id })
            .await
    }

    /// Host or holder of a participant row.
    pub async fn is_member(&self, meeting: &Meeting, user_id: ObjectId) -> DaoResult<bool> {
        if meeting.is_host(user_id) {
            return Ok(true);
        }
        let Some(meeting_id) = meeting.id else {
            return Ok(false);
        };
        Ok(self.find_participant(meeting_id, user_id).await?.is_some())
    }

    pub async fn list_participants(
        &self,
        meeting_id: ObjectId,
    ) -> DaoResult<Vec<MeetingParticipant>> {
        self.participants
            .find_many(
                doc! { "meeting_id": meeting_id },
                Some(doc! { "joined_at": 1 }),
            )
            .await
    }

    /// Closes the caller's open rows. Returns how many were closed.
    pub async fn leave(&self, meeting_id: ObjectId, user_id: ObjectId) -> DaoResult<u64> {
        self.participants
            .update_many(
                doc! { "meeting_id": meeting_id, "user_id": user_id, "left_at": null },
                doc! { "$set": { "left_at": DateTime::now() } },
            )
            .await
    }

    /// Meetings the user hosts or has joined, newest `scheduled_at` first.
    pub async fn list_for_user(&self, user_id: ObjectId) -> DaoResult<Vec<Meeting>> {
        let joined = self
            .participants
            .find_many(doc! { "user_id": user_id }, None)
            .await?;
        let meeting_ids: Vec<ObjectId> = joined
            .iter()
            .map(|p| p.meeting_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        self.base
            .find_many(
                doc! {
                    "$or": [
                        { "host_id": user_id },
                        { "_id": { "$in": meeting_ids } },
                    ]
                },
                Some(doc! { "scheduled_at": -1 }),
            )
            .await
    }
}

/// `{adjective}-{noun}-{0..999}`
pub fn generate_room_code() -> String {
    let mut rng = rand::rng();
    let adjective = ADJECTIVES[rng.random_range(0..ADJECTIVES.len())];
    let noun = NOUNS[rng.random_range(0..NOUNS.len())];
    let number: u32 = rng.random_range(0..1000);
    format!("{adjective}-{noun}-{number}")
}
