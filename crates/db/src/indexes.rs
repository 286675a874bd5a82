use mongodb::{Database, IndexModel, options::IndexOptions};
use tracing::info;

use crate::models::{
    Meeting, MeetingMessage, MeetingParticipant, MeetingRecording, ProcessingJob, User,
    WhiteboardSnapshot,
};

pub async fn ensure_indexes(db: &Database) -> Result<(), mongodb::error::Error> {
    create_indexes(
        db,
        User::COLLECTION,
        vec![index_unique(bson::doc! { "email": 1 })],
    )
    .await?;

    // Room codes double as join links, so they must never collide
    create_indexes(
        db,
        Meeting::COLLECTION,
        vec![
            index_unique(bson::doc! { "room_name": 1 }),
            index(bson::doc! { "host_id": 1, "scheduled_at": -1 }),
        ],
    )
    .await?;

    create_indexes(
        db,
        MeetingParticipant::COLLECTION,
        vec![
            index(bson::doc! { "meeting_id": 1, "joined_at": 1 }),
            index(bson::doc! { "user_id": 1, "meeting_id": 1 }),
        ],
    )
    .await?;

    create_indexes(
        db,
        MeetingMessage::COLLECTION,
        vec![index(bson::doc! { "meeting_id": 1, "created_at": 1 })],
    )
    .await?;

    create_indexes(
        db,
        WhiteboardSnapshot::COLLECTION,
        vec![index(bson::doc! { "meeting_id": 1, "created_at": -1 })],
    )
    .await?;

    create_indexes(
        db,
        MeetingRecording::COLLECTION,
        vec![
            index_unique(bson::doc! { "meeting_id": 1 }),
            index(bson::doc! { "transcription_status": 1 }),
        ],
    )
    .await?;

    create_indexes(
        db,
        ProcessingJob::COLLECTION,
        vec![index(bson::doc! { "meeting_id": 1, "job_type": 1, "status": 1 })],
    )
    .await?;

    info!("All indexes ensured");
    Ok(())
}

fn index(keys: bson::Document) -> IndexModel {
    IndexModel::builder().keys(keys).build()
}

fn index_unique(keys: bson::Document) -> IndexModel {
    IndexModel::builder()
        .keys(keys)
        .options(IndexOptions::builder().unique(true).build())
        .build()
}

async fn create_indexes(
    db: &Database,
    collection: &str,
    indexes: Vec<IndexModel>,
) -> Result<(), mongodb::error::Error> {
    db.collection::<bson::Document>(collection)
        .create_indexes(indexes)
        .await?;
    info!(collection, "Indexes created");
    Ok(())
}
