use crate::fixtures::test_app::TestApp;
use bson::{doc, oid::ObjectId};
use serde_json::Value;

#[tokio::test]
async fn host_creates_a_single_placeholder_recording() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_meeting("rec").await;
    let path = format!("/api/meetings/{}/recording", seeded.meeting_id);

    let resp = app.auth_get(&path, &seeded.host.access_token).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 404);

    let resp = app.auth_post(&path, &seeded.host.access_token).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 201);
    let json: Value = resp.json().await.unwrap();
    assert!(
        json["recording"]["egress_id"]
            .as_str()
            .unwrap()
            .starts_with("manual_")
    );
    assert_eq!(json["recording"]["transcription_status"], "pending");

    let resp = app.auth_post(&path, &seeded.host.access_token).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let again: Value = resp.json().await.unwrap();
    assert_eq!(again["message"], "Recording already in progress");
    assert_eq!(again["recording"]["id"], json["recording"]["id"]);

    // Members can read it.
    let resp = app.auth_get(&path, &seeded.member.access_token).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 200);
}

#[tokio::test]
async fn recording_controls_are_host_only() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_meeting("recguard").await;
    let path = format!("/api/meetings/{}/recording", seeded.meeting_id);

    let resp = app.auth_post(&path, &seeded.member.access_token).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 403);

    let resp = app.auth_delete(&path, &seeded.member.access_token).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 403);

    let resp = app.auth_delete(&path, &seeded.host.access_token).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let json: Value = resp.json().await.unwrap();
    assert!(json["message"].as_str().unwrap().contains("meeting ends"));
}

#[tokio::test]
async fn recording_disabled_meeting_rejects_start() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_meeting("recoff").await;

    app.db
        .collection::<bson::Document>("meetings")
        .update_one(
            doc! { "_id": ObjectId::parse_str(&seeded.meeting_id).unwrap() },
            doc! { "$set": { "is_recording": false } },
        )
        .await
        .unwrap();

    let resp = app
        .auth_post(
            &format!("/api/meetings/{}/recording", seeded.meeting_id),
            &seeded.host.access_token,
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
}
