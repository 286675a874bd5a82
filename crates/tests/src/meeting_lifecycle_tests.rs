use crate::fixtures::test_app::TestApp;
use bson::{doc, oid::ObjectId};
use chrono::{Duration, Utc};
use serde_json::Value;

async fn post_json(app: &TestApp, path: &str, token: &str) -> (u16, Value) {
    let resp = app.auth_post(path, token).send().await.unwrap();
    let status = resp.status().as_u16();
    (status, resp.json().await.unwrap())
}

#[tokio::test]
async fn create_returns_room_code_and_join_url() {
    let app = TestApp::spawn().await;
    let host = app.register_user("host@create.test", "Host", "Password123!").await;

    let scheduled_at = (Utc::now() + Duration::minutes(30)).to_rfc3339();
    let resp = app
        .auth_post("/api/meetings", &host.access_token)
        .json(&serde_json::json!({
            "title": "  Quarterly review  ",
            "scheduled_at": scheduled_at,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 201);

    let json: Value = resp.json().await.unwrap();
    let meeting = &json["meeting"];
    assert_eq!(meeting["title"], "Quarterly review");
    assert_eq!(meeting["status"], "scheduled");
    assert_eq!(meeting["is_recording"], true);
    assert_eq!(meeting["room_style"], "futuristic");

    let room = meeting["room_name"].as_str().unwrap();
    let parts: Vec<&str> = room.split('-').collect();
    assert_eq!(parts.len(), 3);
    assert!(parts[2].parse::<u32>().unwrap() < 1000);
    assert!(json["join_url"].as_str().unwrap().ends_with(&format!("/room/{room}")));
    assert_eq!(json["room_code"], room);

    // Host is added as a participant.
    let resp = app
        .auth_get(
            &format!("/api/meetings/{}/participants", meeting["id"].as_str().unwrap()),
            &host.access_token,
        )
        .send()
        .await
        .unwrap();
    let participants: Vec<Value> = resp.json().await.unwrap();
    assert_eq!(participants.len(), 1);
    assert_eq!(participants[0]["is_host"], true);
}

#[tokio::test]
async fn create_accepts_local_datetime_input() {
    let app = TestApp::spawn().await;
    let host = app.register_user("host@local.test", "Host", "Password123!").await;

    let scheduled_at = (Utc::now() + Duration::hours(2))
        .format("%Y-%m-%dT%H:%M")
        .to_string();
    let resp = app
        .auth_post("/api/meetings", &host.access_token)
        .json(&serde_json::json!({ "title": "Stand-up", "scheduled_at": scheduled_at }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 201);

    let json: Value = resp.json().await.unwrap();
    let stored = json["meeting"]["scheduled_at"].as_str().unwrap();
    assert!(stored.starts_with(&scheduled_at), "{stored} vs {scheduled_at}");
    assert!(json["room_code"].is_string());
}

#[tokio::test]
async fn create_validates_title_and_schedule() {
    let app = TestApp::spawn().await;
    let host = app.register_user("host@validate.test", "Host", "Password123!").await;

    let cases = [
        serde_json::json!({ "scheduled_at": (Utc::now() + Duration::hours(1)).to_rfc3339() }),
        serde_json::json!({ "title": "   ", "scheduled_at": (Utc::now() + Duration::hours(1)).to_rfc3339() }),
        serde_json::json!({ "title": "Past", "scheduled_at": (Utc::now() - Duration::minutes(1)).to_rfc3339() }),
        serde_json::json!({ "title": "Garbled", "scheduled_at": "next tuesday" }),
    ];

    for body in cases {
        let resp = app
            .auth_post("/api/meetings", &host.access_token)
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 400, "accepted {body}");
    }
}

#[tokio::test]
async fn early_start_then_double_end_is_idempotent() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_meeting("early").await;
    let base = format!("/api/meetings/{}", seeded.meeting_id);
    let token = &seeded.host.access_token;

    // No time gate against scheduled_at.
    let (status, json) = post_json(&app, &format!("{base}/start"), token).await;
    assert_eq!(status, 200);
    assert_eq!(json["message"], "Meeting started");

    let (status, json) = post_json(&app, &format!("{base}/start"), token).await;
    assert_eq!(status, 200);
    assert_eq!(json["message"], "Meeting already started");

    let (status, first) = post_json(&app, &format!("{base}/end"), token).await;
    assert_eq!(status, 200);
    assert_eq!(first["message"], "Meeting ended");

    let (status, second) = post_json(&app, &format!("{base}/end"), token).await;
    assert_eq!(status, 200);
    assert_eq!(second["message"], "Meeting already ended");
    assert_eq!(first["ended_at"], second["ended_at"]);
}

#[tokio::test]
async fn start_after_end_is_rejected() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_meeting("restart").await;
    let base = format!("/api/meetings/{}", seeded.meeting_id);
    let token = &seeded.host.access_token;

    // Ending a meeting that never started is allowed.
    let (status, _) = post_json(&app, &format!("{base}/end"), token).await;
    assert_eq!(status, 200);

    let (status, json) = post_json(&app, &format!("{base}/start"), token).await;
    assert_eq!(status, 400);
    assert_eq!(json["error"], "Cannot start an ended meeting");
}

#[tokio::test]
async fn only_the_host_transitions_the_meeting() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_meeting("hostonly").await;
    let base = format!("/api/meetings/{}", seeded.meeting_id);
    let token = &seeded.member.access_token;

    let (status, json) = post_json(&app, &format!("{base}/start"), token).await;
    assert_eq!(status, 403);
    assert_eq!(json["error"], "Only the host can start the meeting");

    let (status, json) = post_json(&app, &format!("{base}/end"), token).await;
    assert_eq!(status, 403);
    assert_eq!(json["error"], "Only the host can end the meeting");

    let resp = app.auth_delete(&base, token).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 403);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["error"], "Only the host can delete the meeting");
}

#[tokio::test]
async fn delete_after_start_is_rejected() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_meeting("nodelete").await;
    let base = format!("/api/meetings/{}", seeded.meeting_id);
    let token = &seeded.host.access_token;

    post_json(&app, &format!("{base}/start"), token).await;

    let resp = app.auth_delete(&base, token).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 400);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["error"], "Cannot delete a meeting that has already started");

    // Still there.
    let resp = app.auth_get(&base, token).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 200);
}

#[tokio::test]
async fn delete_scheduled_meeting_removes_dependents() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_meeting("cascade").await;
    let base = format!("/api/meetings/{}", seeded.meeting_id);
    let token = &seeded.host.access_token;

    app.auth_post(&format!("{base}/messages"), token)
        .json(&serde_json::json!({ "message": "agenda incoming" }))
        .send()
        .await
        .unwrap();
    app.auth_post(&format!("{base}/whiteboard"), token)
        .json(&serde_json::json!({ "data": { "shapes": [] } }))
        .send()
        .await
        .unwrap();
    app.auth_post(&format!("{base}/recording"), token)
        .send()
        .await
        .unwrap();

    let resp = app.auth_delete(&base, token).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let resp = app.auth_get(&base, token).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 404);

    let mid = ObjectId::parse_str(&seeded.meeting_id).unwrap();
    for collection in [
        "meeting_participants",
        "meeting_messages",
        "whiteboard_snapshots",
        "meeting_recordings",
    ] {
        assert!(
            app.raw_doc(collection, doc! { "meeting_id": mid }).await.is_none(),
            "{collection} still holds rows"
        );
    }
}

#[tokio::test]
async fn end_closes_open_participant_rows() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_meeting("closeout").await;
    let base = format!("/api/meetings/{}", seeded.meeting_id);

    post_json(&app, &format!("{base}/start"), &seeded.host.access_token).await;
    let (_, ended) = post_json(&app, &format!("{base}/end"), &seeded.host.access_token).await;
    assert!(ended["ended_at"].is_string());

    let resp = app
        .auth_get(&format!("{base}/participants"), &seeded.host.access_token)
        .send()
        .await
        .unwrap();
    let participants: Vec<Value> = resp.json().await.unwrap();
    assert_eq!(participants.len(), 2);
    for p in &participants {
        assert!(p["left_at"].is_string(), "participant still open: {p}");
    }
}

#[tokio::test]
async fn leave_is_idempotent() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_meeting("leave").await;
    let path = format!("/api/meetings/{}/leave", seeded.meeting_id);

    let (status, json) = post_json(&app, &path, &seeded.member.access_token).await;
    assert_eq!(status, 200);
    assert_eq!(json["closed"], 1);

    let (status, json) = post_json(&app, &path, &seeded.member.access_token).await;
    assert_eq!(status, 200);
    assert_eq!(json["closed"], 0);
}

#[tokio::test]
async fn get_checks_membership_and_ids() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_meeting("access").await;

    let resp = app
        .auth_get(
            &format!("/api/meetings/{}", seeded.meeting_id),
            &seeded.outsider.access_token,
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);

    let resp = app
        .auth_get("/api/meetings/not-an-id", &seeded.host.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);

    let resp = app
        .auth_get(
            &format!("/api/meetings/{}", ObjectId::new().to_hex()),
            &seeded.host.access_token,
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);
}

#[tokio::test]
async fn list_returns_joined_meetings_newest_first() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_meeting("listing").await;
    let later = app
        .create_meeting(&seeded.host.access_token, "Later one")
        .await;

    let resp = app
        .auth_get("/api/meetings", &seeded.host.access_token)
        .send()
        .await
        .unwrap();
    let meetings: Vec<Value> = resp.json().await.unwrap();
    assert_eq!(meetings.len(), 2);
    assert_eq!(meetings[0]["id"], later["id"]);
    assert!(meetings[0]["participants"].is_array());

    let resp = app
        .auth_get("/api/meetings", &seeded.member.access_token)
        .send()
        .await
        .unwrap();
    let meetings: Vec<Value> = resp.json().await.unwrap();
    assert_eq!(meetings.len(), 1);
    assert_eq!(meetings[0]["id"], seeded.meeting_id.as_str());

    let resp = app
        .auth_get("/api/meetings", &seeded.outsider.access_token)
        .send()
        .await
        .unwrap();
    let meetings: Vec<Value> = resp.json().await.unwrap();
    assert!(meetings.is_empty());
}

#[tokio::test]
async fn room_lookups_by_code() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_meeting("lookup").await;

    // Any signed-in user gets host info.
    let resp = app
        .auth_get(
            &format!("/api/meetings/info/{}", seeded.room_name),
            &seeded.outsider.access_token,
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["host"]["display_name"], "Hana Host");

    // Public info needs no session and exposes no ids.
    let resp = reqwest::Client::new()
        .get(app.url(&format!("/api/meetings/public-info/{}", seeded.room_name)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["title"], "Beta planning");
    assert!(json.get("host_id").is_none());

    // Room page is members only.
    let resp = app
        .auth_get(
            &format!("/api/rooms/{}", seeded.room_name),
            &seeded.outsider.access_token,
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);

    let resp = app
        .auth_get(
            &format!("/api/rooms/{}", seeded.room_name),
            &seeded.member.access_token,
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["is_host"], false);

    let resp = app
        .auth_get("/api/rooms/no-such-room", &seeded.member.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);
}

#[tokio::test]
async fn concurrent_ends_stamp_ended_at_once() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_meeting("raceend").await;
    let token = &seeded.host.access_token;
    let path = format!("/api/meetings/{}/end", seeded.meeting_id);

    let (a, b) = tokio::join!(
        post_json(&app, &path, token),
        post_json(&app, &path, token)
    );
    assert_eq!((a.0, b.0), (200, 200));

    let mut messages = [
        a.1["message"].as_str().unwrap().to_string(),
        b.1["message"].as_str().unwrap().to_string(),
    ];
    messages.sort();
    assert_eq!(messages, ["Meeting already ended", "Meeting ended"]);
    assert_eq!(a.1["ended_at"], b.1["ended_at"]);

    let row = app.meeting_doc(&seeded.meeting_id).await;
    let stored = row.get_datetime("ended_at").unwrap().to_chrono().to_rfc3339();
    assert_eq!(a.1["ended_at"], stored.as_str());
}

#[tokio::test]
async fn concurrent_start_and_delete_never_both_succeed() {
    let app = TestApp::spawn().await;
    let host = app.register_user("host@racedel.test", "Host", "Password123!").await;

    for round in 0..5 {
        let meeting = app
            .create_meeting(&host.access_token, &format!("Race {round}"))
            .await;
        let id = meeting["id"].as_str().unwrap().to_string();
        let start_path = format!("/api/meetings/{id}/start");
        let delete_path = format!("/api/meetings/{id}");

        let (start, delete) = tokio::join!(
            post_json(&app, &start_path, &host.access_token),
            async {
                let resp = app
                    .auth_delete(&delete_path, &host.access_token)
                    .send()
                    .await
                    .unwrap();
                let status = resp.status().as_u16();
                (status, resp.json::<Value>().await.unwrap())
            }
        );

        let row = app
            .raw_doc("meetings", doc! { "_id": ObjectId::parse_str(&id).unwrap() })
            .await;
        match (start.0, delete.0) {
            (200, 400) => {
                assert_eq!(start.1["message"], "Meeting started");
                assert_eq!(
                    delete.1["error"],
                    "Cannot delete a meeting that has already started"
                );
                assert!(row.unwrap().get_datetime("started_at").is_ok());
            }
            (404, 200) => assert!(row.is_none()),
            other => panic!("round {round}: unexpected outcome {other:?}"),
        }
    }
}
