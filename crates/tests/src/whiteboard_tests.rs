use crate::fixtures::test_app::TestApp;
use serde_json::Value;

#[tokio::test]
async fn empty_whiteboard_loads_as_nulls() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_meeting("wbempty").await;

    let resp = app
        .auth_get(
            &format!("/api/meetings/{}/whiteboard", seeded.meeting_id),
            &seeded.member.access_token,
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let json: Value = resp.json().await.unwrap();
    assert!(json["data"].is_null());
    assert!(json["last_modified"].is_null());
}

#[tokio::test]
async fn latest_snapshot_wins() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_meeting("wbsave").await;
    let path = format!("/api/meetings/{}/whiteboard", seeded.meeting_id);

    for (token, shapes) in [
        (&seeded.host.access_token, serde_json::json!([{ "type": "rect" }])),
        (
            &seeded.member.access_token,
            serde_json::json!([{ "type": "rect" }, { "type": "arrow" }]),
        ),
    ] {
        let resp = app
            .auth_post(&path, token)
            .json(&serde_json::json!({ "data": { "shapes": shapes }, "is_auto_save": true }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 200);
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }

    let resp = app.auth_get(&path, &seeded.host.access_token).send().await.unwrap();
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["data"]["shapes"].as_array().unwrap().len(), 2);
    assert!(json["last_modified"].is_string());
}

#[tokio::test]
async fn save_requires_data_and_membership() {
    let app = TestApp::spawn().await;
    let seeded = app.seed_meeting("wbguard").await;
    let path = format!("/api/meetings/{}/whiteboard", seeded.meeting_id);

    let resp = app
        .auth_post(&path, &seeded.host.access_token)
        .json(&serde_json::json!({ "is_auto_save": false }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);

    let resp = app
        .auth_post(&path, &seeded.outsider.access_token)
        .json(&serde_json::json!({ "data": { "shapes": [] } }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);
}
