use std::time::Duration;

use bson::{Document, doc, oid::ObjectId};
use chrono::Utc;
use jsonwebtoken::{EncodingKey, Header, encode};
use nexmeet_services::livekit::body_digest;
use serde_json::Value;

use super::test_app::{LIVEKIT_KEY, LIVEKIT_SECRET, TestApp};

pub struct SeededUser {
    pub id: String,
    pub email: String,
    pub name: String,
    pub access_token: String,
}

/// A host, a second member who joined, and an outsider, around one meeting.
pub struct SeededMeeting {
    pub host: SeededUser,
    pub member: SeededUser,
    pub outsider: SeededUser,
    pub meeting_id: String,
    pub room_name: String,
}

impl TestApp {
    /// Register a user and return their auth info.
    pub async fn register_user(&self, email: &str, full_name: &str, password: &str) -> SeededUser {
        let resp = self
            .client
            .post(self.url("/api/auth/register"))
            .json(&serde_json::json!({
                "email": email,
                "full_name": full_name,
                "password": password,
            }))
            .send()
            .await
            .expect("Register request failed");

        let status = resp.status().as_u16();
        let json: Value = resp.json().await.expect("Failed to parse register response");
        assert_eq!(status, 201, "Register failed: {json}");

        SeededUser {
            id: json["user"]["id"].as_str().unwrap().to_string(),
            email: email.to_string(),
            name: json["user"]["display_name"].as_str().unwrap().to_string(),
            access_token: json["access_token"].as_str().unwrap().to_string(),
        }
    }

    /// Create an authenticated request with the given token.
    pub fn auth_get(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.client
            .get(self.url(path))
            .header("Authorization", format!("Bearer {}", token))
    }

    pub fn auth_post(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.client
            .post(self.url(path))
            .header("Authorization", format!("Bearer {}", token))
    }

    pub fn auth_delete(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.client
            .delete(self.url(path))
            .header("Authorization", format!("Bearer {}", token))
    }

    /// Schedule a meeting ten minutes ahead; returns the `meeting` object.
    pub async fn create_meeting(&self, token: &str, title: &str) -> Value {
        let scheduled_at = (Utc::now() + chrono::Duration::minutes(10)).to_rfc3339();
        let resp = self
            .auth_post("/api/meetings", token)
            .json(&serde_json::json!({
                "title": title,
                "description": "Weekly sync",
                "scheduled_at": scheduled_at,
            }))
            .send()
            .await
            .expect("Create meeting request failed");

        let status = resp.status().as_u16();
        let json: Value = resp.json().await.expect("Failed to parse meeting response");
        assert_eq!(status, 201, "Create meeting failed: {json}");
        json["meeting"].clone()
    }

    /// Seed host, member and outsider; the member is added as a participant.
    pub async fn seed_meeting(&self, prefix: &str) -> SeededMeeting {
        let host = self
            .register_user(&format!("host@{prefix}.test"), "Hana Host", "Host12345!")
            .await;
        let member = self
            .register_user(&format!("member@{prefix}.test"), "Mo Member", "Member123!")
            .await;
        let outsider = self
            .register_user(&format!("outsider@{prefix}.test"), "Otto Outsider", "Outsider1!")
            .await;

        let meeting = self.create_meeting(&host.access_token, "Beta planning").await;
        let meeting_id = meeting["id"].as_str().unwrap().to_string();
        let room_name = meeting["room_name"].as_str().unwrap().to_string();

        let resp = self
            .auth_post(
                &format!("/api/meetings/{meeting_id}/participants"),
                &member.access_token,
            )
            .json(&serde_json::json!({ "user_id": member.id }))
            .send()
            .await
            .expect("Add participant request failed");
        assert_eq!(resp.status().as_u16(), 201);

        SeededMeeting {
            host,
            member,
            outsider,
            meeting_id,
            room_name,
        }
    }

    /// Signs a webhook body the way the SFU does.
    pub fn sign_webhook(&self, body: &str) -> String {
        let now = Utc::now().timestamp();
        let claims = serde_json::json!({
            "iss": LIVEKIT_KEY,
            "nbf": now,
            "exp": now + 300,
            "sha256": body_digest(body.as_bytes()),
        });
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(LIVEKIT_SECRET.as_bytes()),
        )
        .unwrap()
    }

    /// POST a correctly signed webhook.
    pub async fn send_webhook(&self, event: &Value) -> reqwest::Response {
        let body = event.to_string();
        self.client
            .post(self.url("/api/livekit/webhook"))
            .header("Authorization", self.sign_webhook(&body))
            .header("Content-Type", "application/webhook+json")
            .body(body)
            .send()
            .await
            .expect("Webhook request failed")
    }

    pub async fn raw_doc(&self, collection: &str, filter: Document) -> Option<Document> {
        self.db
            .collection::<Document>(collection)
            .find_one(filter)
            .await
            .unwrap()
    }

    pub async fn meeting_doc(&self, meeting_id: &str) -> Document {
        let id = ObjectId::parse_str(meeting_id).unwrap();
        self.raw_doc("meetings", doc! { "_id": id })
            .await
            .expect("Meeting row missing")
    }

    /// Polls the meeting's recording row until `done` accepts it.
    pub async fn wait_for_recording(
        &self,
        meeting_id: &str,
        done: impl Fn(&Document) -> bool,
    ) -> Document {
        let id = ObjectId::parse_str(meeting_id).unwrap();
        for _ in 0..100 {
            if let Some(row) = self
                .raw_doc("meeting_recordings", doc! { "meeting_id": id })
                .await
            {
                if done(&row) {
                    return row;
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        panic!("Recording for meeting {meeting_id} never reached the expected state");
    }

    pub async fn job_statuses(&self, meeting_id: &str, job_type: &str) -> Vec<String> {
        let id = ObjectId::parse_str(meeting_id).unwrap();
        let mut cursor = self
            .db
            .collection::<Document>("processing_queue")
            .find(doc! { "meeting_id": id, "job_type": job_type })
            .await
            .unwrap();

        let mut statuses = Vec::new();
        while cursor.advance().await.unwrap() {
            let row = cursor.deserialize_current().unwrap();
            statuses.push(row.get_str("status").unwrap().to_string());
        }
        statuses
    }

    /// Polls the job audit rows until their statuses equal `expected`.
    pub async fn wait_for_jobs(&self, meeting_id: &str, job_type: &str, expected: &[&str]) {
        let mut statuses = Vec::new();
        for _ in 0..100 {
            statuses = self.job_statuses(meeting_id, job_type).await;
            if statuses == expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        panic!("{job_type} jobs for meeting {meeting_id} are {statuses:?}, expected {expected:?}");
    }
}
