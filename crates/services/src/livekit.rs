use base64::Engine;
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use nexmeet_config::LiveKitSettings;
use rand::{Rng, distr::Alphanumeric};
use serde::{Deserialize, Deserializer, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::dao::FinishedRecording;

#[derive(Debug, Error)]
pub enum LiveKitError {
    #[error("LiveKit not configured")]
    NotConfigured,
    #[error("Missing signature")]
    MissingSignature,
    #[error("Invalid webhook signature: {0}")]
    InvalidSignature(String),
    #[error("Webhook body digest mismatch")]
    DigestMismatch,
    #[error("Malformed webhook payload: {0}")]
    MalformedPayload(String),
    #[error("Failed to sign access token: {0}")]
    Signing(String),
}

/// Permissions carried in the `video` claim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoGrant {
    pub room: String,
    pub room_join: bool,
    pub can_publish: bool,
    pub can_subscribe: bool,
    pub can_publish_data: bool,
    pub can_update_own_metadata: bool,
    pub room_admin: bool,
    pub room_record: bool,
}

impl VideoGrant {
    /// Join grant for a participant; hosts additionally administer and record.
    pub fn participant(room: &str, is_host: bool) -> Self {
        Self {
            room: room.to_string(),
            room_join: true,
            can_publish: true,
            can_subscribe: true,
            can_publish_data: true,
            can_update_own_metadata: true,
            room_admin: is_host,
            room_record: is_host,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    pub iss: String,
    pub sub: String,
    pub name: String,
    pub nbf: i64,
    pub exp: i64,
    pub video: VideoGrant,
}

#[derive(Debug, Deserialize)]
struct WebhookClaims {
    sha256: Option<String>,
}

/// Issues SFU access tokens and authenticates SFU webhooks.
#[derive(Debug, Clone)]
pub struct LiveKitService {
    settings: LiveKitSettings,
}

impl LiveKitService {
    pub fn new(settings: LiveKitSettings) -> Self {
        Self { settings }
    }

    pub fn url(&self) -> &str {
        &self.settings.url
    }

    fn credentials(&self) -> Result<(&str, &str), LiveKitError> {
        match (
            self.settings.api_key.as_deref().filter(|k| !k.is_empty()),
            self.settings.api_secret.as_deref().filter(|s| !s.is_empty()),
        ) {
            (Some(key), Some(secret)) => Ok((key, secret)),
            _ => Err(LiveKitError::NotConfigured),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.credentials().is_ok()
    }

    pub fn issue_token(
        &self,
        identity: &str,
        name: &str,
        grant: VideoGrant,
    ) -> Result<String, LiveKitError> {
        let (api_key, api_secret) = self.credentials()?;
        let now = Utc::now().timestamp();

        let claims = AccessClaims {
            iss: api_key.to_string(),
            sub: identity.to_string(),
            name: name.to_string(),
            nbf: now,
            exp: now + self.settings.token_ttl_secs as i64,
            video: grant,
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(api_secret.as_bytes()),
        )
        .map_err(|e| LiveKitError::Signing(e.to_string()))
    }

    /// Checks the signed token from the `Authorization` header against the
    /// raw body and parses the event.
    pub fn verify_webhook(
        &self,
        signature: Option<&str>,
        body: &[u8],
    ) -> Result<WebhookEvent, LiveKitError> {
        let (api_key, api_secret) = self.credentials()?;
        let token = signature
            .map(|s| s.trim())
            .map(|s| s.strip_prefix("Bearer ").unwrap_or(s).trim())
            .filter(|s| !s.is_empty())
            .ok_or(LiveKitError::MissingSignature)?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[api_key]);
        validation.set_required_spec_claims(&["iss"]);
        validation.validate_nbf = true;

        let claims = decode::<WebhookClaims>(
            token,
            &DecodingKey::from_secret(api_secret.as_bytes()),
            &validation,
        )
        .map_err(|e| LiveKitError::InvalidSignature(e.to_string()))?
        .claims;

        let expected = claims.sha256.ok_or(LiveKitError::DigestMismatch)?;
        if expected != body_digest(body) {
            return Err(LiveKitError::DigestMismatch);
        }

        serde_json::from_slice(body).map_err(|e| LiveKitError::MalformedPayload(e.to_string()))
    }
}

/// Base64 SHA-256 of the raw request body, as placed in the `sha256` claim.
pub fn body_digest(body: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(Sha256::digest(body))
}

/// `guest_{unix_millis}_{9 random alphanumerics}`
pub fn guest_identity() -> String {
    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(9)
        .map(|c| char::from(c).to_ascii_lowercase())
        .collect();
    format!("guest_{}_{}", Utc::now().timestamp_millis(), suffix)
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookEvent {
    pub event: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub room: Option<RoomInfo>,
    #[serde(default)]
    pub egress_info: Option<EgressInfo>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomInfo {
    #[serde(default)]
    pub sid: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EgressInfo {
    #[serde(default)]
    pub egress_id: Option<String>,
    #[serde(default)]
    pub room_name: Option<String>,
    /// Enum name (`EGRESS_FAILED`) or its number, depending on the encoder.
    #[serde(default)]
    pub status: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub file_results: Option<Vec<FileInfo>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    pub filename: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub download_url: Option<String>,
    /// Nanoseconds.
    #[serde(default, deserialize_with = "lenient_u64")]
    pub duration: u64,
    /// Bytes.
    #[serde(default, deserialize_with = "lenient_u64")]
    pub size: u64,
}

impl WebhookEvent {
    pub fn room_name(&self) -> Option<&str> {
        self.room
            .as_ref()
            .map(|r| r.name.as_str())
            .or_else(|| self.egress_info.as_ref()?.room_name.as_deref())
            .filter(|name| !name.is_empty())
    }

    pub fn room_sid(&self) -> Option<&str> {
        self.room.as_ref()?.sid.as_deref().filter(|sid| !sid.is_empty())
    }
}

impl EgressInfo {
    pub fn is_failed(&self) -> bool {
        let status_failed = match &self.status {
            Some(serde_json::Value::String(s)) => {
                matches!(s.as_str(), "EGRESS_FAILED" | "EGRESS_ABORTED")
            }
            Some(serde_json::Value::Number(n)) => matches!(n.as_u64(), Some(4 | 5)),
            _ => false,
        };
        status_failed || self.error.as_deref().is_some_and(|e| !e.is_empty())
    }

    /// The egress output, provided it produced an `.mp4`.
    pub fn finished_recording(&self) -> Option<FinishedRecording> {
        let files = self.file_results.as_deref()?;
        let video = files.iter().find(|f| f.filename.ends_with(".mp4"))?;
        let audio = files
            .iter()
            .find(|f| f.filename.ends_with(".mp3") || f.filename.ends_with(".wav"));

        Some(FinishedRecording {
            egress_id: self.egress_id.clone(),
            recording_url: video.url().unwrap_or(&video.filename).to_string(),
            audio_url: audio.and_then(|a| a.url()).map(str::to_string),
            duration_seconds: nanos_to_seconds(video.duration),
            file_size_mb: bytes_to_mb(video.size),
        })
    }
}

impl FileInfo {
    fn url(&self) -> Option<&str> {
        self.download_url
            .as_deref()
            .or(self.location.as_deref())
            .filter(|u| !u.is_empty())
    }
}

fn nanos_to_seconds(nanos: u64) -> u32 {
    (nanos as f64 / 1_000_000_000.0).round() as u32
}

fn bytes_to_mb(bytes: u64) -> f64 {
    (bytes as f64 / (1024.0 * 1024.0) * 100.0).round() / 100.0
}

/// Accepts `123`, `123.0`, `"123"` or null. Protobuf JSON encodes int64 as strings.
fn lenient_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(u64),
        Float(f64),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(0),
        Some(Raw::Int(n)) => Ok(n),
        Some(Raw::Float(f)) => Ok(f.max(0.0) as u64),
        Some(Raw::Text(s)) if s.trim().is_empty() => Ok(0),
        Some(Raw::Text(s)) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}
