use std::time::Duration;

use anyhow::{anyhow, bail, Context};
use async_trait::async_trait;
use nexmeet_config::TranscriptionSettings;
use nexmeet_db::models::{Chapter, Highlight, Utterance};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Finished speech-to-text output for one recording.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    pub id: String,
    pub text: String,
    pub utterances: Vec<Utterance>,
    pub chapters: Vec<Chapter>,
    pub highlights: Vec<Highlight>,
}

/// Speech-to-text backend used by the recording pipeline.
#[async_trait]
pub trait Transcriber: Send + Sync + 'static {
    /// Transcribes the media at `audio_url`, waiting for the result.
    async fn transcribe(&self, audio_url: &str) -> anyhow::Result<Transcript>;

    fn name(&self) -> &str;
}

#[derive(Debug, Serialize)]
struct SubmitRequest<'a> {
    audio_url: &'a str,
    speaker_labels: bool,
    auto_chapters: bool,
    auto_highlights: bool,
}

#[derive(Debug, Deserialize)]
struct TranscriptResponse {
    id: String,
    status: String,
    text: Option<String>,
    error: Option<String>,
    #[serde(default)]
    utterances: Option<Vec<RemoteUtterance>>,
    #[serde(default)]
    chapters: Option<Vec<RemoteChapter>>,
    auto_highlights_result: Option<HighlightsResult>,
}

#[derive(Debug, Deserialize)]
struct RemoteUtterance {
    speaker: String,
    text: String,
    start: u64,
    end: u64,
    confidence: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RemoteChapter {
    headline: String,
    gist: Option<String>,
    summary: Option<String>,
    start: u64,
    end: u64,
}

#[derive(Debug, Deserialize)]
struct HighlightsResult {
    #[serde(default)]
    results: Vec<RemoteHighlight>,
}

#[derive(Debug, Deserialize)]
struct RemoteHighlight {
    text: String,
    count: u32,
    rank: f64,
}

impl From<TranscriptResponse> for Transcript {
    fn from(resp: TranscriptResponse) -> Self {
        Self {
            id: resp.id,
            text: resp.text.unwrap_or_default(),
            utterances: resp
                .utterances
                .unwrap_or_default()
                .into_iter()
                .map(|u| Utterance {
                    speaker: u.speaker,
                    text: u.text,
                    start: u.start,
                    end: u.end,
                    confidence: u.confidence,
                })
                .collect(),
            chapters: resp
                .chapters
                .unwrap_or_default()
                .into_iter()
                .map(|c| Chapter {
                    headline: c.headline,
                    gist: c.gist,
                    summary: c.summary,
                    start: c.start,
                    end: c.end,
                })
                .collect(),
            highlights: resp
                .auto_highlights_result
                .map(|h| h.results)
                .unwrap_or_default()
                .into_iter()
                .map(|h| Highlight {
                    text: h.text,
                    count: h.count,
                    rank: h.rank,
                })
                .collect(),
        }
    }
}

/// AssemblyAI REST client: submit, then poll until the job settles.
#[derive(Debug, Clone)]
pub struct AssemblyAiTranscriber {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    poll_interval: Duration,
    max_wait: Duration,
}

impl AssemblyAiTranscriber {
    pub fn new(client: Client, settings: &TranscriptionSettings) -> Self {
        Self {
            client,
            api_key: settings.api_key.clone(),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            poll_interval: Duration::from_millis(settings.poll_interval_ms.max(100)),
            max_wait: Duration::from_secs(settings.max_wait_secs),
        }
    }

    pub fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    async fn fetch(&self, api_key: &str, id: &str) -> anyhow::Result<TranscriptResponse> {
        let response = self
            .client
            .get(format!("{}/v2/transcript/{}", self.base_url, id))
            .header("authorization", api_key)
            .send()
            .await
            .context("AssemblyAI poll request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("AssemblyAI error {}: {}", status, body);
        }

        response
            .json()
            .await
            .context("Failed to parse AssemblyAI transcript")
    }
}

#[async_trait]
impl Transcriber for AssemblyAiTranscriber {
    async fn transcribe(&self, audio_url: &str) -> anyhow::Result<Transcript> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| anyhow!("AssemblyAI API key not configured"))?;

        let response = self
            .client
            .post(format!("{}/v2/transcript", self.base_url))
            .header("authorization", api_key)
            .json(&SubmitRequest {
                audio_url,
                speaker_labels: true,
                auto_chapters: true,
                auto_highlights: true,
            })
            .send()
            .await
            .context("AssemblyAI submit request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("AssemblyAI error {}: {}", status, body);
        }

        let mut current: TranscriptResponse = response
            .json()
            .await
            .context("Failed to parse AssemblyAI submit response")?;
        info!(transcript_id = %current.id, "Transcription submitted");

        let deadline = tokio::time::Instant::now() + self.max_wait;
        loop {
            match current.status.as_str() {
                "completed" => return Ok(current.into()),
                "error" => bail!(
                    "Transcription failed: {}",
                    current.error.unwrap_or_else(|| "unknown error".to_string())
                ),
                status => debug!(transcript_id = %current.id, status, "Transcription pending"),
            }

            if tokio::time::Instant::now() + self.poll_interval > deadline {
                bail!(
                    "Transcription {} did not finish within {}s",
                    current.id,
                    self.max_wait.as_secs()
                );
            }
            tokio::time::sleep(self.poll_interval).await;
            current = self.fetch(api_key, &current.id).await?;
        }
    }

    fn name(&self) -> &str {
        "assemblyai"
    }
}
