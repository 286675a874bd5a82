use anyhow::{anyhow, bail, Context};
use async_trait::async_trait;
use nexmeet_config::LlmSettings;
use nexmeet_db::models::ActionItem;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Structured analysis of a meeting transcript.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeetingAnalysis {
    #[serde(default)]
    pub executive_summary: String,
    #[serde(default)]
    pub key_points: Vec<String>,
    #[serde(default)]
    pub decisions: Vec<String>,
    #[serde(default)]
    pub action_items: Vec<ActionItem>,
    #[serde(default)]
    pub next_steps: Vec<String>,
    #[serde(default)]
    pub open_topics: Vec<String>,
    #[serde(default = "neutral")]
    pub sentiment: String,
}

fn neutral() -> String {
    "neutral".to_string()
}

impl MeetingAnalysis {
    /// Used when the model answers with something other than the JSON shape.
    pub fn fallback(raw_reply: &str) -> Self {
        Self {
            executive_summary: raw_reply.trim().to_string(),
            sentiment: neutral(),
            ..Default::default()
        }
    }
}

/// Context handed to the summarizer.
#[derive(Debug, Clone)]
pub struct SummaryRequest<'a> {
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub transcript: &'a str,
}

#[async_trait]
pub trait Summarizer: Send + Sync + 'static {
    async fn summarize(&self, request: SummaryRequest<'_>) -> anyhow::Result<MeetingAnalysis>;

    fn name(&self) -> &str;
}

#[derive(Debug, Serialize)]
struct ClaudeRequest {
    model: String,
    max_tokens: u32,
    system: String,
    messages: Vec<ClaudeMessage>,
}

#[derive(Debug, Serialize)]
struct ClaudeMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ClaudeResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    text: Option<String>,
}

const SYSTEM_PROMPT: &str = "You are an expert analyst of business meetings. \
You produce precise, structured executive summaries.";

#[derive(Debug, Clone)]
pub struct ClaudeSummarizer {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
    max_tokens: u32,
}

impl ClaudeSummarizer {
    pub fn new(client: Client, settings: &LlmSettings) -> Self {
        Self {
            client,
            api_key: settings.api_key.clone(),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            max_tokens: settings.max_tokens,
        }
    }

    pub fn is_available(&self) -> bool {
        self.api_key.is_some()
    }
}

#[async_trait]
impl Summarizer for ClaudeSummarizer {
    async fn summarize(&self, request: SummaryRequest<'_>) -> anyhow::Result<MeetingAnalysis> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| anyhow!("Claude API key not configured"))?;

        let body = ClaudeRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            system: SYSTEM_PROMPT.to_string(),
            messages: vec![ClaudeMessage {
                role: "user".to_string(),
                content: build_prompt(&request),
            }],
        };

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .context("Claude API request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("Claude API error {}: {}", status, body);
        }

        let claude_resp: ClaudeResponse = response
            .json()
            .await
            .context("Failed to parse Claude response")?;

        let text = claude_resp
            .content
            .first()
            .and_then(|c| c.text.as_deref())
            .ok_or_else(|| anyhow!("No text in Claude response"))?;

        Ok(parse_analysis(text))
    }

    fn name(&self) -> &str {
        "claude"
    }
}

pub fn build_prompt(request: &SummaryRequest<'_>) -> String {
    format!(
        concat!(
            "Analyze the following meeting transcript and produce a structured executive summary.\n\n",
            "Meeting title: {title}\n",
            "Description: {description}\n\n",
            "Transcript:\n{transcript}\n\n",
            "Return a JSON object with exactly these fields:\n",
            "- \"executive_summary\": overview of the meeting in 2-3 paragraphs\n",
            "- \"key_points\": list of the most important points discussed\n",
            "- \"decisions\": list of concrete decisions taken\n",
            "- \"action_items\": list of {{\"task\", \"owner\", \"due_date\", \"priority\"}} ",
            "where priority is high, medium or low and unknown values are null\n",
            "- \"next_steps\": list of next steps mentioned\n",
            "- \"open_topics\": list of topics left unresolved\n",
            "- \"sentiment\": one of positive, neutral, negative\n",
            "Return ONLY the JSON, no markdown fences."
        ),
        title = request.title,
        description = request.description.unwrap_or("No description"),
        transcript = request.transcript,
    )
}

/// Parses the model reply, tolerating Markdown code fences. Anything that is
/// not the expected JSON object becomes [`MeetingAnalysis::fallback`].
pub fn parse_analysis(reply: &str) -> MeetingAnalysis {
    let body = strip_fences(reply);
    match serde_json::from_str::<MeetingAnalysis>(body) {
        Ok(analysis) => analysis,
        Err(e) => {
            warn!(error = %e, "LLM reply is not valid analysis JSON, storing raw text");
            MeetingAnalysis::fallback(reply)
        }
    }
}

fn strip_fences(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (e.g. "json") on the opening fence
    let rest = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
