use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub app: AppSettings,
    pub database: DatabaseSettings,
    pub jwt: JwtSettings,
    pub livekit: LiveKitSettings,
    pub transcription: TranscriptionSettings,
    pub llm: LlmSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppSettings {
    pub host: String,
    pub port: u16,
    /// Base URL used to build shareable join links.
    pub public_url: String,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseSettings {
    pub url: String,
    pub name: String,
    pub max_pool_size: Option<u32>,
    pub min_pool_size: Option<u32>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtSettings {
    pub secret: String,
    pub access_token_ttl_secs: u64,
    pub issuer: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LiveKitSettings {
    pub url: String,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    pub token_ttl_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TranscriptionSettings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub poll_interval_ms: u64,
    pub max_wait_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmSettings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::default()
                    .separator("__")
                    .prefix("NEXMEET"),
            )
            .set_default("app.host", "0.0.0.0")?
            .set_default("app.port", 3000)?
            .set_default("app.public_url", "http://localhost:3000")?
            .set_default("app.cors_origins", Vec::<String>::new())?
            .set_default("database.url", "mongodb://localhost:27017")?
            .set_default("database.name", "nexmeet")?
            .set_default("jwt.secret", "change-me-in-production")?
            .set_default("jwt.access_token_ttl_secs", 86400)?
            .set_default("jwt.issuer", "nexmeet")?
            .set_default("livekit.url", "ws://localhost:7880")?
            .set_default("livekit.token_ttl_secs", 21600)?
            .set_default("transcription.base_url", "https://api.assemblyai.com")?
            .set_default("transcription.poll_interval_ms", 3000)?
            .set_default("transcription.max_wait_secs", 3600)?
            .set_default("llm.base_url", "https://api.anthropic.com")?
            .set_default("llm.model", "claude-sonnet-4-5-20250929")?
            .set_default("llm.max_tokens", 2000)?
            .build()?;

        config.try_deserialize()
    }
}
