pub mod auth;
pub mod dao;
pub mod lifecycle;
pub mod livekit;
pub mod pipeline;
pub mod relay;
pub mod summary;
pub mod transcription;

pub use auth::AuthService;
pub use dao::*;
pub use lifecycle::MeetingLifecycle;
pub use livekit::LiveKitService;
pub use pipeline::RecordingPipeline;
pub use relay::WebhookRelay;
pub use summary::{ClaudeSummarizer, Summarizer};
pub use transcription::{AssemblyAiTranscriber, Transcriber};
