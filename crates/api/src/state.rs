use mongodb::Database;
use nexmeet_config::Settings;
use nexmeet_services::{
    AssemblyAiTranscriber, AuthService, ClaudeSummarizer, LiveKitService, MeetingLifecycle,
    RecordingPipeline, Summarizer, Transcriber, WebhookRelay,
    dao::{MeetingDao, MessageDao, RecordingDao, UserDao, WhiteboardDao},
};
use std::sync::Arc;
use tracing::warn;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub settings: Settings,
    pub auth: Arc<AuthService>,
    pub users: Arc<UserDao>,
    pub meetings: Arc<MeetingDao>,
    pub messages: Arc<MessageDao>,
    pub whiteboards: Arc<WhiteboardDao>,
    pub recordings: Arc<RecordingDao>,
    pub lifecycle: Arc<MeetingLifecycle>,
    pub livekit: Arc<LiveKitService>,
    pub pipeline: Arc<RecordingPipeline>,
    pub relay: Arc<WebhookRelay>,
}

impl AppState {
    /// State wired to the AssemblyAI and Claude HTTP clients.
    pub fn new(db: Database, settings: Settings) -> Self {
        let http = reqwest::Client::new();
        let transcriber = Arc::new(AssemblyAiTranscriber::new(
            http.clone(),
            &settings.transcription,
        ));
        let summarizer = Arc::new(ClaudeSummarizer::new(http, &settings.llm));
        if !transcriber.is_available() {
            warn!("Transcription API key missing; recordings will not be transcribed");
        }
        if !summarizer.is_available() {
            warn!("LLM API key missing; transcripts will not be summarized");
        }
        Self::with_backends(db, settings, transcriber, summarizer)
    }

    pub fn with_backends(
        db: Database,
        settings: Settings,
        transcriber: Arc<dyn Transcriber>,
        summarizer: Arc<dyn Summarizer>,
    ) -> Self {
        let auth = Arc::new(AuthService::new(settings.jwt.clone()));
        let users = Arc::new(UserDao::new(&db));
        let meetings = Arc::new(MeetingDao::new(&db));
        let messages = Arc::new(MessageDao::new(&db));
        let whiteboards = Arc::new(WhiteboardDao::new(&db));
        let recordings = Arc::new(RecordingDao::new(&db));
        let lifecycle = Arc::new(MeetingLifecycle::new(
            meetings.clone(),
            messages.clone(),
            whiteboards.clone(),
            recordings.clone(),
        ));
        let livekit = Arc::new(LiveKitService::new(settings.livekit.clone()));
        let pipeline = Arc::new(RecordingPipeline::new(
            meetings.clone(),
            recordings.clone(),
            transcriber,
            summarizer,
        ));
        let relay = Arc::new(WebhookRelay::new(
            meetings.clone(),
            recordings.clone(),
            lifecycle.clone(),
            pipeline.clone(),
        ));

        Self {
            db,
            settings,
            auth,
            users,
            meetings,
            messages,
            whiteboards,
            recordings,
            lifecycle,
            livekit,
            pipeline,
            relay,
        }
    }
}
