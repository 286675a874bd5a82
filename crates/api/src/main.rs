use nexmeet_api::{build_router, state::AppState};
use nexmeet_config::Settings;
use nexmeet_db::{connect, indexes::ensure_indexes};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file (silently ignore if missing)
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "nexmeet_api=debug,nexmeet_services=debug,nexmeet_db=debug,tower_http=debug".into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::load()?;
    info!("Starting nexmeet API on {}:{}", settings.app.host, settings.app.port);
    info!(
        livekit_url = %settings.livekit.url,
        transcription_configured = settings.transcription.api_key.is_some(),
        llm_model = %settings.llm.model,
        "Vendor config"
    );

    let db = connect(&settings).await?;
    ensure_indexes(&db).await?;

    let app_state = AppState::new(db, settings.clone());
    if !app_state.livekit.is_configured() {
        warn!("LiveKit credentials missing; token issuance and webhooks will fail");
    }

    let app = build_router(app_state);

    let addr = format!("{}:{}", settings.app.host, settings.app.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
