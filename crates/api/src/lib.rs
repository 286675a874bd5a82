pub mod error;
pub mod extractors;
pub mod routes;
pub mod state;

use axum::{
    Router,
    http::HeaderValue,
    routing::{get, post},
};
use state::AppState;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if allowed.is_empty() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    // Cookie sessions need credentials, which rule out wildcards.
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.settings.app.cors_origins);

    let auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/logout", post(routes::auth::logout))
        .route("/me", get(routes::auth::me));

    let meeting_routes = Router::new()
        .route("/", get(routes::meeting::list).post(routes::meeting::create))
        .route("/info/{room_name}", get(routes::meeting::info))
        .route("/public-info/{room_name}", get(routes::meeting::public_info))
        .route(
            "/{meeting_id}",
            get(routes::meeting::get).delete(routes::meeting::delete),
        )
        .route("/{meeting_id}/start", post(routes::meeting::start))
        .route("/{meeting_id}/end", post(routes::meeting::end))
        .route("/{meeting_id}/leave", post(routes::meeting::leave))
        .route(
            "/{meeting_id}/participants",
            get(routes::participant::list).post(routes::participant::add),
        )
        .route(
            "/{meeting_id}/messages",
            get(routes::message::list).post(routes::message::send),
        )
        .route(
            "/{meeting_id}/whiteboard",
            get(routes::whiteboard::load).post(routes::whiteboard::save),
        )
        .route(
            "/{meeting_id}/recording",
            get(routes::recording::get)
                .post(routes::recording::start)
                .delete(routes::recording::stop),
        );

    let livekit_routes = Router::new()
        .route("/token", post(routes::livekit::token))
        .route("/guest-token", post(routes::livekit::guest_token))
        .route("/webhook", post(routes::livekit::webhook));

    let api = Router::new()
        .nest("/auth", auth_routes)
        .nest("/meetings", meeting_routes)
        .nest("/livekit", livekit_routes)
        .route("/transcription/start", post(routes::transcription::start))
        .route("/ai/summarize", post(routes::summary::summarize))
        .route("/rooms/{room_name}", get(routes::room::get));

    let health = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api)
        .merge(health)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
