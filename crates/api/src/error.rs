use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use nexmeet_services::auth::AuthError;
use nexmeet_services::dao::DaoError;
use nexmeet_services::lifecycle::LifecycleError;
use nexmeet_services::livekit::LiveKitError;
use nexmeet_services::pipeline::PipelineError;
use serde::Serialize;
use tracing::error;

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Unauthorized(String),
    Forbidden(String),
    Conflict(String),
    Internal(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Internal(msg) => {
                error!(error = %msg, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<DaoError> for ApiError {
    fn from(err: DaoError) -> Self {
        match err {
            DaoError::NotFound => ApiError::NotFound("Resource not found".to_string()),
            DaoError::DuplicateKey(msg) => ApiError::Conflict(msg),
            DaoError::Mongo(e) => ApiError::Internal(e.to_string()),
            DaoError::BsonSer(e) => ApiError::Internal(e.to_string()),
            DaoError::BsonDe(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => {
                ApiError::Unauthorized("Invalid credentials".to_string())
            }
            AuthError::Blocked => ApiError::Forbidden("Account is blocked".to_string()),
            AuthError::TokenExpired => ApiError::Unauthorized("Token expired".to_string()),
            AuthError::InvalidToken(msg) => ApiError::Unauthorized(msg),
            AuthError::HashError(msg) => ApiError::Internal(msg),
        }
    }
}

impl From<LifecycleError> for ApiError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::Dao(DaoError::NotFound) => {
                ApiError::NotFound("Meeting not found".to_string())
            }
            LifecycleError::Dao(e) => e.into(),
            LifecycleError::Conflict => ApiError::Conflict(err.to_string()),
            e if e.is_forbidden() => ApiError::Forbidden(e.to_string()),
            e => ApiError::BadRequest(e.to_string()),
        }
    }
}

impl From<LiveKitError> for ApiError {
    fn from(err: LiveKitError) -> Self {
        match err {
            LiveKitError::NotConfigured | LiveKitError::Signing(_) => {
                ApiError::Internal(err.to_string())
            }
            LiveKitError::MissingSignature | LiveKitError::MalformedPayload(_) => {
                ApiError::BadRequest(err.to_string())
            }
            LiveKitError::InvalidSignature(_) | LiveKitError::DigestMismatch => {
                ApiError::Unauthorized("Invalid webhook signature".to_string())
            }
        }
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::RecordingNotFound | PipelineError::MeetingNotFound => {
                ApiError::NotFound(err.to_string())
            }
            PipelineError::NoTranscript => ApiError::BadRequest(err.to_string()),
            PipelineError::Transcription(_) | PipelineError::Summary(_) => {
                ApiError::Internal(err.to_string())
            }
            PipelineError::Dao(e) => e.into(),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        let message = err
            .field_errors()
            .into_iter()
            .map(|(field, errors)| {
                let reason = errors
                    .first()
                    .and_then(|e| e.message.as_ref())
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| "is invalid".to_string());
                format!("{field} {reason}")
            })
            .collect::<Vec<_>>()
            .join(", ");
        ApiError::BadRequest(message)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(err: JsonRejection) -> Self {
        ApiError::BadRequest(err.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(err: QueryRejection) -> Self {
        ApiError::BadRequest(err.body_text())
    }
}
