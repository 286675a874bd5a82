use axum::{
    Json,
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode, header},
};
use nexmeet_db::models::{User, UserStatus};
use nexmeet_services::dao::DaoError;
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use crate::{
    error::ApiError,
    extractors::{auth::AuthUser, json::ApiJson},
    state::AppState,
};

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 8, message = "must be at least 8 characters"))]
    pub password: String,
    #[validate(length(max = 120, message = "must be at most 120 characters"))]
    pub full_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub expires_in: u64,
    pub user: UserResponse,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub full_name: Option<String>,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub role: nexmeet_db::models::UserRole,
}

impl UserResponse {
    fn from_user(user: User) -> Result<Self, ApiError> {
        let id = user
            .id
            .ok_or_else(|| ApiError::Internal("User without id".to_string()))?;
        Ok(Self {
            id: id.to_hex(),
            display_name: user.display_name(),
            email: user.email,
            full_name: user.full_name,
            avatar_url: user.avatar_url,
            role: user.role,
        })
    }
}

fn session_cookie(token: &str, max_age: u64) -> Result<HeaderMap, ApiError> {
    let mut headers = HeaderMap::new();
    let cookie = format!(
        "access_token={}; HttpOnly; Path=/; SameSite=Lax; Max-Age={}",
        token, max_age
    );
    let value = HeaderValue::from_str(&cookie)
        .map_err(|e| ApiError::Internal(format!("Invalid cookie value: {e}")))?;
    headers.insert(header::SET_COOKIE, value);
    Ok(headers)
}

fn issue(state: &AppState, user: User) -> Result<(HeaderMap, AuthResponse), ApiError> {
    let user_id = user
        .id
        .ok_or_else(|| ApiError::Internal("User without id".to_string()))?;
    let user = UserResponse::from_user(user)?;
    let session = state
        .auth
        .issue_session(user_id, &user.email, &user.display_name)?;
    let headers = session_cookie(&session.access_token, session.expires_in)?;

    Ok((
        headers,
        AuthResponse {
            access_token: session.access_token,
            expires_in: session.expires_in,
            user,
        },
    ))
}

pub async fn register(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, HeaderMap, Json<AuthResponse>), ApiError> {
    body.validate()?;

    let password_hash = state.auth.hash_password(&body.password)?;
    let full_name = body
        .full_name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());

    let user = match state.users.create(&body.email, full_name, password_hash).await {
        Ok(user) => user,
        Err(DaoError::DuplicateKey(_)) => {
            return Err(ApiError::Conflict("Email already registered".to_string()));
        }
        Err(e) => return Err(e.into()),
    };
    info!(user_id = ?user.id, "User registered");

    let (headers, response) = issue(&state, user)?;
    Ok((StatusCode::CREATED, headers, Json(response)))
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> Result<(HeaderMap, Json<AuthResponse>), ApiError> {
    if body.email.trim().is_empty() || body.password.is_empty() {
        return Err(ApiError::BadRequest("Email and password are required".to_string()));
    }

    let user = state
        .users
        .find_by_email(&body.email)
        .await
        .map_err(|_| ApiError::Unauthorized("Invalid credentials".to_string()))?;

    let password_hash = user
        .password_hash
        .as_ref()
        .ok_or_else(|| ApiError::Unauthorized("Invalid credentials".to_string()))?;

    if !state.auth.verify_password(&body.password, password_hash)? {
        return Err(ApiError::Unauthorized("Invalid credentials".to_string()));
    }

    if user.status == UserStatus::Blocked {
        return Err(nexmeet_services::auth::AuthError::Blocked.into());
    }

    let (headers, response) = issue(&state, user)?;
    Ok((headers, Json(response)))
}

pub async fn logout() -> Result<(HeaderMap, Json<serde_json::Value>), ApiError> {
    let headers = session_cookie("", 0)?;
    Ok((headers, Json(serde_json::json!({ "success": true }))))
}

pub async fn me(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state.users.find_by_id(auth.user_id).await.map_err(|e| match e {
        DaoError::NotFound => ApiError::Unauthorized("User not found".to_string()),
        other => other.into(),
    })?;

    Ok(Json(UserResponse::from_user(user)?))
}
