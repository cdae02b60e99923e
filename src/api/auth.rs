//! Account API endpoints
//!
//! Handles HTTP requests for the session lifecycle:
//! - POST /account/register - User registration
//! - POST /account/login - Credential login, returns a bearer token
//! - GET /user/info - Profile of the authenticated user
//!
//! Every response uses the uniform envelope `{code, msg, data?}` with
//! `code = 200` for success and a registered domain code otherwise.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{AppState, AuthenticatedUser};
use crate::services::session::{AuthError, CODE_OK};

/// Uniform response envelope
#[derive(Debug, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub code: u32,
    pub msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    /// Success envelope with a payload
    pub fn ok(data: T) -> Self {
        Self {
            code: CODE_OK,
            msg: "ok".to_string(),
            data: Some(data),
        }
    }

    /// Success envelope without a payload
    pub fn ok_empty() -> Self {
        Self {
            code: CODE_OK,
            msg: "ok".to_string(),
            data: None,
        }
    }

    /// Failure envelope for a registered domain code
    pub fn fail(code: u32, msg: impl Into<String>) -> Self {
        Self {
            code,
            msg: msg.into(),
            data: None,
        }
    }
}

/// Request body for user registration
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

/// Request body for user login
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Response payload for a successful login
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginData {
    pub token: String,
}

/// Response payload for user info
#[derive(Debug, Serialize, Deserialize)]
pub struct UserInfoData {
    pub id: i64,
    pub username: String,
}

/// POST /account/register - User registration
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<Json<Envelope<()>>, AuthError> {
    state
        .sessions
        .register(&body.username, &body.password)
        .await?;

    Ok(Json(Envelope::ok_empty()))
}

/// POST /account/login - Credential login
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<Envelope<LoginData>>, AuthError> {
    let token = state.sessions.login(&body.username, &body.password).await?;

    Ok(Json(Envelope::ok(LoginData { token })))
}

/// GET /user/info - Profile of the authenticated user
///
/// The identity comes from the typed extension the auth middleware attached;
/// a request that reaches this handler has already had its token verified.
pub async fn user_info(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
) -> Result<Json<Envelope<UserInfoData>>, AuthError> {
    let user = state.sessions.get_user_profile(user_id).await?;

    Ok(Json(Envelope::ok(UserInfoData {
        id: user.id,
        username: user.username,
    })))
}
