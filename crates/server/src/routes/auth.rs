//! Authentication route handlers.
//!
//! Signup, login and logout with session-backed identity.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_sessions::Session;

use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{clear_current_user, set_current_user};
use crate::models::{CurrentUser, User};
use crate::services::auth::{AuthService, SignupInput};
use crate::state::AppState;

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub status: &'static str,
    pub user: CurrentUser,
}

async fn start_session(session: &Session, user: &User) -> Result<CurrentUser> {
    let current = CurrentUser {
        id: user.id,
        username: user.username.clone(),
        is_staff: user.is_staff,
    };
    set_current_user(session, &current)
        .await
        .map_err(|e| AppError::Internal(format!("session error: {e}")))?;
    set_sentry_user(&current.id, &current.username);
    Ok(current)
}

/// Create an account and log in.
///
/// POST /auth/signup
///
/// # Errors
///
/// Returns 400 for invalid fields and 409 if the username is taken.
pub async fn signup(
    State(state): State<AppState>,
    session: Session,
    Json(input): Json<SignupInput>,
) -> Result<Response> {
    let user = AuthService::new(state.pool()).register(&input, false).await?;
    let current = start_session(&session, &user).await?;

    Ok((
        StatusCode::CREATED,
        Json(SessionResponse {
            status: "success",
            user: current,
        }),
    )
        .into_response())
}

/// Log in with username and password.
///
/// POST /auth/login
///
/// # Errors
///
/// Returns 401 for unknown users and wrong passwords alike.
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(form): Json<LoginRequest>,
) -> Result<Json<SessionResponse>> {
    let user = AuthService::new(state.pool())
        .login(&form.username, &form.password)
        .await
        .inspect_err(|_| tracing::info!(username = %form.username, "failed login"))?;
    let current = start_session(&session, &user).await?;

    Ok(Json(SessionResponse {
        status: "success",
        user: current,
    }))
}

/// Log out.
///
/// POST /auth/logout
///
/// # Errors
///
/// Returns 500 if the session cannot be cleared.
pub async fn logout(session: Session) -> Result<Json<serde_json::Value>> {
    clear_current_user(&session)
        .await
        .map_err(|e| AppError::Internal(format!("session error: {e}")))?;
    clear_sentry_user();

    Ok(Json(json!({ "status": "success" })))
}
