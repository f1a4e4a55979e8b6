//! Authentication HTTP handlers.
//!
//! - POST /api/v1/auth/signup - Create account and session
//! - POST /api/v1/auth/login - Password login
//! - POST /api/v1/auth/logout - End the current session
//! - POST /api/v1/auth/password-reset - Email a reset link
//! - POST /api/v1/auth/password-reset/confirm - Set a new password with the link token
//! - POST /api/v1/auth/magic-link - Email a sign-in link
//! - POST /api/v1/auth/magic-link/consume - Trade the link token for a session

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};

use crate::{
    error::AppError,
    extract::AppJson,
    middleware::auth::AuthContext,
    models::user::{
        ConfirmPasswordResetRequest, ConsumeMagicLinkRequest, EmailRequest, LoginRequest,
        SessionResponse, SignupRequest,
    },
    services::auth_service,
    state::AppState,
};

/// Register a new account.
///
/// # Response
///
/// - **201 Created**: user plus a session token
/// - **409**: email already registered
/// - **400**: invalid email, password or display name
pub async fn signup(
    State(state): State<AppState>,
    AppJson(request): AppJson<SignupRequest>,
) -> Result<impl IntoResponse, AppError> {
    let session = auth_service::signup(&state.pool, &state.config, request).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// Log in with email and password.
///
/// ```json
/// {
///   "user": { "id": "...", "email": "dm@example.com", "display_name": "DM", "has_password": true, "created_at": "..." },
///   "session_token": "9f2c...",
///   "expires_at": "2026-11-15T10:00:00Z"
/// }
/// ```
pub async fn login(
    State(state): State<AppState>,
    AppJson(request): AppJson<LoginRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    let session = auth_service::login(&state.pool, &state.config, request).await?;
    Ok(Json(session))
}

pub async fn logout(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<StatusCode, AppError> {
    auth_service::logout(&state.pool, auth.session_id).await?;
    tracing::info!(user_id = %auth.user_id, email = %auth.email, "user logged out");
    Ok(StatusCode::NO_CONTENT)
}

/// Request a password-reset email.
///
/// Always answers 202 Accepted, whether or not the email is registered.
pub async fn request_password_reset(
    State(state): State<AppState>,
    AppJson(request): AppJson<EmailRequest>,
) -> Result<StatusCode, AppError> {
    auth_service::request_password_reset(&state.pool, &state.config, &state.mailer, &request.email)
        .await?;
    Ok(StatusCode::ACCEPTED)
}

/// Set a new password using the token from the reset email.
///
/// All sessions of the user are revoked; the client must log in again.
pub async fn confirm_password_reset(
    State(state): State<AppState>,
    AppJson(request): AppJson<ConfirmPasswordResetRequest>,
) -> Result<StatusCode, AppError> {
    auth_service::confirm_password_reset(&state.pool, request).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Request a magic sign-in link. Answers 202 Accepted.
pub async fn request_magic_link(
    State(state): State<AppState>,
    AppJson(request): AppJson<EmailRequest>,
) -> Result<StatusCode, AppError> {
    auth_service::request_magic_link(&state.pool, &state.config, &state.mailer, &request.email)
        .await?;
    Ok(StatusCode::ACCEPTED)
}

pub async fn consume_magic_link(
    State(state): State<AppState>,
    AppJson(request): AppJson<ConsumeMagicLinkRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    let session = auth_service::consume_magic_link(&state.pool, &state.config, &request.token).await?;
    Ok(Json(session))
}
