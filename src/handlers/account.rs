//! Account self-service handlers.
//!
//! - GET /api/v1/account - Current user
//! - PATCH /api/v1/account - Update display name
//! - POST /api/v1/account/password - Change password
//! - DELETE /api/v1/account - Delete account and all owned data

use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};

use crate::{
    db::DbPool,
    error::AppError,
    extract::AppJson,
    middleware::auth::AuthContext,
    models::user::{
        ChangePasswordRequest, DeleteAccountRequest, DeletionSummary, UpdateProfileRequest,
        UserResponse,
    },
    services::{account_service, auth_service},
};

pub async fn get_account(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<UserResponse>, AppError> {
    let user = auth_service::get_user(&pool, auth.user_id).await?;
    Ok(Json(user.into()))
}

pub async fn update_account(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    AppJson(request): AppJson<UpdateProfileRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let user = account_service::update_profile(&pool, auth.user_id, request).await?;
    Ok(Json(user.into()))
}

/// Change the password. Other sessions are signed out.
pub async fn change_password(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    AppJson(request): AppJson<ChangePasswordRequest>,
) -> Result<StatusCode, AppError> {
    account_service::change_password(&pool, auth.user_id, auth.session_id, request).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Delete the account.
///
/// # Request Body
///
/// ```json
/// { "password": "current password" }
/// ```
///
/// The body may be omitted for accounts without a password.
///
/// # Response (200 OK)
///
/// ```json
/// {
///   "dice_rolls": 12, "map_pins": 4, "npcs": 9, "session_logs": 3,
///   "characters": 2, "campaigns": 1, "auth_tokens": 0, "sessions": 1
/// }
/// ```
pub async fn delete_account(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    request: Result<Option<Json<DeleteAccountRequest>>, JsonRejection>,
) -> Result<Json<DeletionSummary>, AppError> {
    let request = request?.map(|Json(r)| r).unwrap_or_default();
    let summary = account_service::delete_account(&pool, auth.user_id, request).await?;
    Ok(Json(summary))
}
