//! Session log handlers, nested under a campaign.
//!
//! - POST /api/v1/campaigns/{id}/sessions
//! - GET /api/v1/campaigns/{id}/sessions
//! - GET|PATCH|DELETE /api/v1/campaigns/{id}/sessions/{session_id}

use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::{
    db::{DbPool, is_unique_violation},
    error::AppError,
    extract::{AppJson, AppPath},
    handlers::campaigns::fetch_owned_campaign,
    middleware::auth::AuthContext,
    models::session_log::{CreateSessionLogRequest, SessionLog, UpdateSessionLogRequest},
};

async fn fetch_session_log(
    pool: &DbPool,
    campaign_id: Uuid,
    log_id: Uuid,
) -> Result<SessionLog, AppError> {
    sqlx::query_as::<_, SessionLog>("SELECT * FROM session_logs WHERE id = $1 AND campaign_id = $2")
        .bind(log_id)
        .bind(campaign_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("session_log"))
}

fn number_clash(e: sqlx::Error) -> AppError {
    if is_unique_violation(&e) {
        AppError::Conflict("A session with this number already exists in the campaign".to_string())
    } else {
        AppError::Database(e)
    }
}

/// Record a play session.
///
/// Without `session_number` the next number in the campaign is used. The
/// campaign row is locked while numbering so concurrent creates don't race
/// for the same number.
pub async fn create_session_log(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    AppPath(campaign_id): AppPath<Uuid>,
    AppJson(request): AppJson<CreateSessionLogRequest>,
) -> Result<impl IntoResponse, AppError> {
    let fields = request.validate()?;

    let mut tx = pool.begin().await?;

    let owned: Option<Uuid> =
        sqlx::query_scalar("SELECT id FROM campaigns WHERE id = $1 AND owner_id = $2 FOR UPDATE")
            .bind(campaign_id)
            .bind(auth.user_id)
            .fetch_optional(&mut *tx)
            .await?;
    if owned.is_none() {
        return Err(AppError::NotFound("campaign"));
    }

    let session_number = match fields.session_number {
        Some(n) => n,
        None => {
            sqlx::query_scalar::<_, i32>(
                "SELECT COALESCE(MAX(session_number), 0) + 1 FROM session_logs WHERE campaign_id = $1",
            )
            .bind(campaign_id)
            .fetch_one(&mut *tx)
            .await?
        }
    };

    let log = sqlx::query_as::<_, SessionLog>(
        r#"
        INSERT INTO session_logs (campaign_id, session_number, title, played_on, summary)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(campaign_id)
    .bind(session_number)
    .bind(&fields.title)
    .bind(fields.played_on)
    .bind(&fields.summary)
    .fetch_one(&mut *tx)
    .await
    .map_err(number_clash)?;

    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(log)))
}

/// List session logs in play order.
pub async fn list_session_logs(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    AppPath(campaign_id): AppPath<Uuid>,
) -> Result<Json<Vec<SessionLog>>, AppError> {
    fetch_owned_campaign(&pool, auth.user_id, campaign_id).await?;

    let logs = sqlx::query_as::<_, SessionLog>(
        "SELECT * FROM session_logs WHERE campaign_id = $1 ORDER BY session_number",
    )
    .bind(campaign_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(logs))
}

pub async fn get_session_log(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    AppPath((campaign_id, log_id)): AppPath<(Uuid, Uuid)>,
) -> Result<Json<SessionLog>, AppError> {
    fetch_owned_campaign(&pool, auth.user_id, campaign_id).await?;
    Ok(Json(fetch_session_log(&pool, campaign_id, log_id).await?))
}

pub async fn update_session_log(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    AppPath((campaign_id, log_id)): AppPath<(Uuid, Uuid)>,
    AppJson(request): AppJson<UpdateSessionLogRequest>,
) -> Result<Json<SessionLog>, AppError> {
    fetch_owned_campaign(&pool, auth.user_id, campaign_id).await?;
    let current = fetch_session_log(&pool, campaign_id, log_id).await?;
    let fields = request.apply(current)?;

    let log = sqlx::query_as::<_, SessionLog>(
        r#"
        UPDATE session_logs
        SET session_number = $1, title = $2, played_on = $3, summary = $4, updated_at = NOW()
        WHERE id = $5 AND campaign_id = $6
        RETURNING *
        "#,
    )
    .bind(fields.session_number)
    .bind(&fields.title)
    .bind(fields.played_on)
    .bind(&fields.summary)
    .bind(log_id)
    .bind(campaign_id)
    .fetch_optional(&pool)
    .await
    .map_err(number_clash)?
    .ok_or(AppError::NotFound("session_log"))?;

    Ok(Json(log))
}

pub async fn delete_session_log(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    AppPath((campaign_id, log_id)): AppPath<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    fetch_owned_campaign(&pool, auth.user_id, campaign_id).await?;

    let result = sqlx::query("DELETE FROM session_logs WHERE id = $1 AND campaign_id = $2")
        .bind(log_id)
        .bind(campaign_id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("session_log"));
    }
    Ok(StatusCode::NO_CONTENT)
}
