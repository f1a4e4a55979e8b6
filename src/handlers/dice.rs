//! Dice rolling handlers.
//!
//! - POST /api/v1/dice/roll - Roll without saving (public)
//! - POST /api/v1/campaigns/{id}/rolls - Roll and log to the campaign
//! - GET /api/v1/campaigns/{id}/rolls?limit= - Recent logged rolls

use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    extract::{AppJson, AppPath, AppQuery},
    handlers::campaigns::fetch_owned_campaign,
    middleware::auth::AuthContext,
    models::dice_roll::{
        DiceRoll, LABEL_MAX, LoggedRollResponse, RollHistoryQuery, RollRequest,
    },
    services::dice::{self, RollResult},
    validation::optional_text,
};

/// Evaluate a dice expression.
///
/// # Request Body
///
/// ```json
/// { "expression": "1d20+5", "mode": "advantage" }
/// ```
///
/// # Response
///
/// - **200 OK**: the roll result
/// - **400**: `invalid_dice_expression`
pub async fn roll(
    AppJson(request): AppJson<RollRequest>,
) -> Result<Json<RollResult>, AppError> {
    let result = dice::evaluate(&request.expression, request.mode)?;
    Ok(Json(result))
}

/// Roll and append the result to the campaign's roll log.
pub async fn roll_for_campaign(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    AppPath(campaign_id): AppPath<Uuid>,
    AppJson(request): AppJson<RollRequest>,
) -> Result<impl IntoResponse, AppError> {
    fetch_owned_campaign(&pool, auth.user_id, campaign_id).await?;
    let label = optional_text("label", request.label, LABEL_MAX)?;
    let result = dice::evaluate(&request.expression, request.mode)?;

    let logged = sqlx::query_as::<_, DiceRoll>(
        r#"
        INSERT INTO dice_rolls (campaign_id, user_id, label, expression, mode, result, total)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(campaign_id)
    .bind(auth.user_id)
    .bind(&label)
    .bind(&result.expression)
    .bind(result.mode.as_str())
    .bind(sqlx::types::Json(&result))
    .bind(result.total)
    .fetch_one(&pool)
    .await?;

    tracing::debug!(
        campaign_id = %campaign_id,
        expression = %result.expression,
        total = result.total,
        "roll logged"
    );

    Ok((StatusCode::CREATED, Json(LoggedRollResponse::from(logged))))
}

/// Most recent logged rolls, newest first.
pub async fn list_rolls(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    AppPath(campaign_id): AppPath<Uuid>,
    AppQuery(query): AppQuery<RollHistoryQuery>,
) -> Result<Json<Vec<LoggedRollResponse>>, AppError> {
    fetch_owned_campaign(&pool, auth.user_id, campaign_id).await?;

    let rolls = sqlx::query_as::<_, DiceRoll>(
        "SELECT * FROM dice_rolls WHERE campaign_id = $1 ORDER BY created_at DESC LIMIT $2",
    )
    .bind(campaign_id)
    .bind(query.effective_limit())
    .fetch_all(&pool)
    .await?;

    Ok(Json(rolls.into_iter().map(Into::into).collect()))
}
