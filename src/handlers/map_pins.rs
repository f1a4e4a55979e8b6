//! World map pin handlers, nested under a campaign.
//!
//! - POST /api/v1/campaigns/{id}/pins
//! - GET /api/v1/campaigns/{id}/pins
//! - PATCH|DELETE /api/v1/campaigns/{id}/pins/{pin_id}

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
    extract::{AppJson, AppPath},
    handlers::campaigns::fetch_owned_campaign,
    middleware::auth::AuthContext,
    models::map_pin::{CreateMapPinRequest, MapPin, UpdateMapPinRequest},
};

/// Place a pin on the campaign map.
pub async fn create_pin(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    AppPath(campaign_id): AppPath<Uuid>,
    AppJson(request): AppJson<CreateMapPinRequest>,
) -> Result<impl IntoResponse, AppError> {
    fetch_owned_campaign(&pool, auth.user_id, campaign_id).await?;
    let fields = request.validate()?;

    let pin = sqlx::query_as::<_, MapPin>(
        r#"
        INSERT INTO map_pins (campaign_id, label, description, kind, x, y)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(campaign_id)
    .bind(&fields.label)
    .bind(&fields.description)
    .bind(fields.kind.as_str())
    .bind(fields.x)
    .bind(fields.y)
    .fetch_one(&pool)
    .await?;

    Ok((StatusCode::CREATED, Json(pin)))
}

pub async fn list_pins(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    AppPath(campaign_id): AppPath<Uuid>,
) -> Result<Json<Vec<MapPin>>, AppError> {
    fetch_owned_campaign(&pool, auth.user_id, campaign_id).await?;

    let pins = sqlx::query_as::<_, MapPin>(
        "SELECT * FROM map_pins WHERE campaign_id = $1 ORDER BY created_at",
    )
    .bind(campaign_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(pins))
}

/// Move or relabel a pin.
pub async fn update_pin(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    AppPath((campaign_id, pin_id)): AppPath<(Uuid, Uuid)>,
    AppJson(request): AppJson<UpdateMapPinRequest>,
) -> Result<Json<MapPin>, AppError> {
    fetch_owned_campaign(&pool, auth.user_id, campaign_id).await?;

    let current =
        sqlx::query_as::<_, MapPin>("SELECT * FROM map_pins WHERE id = $1 AND campaign_id = $2")
            .bind(pin_id)
            .bind(campaign_id)
            .fetch_optional(&pool)
            .await?
            .ok_or(AppError::NotFound("map_pin"))?;
    let fields = request.apply(current)?;

    let pin = sqlx::query_as::<_, MapPin>(
        r#"
        UPDATE map_pins
        SET label = $1, description = $2, kind = $3, x = $4, y = $5, updated_at = NOW()
        WHERE id = $6 AND campaign_id = $7
        RETURNING *
        "#,
    )
    .bind(&fields.label)
    .bind(&fields.description)
    .bind(fields.kind.as_str())
    .bind(fields.x)
    .bind(fields.y)
    .bind(pin_id)
    .bind(campaign_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("map_pin"))?;

    Ok(Json(pin))
}

pub async fn delete_pin(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    AppPath((campaign_id, pin_id)): AppPath<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    fetch_owned_campaign(&pool, auth.user_id, campaign_id).await?;

    let result = sqlx::query("DELETE FROM map_pins WHERE id = $1 AND campaign_id = $2")
        .bind(pin_id)
        .bind(campaign_id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("map_pin"));
    }
    Ok(StatusCode::NO_CONTENT)
}
