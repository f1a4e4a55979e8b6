//! Campaign management HTTP handlers.
//!
//! - POST /api/v1/campaigns - Create campaign
//! - GET /api/v1/campaigns - List the user's campaigns
//! - GET /api/v1/campaigns/{id} - Get campaign
//! - PATCH /api/v1/campaigns/{id} - Update campaign
//! - DELETE /api/v1/campaigns/{id} - Delete campaign and everything in it
//!
//! # Ownership
//!
//! Every query filters by BOTH `id` AND `owner_id`, so a campaign belonging
//! to someone else is indistinguishable from one that does not exist.

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
    middleware::auth::AuthContext,
    models::campaign::{Campaign, CampaignResponse, CreateCampaignRequest, UpdateCampaignRequest},
};

/// Load a campaign owned by `owner_id`, or fail with 404.
///
/// Nested resources (NPCs, session logs, pins, rolls) call this first.
pub async fn fetch_owned_campaign(
    pool: &DbPool,
    owner_id: Uuid,
    campaign_id: Uuid,
) -> Result<Campaign, AppError> {
    sqlx::query_as::<_, Campaign>("SELECT * FROM campaigns WHERE id = $1 AND owner_id = $2")
        .bind(campaign_id)
        .bind(owner_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("campaign"))
}

/// Create a new campaign.
///
/// # Response
///
/// - **201 Created**: the campaign
/// - **400**: missing name or invalid map URL
pub async fn create_campaign(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    AppJson(request): AppJson<CreateCampaignRequest>,
) -> Result<impl IntoResponse, AppError> {
    let fields = request.validate()?;

    let campaign = sqlx::query_as::<_, Campaign>(
        r#"
        INSERT INTO campaigns (owner_id, name, description, setting, map_image_url)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(auth.user_id)
    .bind(&fields.name)
    .bind(&fields.description)
    .bind(&fields.setting)
    .bind(&fields.map_image_url)
    .fetch_one(&pool)
    .await?;

    tracing::info!(campaign_id = %campaign.id, user_id = %auth.user_id, "campaign created");

    Ok((StatusCode::CREATED, Json(CampaignResponse::from(campaign))))
}

/// List the user's campaigns, newest first.
pub async fn list_campaigns(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Vec<CampaignResponse>>, AppError> {
    let campaigns = sqlx::query_as::<_, Campaign>(
        "SELECT * FROM campaigns WHERE owner_id = $1 ORDER BY created_at DESC",
    )
    .bind(auth.user_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(campaigns.into_iter().map(Into::into).collect()))
}

pub async fn get_campaign(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    AppPath(campaign_id): AppPath<Uuid>,
) -> Result<Json<CampaignResponse>, AppError> {
    let campaign = fetch_owned_campaign(&pool, auth.user_id, campaign_id).await?;
    Ok(Json(campaign.into()))
}

/// Partially update a campaign. Blank strings clear optional fields.
pub async fn update_campaign(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    AppPath(campaign_id): AppPath<Uuid>,
    AppJson(request): AppJson<UpdateCampaignRequest>,
) -> Result<Json<CampaignResponse>, AppError> {
    let current = fetch_owned_campaign(&pool, auth.user_id, campaign_id).await?;
    let fields = request.apply(current)?;

    let campaign = sqlx::query_as::<_, Campaign>(
        r#"
        UPDATE campaigns
        SET name = $1, description = $2, setting = $3, map_image_url = $4, updated_at = NOW()
        WHERE id = $5 AND owner_id = $6
        RETURNING *
        "#,
    )
    .bind(&fields.name)
    .bind(&fields.description)
    .bind(&fields.setting)
    .bind(&fields.map_image_url)
    .bind(campaign_id)
    .bind(auth.user_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("campaign"))?;

    Ok(Json(campaign.into()))
}

/// Delete a campaign.
///
/// NPCs, session logs, pins and logged rolls go with it (`ON DELETE
/// CASCADE`); characters are kept but detached.
pub async fn delete_campaign(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    AppPath(campaign_id): AppPath<Uuid>,
) -> Result<StatusCode, AppError> {
    let result = sqlx::query("DELETE FROM campaigns WHERE id = $1 AND owner_id = $2")
        .bind(campaign_id)
        .bind(auth.user_id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("campaign"));
    }

    tracing::info!(campaign_id = %campaign_id, "campaign deleted");
    Ok(StatusCode::NO_CONTENT)
}
