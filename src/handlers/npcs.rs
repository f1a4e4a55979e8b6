//! NPC roster handlers, nested under a campaign.
//!
//! - POST /api/v1/campaigns/{id}/npcs
//! - GET /api/v1/campaigns/{id}/npcs?disposition=
//! - GET|PATCH|DELETE /api/v1/campaigns/{id}/npcs/{npc_id}

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
    models::npc::{CreateNpcRequest, Npc, NpcFilter, UpdateNpcRequest},
};

async fn fetch_npc(pool: &DbPool, campaign_id: Uuid, npc_id: Uuid) -> Result<Npc, AppError> {
    sqlx::query_as::<_, Npc>("SELECT * FROM npcs WHERE id = $1 AND campaign_id = $2")
        .bind(npc_id)
        .bind(campaign_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("npc"))
}

pub async fn create_npc(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    AppPath(campaign_id): AppPath<Uuid>,
    AppJson(request): AppJson<CreateNpcRequest>,
) -> Result<impl IntoResponse, AppError> {
    fetch_owned_campaign(&pool, auth.user_id, campaign_id).await?;
    let fields = request.validate()?;

    let npc = sqlx::query_as::<_, Npc>(
        r#"
        INSERT INTO npcs (campaign_id, name, role, disposition, location, notes, is_alive)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(campaign_id)
    .bind(&fields.name)
    .bind(&fields.role)
    .bind(fields.disposition.as_str())
    .bind(&fields.location)
    .bind(&fields.notes)
    .bind(fields.is_alive)
    .fetch_one(&pool)
    .await?;

    Ok((StatusCode::CREATED, Json(npc)))
}

/// List a campaign's NPCs by name, optionally filtered by disposition.
pub async fn list_npcs(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    AppPath(campaign_id): AppPath<Uuid>,
    AppQuery(filter): AppQuery<NpcFilter>,
) -> Result<Json<Vec<Npc>>, AppError> {
    fetch_owned_campaign(&pool, auth.user_id, campaign_id).await?;

    let npcs = sqlx::query_as::<_, Npc>(
        r#"
        SELECT * FROM npcs
        WHERE campaign_id = $1 AND ($2::text IS NULL OR disposition = $2)
        ORDER BY name
        "#,
    )
    .bind(campaign_id)
    .bind(filter.disposition.map(|d| d.as_str()))
    .fetch_all(&pool)
    .await?;

    Ok(Json(npcs))
}

pub async fn get_npc(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    AppPath((campaign_id, npc_id)): AppPath<(Uuid, Uuid)>,
) -> Result<Json<Npc>, AppError> {
    fetch_owned_campaign(&pool, auth.user_id, campaign_id).await?;
    Ok(Json(fetch_npc(&pool, campaign_id, npc_id).await?))
}

pub async fn update_npc(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    AppPath((campaign_id, npc_id)): AppPath<(Uuid, Uuid)>,
    AppJson(request): AppJson<UpdateNpcRequest>,
) -> Result<Json<Npc>, AppError> {
    fetch_owned_campaign(&pool, auth.user_id, campaign_id).await?;
    let current = fetch_npc(&pool, campaign_id, npc_id).await?;
    let fields = request.apply(current)?;

    let npc = sqlx::query_as::<_, Npc>(
        r#"
        UPDATE npcs
        SET name = $1, role = $2, disposition = $3, location = $4, notes = $5,
            is_alive = $6, updated_at = NOW()
        WHERE id = $7 AND campaign_id = $8
        RETURNING *
        "#,
    )
    .bind(&fields.name)
    .bind(&fields.role)
    .bind(fields.disposition.as_str())
    .bind(&fields.location)
    .bind(&fields.notes)
    .bind(fields.is_alive)
    .bind(npc_id)
    .bind(campaign_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("npc"))?;

    Ok(Json(npc))
}

pub async fn delete_npc(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    AppPath((campaign_id, npc_id)): AppPath<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    fetch_owned_campaign(&pool, auth.user_id, campaign_id).await?;

    let result = sqlx::query("DELETE FROM npcs WHERE id = $1 AND campaign_id = $2")
        .bind(npc_id)
        .bind(campaign_id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("npc"));
    }
    Ok(StatusCode::NO_CONTENT)
}
