//! Character HTTP handlers.
//!
//! - POST /api/v1/characters - Create character
//! - GET /api/v1/characters?campaign_id= - List the user's characters
//! - GET /api/v1/characters/{id} - Get character
//! - PATCH /api/v1/characters/{id} - Update character
//! - DELETE /api/v1/characters/{id} - Delete character

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
    models::character::{
        Character, CharacterFields, CharacterFilter, CharacterResponse, CreateCharacterRequest,
        UpdateCharacterRequest,
    },
};

async fn fetch_owned_character(
    pool: &DbPool,
    owner_id: Uuid,
    character_id: Uuid,
) -> Result<Character, AppError> {
    sqlx::query_as::<_, Character>("SELECT * FROM characters WHERE id = $1 AND owner_id = $2")
        .bind(character_id)
        .bind(owner_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("character"))
}

/// A character may only join a campaign its owner runs.
async fn check_campaign(
    pool: &DbPool,
    owner_id: Uuid,
    fields: &CharacterFields,
) -> Result<(), AppError> {
    if let Some(campaign_id) = fields.campaign_id {
        fetch_owned_campaign(pool, owner_id, campaign_id).await?;
    }
    Ok(())
}

/// Create a character.
///
/// # Response
///
/// - **201 Created**: the character with derived ability modifiers
/// - **404**: `campaign_id` is not one of the user's campaigns
/// - **400**: out-of-range level, scores or hit points
pub async fn create_character(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    AppJson(request): AppJson<CreateCharacterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let fields = request.validate()?;
    check_campaign(&pool, auth.user_id, &fields).await?;

    let character = sqlx::query_as::<_, Character>(
        r#"
        INSERT INTO characters (
            owner_id, campaign_id, name, ancestry, class_name, level,
            strength, dexterity, constitution, intelligence, wisdom, charisma,
            max_hit_points, current_hit_points, notes
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
        RETURNING *
        "#,
    )
    .bind(auth.user_id)
    .bind(fields.campaign_id)
    .bind(&fields.name)
    .bind(&fields.ancestry)
    .bind(&fields.class_name)
    .bind(fields.level)
    .bind(fields.abilities.strength)
    .bind(fields.abilities.dexterity)
    .bind(fields.abilities.constitution)
    .bind(fields.abilities.intelligence)
    .bind(fields.abilities.wisdom)
    .bind(fields.abilities.charisma)
    .bind(fields.max_hit_points)
    .bind(fields.current_hit_points)
    .bind(&fields.notes)
    .fetch_one(&pool)
    .await?;

    Ok((StatusCode::CREATED, Json(CharacterResponse::from(character))))
}

/// List characters, optionally only those in one campaign.
pub async fn list_characters(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    AppQuery(filter): AppQuery<CharacterFilter>,
) -> Result<Json<Vec<CharacterResponse>>, AppError> {
    let characters = sqlx::query_as::<_, Character>(
        r#"
        SELECT * FROM characters
        WHERE owner_id = $1 AND ($2::uuid IS NULL OR campaign_id = $2)
        ORDER BY name
        "#,
    )
    .bind(auth.user_id)
    .bind(filter.campaign_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(characters.into_iter().map(Into::into).collect()))
}

pub async fn get_character(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    AppPath(character_id): AppPath<Uuid>,
) -> Result<Json<CharacterResponse>, AppError> {
    let character = fetch_owned_character(&pool, auth.user_id, character_id).await?;
    Ok(Json(character.into()))
}

pub async fn update_character(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    AppPath(character_id): AppPath<Uuid>,
    AppJson(request): AppJson<UpdateCharacterRequest>,
) -> Result<Json<CharacterResponse>, AppError> {
    let current = fetch_owned_character(&pool, auth.user_id, character_id).await?;
    let previous_campaign = current.campaign_id;
    let fields = request.apply(current)?;
    if fields.campaign_id != previous_campaign {
        check_campaign(&pool, auth.user_id, &fields).await?;
    }

    let character = sqlx::query_as::<_, Character>(
        r#"
        UPDATE characters
        SET campaign_id = $1, name = $2, ancestry = $3, class_name = $4, level = $5,
            strength = $6, dexterity = $7, constitution = $8,
            intelligence = $9, wisdom = $10, charisma = $11,
            max_hit_points = $12, current_hit_points = $13, notes = $14,
            updated_at = NOW()
        WHERE id = $15 AND owner_id = $16
        RETURNING *
        "#,
    )
    .bind(fields.campaign_id)
    .bind(&fields.name)
    .bind(&fields.ancestry)
    .bind(&fields.class_name)
    .bind(fields.level)
    .bind(fields.abilities.strength)
    .bind(fields.abilities.dexterity)
    .bind(fields.abilities.constitution)
    .bind(fields.abilities.intelligence)
    .bind(fields.abilities.wisdom)
    .bind(fields.abilities.charisma)
    .bind(fields.max_hit_points)
    .bind(fields.current_hit_points)
    .bind(&fields.notes)
    .bind(character_id)
    .bind(auth.user_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("character"))?;

    Ok(Json(character.into()))
}

pub async fn delete_character(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    AppPath(character_id): AppPath<Uuid>,
) -> Result<StatusCode, AppError> {
    let result = sqlx::query("DELETE FROM characters WHERE id = $1 AND owner_id = $2")
        .bind(character_id)
        .bind(auth.user_id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("character"));
    }
    Ok(StatusCode::NO_CONTENT)
}
