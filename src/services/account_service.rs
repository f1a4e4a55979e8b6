//! Account self-service: profile edits, password changes and deletion.
//!
//! # Deletion Cascade
//!
//! Deleting an account removes everything the user owns in one database
//! transaction, children first, so a failure part-way leaves nothing behind
//! half-deleted. The schema's `ON DELETE CASCADE` clauses would cover most of
//! this on their own; deleting explicitly lets us report what was removed.

use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    models::user::{
        ChangePasswordRequest, DeleteAccountRequest, DeletionSummary, UpdateProfileRequest, User,
    },
    services::{
        auth_service::DISPLAY_NAME_MAX,
        credentials::{hash_password, validate_password, verify_password},
    },
    validation::required_text,
};

pub async fn update_profile(
    pool: &DbPool,
    user_id: Uuid,
    request: UpdateProfileRequest,
) -> Result<User, AppError> {
    let Some(display_name) = request.display_name else {
        return crate::services::auth_service::get_user(pool, user_id).await;
    };
    let display_name = required_text("display_name", &display_name, DISPLAY_NAME_MAX)?;

    let user = sqlx::query_as::<_, User>(
        r#"
        UPDATE users
        SET display_name = $1, updated_at = NOW()
        WHERE id = $2
        RETURNING *
        "#,
    )
    .bind(&display_name)
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::Unauthorized)?;

    Ok(user)
}

/// Change (or, for magic-link accounts, set) the password.
///
/// Accounts that already have a password must supply it. Every other session
/// of the user is revoked; the calling session stays valid.
pub async fn change_password(
    pool: &DbPool,
    user_id: Uuid,
    current_session_id: Uuid,
    request: ChangePasswordRequest,
) -> Result<(), AppError> {
    validate_password(&request.new_password)?;

    let mut tx = pool.begin().await?;

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1 FOR UPDATE")
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::Unauthorized)?;

    if let Some(stored_hash) = user.password_hash.as_deref() {
        let confirmed = match request.current_password.as_deref() {
            Some(current) => verify_password(current, stored_hash)?,
            None => false,
        };
        if !confirmed {
            tx.rollback().await?;
            return Err(AppError::InvalidCredentials);
        }
    }

    sqlx::query("UPDATE users SET password_hash = $1, updated_at = NOW() WHERE id = $2")
        .bind(hash_password(&request.new_password)?)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    let revoked = sqlx::query("DELETE FROM user_sessions WHERE user_id = $1 AND id <> $2")
        .bind(user_id)
        .bind(current_session_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    tx.commit().await?;

    tracing::info!(user_id = %user_id, revoked_sessions = revoked, "password changed");
    Ok(())
}

/// Delete the account and everything it owns.
///
/// # Errors
///
/// - `InvalidCredentials`: the account has a password and it was missing or
///   wrong
pub async fn delete_account(
    pool: &DbPool,
    user_id: Uuid,
    request: DeleteAccountRequest,
) -> Result<DeletionSummary, AppError> {
    let mut tx = pool.begin().await?;

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1 FOR UPDATE")
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::Unauthorized)?;

    if let Some(stored_hash) = user.password_hash.as_deref() {
        let confirmed = match request.password.as_deref() {
            Some(password) => verify_password(password, stored_hash)?,
            None => false,
        };
        if !confirmed {
            tx.rollback().await?;
            return Err(AppError::InvalidCredentials);
        }
    }

    let owned_campaigns = "SELECT id FROM campaigns WHERE owner_id = $1";
    let mut summary = DeletionSummary::default();

    summary.dice_rolls = sqlx::query(&format!(
        "DELETE FROM dice_rolls WHERE user_id = $1 OR campaign_id IN ({owned_campaigns})"
    ))
    .bind(user_id)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    summary.map_pins = sqlx::query(&format!(
        "DELETE FROM map_pins WHERE campaign_id IN ({owned_campaigns})"
    ))
    .bind(user_id)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    summary.npcs = sqlx::query(&format!(
        "DELETE FROM npcs WHERE campaign_id IN ({owned_campaigns})"
    ))
    .bind(user_id)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    summary.session_logs = sqlx::query(&format!(
        "DELETE FROM session_logs WHERE campaign_id IN ({owned_campaigns})"
    ))
    .bind(user_id)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    summary.characters = sqlx::query("DELETE FROM characters WHERE owner_id = $1")
        .bind(user_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    summary.campaigns = sqlx::query("DELETE FROM campaigns WHERE owner_id = $1")
        .bind(user_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    summary.auth_tokens = sqlx::query("DELETE FROM auth_tokens WHERE user_id = $1")
        .bind(user_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    summary.sessions = sqlx::query("DELETE FROM user_sessions WHERE user_id = $1")
        .bind(user_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    tracing::info!(user_id = %user_id, ?summary, "account deleted");
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::Config,
        models::user::LoginRequest,
        services::{auth_service, credentials::hash_token},
        test_support::{PASSWORD, count, create_campaign, password_less_user, signup},
    };

    /// One campaign with two NPCs, a session log, a pin and a roll, plus one
    /// character in the campaign and one outside it. Returns the campaign id.
    async fn seed_world(pool: &DbPool, user_id: Uuid) -> Uuid {
        let campaign_id = create_campaign(pool, user_id, "Curse of Strahd").await;

        sqlx::query("INSERT INTO npcs (campaign_id, name) VALUES ($1, 'Strahd'), ($1, 'Ireena')")
            .bind(campaign_id)
            .execute(pool)
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO session_logs (campaign_id, session_number, title) VALUES ($1, 1, 'Death House')",
        )
        .bind(campaign_id)
        .execute(pool)
        .await
        .unwrap();
        sqlx::query("INSERT INTO map_pins (campaign_id, label, x, y) VALUES ($1, 'Vallaki', 0.4, 0.6)")
            .bind(campaign_id)
            .execute(pool)
            .await
            .unwrap();
        sqlx::query(
            r#"
            INSERT INTO dice_rolls (campaign_id, user_id, expression, mode, result, total)
            VALUES ($1, $2, '1d20', 'normal', '{}'::jsonb, 12)
            "#,
        )
        .bind(campaign_id)
        .bind(user_id)
        .execute(pool)
        .await
        .unwrap();
        sqlx::query(
            r#"
            INSERT INTO characters (owner_id, campaign_id, name, max_hit_points, current_hit_points)
            VALUES ($1, $2, 'Ismark', 12, 12), ($1, NULL, 'Spare', 8, 8)
            "#,
        )
        .bind(user_id)
        .bind(campaign_id)
        .execute(pool)
        .await
        .unwrap();
        sqlx::query(
            r#"
            INSERT INTO auth_tokens (user_id, purpose, token_hash, expires_at)
            VALUES ($1, 'magic_link', 'deadbeef', NOW() + INTERVAL '1 hour')
            "#,
        )
        .bind(user_id)
        .execute(pool)
        .await
        .unwrap();

        campaign_id
    }

    async fn session_id(pool: &DbPool, token: &str) -> Uuid {
        sqlx::query_scalar("SELECT id FROM user_sessions WHERE token_hash = $1")
            .bind(hash_token(token))
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn deletion_removes_everything_owned_and_reports_counts(pool: DbPool) {
        let dm = signup(&pool, "dm@example.com").await;
        seed_world(&pool, dm.user.id).await;

        let neighbour = signup(&pool, "player@example.com").await;
        let their_campaign = create_campaign(&pool, neighbour.user.id, "Tomb of Annihilation").await;

        let summary = delete_account(
            &pool,
            dm.user.id,
            DeleteAccountRequest {
                password: Some(PASSWORD.to_string()),
            },
        )
        .await
        .unwrap();

        assert_eq!(
            summary,
            DeletionSummary {
                dice_rolls: 1,
                map_pins: 1,
                npcs: 2,
                session_logs: 1,
                characters: 2,
                campaigns: 1,
                auth_tokens: 1,
                sessions: 1,
            }
        );
        assert_eq!(count(&pool, "SELECT COUNT(*) FROM users WHERE id = $1", dm.user.id).await, 0);
        assert_eq!(
            count(&pool, "SELECT COUNT(*) FROM campaigns WHERE id = $1", their_campaign).await,
            1
        );
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn wrong_or_missing_password_deletes_nothing(pool: DbPool) {
        let dm = signup(&pool, "dm@example.com").await;
        let campaign_id = seed_world(&pool, dm.user.id).await;

        for password in [Some("not my password".to_string()), None] {
            let result = delete_account(&pool, dm.user.id, DeleteAccountRequest { password }).await;
            assert!(matches!(result, Err(AppError::InvalidCredentials)));
        }

        assert_eq!(count(&pool, "SELECT COUNT(*) FROM users WHERE id = $1", dm.user.id).await, 1);
        assert_eq!(
            count(&pool, "SELECT COUNT(*) FROM npcs WHERE campaign_id = $1", campaign_id).await,
            2
        );
        assert_eq!(
            count(&pool, "SELECT COUNT(*) FROM user_sessions WHERE user_id = $1", dm.user.id).await,
            1
        );
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn password_less_accounts_delete_with_the_session_alone(pool: DbPool) {
        let user_id = password_less_user(&pool, "guest@example.com").await;
        create_campaign(&pool, user_id, "One-shot").await;

        let summary = delete_account(&pool, user_id, DeleteAccountRequest::default())
            .await
            .unwrap();

        assert_eq!(summary.campaigns, 1);
        assert_eq!(count(&pool, "SELECT COUNT(*) FROM users WHERE id = $1", user_id).await, 0);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn password_change_keeps_only_the_calling_session(pool: DbPool) {
        let config = Config::for_tests();
        let dm = signup(&pool, "dm@example.com").await;
        let other = auth_service::login(
            &pool,
            &config,
            LoginRequest {
                email: "dm@example.com".into(),
                password: PASSWORD.into(),
            },
        )
        .await
        .unwrap();
        let current = session_id(&pool, &dm.session_token).await;

        change_password(
            &pool,
            dm.user.id,
            current,
            ChangePasswordRequest {
                current_password: Some(PASSWORD.into()),
                new_password: "an even longer passphrase".into(),
            },
        )
        .await
        .unwrap();

        let remaining: Vec<Uuid> = sqlx::query_scalar("SELECT id FROM user_sessions WHERE user_id = $1")
            .bind(dm.user.id)
            .fetch_all(&pool)
            .await
            .unwrap();
        assert_eq!(remaining, vec![current]);
        assert_ne!(other.session_token, dm.session_token);

        let relogin = auth_service::login(
            &pool,
            &config,
            LoginRequest {
                email: "dm@example.com".into(),
                password: "an even longer passphrase".into(),
            },
        )
        .await;
        assert!(relogin.is_ok());
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn password_change_needs_the_current_password_when_one_exists(pool: DbPool) {
        let dm = signup(&pool, "dm@example.com").await;
        let current = session_id(&pool, &dm.session_token).await;

        let result = change_password(
            &pool,
            dm.user.id,
            current,
            ChangePasswordRequest {
                current_password: None,
                new_password: "an even longer passphrase".into(),
            },
        )
        .await;

        assert!(matches!(result, Err(AppError::InvalidCredentials)));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn password_less_accounts_can_set_a_first_password(pool: DbPool) {
        let user_id = password_less_user(&pool, "guest@example.com").await;

        change_password(
            &pool,
            user_id,
            Uuid::new_v4(),
            ChangePasswordRequest {
                current_password: None,
                new_password: "a brand new passphrase".into(),
            },
        )
        .await
        .unwrap();

        let user = auth_service::get_user(&pool, user_id).await.unwrap();
        assert!(user.password_hash.is_some());
    }
}
