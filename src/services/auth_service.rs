//! Authentication service.
//!
//! This service handles:
//! - Signup and password login
//! - Session issuance and revocation
//! - Password-reset and magic-link tokens (single use, time limited)
//!
//! # Token Handling
//!
//! One-time tokens are consumed with a single conditional `UPDATE ...
//! RETURNING`, so two concurrent requests with the same token cannot both
//! succeed.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::{
    config::Config,
    db::{DbPool, is_unique_violation},
    error::AppError,
    models::user::{
        ConfirmPasswordResetRequest, LoginRequest, SessionResponse, SignupRequest, TokenPurpose,
        User,
    },
    services::{
        credentials::{
            display_name_from_email, generate_token, hash_password, hash_token, normalize_email,
            validate_password, verify_against_decoy, verify_password,
        },
        mail_service::{self, Mailer},
    },
    validation::required_text,
};

pub const DISPLAY_NAME_MAX: usize = 80;

/// Register a new account and log it in.
///
/// # Errors
///
/// - `InvalidRequest`: malformed email, weak password or empty display name
/// - `EmailTaken`: the email is already registered
pub async fn signup(
    pool: &DbPool,
    config: &Config,
    request: SignupRequest,
) -> Result<SessionResponse, AppError> {
    let email = normalize_email(&request.email)?;
    let display_name = required_text("display_name", &request.display_name, DISPLAY_NAME_MAX)?;
    validate_password(&request.password)?;
    let password_hash = hash_password(&request.password)?;

    let mut tx = pool.begin().await?;

    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (email, display_name, password_hash)
        VALUES ($1, $2, $3)
        RETURNING *
        "#,
    )
    .bind(&email)
    .bind(&display_name)
    .bind(&password_hash)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::EmailTaken
        } else {
            AppError::Database(e)
        }
    })?;

    let (session_token, expires_at) =
        create_session(&mut *tx, user.id, config.session_ttl_hours).await?;

    tx.commit().await?;

    tracing::info!(user_id = %user.id, "user signed up");

    Ok(SessionResponse {
        user: user.into(),
        session_token,
        expires_at,
    })
}

/// Exchange email and password for a new session.
///
/// Unknown emails, wrong passwords and password-less (magic link only)
/// accounts all fail with `InvalidCredentials`.
pub async fn login(
    pool: &DbPool,
    config: &Config,
    request: LoginRequest,
) -> Result<SessionResponse, AppError> {
    let user = match normalize_email(&request.email) {
        Ok(email) => find_user_by_email(pool, &email).await?,
        Err(_) => None,
    };

    // Every failure pays for one Argon2 verification.
    let Some((user, stored_hash)) = user.and_then(|user| {
        let hash = user.password_hash.clone()?;
        Some((user, hash))
    }) else {
        verify_against_decoy(&request.password);
        return Err(AppError::InvalidCredentials);
    };

    if !verify_password(&request.password, &stored_hash)? {
        tracing::debug!(user_id = %user.id, "password mismatch");
        return Err(AppError::InvalidCredentials);
    }

    let (session_token, expires_at) =
        create_session(pool, user.id, config.session_ttl_hours).await?;

    tracing::info!(user_id = %user.id, "user logged in");

    Ok(SessionResponse {
        user: user.into(),
        session_token,
        expires_at,
    })
}

/// Delete the session used by the current request.
pub async fn logout(pool: &DbPool, session_id: Uuid) -> Result<(), AppError> {
    sqlx::query("DELETE FROM user_sessions WHERE id = $1")
        .bind(session_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Start a password reset.
///
/// Always succeeds from the caller's point of view so the endpoint cannot be
/// used to check which emails are registered. Earlier unused reset tokens of
/// the user stop working.
pub async fn request_password_reset(
    pool: &DbPool,
    config: &Config,
    mailer: &Mailer,
    email: &str,
) -> Result<(), AppError> {
    let Ok(email) = normalize_email(email) else {
        return Ok(());
    };

    let Some(user) = find_user_by_email(pool, &email).await? else {
        tracing::debug!("password reset requested for unknown email");
        return Ok(());
    };

    let token = issue_token(
        pool,
        user.id,
        TokenPurpose::PasswordReset,
        config.password_reset_ttl_minutes,
    )
    .await?;

    match mail_service::password_reset_mail(
        &config.app_base_url,
        &user.email,
        &token,
        config.password_reset_ttl_minutes,
    ) {
        Ok(mail) => deliver(mailer, &mail).await,
        Err(e) => tracing::error!(error = %e, "APP_BASE_URL is not a valid URL"),
    }

    Ok(())
}

/// Finish a password reset: consume the token, set the new password and sign
/// out every session of the user.
///
/// # Errors
///
/// - `InvalidRequest`: the new password is too short or too long (the token
///   is left unused)
/// - `InvalidToken`: unknown, expired or already used token
pub async fn confirm_password_reset(
    pool: &DbPool,
    request: ConfirmPasswordResetRequest,
) -> Result<(), AppError> {
    validate_password(&request.new_password)?;
    let password_hash = hash_password(&request.new_password)?;

    let mut tx = pool.begin().await?;

    let user_id = consume_token(&mut *tx, &request.token, TokenPurpose::PasswordReset)
        .await?
        .ok_or(AppError::InvalidToken)?;

    sqlx::query("UPDATE users SET password_hash = $1, updated_at = NOW() WHERE id = $2")
        .bind(&password_hash)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    let revoked = sqlx::query("DELETE FROM user_sessions WHERE user_id = $1")
        .bind(user_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    tx.commit().await?;

    tracing::info!(user_id = %user_id, revoked_sessions = revoked, "password reset completed");
    Ok(())
}

/// Send a one-time sign-in link, creating a password-less account for
/// emails that are not registered yet.
pub async fn request_magic_link(
    pool: &DbPool,
    config: &Config,
    mailer: &Mailer,
    email: &str,
) -> Result<(), AppError> {
    let email = normalize_email(email)?;

    // The no-op update makes RETURNING yield the existing row on conflict.
    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (email, display_name)
        VALUES ($1, $2)
        ON CONFLICT (email) DO UPDATE SET email = EXCLUDED.email
        RETURNING *
        "#,
    )
    .bind(&email)
    .bind(display_name_from_email(&email))
    .fetch_one(pool)
    .await?;

    let token = issue_token(
        pool,
        user.id,
        TokenPurpose::MagicLink,
        config.magic_link_ttl_minutes,
    )
    .await?;

    match mail_service::magic_link_mail(
        &config.app_base_url,
        &user.email,
        &token,
        config.magic_link_ttl_minutes,
    ) {
        Ok(mail) => deliver(mailer, &mail).await,
        Err(e) => tracing::error!(error = %e, "APP_BASE_URL is not a valid URL"),
    }

    Ok(())
}

/// Trade a magic-link token for a session.
pub async fn consume_magic_link(
    pool: &DbPool,
    config: &Config,
    token: &str,
) -> Result<SessionResponse, AppError> {
    let mut tx = pool.begin().await?;

    let user_id = consume_token(&mut *tx, token, TokenPurpose::MagicLink)
        .await?
        .ok_or(AppError::InvalidToken)?;

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

    let (session_token, expires_at) =
        create_session(&mut *tx, user.id, config.session_ttl_hours).await?;

    tx.commit().await?;

    tracing::info!(user_id = %user.id, "user signed in with magic link");

    Ok(SessionResponse {
        user: user.into(),
        session_token,
        expires_at,
    })
}

pub async fn find_user_by_email(pool: &DbPool, email: &str) -> Result<Option<User>, AppError> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

pub async fn get_user(pool: &DbPool, user_id: Uuid) -> Result<User, AppError> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::Unauthorized)
}

/// Insert a session row and return the raw token with its expiry.
async fn create_session<'e, E>(
    executor: E,
    user_id: Uuid,
    ttl_hours: i64,
) -> Result<(String, DateTime<Utc>), AppError>
where
    E: sqlx::PgExecutor<'e>,
{
    let token = generate_token();
    let expires_at = Utc::now() + Duration::hours(ttl_hours);

    sqlx::query("INSERT INTO user_sessions (user_id, token_hash, expires_at) VALUES ($1, $2, $3)")
        .bind(user_id)
        .bind(hash_token(&token))
        .bind(expires_at)
        .execute(executor)
        .await?;

    Ok((token, expires_at))
}

/// Retire the user's outstanding tokens for `purpose` and issue a new one.
async fn issue_token(
    pool: &DbPool,
    user_id: Uuid,
    purpose: TokenPurpose,
    ttl_minutes: i64,
) -> Result<String, AppError> {
    let token = generate_token();
    let expires_at = Utc::now() + Duration::minutes(ttl_minutes);

    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        UPDATE auth_tokens
        SET consumed_at = NOW()
        WHERE user_id = $1 AND purpose = $2 AND consumed_at IS NULL
        "#,
    )
    .bind(user_id)
    .bind(purpose.as_str())
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO auth_tokens (user_id, purpose, token_hash, expires_at)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(user_id)
    .bind(purpose.as_str())
    .bind(hash_token(&token))
    .bind(expires_at)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::debug!(user_id = %user_id, purpose = purpose.as_str(), "issued auth token");
    Ok(token)
}

/// Mark a live token as used and return its owner, or `None` if the token is
/// unknown, expired, already used or meant for something else.
async fn consume_token<'e, E>(
    executor: E,
    token: &str,
    purpose: TokenPurpose,
) -> Result<Option<Uuid>, AppError>
where
    E: sqlx::PgExecutor<'e>,
{
    let user_id: Option<Uuid> = sqlx::query_scalar(
        r#"
        UPDATE auth_tokens
        SET consumed_at = NOW()
        WHERE token_hash = $1
          AND purpose = $2
          AND consumed_at IS NULL
          AND expires_at > NOW()
        RETURNING user_id
        "#,
    )
    .bind(hash_token(token.trim()))
    .bind(purpose.as_str())
    .fetch_optional(executor)
    .await?;

    Ok(user_id)
}

/// Mail delivery failures are logged; the request itself still succeeds.
async fn deliver(mailer: &Mailer, mail: &mail_service::OutboundMail) {
    if let Err(e) = mailer.send(mail).await {
        tracing::error!(mail_id = %mail.id, error = %e, "failed to deliver auth mail");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::user::SignupRequest,
        test_support::{PASSWORD, count, password_less_user, signup},
    };

    fn login_request(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn magic_link_tokens_work_once(pool: DbPool) {
        let config = Config::for_tests();
        let mailer = Mailer::from_config(&config).unwrap();
        request_magic_link(&pool, &config, &mailer, " New@Example.com ").await.unwrap();

        let user = find_user_by_email(&pool, "new@example.com").await.unwrap().unwrap();
        assert!(user.password_hash.is_none());
        assert_eq!(user.display_name, "new");

        let token = issue_token(&pool, user.id, TokenPurpose::MagicLink, 15).await.unwrap();

        let session = consume_magic_link(&pool, &config, &token).await.unwrap();
        assert_eq!(session.user.id, user.id);

        let again = consume_magic_link(&pool, &config, &token).await;
        assert!(matches!(again, Err(AppError::InvalidToken)));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn reissuing_retires_earlier_tokens(pool: DbPool) {
        let config = Config::for_tests();
        let user_id = password_less_user(&pool, "guest@example.com").await;

        let first = issue_token(&pool, user_id, TokenPurpose::MagicLink, 15).await.unwrap();
        let second = issue_token(&pool, user_id, TokenPurpose::MagicLink, 15).await.unwrap();

        assert!(matches!(
            consume_magic_link(&pool, &config, &first).await,
            Err(AppError::InvalidToken)
        ));
        assert!(consume_magic_link(&pool, &config, &second).await.is_ok());
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn expired_tokens_are_rejected(pool: DbPool) {
        let config = Config::for_tests();
        let user_id = password_less_user(&pool, "guest@example.com").await;

        let token = issue_token(&pool, user_id, TokenPurpose::MagicLink, -1).await.unwrap();

        assert!(matches!(
            consume_magic_link(&pool, &config, &token).await,
            Err(AppError::InvalidToken)
        ));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn reset_tokens_do_not_sign_in(pool: DbPool) {
        let config = Config::for_tests();
        let dm = signup(&pool, "dm@example.com").await;
        let token = issue_token(&pool, dm.user.id, TokenPurpose::PasswordReset, 60)
            .await
            .unwrap();

        assert!(matches!(
            consume_magic_link(&pool, &config, &token).await,
            Err(AppError::InvalidToken)
        ));

        // The failed attempt must not have spent the token.
        confirm_password_reset(
            &pool,
            ConfirmPasswordResetRequest {
                token,
                new_password: "a fresh passphrase".into(),
            },
        )
        .await
        .unwrap();
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn password_reset_swaps_password_and_signs_out_everywhere(pool: DbPool) {
        let config = Config::for_tests();
        let dm = signup(&pool, "dm@example.com").await;
        login(&pool, &config, login_request("dm@example.com", PASSWORD))
            .await
            .unwrap();
        let token = issue_token(&pool, dm.user.id, TokenPurpose::PasswordReset, 60)
            .await
            .unwrap();

        confirm_password_reset(
            &pool,
            ConfirmPasswordResetRequest {
                token: token.clone(),
                new_password: "a fresh passphrase".into(),
            },
        )
        .await
        .unwrap();

        assert_eq!(
            count(&pool, "SELECT COUNT(*) FROM user_sessions WHERE user_id = $1", dm.user.id).await,
            0
        );
        assert!(matches!(
            login(&pool, &config, login_request("dm@example.com", PASSWORD)).await,
            Err(AppError::InvalidCredentials)
        ));
        assert!(login(&pool, &config, login_request("dm@example.com", "a fresh passphrase")).await.is_ok());

        let reused = confirm_password_reset(
            &pool,
            ConfirmPasswordResetRequest {
                token,
                new_password: "yet another passphrase".into(),
            },
        )
        .await;
        assert!(matches!(reused, Err(AppError::InvalidToken)));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn weak_new_password_leaves_the_reset_token_unused(pool: DbPool) {
        let dm = signup(&pool, "dm@example.com").await;
        let token = issue_token(&pool, dm.user.id, TokenPurpose::PasswordReset, 60)
            .await
            .unwrap();

        let weak = confirm_password_reset(
            &pool,
            ConfirmPasswordResetRequest {
                token: token.clone(),
                new_password: "short".into(),
            },
        )
        .await;
        assert!(matches!(weak, Err(AppError::InvalidRequest(_))));

        confirm_password_reset(
            &pool,
            ConfirmPasswordResetRequest {
                token,
                new_password: "long enough now".into(),
            },
        )
        .await
        .unwrap();
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn reset_requests_for_unknown_emails_issue_nothing(pool: DbPool) {
        let config = Config::for_tests();
        let mailer = Mailer::from_config(&config).unwrap();

        request_password_reset(&pool, &config, &mailer, "ghost@example.com")
            .await
            .unwrap();
        request_password_reset(&pool, &config, &mailer, "not an email")
            .await
            .unwrap();

        let tokens: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM auth_tokens")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(tokens, 0);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn emails_are_unique_ignoring_case(pool: DbPool) {
        signup(&pool, "dm@example.com").await;

        let duplicate = super::signup(
            &pool,
            &Config::for_tests(),
            SignupRequest {
                email: "  DM@Example.com ".into(),
                password: PASSWORD.into(),
                display_name: "Impostor".into(),
            },
        )
        .await;

        assert!(matches!(duplicate, Err(AppError::EmailTaken)));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn login_failures_look_the_same(pool: DbPool) {
        let config = Config::for_tests();
        signup(&pool, "dm@example.com").await;
        password_less_user(&pool, "guest@example.com").await;

        for (email, password) in [
            ("nobody@example.com", PASSWORD),
            ("dm@example.com", "not my password"),
            ("guest@example.com", PASSWORD),
            ("not an email", PASSWORD),
        ] {
            let result = login(&pool, &config, login_request(email, password)).await;
            assert!(matches!(result, Err(AppError::InvalidCredentials)), "{email}");
        }

        let session = login(&pool, &config, login_request(" DM@example.com", PASSWORD))
            .await
            .unwrap();
        assert_eq!(session.user.email, "dm@example.com");
    }
}
