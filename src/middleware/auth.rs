//! Session token authentication middleware.
//!
//! This middleware intercepts every protected request to:
//! 1. Extract the session token from the Authorization header
//! 2. Hash it and look up an unexpired session in the database
//! 3. Inject authentication context into the request
//! 4. Reject unauthorized requests with HTTP 401

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::{db::DbPool, error::AppError, services::credentials::hash_token};

/// Authentication context attached to authenticated requests.
///
/// Handlers extract it with `Extension<AuthContext>` and scope every query
/// by `user_id`.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub email: String,

    /// The session used for this request (logout deletes it)
    pub session_id: Uuid,
}

#[derive(sqlx::FromRow)]
struct SessionLookup {
    session_id: Uuid,
    user_id: Uuid,
    email: String,
}

/// Extract `<token>` from `Bearer <token>`.
pub fn bearer_token(header_value: &str) -> Option<&str> {
    header_value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Session authentication middleware function.
///
/// # Flow
///
/// 1. Extract `Authorization: Bearer <token>` header from request
/// 2. Hash the token using SHA-256
/// 3. Query for a session with that hash whose `expires_at` is in the future
/// 4. If found: inject `AuthContext` into request, call next handler
/// 5. If not found: return 401 Unauthorized error
pub async fn auth_middleware(
    State(pool): State<DbPool>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(bearer_token)
        .ok_or(AppError::Unauthorized)?;

    let token_hash = hash_token(token);

    let session = sqlx::query_as::<_, SessionLookup>(
        r#"
        SELECT s.id AS session_id, u.id AS user_id, u.email
        FROM user_sessions s
        JOIN users u ON u.id = s.user_id
        WHERE s.token_hash = $1 AND s.expires_at > NOW()
        "#,
    )
    .bind(&token_hash)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::Unauthorized)?;

    request.extensions_mut().insert(AuthContext {
        user_id: session.user_id,
        email: session.email,
        session_id: session.session_id,
    });

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use super::*;
    use crate::test_support::{app, call, signup};

    #[test]
    fn bearer_token_parsing() {
        assert_eq!(bearer_token("Bearer abc123"), Some("abc123"));
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("Basic abc123"), None);
        assert_eq!(bearer_token("abc123"), None);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn expired_sessions_are_rejected(pool: DbPool) {
        let dm = signup(&pool, "dm@example.com").await;
        let router = app(pool.clone());

        let (status, body) = call(&router, "GET", "/api/v1/account", &dm.session_token, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["email"], "dm@example.com");

        sqlx::query("UPDATE user_sessions SET expires_at = NOW() - INTERVAL '1 minute' WHERE user_id = $1")
            .bind(dm.user.id)
            .execute(&pool)
            .await
            .unwrap();

        let (status, body) = call(&router, "GET", "/api/v1/account", &dm.session_token, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "unauthorized");
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn logout_ends_the_session(pool: DbPool) {
        let dm = signup(&pool, "dm@example.com").await;
        let router = app(pool);

        let (status, _) = call(&router, "POST", "/api/v1/auth/logout", &dm.session_token, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = call(&router, "GET", "/api/v1/account", &dm.session_token, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
