//! Helpers for tests that run against a real database.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use crate::{
    config::Config,
    db::DbPool,
    models::user::{SessionResponse, SignupRequest},
    routes::build_router,
    services::{auth_service, mail_service::Mailer},
    state::AppState,
};

pub const PASSWORD: &str = "a long passphrase";

pub fn app(pool: DbPool) -> Router {
    let config = Config::for_tests();
    let mailer = Mailer::from_config(&config).expect("mailer");

    build_router(AppState {
        pool,
        config: Arc::new(config),
        mailer,
    })
}

pub async fn signup(pool: &DbPool, email: &str) -> SessionResponse {
    auth_service::signup(
        pool,
        &Config::for_tests(),
        SignupRequest {
            email: email.to_string(),
            password: PASSWORD.to_string(),
            display_name: "DM".to_string(),
        },
    )
    .await
    .expect("signup")
}

/// A user created the way a magic link creates one: no password.
pub async fn password_less_user(pool: &DbPool, email: &str) -> Uuid {
    sqlx::query_scalar("INSERT INTO users (email, display_name) VALUES ($1, 'Guest') RETURNING id")
        .bind(email)
        .fetch_one(pool)
        .await
        .expect("user")
}

pub async fn create_campaign(pool: &DbPool, owner_id: Uuid, name: &str) -> Uuid {
    sqlx::query_scalar("INSERT INTO campaigns (owner_id, name) VALUES ($1, $2) RETURNING id")
        .bind(owner_id)
        .bind(name)
        .fetch_one(pool)
        .await
        .expect("campaign")
}

pub async fn count(pool: &DbPool, sql: &str, id: Uuid) -> i64 {
    sqlx::query_scalar(sql)
        .bind(id)
        .fetch_one(pool)
        .await
        .expect("count")
}

/// Send a request as `token` and decode the JSON answer (`Null` when empty).
pub async fn call(
    router: &Router,
    method: &str,
    uri: &str,
    token: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("Authorization", format!("Bearer {token}"));

    let body = match body {
        Some(json) => {
            builder = builder.header("Content-Type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = router
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };

    (status, json)
}
