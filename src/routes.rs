//! HTTP router assembly.

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{handlers, middleware, state::AppState};

/// Build the full application router.
///
/// Public routes: health, signup/login, password reset, magic links and the
/// stateless dice roller. Everything else requires a session token.
pub fn build_router(state: AppState) -> Router {
    let authenticated_routes = Router::new()
        // Session and account
        .route("/api/v1/auth/logout", post(handlers::auth::logout))
        .route(
            "/api/v1/account",
            get(handlers::account::get_account)
                .patch(handlers::account::update_account)
                .delete(handlers::account::delete_account),
        )
        .route(
            "/api/v1/account/password",
            post(handlers::account::change_password),
        )
        // Campaigns
        .route(
            "/api/v1/campaigns",
            post(handlers::campaigns::create_campaign).get(handlers::campaigns::list_campaigns),
        )
        .route(
            "/api/v1/campaigns/{id}",
            get(handlers::campaigns::get_campaign)
                .patch(handlers::campaigns::update_campaign)
                .delete(handlers::campaigns::delete_campaign),
        )
        // Characters
        .route(
            "/api/v1/characters",
            post(handlers::characters::create_character)
                .get(handlers::characters::list_characters),
        )
        .route(
            "/api/v1/characters/{id}",
            get(handlers::characters::get_character)
                .patch(handlers::characters::update_character)
                .delete(handlers::characters::delete_character),
        )
        // NPC roster
        .route(
            "/api/v1/campaigns/{id}/npcs",
            post(handlers::npcs::create_npc).get(handlers::npcs::list_npcs),
        )
        .route(
            "/api/v1/campaigns/{id}/npcs/{npc_id}",
            get(handlers::npcs::get_npc)
                .patch(handlers::npcs::update_npc)
                .delete(handlers::npcs::delete_npc),
        )
        // Session logs
        .route(
            "/api/v1/campaigns/{id}/sessions",
            post(handlers::session_logs::create_session_log)
                .get(handlers::session_logs::list_session_logs),
        )
        .route(
            "/api/v1/campaigns/{id}/sessions/{session_id}",
            get(handlers::session_logs::get_session_log)
                .patch(handlers::session_logs::update_session_log)
                .delete(handlers::session_logs::delete_session_log),
        )
        // World map
        .route(
            "/api/v1/campaigns/{id}/pins",
            post(handlers::map_pins::create_pin).get(handlers::map_pins::list_pins),
        )
        .route(
            "/api/v1/campaigns/{id}/pins/{pin_id}",
            axum::routing::patch(handlers::map_pins::update_pin)
                .delete(handlers::map_pins::delete_pin),
        )
        // Campaign roll log
        .route(
            "/api/v1/campaigns/{id}/rolls",
            post(handlers::dice::roll_for_campaign).get(handlers::dice::list_rolls),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.pool.clone(),
            middleware::auth::auth_middleware,
        ));

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/api/v1/auth/signup", post(handlers::auth::signup))
        .route("/api/v1/auth/login", post(handlers::auth::login))
        .route(
            "/api/v1/auth/password-reset",
            post(handlers::auth::request_password_reset),
        )
        .route(
            "/api/v1/auth/password-reset/confirm",
            post(handlers::auth::confirm_password_reset),
        )
        .route(
            "/api/v1/auth/magic-link",
            post(handlers::auth::request_magic_link),
        )
        .route(
            "/api/v1/auth/magic-link/consume",
            post(handlers::auth::consume_magic_link),
        )
        .route("/api/v1/dice/roll", post(handlers::dice::roll))
        .merge(authenticated_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
