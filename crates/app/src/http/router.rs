use axum::Router;
use axum::middleware;
use axum::routing::{get, post};

use crate::http::middleware::admin_auth;
use crate::http::routes::{admin, health, webhook};
use crate::state::AppState;

pub fn build(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/webhook/chatbot/message", post(webhook::chatbot_webhook))
        .route("/v1/admin/scan", post(admin::scan::post_scan))
        .route("/v1/admin/dispatch", post(admin::dispatch::post_dispatch))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            admin_auth::require_admin,
        ))
        .with_state(state)
}
