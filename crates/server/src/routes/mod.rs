//! Router assembly.

mod assessments;
mod children;
mod notifications;
mod rooms;

use axum::middleware;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use tower_http::cors::CorsLayer;

use crate::auth;
use crate::state::AppState;

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Build the full application router.
///
/// Everything under `/api` except `/api/auth` and `/api/health` sits
/// behind the bearer-token middleware.
pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .nest("/assessments", assessments::router())
        .nest("/children", children::router())
        .nest("/rooms", rooms::router())
        .nest("/notifications", notifications::router())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_auth,
        ));

    let api = Router::new()
        .route("/health", get(health))
        .nest("/auth", auth::router())
        .merge(protected);

    Router::new()
        .nest("/api", api)
        .layer(CorsLayer::permissive())
        .with_state(state)
}
