//! In-memory /cats CRUD resource behind a token check.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use tokio::sync::RwLock;

use crate::server::AppState;

/// Shared in-memory resource store. No persistence by design.
pub type CatStore = Arc<RwLock<Vec<serde_json::Value>>>;

pub fn router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/cats", get(list_cats).post(create_cat))
        .route_layer(middleware::from_fn_with_state(state, require_auth))
}

async fn list_cats(State(state): State<Arc<AppState>>) -> Json<Vec<serde_json::Value>> {
    Json(state.cats.read().await.clone())
}

async fn create_cat(
    State(state): State<Arc<AppState>>,
    Json(cat): Json<serde_json::Value>,
) -> impl IntoResponse {
    state.cats.write().await.push(cat.clone());
    (StatusCode::CREATED, Json(cat))
}

/// Reject requests whose Authorization header does not carry the configured
/// token. Not real authentication — the same loose string check the service
/// has always shipped with.
async fn require_auth(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let authorized = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.contains(&state.config.auth.token));

    if authorized {
        next.run(request).await
    } else {
        StatusCode::UNAUTHORIZED.into_response()
    }
}
