//! Login token check and liveness routes.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Serialize;

use crate::{
    adapters::http::app_state::AppState, app_error::AuthResult,
    domain::entities::login_request::LoginRequest,
};

#[derive(Serialize)]
struct LoginResponse {
    success: bool,
}

/// POST /api/login
/// Accepts `{app_id, token, app_key}` and answers 200 when the token
/// currently authorizes a login in this region.
async fn login(
    State(app_state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AuthResult<impl IntoResponse> {
    app_state.token_validator.authenticate(&payload).await?;
    Ok((StatusCode::OK, Json(LoginResponse { success: true })))
}

#[derive(Serialize)]
struct HealthResponse<'a> {
    status: &'static str,
    region: &'a str,
    cache_hits: u64,
    cache_misses: u64,
    cache_hit_ratio: Option<f64>,
}

/// GET /api/health
/// Liveness plus the serving region and this instance's cache counters.
async fn health(State(app_state): State<AppState>) -> impl IntoResponse {
    let validator = &app_state.token_validator;
    let stats = validator.cache_stats();
    Json(HealthResponse {
        status: "ok",
        region: validator.serving_region(),
        cache_hits: stats.hits,
        cache_misses: stats.misses,
        cache_hit_ratio: stats.hit_ratio(),
    })
    .into_response()
}

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/health", get(health))
}
