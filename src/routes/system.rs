use axum::{
    extract::{OriginalUri, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use crate::{response::ErrorBody, state::AppState};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub success: bool,
    pub message: &'static str,
    pub timestamp: String,
    pub environment: &'static str,
}

#[derive(Debug, Serialize)]
pub struct Endpoints {
    pub health: &'static str,
    pub users: &'static str,
    pub documentation: &'static str,
}

#[derive(Debug, Serialize)]
pub struct WelcomeResponse {
    pub success: bool,
    pub message: &'static str,
    pub version: &'static str,
    pub endpoints: Endpoints,
}

pub fn system_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(welcome).fallback(route_not_found))
        .route("/api/health", get(health).fallback(route_not_found))
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let timestamp = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default();
    Json(HealthResponse {
        success: true,
        message: "Server is running!",
        timestamp,
        environment: state.config.environment.as_str(),
    })
}

pub async fn welcome() -> Json<WelcomeResponse> {
    Json(WelcomeResponse {
        success: true,
        message: "Welcome to CRUD Backend API",
        version: env!("CARGO_PKG_VERSION"),
        endpoints: Endpoints {
            health: "/api/health",
            users: "/api/users",
            documentation: "See README.md for full API documentation",
        },
    })
}

/// Fallback for any path or method the router does not serve.
pub async fn route_not_found(OriginalUri(uri): OriginalUri) -> Response {
    let target = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| uri.path());
    (
        StatusCode::NOT_FOUND,
        Json(ErrorBody::new(format!("Route {} not found", target))),
    )
        .into_response()
}
