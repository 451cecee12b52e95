use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    routing::{delete, get, patch},
    Json, Router,
};
use serde_json::{Map, Value};
use tracing::{info, instrument};

use crate::{
    error::ApiError,
    response::{ApiResponse, Empty},
    routes::system::route_not_found,
    state::AppState,
    users::{
        dto::{ListQuery, PublicUser, UserPage},
        repo_types::UserChanges,
        services::{prepare_changes, prepare_new_user},
        validation::{validate_create, validate_update},
    },
};

type ApiResult<T> = Result<T, ApiError>;

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/users",
            get(list_users).post(create_user).fallback(route_not_found),
        )
        .route(
            "/api/users/:id",
            get(get_user)
                .put(update_user)
                .delete(deactivate_user)
                .fallback(route_not_found),
        )
        .route(
            "/api/users/:id/permanent",
            delete(delete_user_permanently).fallback(route_not_found),
        )
        .route(
            "/api/users/:id/activate",
            patch(activate_user).fallback(route_not_found),
        )
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.trim().to_ascii_lowercase().starts_with("application/json"))
        .unwrap_or(false)
}

/// Reads the request body as a JSON object. A missing body, or one that is
/// not declared as JSON, reads as `{}`.
fn json_object(headers: &HeaderMap, body: &Bytes) -> ApiResult<Map<String, Value>> {
    if body.is_empty() || !is_json(headers) {
        return Ok(Map::new());
    }
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ApiError::BadRequest(
            "Request body must be a JSON object".into(),
        )),
        Err(e) => Err(ApiError::BadRequest(format!("Invalid JSON: {}", e))),
    }
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> ApiResult<Json<UserPage>> {
    let Query(pairs) = query?;
    let query = ListQuery::from_pairs(pairs);
    let filter = query.filter();
    let pagination = query.pagination();

    let users = state.store.find_page(&filter, pagination.window()).await?;
    let total = state.store.count(&filter).await?;

    Ok(Json(UserPage {
        success: true,
        count: users.len(),
        total,
        page: pagination.page,
        pages: pagination.pages(total),
        data: users.into_iter().map(PublicUser::from).collect(),
    }))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<PublicUser>>> {
    let user = state.store.find_by_id(&id).await?.ok_or(ApiError::NotFound)?;
    Ok(Json(ApiResponse::success(user.into())))
}

#[instrument(skip(state, headers, body))]
pub async fn create_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<ApiResponse<PublicUser>>)> {
    let body = json_object(&headers, &body)?;
    let input = validate_create(&body).map_err(ApiError::Validation)?;
    let new_user = prepare_new_user(input).await?;

    let user = state.store.insert(new_user).await?;
    info!(user_id = %user.id, "user created");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(user.into())),
    ))
}

#[instrument(skip(state, headers, body))]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<ApiResponse<PublicUser>>> {
    let body = json_object(&headers, &body)?;
    let input = validate_update(&body).map_err(ApiError::Validation)?;
    let changes = prepare_changes(input).await?;

    let user = state
        .store
        .update_fields(&id, changes)
        .await?
        .ok_or(ApiError::NotFound)?;
    info!(user_id = %user.id, "user updated");

    Ok(Json(ApiResponse::success(user.into())))
}

#[instrument(skip(state))]
pub async fn deactivate_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<Empty>>> {
    state
        .store
        .update_fields(&id, UserChanges::active(false))
        .await?
        .ok_or(ApiError::NotFound)?;
    info!(user_id = %id, "user deactivated");

    Ok(Json(ApiResponse::message("User deactivated successfully")))
}

#[instrument(skip(state))]
pub async fn delete_user_permanently(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<Empty>>> {
    if !state.store.delete(&id).await? {
        return Err(ApiError::NotFound);
    }
    info!(user_id = %id, "user permanently deleted");

    Ok(Json(ApiResponse::message("User permanently deleted")))
}

#[instrument(skip(state))]
pub async fn activate_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<PublicUser>>> {
    let user = state
        .store
        .update_fields(&id, UserChanges::active(true))
        .await?
        .ok_or(ApiError::NotFound)?;
    info!(user_id = %id, "user activated");

    Ok(Json(ApiResponse::success_with_message(
        user.into(),
        "User activated successfully",
    )))
}
