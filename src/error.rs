use axum::{
    extract::{rejection::QueryRejection, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::{error, warn};

use crate::response::{ErrorBody, ValidationErrorBody};
use crate::state::AppState;
use crate::users::repo::StoreError;
use crate::users::validation::FieldError;

pub const USER_NOT_FOUND: &str = "User not found";
const RESOURCE_NOT_FOUND: &str = "Resource not found";
const DUPLICATE_FIELD: &str = "Duplicate field value entered";
const SERVER_ERROR: &str = "Server Error";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("validation failed on {} field(s)", .0.len())]
    Validation(Vec<FieldError>),

    #[error("{}", USER_NOT_FOUND)]
    NotFound,

    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Internal(anyhow::Error),
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

/// Internal error text attached to 500 responses for the terminal stage.
#[derive(Debug, Clone)]
pub struct ErrorDetail(pub String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                Json(ValidationErrorBody {
                    success: false,
                    errors,
                }),
            )
                .into_response(),
            ApiError::NotFound => {
                (StatusCode::NOT_FOUND, Json(ErrorBody::new(USER_NOT_FOUND))).into_response()
            }
            ApiError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, Json(ErrorBody::new(msg))).into_response()
            }
            ApiError::Store(StoreError::InvalidId(id)) => {
                warn!(%id, "malformed id");
                (StatusCode::NOT_FOUND, Json(ErrorBody::new(RESOURCE_NOT_FOUND))).into_response()
            }
            ApiError::Store(StoreError::Duplicate(detail)) => {
                warn!(%detail, "duplicate key");
                (StatusCode::BAD_REQUEST, Json(ErrorBody::new(DUPLICATE_FIELD))).into_response()
            }
            other => {
                let detail = other.to_string();
                error!(error = %detail, "request failed");
                let mut res = (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorBody::new(SERVER_ERROR)),
                )
                    .into_response();
                res.extensions_mut().insert(ErrorDetail(detail));
                res
            }
        }
    }
}

/// Last stage before the client: reveals internal error text outside
/// production, keeps the generic body otherwise.
pub async fn terminal_error_stage(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    let mut res = next.run(req).await;
    let Some(ErrorDetail(detail)) = res.extensions_mut().remove::<ErrorDetail>() else {
        return res;
    };
    if state.config.environment.exposes_errors() {
        let status = res.status();
        return (status, Json(ErrorBody::new(detail))).into_response();
    }
    res
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use serde_json::Value;

    async fn body_json(res: Response) -> Value {
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn not_found_shape() {
        let res = ApiError::NotFound.into_response();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        let v = body_json(res).await;
        assert_eq!(v["success"], false);
        assert_eq!(v["error"], USER_NOT_FOUND);
    }

    #[tokio::test]
    async fn store_failures_are_generic_500s() {
        let res = ApiError::Store(StoreError::Backend("connection reset".into())).into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let detail = res.extensions().get::<ErrorDetail>().cloned().unwrap();
        assert!(detail.0.contains("connection reset"));
        let v = body_json(res).await;
        assert_eq!(v["error"], SERVER_ERROR);
    }

    #[tokio::test]
    async fn malformed_id_is_not_a_500() {
        let res = ApiError::Store(StoreError::InvalidId("xyz".into())).into_response();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(res).await["error"], RESOURCE_NOT_FOUND);
    }

    #[tokio::test]
    async fn duplicate_email_is_a_400() {
        let res = ApiError::Store(StoreError::Duplicate("email".into())).into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(res).await["error"], DUPLICATE_FIELD);
    }
}
