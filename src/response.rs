//! Uniform JSON envelope for every response.

use serde::Serialize;

use crate::users::validation::FieldError;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

/// Serializes as `{}`.
#[derive(Debug, Default, Serialize)]
pub struct Empty {}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data,
            message: None,
        }
    }

    pub fn success_with_message(data: T, message: &'static str) -> Self {
        Self {
            success: true,
            data,
            message: Some(message),
        }
    }
}

impl ApiResponse<Empty> {
    pub fn message(message: &'static str) -> Self {
        Self::success_with_message(Empty {}, message)
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ValidationErrorBody {
    pub success: bool,
    pub errors: Vec<FieldError>,
}
