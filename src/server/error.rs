//! Error types for the server

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::application::{AuthError, PredictionError};

/// Request failure as seen by a client.
///
/// Every body has a single `detail` field; internal causes are logged here
/// and never serialized.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid API Key")]
    Unauthorized,

    #[error("Authentication service unavailable: {0}")]
    AuthUnavailable(String),

    #[error("Validation failed: {0:?}")]
    Validation(Vec<String>),

    #[error("Prediction failed: {0}")]
    Prediction(#[from] PredictionError),
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidKey => Self::Unauthorized,
            AuthError::Unavailable(msg) => Self::AuthUnavailable(msg),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(vec![rejection.body_text()])
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, json!("Invalid API Key")),
            ApiError::AuthUnavailable(msg) => {
                tracing::error!(detail = %msg, "Key store unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    json!("Authentication service unavailable"),
                )
            }
            ApiError::Validation(errors) => (StatusCode::UNPROCESSABLE_ENTITY, json!(errors)),
            ApiError::Prediction(e) => {
                tracing::error!(detail = %e, "Prediction request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!("Prediction service error"),
                )
            }
        };

        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::ModelError;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ApiError::Unauthorized, StatusCode::UNAUTHORIZED),
            (ApiError::AuthUnavailable("down".into()), StatusCode::SERVICE_UNAVAILABLE),
            (ApiError::Validation(vec!["age".into()]), StatusCode::UNPROCESSABLE_ENTITY),
            (
                ApiError::Prediction(PredictionError::Inference(ModelError::Inference("x".into()))),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }
}
