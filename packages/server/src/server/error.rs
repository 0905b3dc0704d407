//! JSON error responses for the HTTP API.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{error, warn};

use crate::domains::auth::AuthFlowError;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Authentication required")
    }

    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    }
}

impl From<AuthFlowError> for ApiError {
    fn from(err: AuthFlowError) -> Self {
        match err {
            AuthFlowError::Validation(_)
            | AuthFlowError::SessionNotFound
            | AuthFlowError::SessionExpired
            | AuthFlowError::AttemptsExhausted
            | AuthFlowError::InvalidCode { .. } => ApiError::bad_request(err.to_string()),
            AuthFlowError::Gateway(ref reason) => {
                warn!(error = %reason, "OTP gateway failure");
                ApiError::new(StatusCode::BAD_GATEWAY, err.to_string())
            }
            AuthFlowError::Configuration(ref reason) => {
                error!(error = %reason, "OTP gateway is misconfigured");
                ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
            AuthFlowError::InvalidToken | AuthFlowError::UserNotFound => {
                ApiError::new(StatusCode::UNAUTHORIZED, err.to_string())
            }
            AuthFlowError::Internal(e) => {
                error!(error = %e, "Auth flow failed");
                ApiError::internal()
            }
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        error!(error = %err, "Request failed");
        ApiError::internal()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorBody {
                success: false,
                message: self.message,
            }),
        )
            .into_response()
    }
}
