use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use crate::flow::lifecycle::LifecycleError;
use crate::flow::navigation::NavigationError;
use crate::gateway::{AuthError, GatewayError};
use crate::input::validate::ValidationError;

const BACKEND_FAILURE_MESSAGE: &str = "could not save your data, please try again";
const STALE_RECORD_MESSAGE: &str = "your data changed on another device, reload and try again";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("session missing or expired")]
    Unauthorized,

    #[error("confirmation required: {0}")]
    ConfirmationRequired(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Navigation(#[from] NavigationError),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
            AppError::ConfirmationRequired(msg) => (StatusCode::PRECONDITION_REQUIRED, msg.clone()),
            AppError::Validation(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            AppError::Auth(err) => auth_status(err),
            AppError::Gateway(GatewayError::BlobNotFound(key)) => {
                (StatusCode::NOT_FOUND, format!("no file stored at {key}"))
            }
            AppError::Gateway(GatewayError::VersionConflict { .. }) => {
                (StatusCode::CONFLICT, STALE_RECORD_MESSAGE.to_string())
            }
            AppError::Gateway(err) => {
                tracing::error!(error = %err, "backend call failed");
                (StatusCode::BAD_GATEWAY, BACKEND_FAILURE_MESSAGE.to_string())
            }
            AppError::Navigation(err) => (StatusCode::CONFLICT, err.to_string()),
            AppError::Lifecycle(err @ LifecycleError::InvalidAction { .. }) => {
                (StatusCode::CONFLICT, err.to_string())
            }
            AppError::Lifecycle(err) => (StatusCode::UNPROCESSABLE_ENTITY, err.to_string()),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

fn auth_status(err: &AuthError) -> (StatusCode, String) {
    match err {
        AuthError::EmailAlreadyInUse => (
            StatusCode::CONFLICT,
            "this e-mail is already registered".to_string(),
        ),
        AuthError::InvalidEmail => (StatusCode::BAD_REQUEST, "invalid e-mail".to_string()),
        AuthError::InvalidCredential => (
            StatusCode::UNAUTHORIZED,
            "incorrect e-mail or password".to_string(),
        ),
        AuthError::Other { code, message } => {
            tracing::warn!(code = %code, "unmapped authentication error");
            (
                StatusCode::BAD_GATEWAY,
                format!("could not complete the request: {message}"),
            )
        }
    }
}
