use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::json;

use armrpc_core::error::CoreError;
use armrpc_core::route::HttpVerb;
use armrpc_store::StoreError;

/// Application-level error type for dispatch and controllers.
///
/// Wraps [`CoreError`] and [`StoreError`] and adds HTTP-specific variants.
/// Renders the resource-manager error envelope
/// `{"error": {"code": ..., "message": ...}}`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

pub type AppResult<T> = Result<T, AppError>;

const INTERNAL_MESSAGE: &str = "An internal error occurred";

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut allow: Option<String> = None;

        let (status, code, message) = match &self {
            // --- Dispatch-level errors ---
            AppError::Core(core) => match core {
                CoreError::NotFound { method, path } => (
                    StatusCode::NOT_FOUND,
                    "NotFound",
                    format!("The request '{method} {path}' is invalid."),
                ),
                CoreError::MethodNotAllowed {
                    method,
                    path,
                    allowed,
                } => {
                    allow = Some(allow_header(allowed));
                    (
                        StatusCode::METHOD_NOT_ALLOWED,
                        "MethodNotAllowed",
                        format!("The method '{method}' is not supported for '{path}'."),
                    )
                }
                CoreError::MalformedIdentifier(_) | CoreError::InvalidScope(_) => {
                    (StatusCode::BAD_REQUEST, "BadRequest", core.to_string())
                }
                other => {
                    tracing::error!(error = %other, "Unexpected core error while serving a request");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Internal",
                        INTERNAL_MESSAGE.to_string(),
                    )
                }
            },

            // --- Storage errors ---
            AppError::Store(store) => match store {
                StoreError::NotFound(id) => (
                    StatusCode::NOT_FOUND,
                    "NotFound",
                    format!("The resource with id '{id}' was not found."),
                ),
                StoreError::PreconditionFailed { .. } => (
                    StatusCode::PRECONDITION_FAILED,
                    "PreconditionFailed",
                    store.to_string(),
                ),
                StoreError::InvalidKey(_) => {
                    (StatusCode::BAD_REQUEST, "BadRequest", store.to_string())
                }
                StoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Storage error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Internal",
                        INTERNAL_MESSAGE.to_string(),
                    )
                }
            },

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BadRequest", msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal",
                    INTERNAL_MESSAGE.to_string(),
                )
            }
        };

        let body = json!({
            "error": {
                "code": code,
                "message": message,
            }
        });

        let mut response = (status, axum::Json(body)).into_response();
        if let Some(value) = allow.and_then(|v| HeaderValue::from_str(&v).ok()) {
            response.headers_mut().insert(header::ALLOW, value);
        }
        response
    }
}

fn allow_header(allowed: &[HttpVerb]) -> String {
    allowed
        .iter()
        .map(|verb| verb.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
