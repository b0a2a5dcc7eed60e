//! Built-in controllers and the helpers they share.

pub mod discovery;
pub mod operations;
pub mod resource;
pub mod secrets;

use axum::body::Body;
use axum::extract::Request;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::de::DeserializeOwned;

use armrpc_core::builder::{OPERATION_RESULTS_TYPE, OPERATION_STATUSES_TYPE};
use armrpc_core::operation_id::OperationId;
use armrpc_core::scope::ResolvedScope;

use crate::controller::ControllerOptions;
use crate::error::{AppError, AppResult};

/// Largest request body a controller will buffer.
const MAX_BODY_BYTES: usize = 4 * 1024 * 1024;

pub const AZURE_ASYNC_OPERATION: HeaderName = HeaderName::from_static("azure-asyncoperation");

/// Seconds a client should wait before polling an operation again.
pub const RETRY_AFTER_SECS: u64 = 5;

/// Buffer the request body and parse it as JSON. An empty body parses as
/// `{}` for types that accept it.
pub(crate) async fn read_json<T: DeserializeOwned>(request: Request) -> AppResult<T> {
    let bytes = axum::body::to_bytes(request.into_body(), MAX_BODY_BYTES)
        .await
        .map_err(|e| AppError::BadRequest(format!("Failed to read request body: {e}")))?;
    let bytes: &[u8] = if bytes.iter().all(u8::is_ascii_whitespace) {
        b"{}"
    } else {
        &bytes
    };
    serde_json::from_slice(bytes)
        .map_err(|e| AppError::BadRequest(format!("Invalid request body: {e}")))
}

pub(crate) fn json_response(
    status: StatusCode,
    headers: HeaderMap,
    body: &impl serde::Serialize,
) -> Response {
    (status, headers, axum::Json(body)).into_response()
}

pub(crate) fn empty_response(status: StatusCode, headers: HeaderMap) -> Response {
    (status, headers, Body::empty()).into_response()
}

pub(crate) fn header_value(value: &str) -> AppResult<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| AppError::InternalError(format!("Invalid header value '{value}': {e}")))
}

/// Builds the polling URLs returned by mutating controllers.
#[derive(Debug, Clone)]
pub(crate) struct PollingLinks {
    path_base: String,
    location: String,
}

impl PollingLinks {
    pub(crate) fn new(options: &ControllerOptions) -> Self {
        Self {
            path_base: options.path_base.clone(),
            location: options.location.clone(),
        }
    }

    fn url(&self, scope: &ResolvedScope, namespace: &str, kind: &str, id: &OperationId) -> String {
        format!(
            "{}{}/providers/{}/locations/{}/{}/{id}",
            self.path_base,
            scope.root,
            namespace.to_ascii_lowercase(),
            self.location,
            kind.to_ascii_lowercase(),
        )
    }

    pub(crate) fn status_url(&self, scope: &ResolvedScope, namespace: &str, id: &OperationId) -> String {
        self.url(scope, namespace, OPERATION_STATUSES_TYPE, id)
    }

    pub(crate) fn result_url(&self, scope: &ResolvedScope, namespace: &str, id: &OperationId) -> String {
        self.url(scope, namespace, OPERATION_RESULTS_TYPE, id)
    }

    /// `Azure-AsyncOperation` and `Location` headers for an operation.
    pub(crate) fn headers(
        &self,
        scope: &ResolvedScope,
        namespace: &str,
        id: &OperationId,
    ) -> AppResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AZURE_ASYNC_OPERATION,
            header_value(&self.status_url(scope, namespace, id))?,
        );
        headers.insert(
            header::LOCATION,
            header_value(&self.result_url(scope, namespace, id))?,
        );
        Ok(headers)
    }
}
