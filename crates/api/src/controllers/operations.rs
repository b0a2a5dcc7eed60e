//! Polling controllers for long-running operations, plus the status store
//! the mutating controllers write to.

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::Request;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::Response;

use armrpc_core::async_operation::{status_key, OperationStatus, ProvisioningState};
use armrpc_core::builder::OPERATION_STATUSES_TYPE;
use armrpc_core::operation_id::OperationId;
use armrpc_store::{Object, StorageProvider, StoreError};

use super::{empty_response, header_value, json_response, RETRY_AFTER_SECS};
use crate::controller::{self, Controller, ControllerFactory, RequestContext};
use crate::error::{AppError, AppResult};

fn statuses_type(namespace: &str) -> String {
    format!("{namespace}/{OPERATION_STATUSES_TYPE}")
}

pub(crate) async fn save_status(
    storage: &dyn StorageProvider,
    namespace: &str,
    status: &OperationStatus,
) -> AppResult<()> {
    let resource_type = statuses_type(namespace);
    let client = storage.storage_client(&resource_type).await?;
    let data = serde_json::to_value(status)
        .map_err(|e| AppError::InternalError(format!("Failed to encode operation status: {e}")))?;
    client
        .save(
            Object::new(status_key(namespace, &status.name), resource_type, data),
            None,
        )
        .await?;
    tracing::debug!(operation_id = %status.name, status = ?status.status, "Recorded operation status");
    Ok(())
}

pub(crate) async fn load_status(
    storage: &dyn StorageProvider,
    namespace: &str,
    id: &OperationId,
) -> AppResult<OperationStatus> {
    let client = storage.storage_client(&statuses_type(namespace)).await?;
    let object = client.get(&status_key(namespace, id)).await.map_err(|err| match err {
        StoreError::NotFound(_) => StoreError::NotFound(format!("operation {id}")),
        other => other,
    })?;
    serde_json::from_value(object.data)
        .map_err(|e| AppError::InternalError(format!("Corrupt operation status {id}: {e}")))
}

fn required_operation_id(ctx: &RequestContext) -> AppResult<OperationId> {
    ctx.operation_id.ok_or_else(|| {
        AppError::InternalError(format!("{} was dispatched without an operation id", ctx.operation_type))
    })
}

// ---------------------------------------------------------------------------
// Controllers
// ---------------------------------------------------------------------------

/// GET `.../operationstatuses/{operationId}`: the stored record.
pub struct OperationStatusController {
    storage: Arc<dyn StorageProvider>,
}

#[async_trait]
impl Controller for OperationStatusController {
    async fn run(&self, ctx: RequestContext, _request: Request) -> AppResult<Response> {
        let id = required_operation_id(&ctx)?;
        let status = load_status(self.storage.as_ref(), ctx.operation_type.namespace(), &id).await?;
        Ok(json_response(StatusCode::OK, HeaderMap::new(), &status))
    }
}

/// GET `.../operationresults/{operationId}`: 202 while running, 204 once
/// succeeded, the record itself once failed or canceled.
pub struct OperationResultController {
    storage: Arc<dyn StorageProvider>,
}

#[async_trait]
impl Controller for OperationResultController {
    async fn run(&self, ctx: RequestContext, request: Request) -> AppResult<Response> {
        let id = required_operation_id(&ctx)?;
        let status = load_status(self.storage.as_ref(), ctx.operation_type.namespace(), &id).await?;

        match status.status {
            state if !state.is_terminal() => {
                let mut headers = HeaderMap::new();
                headers.insert(header::LOCATION, header_value(request.uri().path())?);
                headers.insert(header::RETRY_AFTER, header_value(&RETRY_AFTER_SECS.to_string())?);
                Ok(empty_response(StatusCode::ACCEPTED, headers))
            }
            ProvisioningState::Succeeded => Ok(empty_response(StatusCode::NO_CONTENT, HeaderMap::new())),
            _ => Ok(json_response(StatusCode::OK, HeaderMap::new(), &status)),
        }
    }
}

pub fn status_factory() -> ControllerFactory {
    controller::factory(|options| {
        Ok(Arc::new(OperationStatusController {
            storage: Arc::clone(&options.storage),
        }))
    })
}

pub fn result_factory() -> ControllerFactory {
    controller::factory(|options| {
        Ok(Arc::new(OperationResultController {
            storage: Arc::clone(&options.storage),
        }))
    })
}
