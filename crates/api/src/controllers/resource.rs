//! Storage-backed CRUD controller for tracked resources.
//!
//! Mutations complete synchronously against storage, but each one is still
//! recorded as an operation so clients can follow the `Azure-AsyncOperation`
//! and `Location` headers like they would for any long-running request.

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::Request;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::Response;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use armrpc_core::async_operation::{ErrorDetail, OperationStatus, ProvisioningState};
use armrpc_core::operation::OperationMethod;
use armrpc_core::operation_id::OperationId;
use armrpc_store::{Object, Query, StorageClient, StorageProvider, StoreError};

use super::operations::save_status;
use super::{empty_response, header_value, json_response, read_json, PollingLinks};
use crate::controller::{self, Controller, ControllerFactory, RequestContext};
use crate::error::{AppError, AppResult};

const PROVISIONING_STATE: &str = "provisioningState";
const SECRETS: &str = "secrets";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceOperation {
    List,
    Get,
    Put,
    Patch,
    Delete,
}

impl ResourceOperation {
    /// The CRUD operation for a standard method; `None` for custom actions.
    pub fn from_method(method: &OperationMethod) -> Option<Self> {
        match method {
            OperationMethod::List => Some(Self::List),
            OperationMethod::Get => Some(Self::Get),
            OperationMethod::Put => Some(Self::Put),
            OperationMethod::Patch => Some(Self::Patch),
            OperationMethod::Delete => Some(Self::Delete),
            OperationMethod::Custom(_) => None,
        }
    }
}

/// Request body accepted by PUT and PATCH.
#[derive(Debug, Default, Deserialize)]
struct ResourceInput {
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    tags: Map<String, Value>,
    #[serde(default)]
    properties: Map<String, Value>,
}

/// Stored representation of a tracked resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ResourceDocument {
    id: String,
    name: String,
    #[serde(rename = "type")]
    resource_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    location: Option<String>,
    #[serde(default)]
    tags: Map<String, Value>,
    #[serde(default)]
    properties: Map<String, Value>,
}

/// Strip secret material before a resource leaves the service.
fn redact(mut data: Value) -> Value {
    if let Some(properties) = data.get_mut("properties").and_then(Value::as_object_mut) {
        properties.remove(SECRETS);
    }
    data
}

fn merge(target: &mut Map<String, Value>, patch: Map<String, Value>) {
    for (key, value) in patch {
        if value.is_null() {
            target.remove(&key);
        } else {
            target.insert(key, value);
        }
    }
}

fn if_match(request: &Request) -> Option<String> {
    request
        .headers()
        .get(header::IF_MATCH)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim_matches('"').to_string())
}

fn etag_header(headers: &mut HeaderMap, etag: &str) -> AppResult<()> {
    headers.insert(header::ETAG, header_value(&format!("\"{etag}\""))?);
    Ok(())
}

fn error_detail(err: &StoreError) -> ErrorDetail {
    let code = match err {
        StoreError::NotFound(_) => "NotFound",
        StoreError::PreconditionFailed { .. } => "PreconditionFailed",
        StoreError::InvalidKey(_) => "BadRequest",
        StoreError::Internal(_) => "Internal",
    };
    ErrorDetail {
        code: code.to_string(),
        message: err.to_string(),
    }
}

pub struct ResourceController {
    operation: ResourceOperation,
    resource_type: String,
    storage: Arc<dyn StorageProvider>,
    links: PollingLinks,
}

pub fn factory(resource_type: &str, operation: ResourceOperation) -> ControllerFactory {
    let resource_type = resource_type.to_string();
    controller::factory(move |options| {
        Ok(Arc::new(ResourceController {
            operation,
            resource_type: resource_type.clone(),
            storage: Arc::clone(&options.storage),
            links: PollingLinks::new(options),
        }))
    })
}

#[async_trait]
impl Controller for ResourceController {
    async fn run(&self, ctx: RequestContext, request: Request) -> AppResult<Response> {
        let client = self.storage.storage_client(&self.resource_type).await?;
        let client = client.as_ref();
        match self.operation {
            ResourceOperation::List => self.list(client, &ctx).await,
            ResourceOperation::Get => self.get(client, &ctx).await,
            ResourceOperation::Put => self.put(client, &ctx, request).await,
            ResourceOperation::Patch => self.patch(client, &ctx, request).await,
            ResourceOperation::Delete => self.delete(client, &ctx).await,
        }
    }
}

impl ResourceController {
    async fn list(&self, client: &dyn StorageClient, ctx: &RequestContext) -> AppResult<Response> {
        let objects = client
            .query(&Query {
                scope: ctx.scope.id(),
                resource_type: self.resource_type.clone(),
            })
            .await?;
        let value: Vec<Value> = objects.into_iter().map(|o| redact(o.data)).collect();
        Ok(json_response(StatusCode::OK, HeaderMap::new(), &json!({ "value": value })))
    }

    async fn get(&self, client: &dyn StorageClient, ctx: &RequestContext) -> AppResult<Response> {
        let object = client.get(&ctx.resource_id).await?;
        let mut headers = HeaderMap::new();
        etag_header(&mut headers, &object.etag)?;
        Ok(json_response(StatusCode::OK, headers, &redact(object.data)))
    }

    async fn put(
        &self,
        client: &dyn StorageClient,
        ctx: &RequestContext,
        request: Request,
    ) -> AppResult<Response> {
        let name = ctx
            .resource_name()
            .ok_or_else(|| AppError::InternalError("PUT route without a resource name".into()))?
            .to_string();
        let if_match = if_match(&request);
        let input: ResourceInput = read_json(request).await?;

        let created = match client.get(&ctx.resource_id).await {
            Ok(_) => false,
            Err(StoreError::NotFound(_)) => true,
            Err(err) => return Err(err.into()),
        };

        let mut properties = input.properties;
        properties.insert(PROVISIONING_STATE.into(), json!(ProvisioningState::Succeeded));
        let document = ResourceDocument {
            id: ctx.resource_id.clone(),
            name,
            resource_type: self.resource_type.clone(),
            location: input.location,
            tags: input.tags,
            properties,
        };

        let status = if created {
            StatusCode::CREATED
        } else {
            StatusCode::OK
        };
        self.save(client, ctx, document, if_match.as_deref(), status).await
    }

    async fn patch(
        &self,
        client: &dyn StorageClient,
        ctx: &RequestContext,
        request: Request,
    ) -> AppResult<Response> {
        let if_match = if_match(&request);
        let input: ResourceInput = read_json(request).await?;

        let existing = client.get(&ctx.resource_id).await?;
        let mut document: ResourceDocument = serde_json::from_value(existing.data)
            .map_err(|e| AppError::InternalError(format!("Corrupt resource {}: {e}", ctx.resource_id)))?;

        merge(&mut document.tags, input.tags);
        let mut properties = input.properties;
        properties.remove(PROVISIONING_STATE);
        merge(&mut document.properties, properties);
        document.properties.insert(PROVISIONING_STATE.into(), json!(ProvisioningState::Succeeded));

        let expected = if_match.unwrap_or(existing.etag);
        self.save(client, ctx, document, Some(&expected), StatusCode::OK).await
    }

    async fn delete(&self, client: &dyn StorageClient, ctx: &RequestContext) -> AppResult<Response> {
        match client.get(&ctx.resource_id).await {
            Ok(_) => {}
            Err(StoreError::NotFound(_)) => {
                return Ok(empty_response(StatusCode::NO_CONTENT, HeaderMap::new()));
            }
            Err(err) => return Err(err.into()),
        }

        let (operation_id, status) = self.begin(ctx, ProvisioningState::Deleting).await?;
        let outcome = client.delete(&ctx.resource_id).await;
        self.finish(ctx, status, outcome).await?;

        let headers = self.links.headers(&ctx.scope, ctx.operation_type.namespace(), &operation_id)?;
        Ok(empty_response(StatusCode::OK, headers))
    }

    async fn save(
        &self,
        client: &dyn StorageClient,
        ctx: &RequestContext,
        document: ResourceDocument,
        if_match: Option<&str>,
        status_code: StatusCode,
    ) -> AppResult<Response> {
        let data = serde_json::to_value(&document)
            .map_err(|e| AppError::InternalError(format!("Failed to encode resource: {e}")))?;

        let (operation_id, status) = self.begin(ctx, ProvisioningState::Updating).await?;
        let outcome = client
            .save(Object::new(&ctx.resource_id, &self.resource_type, data), if_match)
            .await;
        let saved = self.finish(ctx, status, outcome).await?;

        let mut headers = self.links.headers(&ctx.scope, ctx.operation_type.namespace(), &operation_id)?;
        etag_header(&mut headers, &saved.etag)?;
        tracing::info!(resource_id = %ctx.resource_id, operation_id = %operation_id, "Saved resource");
        Ok(json_response(status_code, headers, &redact(saved.data)))
    }

    /// Record a new operation against the request's resource.
    async fn begin(
        &self,
        ctx: &RequestContext,
        state: ProvisioningState,
    ) -> AppResult<(OperationId, OperationStatus)> {
        let operation_id = OperationId::new();
        let namespace = ctx.operation_type.namespace();
        let mut status = OperationStatus::accepted(
            self.links.status_url(&ctx.scope, namespace, &operation_id),
            operation_id,
            ctx.resource_id.clone(),
        );
        status.transition(state);
        save_status(self.storage.as_ref(), namespace, &status).await?;
        Ok((operation_id, status))
    }

    /// Settle the operation from the storage outcome.
    async fn finish<T>(
        &self,
        ctx: &RequestContext,
        mut status: OperationStatus,
        outcome: Result<T, StoreError>,
    ) -> AppResult<T> {
        let namespace = ctx.operation_type.namespace();
        match outcome {
            Ok(value) => {
                status.transition(ProvisioningState::Succeeded);
                save_status(self.storage.as_ref(), namespace, &status).await?;
                Ok(value)
            }
            Err(err) => {
                status.fail(error_detail(&err));
                save_status(self.storage.as_ref(), namespace, &status).await?;
                Err(err.into())
            }
        }
    }
}
