use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::Request;
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use serde_json::{json, Value};

use armrpc_store::StorageProvider;

use super::json_response;
use crate::controller::{self, Controller, ControllerFactory, RequestContext};
use crate::error::AppResult;

/// POST `.../{resourceName}/listsecrets`: the secrets stored with a resource.
pub struct ListSecretsController {
    resource_type: String,
    storage: Arc<dyn StorageProvider>,
}

#[async_trait]
impl Controller for ListSecretsController {
    async fn run(&self, ctx: RequestContext, _request: Request) -> AppResult<Response> {
        let client = self.storage.storage_client(&self.resource_type).await?;
        let object = client.get(&ctx.resource_id).await?;

        let secrets = object
            .data
            .pointer("/properties/secrets")
            .cloned()
            .filter(Value::is_object)
            .unwrap_or_else(|| json!({}));
        tracing::info!(resource_id = %ctx.resource_id, "Listed secrets");
        Ok(json_response(StatusCode::OK, HeaderMap::new(), &secrets))
    }
}

pub fn factory(resource_type: &str) -> ControllerFactory {
    let resource_type = resource_type.to_string();
    controller::factory(move |options| {
        Ok(Arc::new(ListSecretsController {
            resource_type: resource_type.clone(),
            storage: Arc::clone(&options.storage),
        }))
    })
}
