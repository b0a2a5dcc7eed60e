//! Provider operation discovery: `GET /providers/{namespace}/operations`.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::Request;
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use serde::Serialize;
use serde_json::json;

use armrpc_core::operation::{OperationMethod, OperationType};
use armrpc_core::registry::OperationTypeRegistry;

use super::json_response;
use crate::controller::{self, Controller, ControllerFactory, RequestContext};
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationDisplay {
    pub provider: String,
    pub resource: String,
    pub operation: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationEntry {
    pub name: String,
    pub display: OperationDisplay,
    pub is_data_action: bool,
}

impl OperationEntry {
    fn for_operation(operation: &OperationType) -> Self {
        let namespace = operation.namespace();
        let type_name = operation.type_name();
        let (suffix, verb) = match &operation.method {
            OperationMethod::Custom(token) => {
                (format!("{}/action", token.to_ascii_lowercase()), token.clone())
            }
            method => (method.access().to_string(), capitalize(method.access())),
        };

        Self {
            name: format!("{namespace}/{type_name}/{suffix}"),
            display: OperationDisplay {
                provider: namespace.to_string(),
                resource: type_name.to_string(),
                operation: format!("{verb} {type_name}"),
                description: format!("{verb} {namespace} {type_name}."),
            },
            is_data_action: false,
        }
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

/// Lists the operations a provider namespace declares.
#[derive(Debug)]
pub struct DiscoveryController {
    operations: Vec<OperationEntry>,
}

impl DiscoveryController {
    /// Collect one entry per distinct operation name in `namespace`.
    ///
    /// Fails when the registry declares nothing for the namespace.
    pub fn new(namespace: &str, registry: &OperationTypeRegistry) -> AppResult<Self> {
        let entries: BTreeMap<String, OperationEntry> = registry
            .operation_types()
            .filter(|op| op.namespace().eq_ignore_ascii_case(namespace))
            .map(|op| OperationEntry::for_operation(&op))
            .map(|entry| (entry.name.to_ascii_lowercase(), entry))
            .collect();

        if entries.is_empty() {
            return Err(AppError::InternalError(format!(
                "No operations are declared for provider {namespace}"
            )));
        }

        Ok(Self {
            operations: entries.into_values().collect(),
        })
    }

    pub fn operations(&self) -> &[OperationEntry] {
        &self.operations
    }
}

#[async_trait]
impl Controller for DiscoveryController {
    async fn run(&self, _ctx: RequestContext, _request: Request) -> AppResult<Response> {
        Ok(json_response(
            StatusCode::OK,
            HeaderMap::new(),
            &json!({ "value": self.operations }),
        ))
    }
}

pub fn factory(namespace: &str) -> ControllerFactory {
    let namespace = namespace.to_string();
    controller::factory(move |options| {
        Ok(Arc::new(DiscoveryController::new(&namespace, &options.registry)?))
    })
}
