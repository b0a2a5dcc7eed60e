//! The capability the dispatcher invokes for a matched route.
//!
//! A route is bound to a [`ControllerFactory`] when its provider manifest is
//! written. The factory runs once at startup with the [`ControllerOptions`]
//! for the route's convention and yields the [`Controller`] that serves every
//! request matched to that route.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{Query, Request};
use axum::http::Uri;
use axum::response::Response;

use armrpc_core::builder::RESOURCE_NAME_PARAM;
use armrpc_core::dispatch::RouteMatch;
use armrpc_core::operation::OperationType;
use armrpc_core::operation_id::OperationId;
use armrpc_core::registry::OperationTypeRegistry;
use armrpc_core::route::RouteShape;
use armrpc_core::scope::{ConventionKind, ResolvedScope};
use armrpc_store::StorageProvider;

use crate::error::AppResult;

/// Serves requests for one route.
#[async_trait]
pub trait Controller: Send + Sync {
    async fn run(&self, ctx: RequestContext, request: Request) -> AppResult<Response>;
}

/// Builds a controller for a route at startup.
pub type ControllerFactory =
    Arc<dyn Fn(&ControllerOptions) -> AppResult<Arc<dyn Controller>> + Send + Sync>;

/// Wrap a closure as a [`ControllerFactory`].
pub fn factory<F>(f: F) -> ControllerFactory
where
    F: Fn(&ControllerOptions) -> AppResult<Arc<dyn Controller>> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Everything a controller may need at construction time.
#[derive(Clone)]
pub struct ControllerOptions {
    pub path_base: String,
    /// Convention the route being constructed is mounted under.
    pub convention: ConventionKind,
    /// Location segment for polling URLs.
    pub location: String,
    pub storage: Arc<dyn StorageProvider>,
    pub registry: Arc<OperationTypeRegistry>,
}

impl ControllerOptions {
    pub fn is_subscription_convention(&self) -> bool {
        self.convention == ConventionKind::Subscription
    }
}

/// Per-request data handed to a controller by the dispatcher.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub operation_type: OperationType,
    /// Path below the path base, original case. Action routes drop the
    /// trailing action segment so this is always the target resource.
    pub resource_id: String,
    pub scope: ResolvedScope,
    pub params: Vec<(String, String)>,
    /// Parsed identifier on the polling routes.
    pub operation_id: Option<OperationId>,
    /// `api-version` query value, if the caller sent one.
    pub api_version: Option<String>,
}

impl RequestContext {
    pub fn from_match<H>(matched: &RouteMatch<'_, H>, uri: &Uri) -> Self {
        let spec = &matched.route.spec;
        let resource_id = match &spec.shape {
            RouteShape::Action(_) => matched
                .resource_path
                .rsplit_once('/')
                .map(|(resource, _)| resource.to_string())
                .unwrap_or_else(|| matched.resource_path.clone()),
            _ => matched.resource_path.clone(),
        };

        Self {
            operation_type: spec.operation_type.clone(),
            resource_id,
            scope: matched.scope.clone(),
            params: matched.params.clone(),
            operation_id: matched.operation_id,
            api_version: api_version(uri),
        }
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn resource_name(&self) -> Option<&str> {
        self.param(RESOURCE_NAME_PARAM)
    }
}

fn api_version(uri: &Uri) -> Option<String> {
    Query::<HashMap<String, String>>::try_from_uri(uri)
        .ok()
        .and_then(|Query(mut query)| query.remove("api-version"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_version_is_read_from_query() {
        let uri: Uri = "/planes/radius/local/providers/applications.dapr/statestores?api-version=2023-10-01-preview&x=1"
            .parse()
            .unwrap();
        assert_eq!(api_version(&uri).as_deref(), Some("2023-10-01-preview"));

        let uri: Uri = "/planes/radius/local".parse().unwrap();
        assert_eq!(api_version(&uri), None);
    }
}
