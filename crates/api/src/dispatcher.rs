//! Hands each request to exactly one controller.
//!
//! The dispatcher is mounted as the router's fallback, so every request that
//! is not a fixed service route (health) lands here. Matching is delegated to
//! the route table; rejections are rendered as [`AppError`] responses before
//! any controller runs.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::response::{IntoResponse, Response};

use armrpc_core::builder::RouteTable;
use armrpc_core::error::CoreError;
use armrpc_core::registry::OperationTypeRegistry;
use armrpc_core::route::RouteSpec;

use crate::controller::{Controller, RequestContext};
use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Route table whose handlers are constructed controllers.
pub type ControllerTable = RouteTable<Arc<dyn Controller>>;

pub struct Dispatcher {
    table: ControllerTable,
    registry: Arc<OperationTypeRegistry>,
}

impl Dispatcher {
    pub fn new(table: ControllerTable, registry: Arc<OperationTypeRegistry>) -> Self {
        Self { table, registry }
    }

    pub fn table(&self) -> &ControllerTable {
        &self.table
    }

    pub fn registry(&self) -> &OperationTypeRegistry {
        &self.registry
    }

    /// The route `method path` would dispatch to, without running it.
    pub fn route_for(&self, method: &str, path: &str) -> Result<&RouteSpec, CoreError> {
        self.table.resolve(method, path).map(|matched| {
            let route = matched.route;
            &route.spec
        })
    }

    pub async fn dispatch(&self, request: Request) -> Response {
        match self.try_dispatch(request).await {
            Ok(response) => response,
            Err(err) => err.into_response(),
        }
    }

    async fn try_dispatch(&self, request: Request) -> AppResult<Response> {
        let (controller, ctx) = {
            let method = request.method().as_str();
            let path = request.uri().path();
            let matched = self.table.resolve(method, path).map_err(|err| {
                tracing::debug!(%method, %path, error = %err, "Request rejected by dispatcher");
                AppError::from(err)
            })?;

            let ctx = RequestContext::from_match(&matched, request.uri());
            tracing::debug!(
                operation = %ctx.operation_type,
                template = %matched.route.spec.template,
                "Dispatching request"
            );
            (Arc::clone(matched.handler()), ctx)
        };

        controller.run(ctx, request).await
    }
}

/// Router fallback: dispatch through the route table.
pub async fn dispatch(State(state): State<AppState>, request: Request) -> Response {
    state.dispatcher.dispatch(request).await
}
