//! Startup assembly of the dispatcher.
//!
//! Runs once before the listener is bound: declare, build, validate,
//! construct. Any error here is fatal to the process.

use std::sync::Arc;

use armrpc_core::builder::RouteTableBuilder;
use armrpc_core::error::CoreError;
use armrpc_core::registry::OperationTypeRegistry;
use armrpc_core::route::RouteSpec;
use armrpc_core::scope::{RootScope, ScopeConvention};
use armrpc_core::validator::validate;
use armrpc_store::StorageProvider;

use crate::config::ServerConfig;
use crate::controller::{ControllerFactory, ControllerOptions};
use crate::controllers::operations;
use crate::dispatcher::Dispatcher;
use crate::providers::{self, Descriptor};

/// Build the dispatcher for the built-in providers.
pub fn build_dispatcher(
    config: &ServerConfig,
    storage: Arc<dyn StorageProvider>,
) -> Result<Dispatcher, CoreError> {
    let mut registry = OperationTypeRegistry::new();
    providers::declare_all(&mut registry)?;
    build_dispatcher_with(config, storage, registry, providers::resource_types())
}

/// Build a dispatcher from an explicit registry and set of route bindings.
pub fn build_dispatcher_with(
    config: &ServerConfig,
    storage: Arc<dyn StorageProvider>,
    registry: OperationTypeRegistry,
    resource_types: Vec<Descriptor>,
) -> Result<Dispatcher, CoreError> {
    let table = RouteTableBuilder::new(
        &config.path_base,
        operations::status_factory(),
        operations::result_factory(),
    )
    .conventions(config.conventions.iter().map(|kind| ScopeConvention::from_kind(*kind)))
    .resource_types(resource_types)
    .build()?;

    for convention in table.conventions() {
        let routes = table
            .specs()
            .filter(|spec| spec.convention == convention.kind())
            .count();
        tracing::info!(convention = %convention, routes, "Built route table");
    }

    validate(&registry, &table)?;
    let exempt: Vec<String> = table.exemptions().iter().map(ToString::to_string).collect();
    tracing::info!(
        operation_types = registry.operation_types().count(),
        exempt = ?exempt,
        "Operation types validated"
    );

    let registry = Arc::new(registry);
    let options = |spec: &RouteSpec| ControllerOptions {
        path_base: config.path_base.clone(),
        convention: spec.convention,
        location: config.location.clone(),
        storage: Arc::clone(&storage),
        registry: Arc::clone(&registry),
    };

    let table = table.try_map(|spec, factory: ControllerFactory| {
        factory(&options(spec)).map_err(|err| CoreError::ControllerConstruction {
            operation: spec.operation_type.to_string(),
            message: err.to_string(),
        })
    })?;

    Ok(Dispatcher::new(table, registry))
}
