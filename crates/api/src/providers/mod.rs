//! Provider manifests.
//!
//! Each provider module does two separate things: it declares the operation
//! set of every resource type into the registry, and it binds controller
//! factories to routes. Startup validation compares the two.

pub mod dapr;
pub mod datastores;

use armrpc_core::builder::{HandlerBinding, ResourceTypeDescriptor};
use armrpc_core::error::CoreError;
use armrpc_core::operation::OperationMethod;
use armrpc_core::registry::OperationTypeRegistry;
use armrpc_core::route::{RouteFlags, RouteShape};

use crate::controller::ControllerFactory;
use crate::controllers::discovery;
use crate::controllers::resource::{self, ResourceOperation};

pub type Descriptor = ResourceTypeDescriptor<ControllerFactory>;

/// `List, Get, Put, Patch, Delete`.
pub fn crud() -> Vec<OperationMethod> {
    vec![
        OperationMethod::List,
        OperationMethod::Get,
        OperationMethod::Put,
        OperationMethod::Patch,
        OperationMethod::Delete,
    ]
}

pub fn list_secrets() -> OperationMethod {
    OperationMethod::Custom("LISTSECRETS".into())
}

/// Bind the storage-backed resource controller for every CRUD method.
pub fn crud_bindings(resource_type: &str) -> Descriptor {
    crud().into_iter().fold(Descriptor::new(resource_type), |descriptor, method| {
        match ResourceOperation::from_method(&method) {
            Some(operation) => {
                let handler = resource::factory(resource_type, operation);
                descriptor.bind(method, handler)
            }
            None => descriptor,
        }
    })
}

/// The `/providers/{namespace}/operations` listing, mounted without a root
/// scope where the convention allows it.
pub fn discovery_binding(namespace: &str) -> Descriptor {
    Descriptor::new(format!("{namespace}/providers")).bind_with(
        HandlerBinding::new(OperationMethod::Get, discovery::factory(namespace))
            .with_shape(RouteShape::ProviderOperations)
            .with_flags(RouteFlags::DISCOVERY),
    )
}

/// Declare every built-in provider's operation sets.
pub fn declare_all(registry: &mut OperationTypeRegistry) -> Result<(), CoreError> {
    dapr::declare(registry)?;
    datastores::declare(registry)?;
    Ok(())
}

/// Route bindings of every built-in provider.
pub fn resource_types() -> Vec<Descriptor> {
    let mut descriptors = dapr::resource_types();
    descriptors.extend(datastores::resource_types());
    descriptors
}
