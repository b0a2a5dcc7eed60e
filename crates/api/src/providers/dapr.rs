//! `Applications.Dapr`: building blocks backed by Dapr components.

use armrpc_core::error::CoreError;
use armrpc_core::registry::OperationTypeRegistry;

use super::{crud, crud_bindings, discovery_binding, Descriptor};

pub const NAMESPACE: &str = "Applications.Dapr";

pub const PUB_SUB_BROKERS: &str = "Applications.Dapr/pubSubBrokers";
pub const SECRET_STORES: &str = "Applications.Dapr/secretStores";
pub const STATE_STORES: &str = "Applications.Dapr/stateStores";

pub fn declare(registry: &mut OperationTypeRegistry) -> Result<(), CoreError> {
    for resource_type in [PUB_SUB_BROKERS, SECRET_STORES, STATE_STORES] {
        registry.declare(resource_type, crud())?;
    }
    Ok(())
}

pub fn resource_types() -> Vec<Descriptor> {
    vec![
        crud_bindings(PUB_SUB_BROKERS),
        crud_bindings(SECRET_STORES),
        crud_bindings(STATE_STORES),
        discovery_binding(NAMESPACE),
    ]
}
