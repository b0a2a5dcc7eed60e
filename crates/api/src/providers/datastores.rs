//! `Applications.Datastores`: portable databases and caches.

use armrpc_core::error::CoreError;
use armrpc_core::registry::OperationTypeRegistry;

use super::{crud, crud_bindings, discovery_binding, list_secrets, Descriptor};
use crate::controllers::secrets;

pub const NAMESPACE: &str = "Applications.Datastores";

pub const MONGO_DATABASES: &str = "Applications.Datastores/mongoDatabases";
pub const REDIS_CACHES: &str = "Applications.Datastores/redisCaches";
pub const SQL_DATABASES: &str = "Applications.Datastores/sqlDatabases";

pub fn declare(registry: &mut OperationTypeRegistry) -> Result<(), CoreError> {
    for resource_type in [MONGO_DATABASES, REDIS_CACHES] {
        let mut operations = crud();
        operations.push(list_secrets());
        registry.declare(resource_type, operations)?;
    }
    registry.declare(SQL_DATABASES, crud())?;
    Ok(())
}

pub fn resource_types() -> Vec<Descriptor> {
    vec![
        crud_bindings(MONGO_DATABASES).bind(list_secrets(), secrets::factory(MONGO_DATABASES)),
        crud_bindings(REDIS_CACHES).bind(list_secrets(), secrets::factory(REDIS_CACHES)),
        crud_bindings(SQL_DATABASES),
        discovery_binding(NAMESPACE),
    ]
}
