//! Route and operation model for a resource-provider front end.
//!
//! Pure logic with no HTTP framework dependency: operation types and their
//! registry, root-scope conventions, route-table construction, request
//! matching and startup validation.

pub mod async_operation;
pub mod builder;
pub mod dispatch;
pub mod error;
pub mod operation;
pub mod operation_id;
pub mod registry;
pub mod route;
pub mod scope;
pub mod types;
pub mod validator;
