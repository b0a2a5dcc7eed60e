//! Storage boundary consumed by resource controllers.
//!
//! The dispatch layer never touches storage itself; it hands a
//! [`StorageProvider`] to controller factories, and controllers look up a
//! per-resource-type [`StorageClient`] from it.

pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use memory::InMemoryStorageProvider;

/// Errors returned by storage clients.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("ETag mismatch for {id}: expected {expected}")]
    PreconditionFailed { id: String, expected: String },

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage error: {0}")]
    Internal(String),
}

/// A stored document and its metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Object {
    /// Key the object is stored under (a resource id or an operation key).
    pub id: String,
    /// Resource type the object belongs to.
    pub resource_type: String,
    /// Opaque version tag, replaced on every save.
    #[serde(default)]
    pub etag: String,
    pub data: serde_json::Value,
}

impl Object {
    pub fn new(
        id: impl Into<String>,
        resource_type: impl Into<String>,
        data: serde_json::Value,
    ) -> Self {
        Self {
            id: id.into(),
            resource_type: resource_type.into(),
            etag: String::new(),
            data,
        }
    }
}

/// Filter for [`StorageClient::query`].
#[derive(Debug, Clone)]
pub struct Query {
    /// Only objects whose id lies below this scope (e.g. a resource group).
    pub scope: String,
    /// Only objects of this resource type (case-insensitive).
    pub resource_type: String,
}

/// Per-resource-type document store.
///
/// Keys compare case-insensitively; the stored object keeps the id spelling
/// it was saved with.
#[async_trait]
pub trait StorageClient: Send + Sync {
    async fn get(&self, id: &str) -> Result<Object, StoreError>;

    /// Save `object`, returning the stored copy with its new etag.
    ///
    /// When `if_match` is set the current etag must equal it.
    async fn save(&self, object: Object, if_match: Option<&str>) -> Result<Object, StoreError>;

    /// Delete by id. Returns `NotFound` when nothing was stored.
    async fn delete(&self, id: &str) -> Result<(), StoreError>;

    async fn query(&self, query: &Query) -> Result<Vec<Object>, StoreError>;
}

/// Hands out storage clients by resource type.
#[async_trait]
pub trait StorageProvider: Send + Sync {
    async fn storage_client(&self, resource_type: &str) -> Result<Arc<dyn StorageClient>, StoreError>;
}
