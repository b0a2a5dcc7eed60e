//! In-memory storage, used by the default server configuration and by tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{Object, Query, StorageClient, StorageProvider, StoreError};

/// Storage client backed by an ordered map keyed by lower-cased id.
#[derive(Debug, Default)]
pub struct InMemoryStorageClient {
    objects: RwLock<BTreeMap<String, Object>>,
}

impl InMemoryStorageClient {
    pub fn new() -> Self {
        Self::default()
    }
}

fn key(id: &str) -> Result<String, StoreError> {
    if id.trim().is_empty() {
        return Err(StoreError::InvalidKey(id.to_string()));
    }
    Ok(id.trim_end_matches('/').to_ascii_lowercase())
}

#[async_trait]
impl StorageClient for InMemoryStorageClient {
    async fn get(&self, id: &str) -> Result<Object, StoreError> {
        let key = key(id)?;
        self.objects
            .read()
            .await
            .get(&key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn save(&self, mut object: Object, if_match: Option<&str>) -> Result<Object, StoreError> {
        let key = key(&object.id)?;
        let mut objects = self.objects.write().await;

        if let Some(expected) = if_match {
            let current = objects.get(&key).map(|o| o.etag.as_str());
            if current != Some(expected) {
                return Err(StoreError::PreconditionFailed {
                    id: object.id,
                    expected: expected.to_string(),
                });
            }
        }

        object.etag = uuid::Uuid::new_v4().to_string();
        objects.insert(key, object.clone());
        tracing::trace!(id = %object.id, etag = %object.etag, "Saved object");
        Ok(object)
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let key = key(id)?;
        match self.objects.write().await.remove(&key) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound(id.to_string())),
        }
    }

    async fn query(&self, query: &Query) -> Result<Vec<Object>, StoreError> {
        let scope = format!("{}/", key(&query.scope)?);
        Ok(self
            .objects
            .read()
            .await
            .range(scope.clone()..)
            .take_while(|(k, _)| k.starts_with(&scope))
            .filter(|(_, o)| o.resource_type.eq_ignore_ascii_case(&query.resource_type))
            .map(|(_, o)| o.clone())
            .collect())
    }
}

/// One [`InMemoryStorageClient`] per resource type, created on first use.
#[derive(Debug, Default)]
pub struct InMemoryStorageProvider {
    clients: RwLock<HashMap<String, Arc<InMemoryStorageClient>>>,
}

impl InMemoryStorageProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StorageProvider for InMemoryStorageProvider {
    async fn storage_client(&self, resource_type: &str) -> Result<Arc<dyn StorageClient>, StoreError> {
        let type_key = resource_type.to_ascii_lowercase();
        if let Some(client) = self.clients.read().await.get(&type_key) {
            let client: Arc<dyn StorageClient> = client.clone();
            return Ok(client);
        }
        let mut clients = self.clients.write().await;
        let client: Arc<dyn StorageClient> = clients
            .entry(type_key)
            .or_insert_with(|| Arc::new(InMemoryStorageClient::new()))
            .clone();
        Ok(client)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    const STATE_STORES: &str = "Applications.Dapr/stateStores";

    fn state_store(id: &str) -> Object {
        Object::new(id, STATE_STORES, json!({ "name": id }))
    }

    #[tokio::test]
    async fn save_then_get_is_case_insensitive() {
        let client = InMemoryStorageClient::new();
        let saved = client
            .save(state_store("/planes/radius/local/resourceGroups/rg/providers/Applications.Dapr/stateStores/Redis"), None)
            .await
            .unwrap();
        assert!(!saved.etag.is_empty());

        let fetched = client
            .get("/planes/radius/local/resourcegroups/rg/providers/applications.dapr/statestores/redis")
            .await
            .unwrap();
        assert_eq!(fetched.id, saved.id);
    }

    #[tokio::test]
    async fn get_missing_is_not_found() {
        let client = InMemoryStorageClient::new();
        assert_matches!(client.get("/missing").await, Err(StoreError::NotFound(_)));
        assert_matches!(client.get("  ").await, Err(StoreError::InvalidKey(_)));
    }

    #[tokio::test]
    async fn etag_precondition() {
        let client = InMemoryStorageClient::new();
        let first = client.save(state_store("/a/b"), None).await.unwrap();

        assert_matches!(
            client.save(state_store("/a/b"), Some("stale")).await,
            Err(StoreError::PreconditionFailed { .. })
        );
        let second = client
            .save(state_store("/a/b"), Some(first.etag.as_str()))
            .await
            .unwrap();
        assert_ne!(first.etag, second.etag);
    }

    #[tokio::test]
    async fn delete_removes_object() {
        let client = InMemoryStorageClient::new();
        client.save(state_store("/a/b"), None).await.unwrap();
        client.delete("/A/B").await.unwrap();
        assert_matches!(client.delete("/a/b").await, Err(StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn query_filters_by_scope_and_type() {
        let client = InMemoryStorageClient::new();
        let root = "/planes/radius/local";
        for id in [
            format!("{root}/resourcegroups/rg1/providers/Applications.Dapr/stateStores/one"),
            format!("{root}/resourcegroups/rg2/providers/Applications.Dapr/stateStores/two"),
        ] {
            client.save(state_store(&id), None).await.unwrap();
        }
        client
            .save(
                Object::new(
                    format!("{root}/resourcegroups/rg1/providers/Applications.Dapr/secretStores/s"),
                    "Applications.Dapr/secretStores",
                    json!({}),
                ),
                None,
            )
            .await
            .unwrap();
        client
            .save(state_store("/planes/radius/localother/resourcegroups/rg1/x"), None)
            .await
            .unwrap();

        let all = client
            .query(&Query {
                scope: root.to_string(),
                resource_type: STATE_STORES.to_string(),
            })
            .await
            .unwrap();
        assert_eq!(all.len(), 2);

        let rg1 = client
            .query(&Query {
                scope: format!("{root}/resourceGroups/RG1"),
                resource_type: "applications.dapr/statestores".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(rg1.len(), 1);
    }

    #[tokio::test]
    async fn provider_reuses_client_per_type() {
        let provider = InMemoryStorageProvider::new();
        let a = provider.storage_client(STATE_STORES).await.unwrap();
        a.save(state_store("/x/y"), None).await.unwrap();

        let b = provider
            .storage_client("applications.dapr/STATESTORES")
            .await
            .unwrap();
        assert!(b.get("/x/y").await.is_ok());
    }
}
