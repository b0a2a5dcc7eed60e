//! Polling routes against operation records seeded directly into storage.

mod common;

use std::sync::Arc;

use axum::http::StatusCode;

use armrpc_core::async_operation::{status_key, ErrorDetail, OperationStatus, ProvisioningState};
use armrpc_core::operation_id::OperationId;
use armrpc_store::{InMemoryStorageProvider, Object, StorageProvider};
use common::{assert_error, body_json, get, header_str};

const NAMESPACE: &str = "Applications.Dapr";

async fn seed(storage: &InMemoryStorageProvider, status: &OperationStatus) {
    let resource_type = format!("{NAMESPACE}/operationStatuses");
    let client = storage.storage_client(&resource_type).await.unwrap();
    client
        .save(
            Object::new(
                status_key(NAMESPACE, &status.name),
                resource_type,
                serde_json::to_value(status).unwrap(),
            ),
            None,
        )
        .await
        .unwrap();
}

fn polling_url(prefix: &str, kind: &str, id: &OperationId) -> String {
    format!("{prefix}/providers/applications.dapr/locations/global/{kind}/{id}")
}

fn record(state: ProvisioningState) -> OperationStatus {
    let mut status = OperationStatus::accepted(
        "/op".into(),
        OperationId::new(),
        "/planes/radius/local/resourcegroups/rg/providers/Applications.Dapr/stateStores/s".into(),
    );
    status.transition(state);
    status
}

// ---------------------------------------------------------------------------
// Test: a running operation reports 202 on its result route
// ---------------------------------------------------------------------------

#[tokio::test]
async fn running_operation_returns_202_with_retry_after() {
    let setup = common::ucp();
    let storage = Arc::new(InMemoryStorageProvider::new());
    let app = common::build_test_app_with_storage(&setup.config, Arc::clone(&storage));

    let status = record(ProvisioningState::Updating);
    seed(&storage, &status).await;

    let response = get(&app, &polling_url(&setup.prefix(), "operationstatuses", &status.name)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "Updating");
    assert!(json.get("endTime").is_none());

    let result_url = polling_url(&setup.prefix(), "operationresults", &status.name);
    let response = get(&app, &result_url).await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(header_str(&response, "location"), Some(result_url.as_str()));
    assert_eq!(header_str(&response, "retry-after"), Some("5"));
}

// ---------------------------------------------------------------------------
// Test: a failed operation returns its record with the error
// ---------------------------------------------------------------------------

#[tokio::test]
async fn failed_operation_returns_error_detail() {
    let setup = common::azure();
    let storage = Arc::new(InMemoryStorageProvider::new());
    let app = common::build_test_app_with_storage(&setup.config, Arc::clone(&storage));

    let mut status = record(ProvisioningState::Provisioning);
    status.fail(ErrorDetail {
        code: "DeploymentFailed".into(),
        message: "component rejected".into(),
    });
    seed(&storage, &status).await;

    let response = get(&app, &polling_url(&setup.prefix(), "operationresults", &status.name)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "Failed");
    assert_eq!(json["error"]["code"], "DeploymentFailed");
}

// ---------------------------------------------------------------------------
// Test: unknown operation ids return 404 on both routes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_operation_returns_404() {
    let setup = common::ucp();
    let app = common::build_test_app(&setup.config);
    let id = OperationId::new();

    for kind in ["operationstatuses", "operationresults"] {
        let response = get(&app, &polling_url(&setup.prefix(), kind, &id)).await;
        assert_eq!(assert_error(response, StatusCode::NOT_FOUND).await, "NotFound");
    }
}

// ---------------------------------------------------------------------------
// Test: ids are matched case-insensitively
// ---------------------------------------------------------------------------

#[tokio::test]
async fn upper_case_operation_id_resolves() {
    let setup = common::ucp();
    let storage = Arc::new(InMemoryStorageProvider::new());
    let app = common::build_test_app_with_storage(&setup.config, Arc::clone(&storage));

    let status = record(ProvisioningState::Succeeded);
    seed(&storage, &status).await;

    let url = polling_url(&setup.prefix(), "operationstatuses", &status.name).to_uppercase();
    let url = url.replacen(&setup.prefix().to_uppercase(), &setup.prefix(), 1);
    let response = get(&app, &url).await;
    assert_eq!(response.status(), StatusCode::OK);
}
