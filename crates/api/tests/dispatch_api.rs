//! HTTP-level dispatch behaviour: fixed service routes, dispatch
//! rejections, and the guarantee that a rejected request runs no controller.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::Request;
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::json;

use armrpc_api::bootstrap::build_dispatcher_with;
use armrpc_api::controller::{self, Controller, RequestContext};
use armrpc_api::error::AppResult;
use armrpc_core::builder::ResourceTypeDescriptor;
use armrpc_core::operation::OperationMethod;
use armrpc_core::registry::OperationTypeRegistry;
use armrpc_store::InMemoryStorageProvider;
use common::{assert_error, body_json, get, header_str, send};

const WIDGETS: &str = "Applications.Test/widgets";

/// Counts invocations and echoes the request context.
struct EchoController {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl Controller for EchoController {
    async fn run(&self, ctx: RequestContext, _request: Request) -> AppResult<Response> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(axum::Json(json!({
            "operation": ctx.operation_type.to_string(),
            "resourceId": ctx.resource_id,
            "resourceName": ctx.resource_name(),
            "scope": ctx.scope,
            "apiVersion": ctx.api_version,
        }))
        .into_response())
    }
}

fn echo_app(calls: Arc<AtomicUsize>) -> axum::Router {
    let setup = common::ucp();
    let mut registry = OperationTypeRegistry::new();
    registry
        .declare(WIDGETS, [OperationMethod::Get, OperationMethod::Put])
        .unwrap();

    let echo = move || {
        let calls = Arc::clone(&calls);
        controller::factory(move |_options| {
            Ok(Arc::new(EchoController {
                calls: Arc::clone(&calls),
            }))
        })
    };
    let widgets = ResourceTypeDescriptor::new(WIDGETS)
        .bind(OperationMethod::Get, echo())
        .bind(OperationMethod::Put, echo());

    let dispatcher = build_dispatcher_with(
        &setup.config,
        Arc::new(InMemoryStorageProvider::new()),
        registry,
        vec![widgets],
    )
    .unwrap();
    common::build_test_app_with(&setup.config, dispatcher)
}

// ---------------------------------------------------------------------------
// Test: GET /healthz is served outside the dispatcher
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_check_returns_ok_with_json() {
    let app = common::build_test_app(&common::ucp().config);
    let response = get(&app, "/healthz").await;

    assert_eq!(response.status(), StatusCode::OK);
    let request_id = header_str(&response, "x-request-id").map(str::to_string);
    assert_eq!(request_id.map(|id| id.len()), Some(36));

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
}

// ---------------------------------------------------------------------------
// Test: unknown paths return the 404 error envelope
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_path_returns_not_found_envelope() {
    let app = common::build_test_app(&common::ucp().config);

    let response = get(&app, "/api.ucp.dev/planes/radius/local/providers/applications.dapr/unknown").await;
    assert_eq!(assert_error(response, StatusCode::NOT_FOUND).await, "NotFound");

    // Path base is required.
    let response = get(&app, "/planes/radius/local/providers/applications.dapr/statestores").await;
    assert_eq!(assert_error(response, StatusCode::NOT_FOUND).await, "NotFound");
}

// ---------------------------------------------------------------------------
// Test: unsupported verb on a known path returns 405 with Allow
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unsupported_method_returns_405_with_allow_header() {
    let app = common::build_test_app(&common::ucp().config);
    let path = "/api.ucp.dev/planes/radius/local/resourcegroups/testrg/providers/applications.dapr/secretstores/s0";

    let response = send(&app, Method::TRACE, path, None).await;
    assert_eq!(
        header_str(&response, "allow"),
        Some("GET, PUT, PATCH, DELETE")
    );
    assert_eq!(
        assert_error(response, StatusCode::METHOD_NOT_ALLOWED).await,
        "MethodNotAllowed"
    );

    let response = send(&app, Method::POST, path, None).await;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

// ---------------------------------------------------------------------------
// Test: malformed operation ids are rejected before any controller runs
// ---------------------------------------------------------------------------

#[tokio::test]
async fn malformed_operation_id_returns_400() {
    let app = common::build_test_app(&common::ucp().config);
    let response = get(
        &app,
        "/api.ucp.dev/planes/radius/local/providers/applications.dapr/locations/global/operationresults/not-a-uuid",
    )
    .await;
    assert_eq!(assert_error(response, StatusCode::BAD_REQUEST).await, "BadRequest");
}

// ---------------------------------------------------------------------------
// Test: the matched controller receives the request context
// ---------------------------------------------------------------------------

#[tokio::test]
async fn controller_receives_request_context() {
    let calls = Arc::new(AtomicUsize::new(0));
    let app = echo_app(Arc::clone(&calls));

    let response = get(
        &app,
        "/api.ucp.dev/planes/radius/local/resourceGroups/TestRG/providers/Applications.Test/widgets/Widget0?api-version=2023-10-01-preview",
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;

    assert_eq!(json["operation"], "APPLICATIONS.TEST/WIDGETS|GET");
    assert_eq!(
        json["resourceId"],
        "/planes/radius/local/resourceGroups/TestRG/providers/Applications.Test/widgets/Widget0"
    );
    assert_eq!(json["resourceName"], "Widget0");
    assert_eq!(json["scope"]["root"], "/planes/radius/local");
    assert_eq!(json["scope"]["resourceGroup"], "TestRG");
    assert_eq!(json["apiVersion"], "2023-10-01-preview");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

// ---------------------------------------------------------------------------
// Test: rejected requests never reach a controller
// ---------------------------------------------------------------------------

#[tokio::test]
async fn rejections_invoke_no_controller() {
    let calls = Arc::new(AtomicUsize::new(0));
    let app = echo_app(Arc::clone(&calls));
    let instance = "/api.ucp.dev/planes/radius/local/resourcegroups/rg/providers/applications.test/widgets/w";

    for (method, path, status) in [
        (Method::TRACE, instance.to_string(), StatusCode::METHOD_NOT_ALLOWED),
        (Method::DELETE, instance.to_string(), StatusCode::METHOD_NOT_ALLOWED),
        (
            Method::GET,
            format!("{instance}/extra"),
            StatusCode::NOT_FOUND,
        ),
        (
            Method::GET,
            "/api.ucp.dev/planes/radius/local/providers/applications.test/locations/global/operationstatuses/123"
                .to_string(),
            StatusCode::BAD_REQUEST,
        ),
    ] {
        let response = send(&app, method.clone(), &path, None).await;
        assert_eq!(response.status(), status, "{method} {path}");
    }

    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

// ---------------------------------------------------------------------------
// Test: provider discovery lists declared operations (subscription only)
// ---------------------------------------------------------------------------

#[tokio::test]
async fn provider_operations_listing() {
    let app = common::build_test_app(&common::azure().config);
    let response = get(&app, "/providers/Applications.Datastores/operations").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let names: Vec<&str> = json["value"]
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["name"].as_str().unwrap())
        .collect();
    assert!(names.contains(&"Applications.Datastores/mongoDatabases/read"));
    assert!(names.contains(&"Applications.Datastores/redisCaches/listsecrets/action"));
    assert!(names.contains(&"Applications.Datastores/sqlDatabases/delete"));
    assert!(!names.iter().any(|n| n.starts_with("Applications.Dapr/")));
}
