#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use armrpc_api::bootstrap::build_dispatcher;
use armrpc_api::config::ServerConfig;
use armrpc_api::dispatcher::Dispatcher;
use armrpc_api::router::build_app_router;
use armrpc_api::state::AppState;
use armrpc_core::scope::ConventionKind;
use armrpc_store::InMemoryStorageProvider;

/// Path base and root scope of the plane convention test setup.
pub const UCP_PATH_BASE: &str = "/api.ucp.dev";
pub const UCP_ROOT: &str = "/planes/radius/local";

/// Root scope of the subscription convention test setup (no path base).
pub const AZURE_ROOT: &str = "/subscriptions/00000000-0000-0000-0000-000000000000";

/// A test convention setup: config plus the concrete root scope to probe.
#[derive(Debug, Clone)]
pub struct Setup {
    pub config: ServerConfig,
    pub root: &'static str,
}

impl Setup {
    /// Path base plus root scope.
    pub fn prefix(&self) -> String {
        format!("{}{}", self.config.path_base, self.root)
    }
}

pub fn test_config(convention: ConventionKind, path_base: &str) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        path_base: path_base.to_string(),
        conventions: vec![convention],
        location: "global".to_string(),
    }
}

pub fn ucp() -> Setup {
    Setup {
        config: test_config(ConventionKind::Plane, UCP_PATH_BASE),
        root: UCP_ROOT,
    }
}

pub fn azure() -> Setup {
    Setup {
        config: test_config(ConventionKind::Subscription, ""),
        root: AZURE_ROOT,
    }
}

pub fn test_dispatcher(config: &ServerConfig, storage: Arc<InMemoryStorageProvider>) -> Dispatcher {
    build_dispatcher(config, storage).expect("built-in providers must assemble")
}

/// Build the full application router around the built-in providers.
pub fn build_test_app(config: &ServerConfig) -> Router {
    build_test_app_with_storage(config, Arc::new(InMemoryStorageProvider::new()))
}

pub fn build_test_app_with_storage(
    config: &ServerConfig,
    storage: Arc<InMemoryStorageProvider>,
) -> Router {
    let dispatcher = test_dispatcher(config, storage);
    build_test_app_with(config, dispatcher)
}

pub fn build_test_app_with(config: &ServerConfig, dispatcher: Dispatcher) -> Router {
    let state = AppState {
        config: Arc::new(config.clone()),
        dispatcher: Arc::new(dispatcher),
    };
    build_app_router(state, config)
}

pub async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> Response {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.clone().oneshot(request).await.unwrap()
}

pub async fn get(app: &Router, uri: &str) -> Response {
    send(app, Method::GET, uri, None).await
}

pub async fn body_json(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn header_str<'a>(response: &'a Response, name: &str) -> Option<&'a str> {
    response.headers().get(name).and_then(|v| v.to_str().ok())
}

/// Assert the resource-manager error envelope and return its code.
pub async fn assert_error(response: Response, status: StatusCode) -> String {
    assert_eq!(response.status(), status);
    let json = body_json(response).await;
    assert!(json["error"]["message"].is_string(), "missing message: {json}");
    json["error"]["code"].as_str().unwrap().to_string()
}
