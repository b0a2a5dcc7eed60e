use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use armrpc_api::bootstrap::build_dispatcher;
use armrpc_api::config::ServerConfig;
use armrpc_api::router::build_app_router;
use armrpc_api::state::AppState;
use armrpc_store::InMemoryStorageProvider;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    // LOG_FORMAT=json switches to structured JSON lines.
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "armrpc_api=debug,tower_http=debug".into()),
        )
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json_logs).then(|| tracing_subscriber::fmt::layer()))
        .init();

    // --- Configuration ---
    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(err) => fatal(&err),
    };
    tracing::info!(
        host = %config.host,
        port = %config.port,
        path_base = %config.path_base,
        conventions = ?config.conventions,
        "Loaded server configuration"
    );

    // --- Route table and controllers ---
    let storage = Arc::new(InMemoryStorageProvider::new());
    let dispatcher = match build_dispatcher(&config, storage) {
        Ok(dispatcher) => dispatcher,
        Err(err) => fatal(&err),
    };
    tracing::info!(routes = dispatcher.table().len(), "Dispatcher ready");

    // --- App state ---
    let state = AppState {
        config: Arc::new(config.clone()),
        dispatcher: Arc::new(dispatcher),
    };
    let app = build_app_router(state, &config);

    // --- Start server ---
    let host = match config.host.parse() {
        Ok(host) => host,
        Err(err) => fatal(&err),
    };
    let addr = SocketAddr::new(host, config.port);
    tracing::info!(%addr, "Starting server");

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => fatal(&err),
    };

    let shutdown_grace = Duration::from_secs(config.shutdown_timeout_secs);
    let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal());
    let server = tokio::spawn(async move { server.await });

    tokio::select! {
        result = server => {
            match result {
                Ok(Ok(())) => tracing::info!("Graceful shutdown complete"),
                Ok(Err(err)) => fatal(&err),
                Err(err) => fatal(&err),
            }
        }
        () = drain_deadline(shutdown_grace) => {
            tracing::warn!(
                grace_secs = config.shutdown_timeout_secs,
                "In-flight requests did not drain in time, exiting"
            );
        }
    }
}

/// Log a startup or serve error and exit with status 1.
fn fatal(err: &dyn std::fmt::Display) -> ! {
    tracing::error!(error = %err, "Fatal error");
    std::process::exit(1);
}

/// Resolves `grace` after a shutdown signal is received.
async fn drain_deadline(grace: Duration) {
    shutdown_signal().await;
    tokio::time::sleep(grace).await;
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            fatal(&err);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => fatal(&err),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
