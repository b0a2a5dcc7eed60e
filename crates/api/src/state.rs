use std::sync::Arc;

use crate::config::ServerConfig;
use crate::dispatcher::Dispatcher;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; everything sits behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    /// Route table plus constructed controllers, immutable after startup.
    pub dispatcher: Arc<Dispatcher>,
}
