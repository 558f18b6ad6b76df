//! Observer server startup helper for embedding in the engine.
//!
//! [`spawn_observer`] launches the HTTP + `WebSocket` server on a
//! background Tokio task so it runs alongside the tick loop.

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::server::{ServerConfig, ServerError};
use crate::state::AppState;

/// Errors that can occur when spawning the Observer server.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// The server failed to bind or start.
    #[error("server start error: {0}")]
    Server(#[from] ServerError),
}

/// Spawn the Observer HTTP server on a background Tokio task.
///
/// The address is validated before the task is spawned so obvious
/// misconfigurations fail at startup. Binding itself happens inside the
/// task; a bind failure there is logged.
///
/// # Errors
///
/// Returns [`StartupError::Server`] if `config` does not describe a valid
/// socket address.
pub fn spawn_observer(
    config: ServerConfig,
    state: Arc<AppState>,
) -> Result<JoinHandle<()>, StartupError> {
    let addr = config.socket_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = crate::server::start_server(&config, state).await {
            tracing::error!(error = %e, "Observer server exited with error");
        }
    });

    tracing::info!(%addr, "Observer server spawned on background task");

    Ok(handle)
}
