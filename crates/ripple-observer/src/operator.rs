//! Operator REST API handlers for runtime simulation control.
//!
//! These endpoints are separate from the read-only observer API. Commands
//! that touch runs or the graph are queued on [`OperatorState`] and applied
//! by the runner between ticks; pause, resume, speed, and shutdown take
//! effect directly.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/api/operator/status` | Current runner status |
//! | `POST` | `/api/operator/start` | Start a new run |
//! | `POST` | `/api/operator/stop` | Stop the active run |
//! | `POST` | `/api/operator/pause` | Pause stepping |
//! | `POST` | `/api/operator/resume` | Resume stepping |
//! | `POST` | `/api/operator/speed` | Set tick interval (ms) |
//! | `POST` | `/api/operator/filter` | Replace the community filter |
//! | `POST` | `/api/operator/communities/{id}/toggle` | Toggle one community |
//! | `POST` | `/api/operator/regenerate` | Regenerate personas |
//! | `POST` | `/api/operator/shutdown` | Clean runner shutdown |

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use ripple_core::operator::{MIN_TICK_INTERVAL_MS, OperatorCommand, OperatorState, OperatorStatus};
use ripple_types::{ALL_COMMUNITIES, CommunityFilter};

use crate::error::ObserverError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /api/operator/speed`.
#[derive(Debug, serde::Deserialize)]
pub struct SetSpeedRequest {
    /// New tick interval in milliseconds.
    pub tick_interval_ms: u64,
}

/// Request body for `POST /api/operator/filter`.
#[derive(Debug, serde::Deserialize)]
pub struct SetFilterRequest {
    /// Community selectors: `["all"]` or a list of community ids.
    pub communities: Vec<String>,
}

/// Generic success response.
#[derive(Debug, serde::Serialize)]
struct OperatorResponse {
    /// Whether the operation succeeded.
    ok: bool,
    /// Human-readable message.
    message: String,
}

impl OperatorResponse {
    fn ok(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            ok: true,
            message: message.into(),
        })
    }
}

fn operator_of(state: &AppState) -> Result<&Arc<OperatorState>, ObserverError> {
    state
        .operator_state
        .as_ref()
        .ok_or(ObserverError::OperatorUnavailable)
}

// ---------------------------------------------------------------------------
// GET /api/operator/status
// ---------------------------------------------------------------------------

/// Return pause state, speed, pending commands, and the active run.
pub async fn status(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    let operator = operator_of(&state)?;
    let snapshot = state.snapshot.read().await;

    let status = OperatorStatus {
        paused: operator.is_paused(),
        shutdown_requested: operator.is_shutdown_requested(),
        tick_interval_ms: operator.tick_interval_ms(),
        elapsed_seconds: operator.elapsed_seconds(),
        pending_commands: operator.pending_commands().await,
        run_id: snapshot.run_id.map(|id| id.to_string()),
        tick: snapshot.tick,
        graph_revision: snapshot.graph_revision,
        runs_ended: snapshot.runs_ended,
        end_reason: operator.end_reason().await,
        started_at: operator.started_at().to_rfc3339(),
    };

    Ok(Json(status))
}

// ---------------------------------------------------------------------------
// POST /api/operator/start, /stop
// ---------------------------------------------------------------------------

/// Queue a new run on the current graph. An active run is replaced.
pub async fn start_run(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    let operator = operator_of(&state)?;
    operator.push_command(OperatorCommand::StartRun).await;
    Ok(OperatorResponse::ok("Run start queued"))
}

/// Queue a stop of the active run. The graph and snapshot are kept.
pub async fn stop_run(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    let operator = operator_of(&state)?;
    operator.push_command(OperatorCommand::StopRun).await;
    Ok(OperatorResponse::ok("Run stop queued"))
}

// ---------------------------------------------------------------------------
// POST /api/operator/pause, /resume
// ---------------------------------------------------------------------------

/// Pause stepping. Queued commands are still applied while paused.
pub async fn pause(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    operator_of(&state)?.pause();
    Ok(OperatorResponse::ok("Simulation paused"))
}

/// Resume stepping after a pause.
pub async fn resume(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    operator_of(&state)?.resume();
    Ok(OperatorResponse::ok("Simulation resumed"))
}

// ---------------------------------------------------------------------------
// POST /api/operator/speed
// ---------------------------------------------------------------------------

/// Change the tick interval at runtime.
pub async fn set_speed(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SetSpeedRequest>,
) -> Result<impl IntoResponse, ObserverError> {
    let operator = operator_of(&state)?;

    operator.set_tick_interval_ms(body.tick_interval_ms).map_or_else(
        || {
            Err(ObserverError::InvalidRequest(format!(
                "tick_interval_ms must be at least {MIN_TICK_INTERVAL_MS}"
            )))
        },
        |prev| {
            Ok(Json(serde_json::json!({
                "ok": true,
                "message": format!("Tick interval changed from {}ms to {}ms", prev, body.tick_interval_ms),
                "previous_interval_ms": prev,
                "new_interval_ms": body.tick_interval_ms,
            })))
        },
    )
}

// ---------------------------------------------------------------------------
// POST /api/operator/filter, /communities/{id}/toggle
// ---------------------------------------------------------------------------

/// Replace the community filter. Every selector must be `all` or a
/// configured community id; an empty list is rejected.
pub async fn set_filter(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SetFilterRequest>,
) -> Result<impl IntoResponse, ObserverError> {
    let operator = operator_of(&state)?;

    if body.communities.is_empty() {
        return Err(ObserverError::InvalidRequest(
            "communities must name at least one selector".to_owned(),
        ));
    }
    {
        let snapshot = state.snapshot.read().await;
        if let Some(unknown) = body
            .communities
            .iter()
            .find(|s| s.as_str() != ALL_COMMUNITIES && !snapshot.has_community(s))
        {
            return Err(ObserverError::InvalidRequest(format!(
                "unknown community: {unknown}"
            )));
        }
    }

    let filter = CommunityFilter::from_selectors(&body.communities);
    let selectors = filter.selectors();
    operator
        .push_command(OperatorCommand::SetFilter { filter })
        .await;

    Ok(Json(serde_json::json!({
        "ok": true,
        "message": "Filter change queued",
        "filter": selectors,
    })))
}

/// Toggle one community (or `all`) in the filter.
pub async fn toggle_community(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ObserverError> {
    let operator = operator_of(&state)?;

    if id != ALL_COMMUNITIES && !state.snapshot.read().await.has_community(&id) {
        return Err(ObserverError::NotFound(format!("community {id}")));
    }

    let message = format!("Toggle of '{id}' queued");
    operator
        .push_command(OperatorCommand::ToggleCommunity { community: id })
        .await;
    Ok(OperatorResponse::ok(message))
}

// ---------------------------------------------------------------------------
// POST /api/operator/regenerate
// ---------------------------------------------------------------------------

/// Queue a fresh persona generation and graph rebuild.
pub async fn regenerate(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    let operator = operator_of(&state)?;
    operator.push_command(OperatorCommand::Regenerate).await;
    Ok(OperatorResponse::ok("Persona regeneration queued"))
}

// ---------------------------------------------------------------------------
// POST /api/operator/shutdown
// ---------------------------------------------------------------------------

/// Trigger a clean shutdown.
///
/// The runner reports the active run and exits before its next tick; the
/// engine then stops the server.
pub async fn shutdown(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    operator_of(&state)?.request_shutdown();
    Ok(OperatorResponse::ok("Shutdown requested"))
}
