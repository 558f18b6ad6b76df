//! Axum router construction for the Observer API.
//!
//! Assembles all routes (REST + `WebSocket` + operator) into a single
//! [`Router`] with CORS enabled for the renderer and request tracing.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::operator;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router for the Observer server.
///
/// The router includes:
/// - `GET /` -- minimal HTML status page
/// - `GET /ws/ticks` -- `WebSocket` tick summary stream
/// - `GET /api/graph` -- nodes and links (`?community=` narrows nodes)
/// - `GET /api/graph/nodes/{id}` -- one node with its neighbours
/// - `GET /api/activation` -- active and blinking ids
/// - `GET /api/communities` -- definitions, counts, active filter
/// - `GET /api/stats` -- connectivity and run statistics
/// - `/api/operator/*` -- runtime control
///
/// CORS allows any origin so a locally served renderer can connect.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Status page
        .route("/", get(handlers::index))
        // WebSocket
        .route("/ws/ticks", get(ws::ws_ticks))
        // REST API
        .route("/api/graph", get(handlers::get_graph))
        .route("/api/graph/nodes/{id}", get(handlers::get_node))
        .route("/api/activation", get(handlers::get_activation))
        .route("/api/communities", get(handlers::list_communities))
        .route("/api/stats", get(handlers::get_stats))
        // Operator API
        .route("/api/operator/status", get(operator::status))
        .route("/api/operator/start", post(operator::start_run))
        .route("/api/operator/stop", post(operator::stop_run))
        .route("/api/operator/pause", post(operator::pause))
        .route("/api/operator/resume", post(operator::resume))
        .route("/api/operator/speed", post(operator::set_speed))
        .route("/api/operator/filter", post(operator::set_filter))
        .route(
            "/api/operator/communities/{id}/toggle",
            post(operator::toggle_community),
        )
        .route("/api/operator/regenerate", post(operator::regenerate))
        .route("/api/operator/shutdown", post(operator::shutdown))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
