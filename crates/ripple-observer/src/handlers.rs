//! REST API endpoint handlers for the Observer server.
//!
//! All handlers read from the in-memory [`SimulationSnapshot`] via the
//! shared [`AppState`].
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Minimal HTML status page |
//! | `GET` | `/api/graph` | Nodes and links, optionally for one community |
//! | `GET` | `/api/graph/nodes/{id}` | Single node with neighbour ids |
//! | `GET` | `/api/activation` | Active and blinking ids, phase, tick |
//! | `GET` | `/api/communities` | Definitions, persona counts, filter |
//! | `GET` | `/api/stats` | Connectivity summary and run statistics |
//!
//! [`SimulationSnapshot`]: crate::state::SimulationSnapshot

use std::collections::HashSet;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::response::{Html, IntoResponse};
use ripple_types::{Link, Node};

use crate::error::ObserverError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Query parameter structs
// ---------------------------------------------------------------------------

/// Query parameters for the `GET /api/graph` endpoint.
#[derive(Debug, serde::Deserialize)]
pub struct GraphQuery {
    /// Only return nodes of this community, and links between them.
    pub community: Option<String>,
}

// ---------------------------------------------------------------------------
// GET / -- minimal HTML status page
// ---------------------------------------------------------------------------

/// Serve a minimal HTML page showing network status and API links.
pub async fn index(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.snapshot.read().await;
    let revision = snapshot.graph_revision;
    let nodes = snapshot.graph.node_count();
    let links = snapshot.graph.link_count();
    let components = snapshot.components.component_count;
    let tick = snapshot.tick;
    let phase = snapshot.activation.phase;
    let active = snapshot.activation.active_count();
    let run = snapshot
        .run_id
        .map_or_else(|| String::from("idle"), |id| id.to_string());
    let filter = snapshot.filter.selectors().join(", ");

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>Ripple Observer</title>
    <style>
        body {{
            background: #101418;
            color: #d0d7de;
            font-family: 'Fira Code', 'Consolas', monospace;
            padding: 2rem;
            max-width: 860px;
            margin: 0 auto;
        }}
        h1 {{ color: #f1c40f; margin-bottom: 0.25rem; }}
        .subtitle {{ color: #8b949e; margin-top: 0; }}
        .metric {{
            display: inline-block;
            background: #161b22;
            border: 1px solid #30363d;
            border-radius: 6px;
            padding: 1rem 1.5rem;
            margin: 0.5rem 0.5rem 0.5rem 0;
            min-width: 110px;
        }}
        .metric .label {{ color: #8b949e; font-size: 0.85rem; }}
        .metric .value {{ color: #f1c40f; font-size: 1.5rem; font-weight: bold; }}
        a {{ color: #58a6ff; text-decoration: none; }}
        ul {{ list-style: none; padding: 0; }}
        li {{ padding: 0.3rem 0; }}
        hr {{ border: none; border-top: 1px solid #30363d; margin: 1.5rem 0; }}
    </style>
</head>
<body>
    <h1>Ripple Observer</h1>
    <p class="subtitle">Persona network activation monitor</p>

    <p>Run: <code>{run}</code> &middot; Filter: <code>{filter}</code></p>

    <div>
        <div class="metric"><div class="label">Revision</div><div class="value">{revision}</div></div>
        <div class="metric"><div class="label">Nodes</div><div class="value">{nodes}</div></div>
        <div class="metric"><div class="label">Links</div><div class="value">{links}</div></div>
        <div class="metric"><div class="label">Components</div><div class="value">{components}</div></div>
        <div class="metric"><div class="label">Tick</div><div class="value">{tick}</div></div>
        <div class="metric"><div class="label">Phase</div><div class="value">{phase}</div></div>
        <div class="metric"><div class="label">Active</div><div class="value">{active}</div></div>
    </div>

    <hr>

    <h2>API Endpoints</h2>
    <ul>
        <li>GET <a href="/api/graph">/api/graph</a> -- Nodes and links (?community=ID)</li>
        <li>GET /api/graph/nodes/{{id}} -- Single node with neighbours</li>
        <li>GET <a href="/api/activation">/api/activation</a> -- Active and blinking nodes</li>
        <li>GET <a href="/api/communities">/api/communities</a> -- Communities and filter</li>
        <li>GET <a href="/api/stats">/api/stats</a> -- Connectivity and run statistics</li>
        <li>GET <a href="/api/operator/status">/api/operator/status</a> -- Runner status</li>
        <li>WS <code>/ws/ticks</code> -- Live tick stream</li>
    </ul>
</body>
</html>"#
    ))
}

// ---------------------------------------------------------------------------
// GET /api/graph -- nodes and links
// ---------------------------------------------------------------------------

/// Return the current graph.
///
/// # Query Parameters
///
/// - `community`: only nodes of this community and the links between
///   them. Unknown ids are rejected with 400.
pub async fn get_graph(
    State(state): State<Arc<AppState>>,
    Query(params): Query<GraphQuery>,
) -> Result<impl IntoResponse, ObserverError> {
    let snapshot = state.snapshot.read().await;
    let graph = &snapshot.graph;

    let (nodes, links): (Vec<&Node>, Vec<&Link>) = match params.community.as_deref() {
        None => (graph.nodes.iter().collect(), graph.links.iter().collect()),
        Some(community) => {
            if !snapshot.has_community(community) {
                return Err(ObserverError::InvalidRequest(format!(
                    "unknown community: {community}"
                )));
            }
            let nodes: Vec<&Node> = graph
                .nodes
                .iter()
                .filter(|n| n.community_id.as_str() == community)
                .collect();
            let ids: HashSet<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
            let links = graph
                .links
                .iter()
                .filter(|l| ids.contains(l.source.as_str()) && ids.contains(l.target.as_str()))
                .collect();
            (nodes, links)
        }
    };

    Ok(Json(serde_json::json!({
        "revision": snapshot.graph_revision,
        "filter": snapshot.filter.selectors(),
        "node_count": nodes.len(),
        "link_count": links.len(),
        "nodes": nodes,
        "links": links,
    })))
}

// ---------------------------------------------------------------------------
// GET /api/graph/nodes/{id} -- single node
// ---------------------------------------------------------------------------

/// Return one node with its neighbour ids and activation flags.
pub async fn get_node(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ObserverError> {
    let snapshot = state.snapshot.read().await;

    let node = snapshot
        .graph
        .node(&id)
        .ok_or_else(|| ObserverError::NotFound(format!("node {id}")))?;
    let neighbours = snapshot.adjacency.neighbours_of(&id).unwrap_or_default();

    Ok(Json(serde_json::json!({
        "node": node,
        "degree": neighbours.len(),
        "neighbours": neighbours,
        "active": snapshot.activation.is_active(&id),
        "blinking": snapshot.activation.is_blinking(&id),
    })))
}

// ---------------------------------------------------------------------------
// GET /api/activation -- activation state
// ---------------------------------------------------------------------------

/// Return the activation state of the active (or last) run.
pub async fn get_activation(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    let snapshot = state.snapshot.read().await;
    let activation = &snapshot.activation;

    Ok(Json(serde_json::json!({
        "run_id": snapshot.run_id,
        "graph_revision": snapshot.graph_revision,
        "tick": snapshot.tick,
        "phase": activation.phase,
        "active_count": activation.active_count(),
        "node_count": snapshot.graph.node_count(),
        "fraction": snapshot.fraction(),
        "active_ids": activation.active_ids,
        "blinking_ids": activation.blinking_ids,
    })))
}

// ---------------------------------------------------------------------------
// GET /api/communities -- community list
// ---------------------------------------------------------------------------

/// List configured communities with persona and node counts and whether
/// each passes the active filter.
pub async fn list_communities(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    let snapshot = state.snapshot.read().await;

    let communities: Vec<serde_json::Value> = snapshot
        .communities
        .iter()
        .map(|c| {
            let node_count = snapshot
                .graph
                .nodes
                .iter()
                .filter(|n| n.community_id == c.id)
                .count();
            serde_json::json!({
                "id": c.id,
                "display_name": c.display_name,
                "color": c.color,
                "base_size": c.base_size,
                "persona_count": snapshot.persona_counts.get(&c.id).copied().unwrap_or(0),
                "node_count": node_count,
                "selected": snapshot.filter.matches(&c.id),
            })
        })
        .collect();

    Ok(Json(serde_json::json!({
        "count": communities.len(),
        "filter": snapshot.filter.selectors(),
        "communities": communities,
    })))
}

// ---------------------------------------------------------------------------
// GET /api/stats -- connectivity and run statistics
// ---------------------------------------------------------------------------

/// Return the connectivity summary of the current graph and the last run
/// report.
pub async fn get_stats(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    let snapshot = state.snapshot.read().await;

    Ok(Json(serde_json::json!({
        "graph_revision": snapshot.graph_revision,
        "components": snapshot.components,
        "connected": snapshot.components.is_connected(),
        "runs_ended": snapshot.runs_ended,
        "last_report": serde_json::to_value(&snapshot.last_report)?,
        "updated_at": snapshot.updated_at,
    })))
}
