//! Integration tests for the Observer API endpoints.
//!
//! Tests drive the Axum `Router` directly via `tower::ServiceExt` without
//! starting a TCP server.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use ripple_core::operator::{OperatorCommand, OperatorState};
use ripple_network::{NetworkSession, NetworkSettings};
use ripple_observer::router::build_router;
use ripple_observer::state::{AppState, SnapshotUpdate, TickBroadcast};
use ripple_types::{ActivationState, Phase, RunId};
use serde_json::Value;
use tower::ServiceExt;

async fn make_test_state(operator: Option<Arc<OperatorState>>) -> Arc<AppState> {
    let settings = NetworkSettings {
        persona_count: 40,
        ..NetworkSettings::default()
    };
    let session = NetworkSession::new(settings, SmallRng::seed_from_u64(7)).unwrap();
    let state = Arc::new(operator.map_or_else(AppState::new, AppState::with_operator));

    {
        let mut snap = state.snapshot.write().await;
        snap.communities = session.communities().to_vec();
        snap.persona_counts = session.store().community_counts();
        snap.apply(SnapshotUpdate::Graph {
            graph: session.graph(),
            revision: session.revision(),
            filter: session.filter().clone(),
        });
        let run_id = RunId::new();
        snap.apply(SnapshotUpdate::RunStarted { run_id });
        let first = snap.graph.nodes[0].id.clone();
        let second = snap.graph.nodes[1].id.clone();
        snap.apply(SnapshotUpdate::Tick {
            tick: 1,
            activation: ActivationState {
                active_ids: [first.clone(), second].into_iter().collect(),
                blinking_ids: [first].into_iter().collect(),
                phase: Phase::Seed,
            },
        });
    }

    state
}

async fn operator_state() -> (Arc<AppState>, Arc<OperatorState>) {
    let operator = Arc::new(OperatorState::new(500));
    let state = make_test_state(Some(Arc::clone(&operator))).await;
    (state, operator)
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn post(uri: &str) -> Request<Body> {
    Request::post(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

// =========================================================================
// Read-only API
// =========================================================================

#[tokio::test]
async fn test_index_returns_html() {
    let router = build_router(make_test_state(None).await);

    let response = router
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap();
    assert!(content_type.contains("text/html"));
}

#[tokio::test]
async fn test_get_graph() {
    let router = build_router(make_test_state(None).await);

    let response = router
        .oneshot(Request::get("/api/graph").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["revision"], 1);
    assert_eq!(json["node_count"], 40);
    assert_eq!(json["nodes"].as_array().unwrap().len(), 40);
    assert!(json["link_count"].as_u64().unwrap() >= 39);
    assert_eq!(json["filter"][0], "all");
}

#[tokio::test]
async fn test_get_graph_for_one_community() {
    let router = build_router(make_test_state(None).await);

    let response = router
        .oneshot(
            Request::get("/api/graph?community=south-india")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["node_count"], 10);
    for node in json["nodes"].as_array().unwrap() {
        assert_eq!(node["community_id"], "south-india");
    }
    // The spanning tree alone gives n - 1 intra-community links.
    assert!(json["link_count"].as_u64().unwrap() >= 9);
}

#[tokio::test]
async fn test_get_graph_unknown_community() {
    let router = build_router(make_test_state(None).await);

    let response = router
        .oneshot(
            Request::get("/api/graph?community=atlantis")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], 400);
    assert!(json["error"].as_str().unwrap().contains("atlantis"));
}

#[tokio::test]
async fn test_get_node() {
    let router = build_router(make_test_state(None).await);

    let response = router
        .oneshot(
            Request::get("/api/graph/nodes/persona-0")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["node"]["id"], "persona-0");
    assert_eq!(json["active"], true);
    assert_eq!(json["blinking"], true);
    assert!(json["degree"].as_u64().unwrap() >= 1);
    assert_eq!(
        json["degree"].as_u64().unwrap(),
        json["neighbours"].as_array().unwrap().len() as u64
    );
}

#[tokio::test]
async fn test_get_node_not_found() {
    let router = build_router(make_test_state(None).await);

    let response = router
        .oneshot(
            Request::get("/api/graph/nodes/persona-9999")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_get_activation() {
    let router = build_router(make_test_state(None).await);

    let response = router
        .oneshot(Request::get("/api/activation").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["tick"], 1);
    assert_eq!(json["phase"], "seed");
    assert_eq!(json["active_count"], 2);
    assert_eq!(json["node_count"], 40);
    assert_eq!(json["blinking_ids"].as_array().unwrap().len(), 1);
    assert!(json["run_id"].is_string());
}

#[tokio::test]
async fn test_list_communities() {
    let router = build_router(make_test_state(None).await);

    let response = router
        .oneshot(Request::get("/api/communities").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["count"], 4);
    let first = &json["communities"][0];
    assert_eq!(first["id"], "north-india");
    assert_eq!(first["color"], "#FF5733");
    assert_eq!(first["persona_count"], 10);
    assert_eq!(first["node_count"], 10);
    assert_eq!(first["selected"], true);
}

#[tokio::test]
async fn test_get_stats() {
    let router = build_router(make_test_state(None).await);

    let response = router
        .oneshot(Request::get("/api/stats").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["connected"], true);
    assert_eq!(json["components"]["component_count"], 1);
    assert_eq!(json["components"]["node_count"], 40);
    assert_eq!(json["runs_ended"], 0);
    assert!(json["last_report"].is_null());
}

#[tokio::test]
async fn test_broadcast_channel() {
    let state = AppState::new();
    let mut rx = state.subscribe();

    let summary = TickBroadcast {
        run_id: RunId::new(),
        graph_revision: 1,
        tick: 42,
        phase: Phase::Spread,
        active_count: 120,
        node_count: 988,
        newly_active: 7,
        blinking_count: 20,
        fraction: 0.12,
        saturated: false,
    };

    assert_eq!(state.broadcast(&summary), 1);

    let received = rx.recv().await.unwrap();
    assert_eq!(received.tick, 42);
    assert_eq!(received.active_count, 120);
}

#[tokio::test]
async fn test_nonexistent_route_returns_404() {
    let router = build_router(make_test_state(None).await);

    let response = router
        .oneshot(Request::get("/api/nonexistent").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// =========================================================================
// Operator API
// =========================================================================

#[tokio::test]
async fn test_operator_unavailable_without_runner() {
    let router = build_router(make_test_state(None).await);

    let response = router.oneshot(post("/api/operator/pause")).await.unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_operator_status() {
    let (state, _operator) = operator_state().await;
    let router = build_router(state);

    let response = router
        .oneshot(Request::get("/api/operator/status").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["paused"], false);
    assert_eq!(json["tick_interval_ms"], 500);
    assert_eq!(json["tick"], 1);
    assert_eq!(json["graph_revision"], 1);
    assert_eq!(json["pending_commands"], 0);
}

#[tokio::test]
async fn test_pause_and_resume() {
    let (state, operator) = operator_state().await;
    let router = build_router(state);

    let response = router
        .clone()
        .oneshot(post("/api/operator/pause"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(operator.is_paused());

    let response = router.oneshot(post("/api/operator/resume")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(!operator.is_paused());
}

#[tokio::test]
async fn test_set_speed() {
    let (state, operator) = operator_state().await;
    let router = build_router(state);

    let response = router
        .clone()
        .oneshot(post_json(
            "/api/operator/speed",
            &serde_json::json!({ "tick_interval_ms": 250 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["previous_interval_ms"], 500);
    assert_eq!(operator.tick_interval_ms(), 250);

    let response = router
        .oneshot(post_json(
            "/api/operator/speed",
            &serde_json::json!({ "tick_interval_ms": 10 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(operator.tick_interval_ms(), 250);
}

#[tokio::test]
async fn test_run_commands_are_queued() {
    let (state, operator) = operator_state().await;
    let router = build_router(state);

    for uri in [
        "/api/operator/start",
        "/api/operator/stop",
        "/api/operator/regenerate",
    ] {
        let response = router.clone().oneshot(post(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    assert_eq!(
        operator.drain_commands().await,
        vec![
            OperatorCommand::StartRun,
            OperatorCommand::StopRun,
            OperatorCommand::Regenerate,
        ]
    );
}

#[tokio::test]
async fn test_set_filter() {
    let (state, operator) = operator_state().await;
    let router = build_router(state);

    let response = router
        .clone()
        .oneshot(post_json(
            "/api/operator/filter",
            &serde_json::json!({ "communities": ["east-india", "west-india"] }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["filter"], serde_json::json!(["east-india", "west-india"]));
    assert_eq!(operator.pending_commands().await, 1);

    let response = router
        .oneshot(post_json(
            "/api/operator/filter",
            &serde_json::json!({ "communities": ["atlantis"] }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(operator.pending_commands().await, 1);
}

#[tokio::test]
async fn test_empty_filter_rejected() {
    let (state, operator) = operator_state().await;
    let router = build_router(state);

    let response = router
        .oneshot(post_json(
            "/api/operator/filter",
            &serde_json::json!({ "communities": [] }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(operator.pending_commands().await, 0);
}

#[tokio::test]
async fn test_toggle_community() {
    let (state, operator) = operator_state().await;
    let router = build_router(state);

    let response = router
        .clone()
        .oneshot(post("/api/operator/communities/north-india/toggle"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = router
        .clone()
        .oneshot(post("/api/operator/communities/all/toggle"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = router
        .oneshot(post("/api/operator/communities/atlantis/toggle"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    assert_eq!(
        operator.drain_commands().await,
        vec![
            OperatorCommand::ToggleCommunity {
                community: String::from("north-india"),
            },
            OperatorCommand::ToggleCommunity {
                community: String::from("all"),
            },
        ]
    );
}

#[tokio::test]
async fn test_shutdown() {
    let (state, operator) = operator_state().await;
    let router = build_router(state);

    let response = router.oneshot(post("/api/operator/shutdown")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(operator.is_shutdown_requested());
}
