//! `WebSocket` handler for real-time tick streaming.
//!
//! Clients connect to `GET /ws/ticks` and receive a JSON-encoded
//! [`TickBroadcast`] each time the runner completes a tick. Lagging
//! clients skip ahead to the newest tick.

use std::ops::ControlFlow;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use crate::state::{AppState, TickBroadcast};

/// Upgrade an HTTP request to a `WebSocket` connection and begin
/// streaming tick summaries.
///
/// # Route
///
/// `GET /ws/ticks`
pub async fn ws_ticks(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_ws(socket, state))
}

/// Forward broadcasts to one client until either side goes away.
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
    let mut rx = state.subscribe();
    debug!(clients = state.tx.receiver_count(), "WebSocket client connected");

    loop {
        let flow = tokio::select! {
            result = rx.recv() => forward_tick(&mut socket, result).await,
            frame = socket.recv() => client_frame(&mut socket, frame).await,
        };
        if flow.is_break() {
            debug!("WebSocket session closed");
            return;
        }
    }
}

/// Push one broadcast result to the client.
async fn forward_tick(
    socket: &mut WebSocket,
    result: Result<TickBroadcast, RecvError>,
) -> ControlFlow<()> {
    match result {
        Ok(tick) => {
            let json = match serde_json::to_string(&tick) {
                Ok(j) => j,
                Err(e) => {
                    warn!(error = %e, tick = tick.tick, "Failed to serialize tick broadcast");
                    return ControlFlow::Continue(());
                }
            };
            if socket.send(Message::Text(json.into())).await.is_err() {
                return ControlFlow::Break(());
            }
            ControlFlow::Continue(())
        }
        Err(RecvError::Lagged(skipped)) => {
            debug!(skipped, "WebSocket client lagged, skipping ahead");
            ControlFlow::Continue(())
        }
        Err(RecvError::Closed) => ControlFlow::Break(()),
    }
}

/// React to a frame sent by the client. Text and binary frames are ignored.
async fn client_frame(
    socket: &mut WebSocket,
    frame: Option<Result<Message, axum::Error>>,
) -> ControlFlow<()> {
    match frame {
        None | Some(Ok(Message::Close(_))) => ControlFlow::Break(()),
        Some(Err(e)) => {
            debug!(error = %e, "WebSocket receive error");
            ControlFlow::Break(())
        }
        Some(Ok(Message::Ping(data))) => {
            if socket.send(Message::Pong(data)).await.is_err() {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        }
        Some(Ok(_)) => ControlFlow::Continue(()),
    }
}
