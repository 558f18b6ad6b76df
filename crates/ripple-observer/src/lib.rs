//! Observer API server for the Ripple persona network.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **`WebSocket` endpoint** (`/ws/ticks`) for real-time tick streaming
//!   via [`tokio::sync::broadcast`]
//! - **REST endpoints** for the current graph, single nodes, activation
//!   state, communities, and connectivity statistics
//! - **Operator REST endpoints** for runtime control (runs, pause, speed,
//!   filter, regeneration, shutdown)
//! - **Minimal HTML status page** (`GET /`)
//!
//! # Architecture
//!
//! The observer reads from an in-memory [`SimulationSnapshot`] that the
//! engine updates as the runner progresses. Handlers never mutate
//! simulation state; operator endpoints only queue commands.
//!
//! [`SimulationSnapshot`]: state::SimulationSnapshot

pub mod error;
pub mod handlers;
pub mod operator;
pub mod router;
pub mod server;
pub mod startup;
pub mod state;
pub mod ws;

// Re-export primary types for convenience.
pub use router::build_router;
pub use server::{ServerConfig, ServerError, start_server};
pub use startup::{StartupError, spawn_observer};
pub use state::{AppState, SimulationSnapshot, SnapshotUpdate, TickBroadcast};
