//! Shared application state for the Observer API server.
//!
//! [`AppState`] holds the broadcast channel for tick summaries and the
//! in-memory [`SimulationSnapshot`] the REST endpoints serve. The engine
//! feeds the snapshot through [`SnapshotUpdate`]s; handlers only read it.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use ripple_core::operator::OperatorState;
use ripple_core::run::{RunReport, TickSummary};
use ripple_network::{Adjacency, ComponentSummary};
use ripple_types::{
    ActivationState, CommunityDefinition, CommunityFilter, CommunityId, Graph, Phase, RunId,
};
use tokio::sync::{RwLock, broadcast};

/// Capacity of the broadcast channel for tick summaries.
///
/// If a subscriber falls behind by more than this many messages it will
/// receive a [`broadcast::error::RecvError::Lagged`] and skip to the
/// newest message.
const BROADCAST_CAPACITY: usize = 256;

/// JSON-serializable tick summary pushed over the `WebSocket`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TickBroadcast {
    /// Run the tick belongs to.
    pub run_id: RunId,
    /// Graph revision the run is bound to.
    pub graph_revision: u64,
    /// Tick number within the run.
    pub tick: u64,
    /// Phase after the tick.
    pub phase: Phase,
    /// Active nodes.
    pub active_count: usize,
    /// Nodes in the graph.
    pub node_count: usize,
    /// Nodes activated on this tick.
    pub newly_active: usize,
    /// Nodes blinking on this tick.
    pub blinking_count: usize,
    /// Active fraction.
    pub fraction: f64,
    /// Whether every node is active.
    pub saturated: bool,
}

impl TickBroadcast {
    /// Project a core tick summary for the wire.
    pub const fn from_summary(summary: &TickSummary, graph_revision: u64) -> Self {
        Self {
            run_id: summary.run_id,
            graph_revision,
            tick: summary.tick,
            phase: summary.phase,
            active_count: summary.active_count,
            node_count: summary.node_count,
            newly_active: summary.newly_active,
            blinking_count: summary.blinking_count,
            fraction: summary.fraction,
            saturated: summary.saturated,
        }
    }
}

/// A change the engine pushes into the snapshot.
#[derive(Debug, Clone)]
pub enum SnapshotUpdate {
    /// The graph was rebuilt. Activation is cleared.
    Graph {
        /// The new graph.
        graph: Arc<Graph>,
        /// Its revision.
        revision: u64,
        /// The filter it was built with.
        filter: CommunityFilter,
    },
    /// A run started with an empty activation state.
    RunStarted {
        /// The new run.
        run_id: RunId,
    },
    /// A tick completed.
    Tick {
        /// Tick number within the run.
        tick: u64,
        /// Activation state after the tick.
        activation: ActivationState,
    },
    /// A run ended.
    RunEnded {
        /// Its final report.
        report: Box<RunReport>,
    },
}

/// In-memory snapshot served by the REST endpoints.
#[derive(Debug, Clone, Default)]
pub struct SimulationSnapshot {
    /// Configured communities, in order.
    pub communities: Vec<CommunityDefinition>,
    /// Personas generated per community.
    pub persona_counts: BTreeMap<CommunityId, usize>,
    /// The current graph.
    pub graph: Arc<Graph>,
    /// Neighbour lookup for the current graph.
    pub adjacency: Adjacency,
    /// Connectivity summary of the current graph.
    pub components: ComponentSummary,
    /// Revision of the current graph (0 before the first build).
    pub graph_revision: u64,
    /// Filter the current graph was built with.
    pub filter: CommunityFilter,
    /// The active run, if any.
    pub run_id: Option<RunId>,
    /// Tick of the active run.
    pub tick: u64,
    /// Activation state of the active (or last) run.
    pub activation: ActivationState,
    /// Runs ended since start.
    pub runs_ended: u64,
    /// Report of the most recently ended run.
    pub last_report: Option<RunReport>,
    /// When the snapshot last changed.
    pub updated_at: Option<DateTime<Utc>>,
}

impl SimulationSnapshot {
    /// Apply one engine update.
    pub fn apply(&mut self, update: SnapshotUpdate) {
        match update {
            SnapshotUpdate::Graph {
                graph,
                revision,
                filter,
            } => {
                self.adjacency = Adjacency::from_graph(&graph);
                self.components = ComponentSummary::of(&graph);
                self.graph = graph;
                self.graph_revision = revision;
                self.filter = filter;
                self.activation = ActivationState::new();
                self.tick = 0;
            }
            SnapshotUpdate::RunStarted { run_id } => {
                self.run_id = Some(run_id);
                self.tick = 0;
                self.activation = ActivationState::new();
            }
            SnapshotUpdate::Tick { tick, activation } => {
                self.tick = tick;
                self.activation = activation;
            }
            SnapshotUpdate::RunEnded { report } => {
                if self.run_id == Some(report.run_id) {
                    self.run_id = None;
                }
                self.runs_ended = self.runs_ended.saturating_add(1);
                self.last_report = Some(*report);
            }
        }
        self.updated_at = Some(Utc::now());
    }

    /// Whether `id` names a configured community.
    pub fn has_community(&self, id: &str) -> bool {
        self.communities.iter().any(|c| c.id.as_str() == id)
    }

    /// Active fraction of the current graph.
    pub fn fraction(&self) -> f64 {
        self.activation.fraction(self.graph.node_count())
    }
}

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`] and injected via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Broadcast sender for tick summary messages.
    pub tx: broadcast::Sender<TickBroadcast>,
    /// The current simulation snapshot.
    pub snapshot: Arc<RwLock<SimulationSnapshot>>,
    /// Shared operator control state (present when the runner is live).
    pub operator_state: Option<Arc<OperatorState>>,
}

impl AppState {
    /// Create a new application state with an empty snapshot.
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            tx,
            snapshot: Arc::new(RwLock::new(SimulationSnapshot::default())),
            operator_state: None,
        }
    }

    /// Create a new application state with operator control state attached.
    pub fn with_operator(operator: Arc<OperatorState>) -> Self {
        Self {
            operator_state: Some(operator),
            ..Self::new()
        }
    }

    /// Subscribe to the tick broadcast channel.
    pub fn subscribe(&self) -> broadcast::Receiver<TickBroadcast> {
        self.tx.subscribe()
    }

    /// Publish a tick summary to all connected clients.
    ///
    /// Returns the number of receivers that got the message; 0 when no
    /// clients are connected.
    pub fn broadcast(&self, summary: &TickBroadcast) -> usize {
        // send only fails when there are zero receivers.
        self.tx.send(summary.clone()).unwrap_or(0)
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
