//! One simulation run: start, step, stop.
//!
//! A run is bound to a single graph revision. When the graph is rebuilt the
//! driver stops the run and starts a new one; a stopped run cannot resume.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::Rng;
use ripple_types::{ActivationState, Graph, Phase, PersonaId, RunId};
use serde::{Deserialize, Serialize};

use crate::diffusion::DiffusionSimulator;
use crate::tracker::{ActivationReport, ActivationTracker};

/// Outcome of a single step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickSummary {
    /// Run the tick belongs to.
    pub run_id: RunId,
    /// 1-based tick number within the run.
    pub tick: u64,
    /// Phase after the step.
    pub phase: Phase,
    /// Active nodes after the step.
    pub active_count: usize,
    /// Nodes in the graph.
    pub node_count: usize,
    /// Nodes activated by this step.
    pub newly_active: usize,
    /// Nodes blinking after the step.
    pub blinking_count: usize,
    /// Active fraction after the step.
    pub fraction: f64,
    /// Whether every node is now active.
    pub saturated: bool,
}

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunEndReason {
    /// Every node became active.
    Saturated,
    /// The per-run tick limit was reached.
    MaxTicksReached,
    /// An operator stopped the run.
    OperatorStop,
    /// A new run was started in its place.
    Restarted,
    /// The graph was rebuilt under it.
    GraphChanged,
    /// The runner shut down.
    Shutdown,
}

/// Final report of a stopped run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Run identifier.
    pub run_id: RunId,
    /// Graph revision the run was bound to.
    pub graph_revision: u64,
    /// Why the run ended.
    pub end_reason: RunEndReason,
    /// Wall-clock start.
    pub started_at: DateTime<Utc>,
    /// Wall-clock end.
    pub ended_at: DateTime<Utc>,
    /// Steps executed.
    pub ticks: u64,
    /// Phase of the final state.
    pub final_phase: Phase,
    /// Active nodes at the end.
    pub active_count: usize,
    /// Nodes in the graph.
    pub node_count: usize,
    /// Whether every node was active at the end.
    pub saturated: bool,
    /// Adoption statistics.
    pub activation: ActivationReport,
}

/// A live run over one graph revision.
#[derive(Debug)]
pub struct SimulationRun {
    run_id: RunId,
    graph: Arc<Graph>,
    graph_revision: u64,
    simulator: DiffusionSimulator,
    state: ActivationState,
    tracker: ActivationTracker,
    tick: u64,
    started_at: DateTime<Utc>,
}

impl SimulationRun {
    /// Start a run with an empty activation state.
    pub fn start(graph: Arc<Graph>, graph_revision: u64, simulator: DiffusionSimulator) -> Self {
        let tracker = ActivationTracker::new(&graph);
        Self {
            run_id: RunId::new(),
            graph,
            graph_revision,
            simulator,
            state: ActivationState::new(),
            tracker,
            tick: 0,
            started_at: Utc::now(),
        }
    }

    /// Advance one step and summarise it.
    pub fn step(&mut self, rng: &mut impl Rng) -> TickSummary {
        let next = self.simulator.step(&self.graph, &self.state, rng);
        self.tick = self.tick.saturating_add(1);

        let newly: BTreeSet<&PersonaId> = next.active_ids.difference(&self.state.active_ids).collect();
        let newly_active = newly.len();
        self.tracker.record(self.tick, newly);
        self.state = next;

        TickSummary {
            run_id: self.run_id,
            tick: self.tick,
            phase: self.state.phase,
            active_count: self.active_count(),
            node_count: self.graph.node_count(),
            newly_active,
            blinking_count: self.state.blinking_ids.len(),
            fraction: DiffusionSimulator::fraction(&self.graph, &self.state),
            saturated: self.is_saturated(),
        }
    }

    /// Stop the run and produce its report.
    pub fn stop(self, end_reason: RunEndReason) -> RunReport {
        let active_count = self.active_count();
        let saturated = self.is_saturated();
        RunReport {
            run_id: self.run_id,
            graph_revision: self.graph_revision,
            end_reason,
            started_at: self.started_at,
            ended_at: Utc::now(),
            ticks: self.tick,
            final_phase: self.state.phase,
            active_count,
            node_count: self.graph.node_count(),
            saturated,
            activation: self.tracker.report(),
        }
    }

    /// Run identifier.
    pub const fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Steps executed so far.
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Graph revision the run is bound to.
    pub const fn graph_revision(&self) -> u64 {
        self.graph_revision
    }

    /// The graph the run steps over.
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Current activation state.
    pub const fn state(&self) -> &ActivationState {
        &self.state
    }

    /// Active nodes of the run's graph.
    pub fn active_count(&self) -> usize {
        self.graph
            .nodes
            .iter()
            .filter(|n| self.state.is_active(n.id.as_str()))
            .count()
    }

    /// Whether every node is active. An empty graph is never saturated.
    pub fn is_saturated(&self) -> bool {
        !self.graph.is_empty() && self.active_count() == self.graph.node_count()
    }
}
