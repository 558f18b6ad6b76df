//! Simulation loop runner with operator controls.
//!
//! [`run_simulation`] drives the tick loop around a [`NetworkSession`]:
//!
//! - **Runs**: start on launch (when `auto_start`) or on operator command;
//!   end on saturation, the per-run tick limit, an operator stop, or a
//!   graph change
//! - **Graph changes**: filter updates, community toggles, and persona
//!   regeneration rebuild the graph and discard the active run
//! - **Pause/resume**: stepping halts while commands keep being applied
//! - **Variable tick speed**: interval adjustable at runtime
//! - **Clean shutdown**: the active run is reported before returning

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use ripple_network::{NetworkError, NetworkSession};
use ripple_types::{CommunityFilter, Graph};
use tracing::{debug, info, warn};

use crate::config::SimulationBoundsConfig;
use crate::diffusion::DiffusionSimulator;
use crate::operator::{OperatorCommand, OperatorState, SimulationEndReason};
use crate::run::{RunEndReason, RunReport, SimulationRun, TickSummary};

/// Errors that can occur during the simulation loop.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// Persona regeneration failed on settings that were valid at startup.
    #[error("network error: {source}")]
    Network {
        /// The underlying network error.
        #[from]
        source: NetworkError,
    },
}

/// Result of the simulation loop.
#[derive(Debug)]
pub struct SimulationResult {
    /// The reason the loop ended.
    pub end_reason: SimulationEndReason,
    /// Report of the last run that ended, if any.
    pub last_report: Option<RunReport>,
    /// Runs that ended for any reason.
    pub runs_ended: u64,
    /// Total steps executed across all runs.
    pub total_ticks: u64,
}

/// Observer hooks invoked by the runner.
///
/// Implementations use these to update snapshots and broadcast tick
/// summaries. Every method except [`on_tick`](Self::on_tick) defaults to a
/// no-op.
pub trait TickCallback: Send {
    /// Called after each step of the active run.
    fn on_tick(&mut self, summary: &TickSummary, run: &SimulationRun);

    /// Called when a new run starts.
    fn on_run_start(&mut self, _run: &SimulationRun) {}

    /// Called when a run ends, with its final report.
    fn on_run_end(&mut self, _report: &RunReport) {}

    /// Called after the graph was rebuilt.
    fn on_graph_changed(&mut self, _graph: &Arc<Graph>, _revision: u64, _filter: &CommunityFilter) {}
}

/// A no-op tick callback for testing.
pub struct NoOpCallback;

impl TickCallback for NoOpCallback {
    fn on_tick(&mut self, _summary: &TickSummary, _run: &SimulationRun) {}
}

/// Mutable loop bookkeeping.
struct LoopState {
    run: Option<SimulationRun>,
    last_report: Option<RunReport>,
    runs_ended: u64,
    total_ticks: u64,
}

impl LoopState {
    fn start_run<R: Rng>(
        &mut self,
        session: &NetworkSession<R>,
        simulator: &DiffusionSimulator,
        callback: &mut dyn TickCallback,
    ) {
        self.end_run(RunEndReason::Restarted, callback);
        let run = SimulationRun::start(session.graph(), session.revision(), simulator.clone());
        info!(
            run_id = %run.run_id(),
            graph_revision = run.graph_revision(),
            nodes = run.graph().node_count(),
            "Run started"
        );
        callback.on_run_start(&run);
        self.run = Some(run);
    }

    fn end_run(&mut self, reason: RunEndReason, callback: &mut dyn TickCallback) {
        let Some(run) = self.run.take() else {
            return;
        };
        let report = run.stop(reason);
        info!(
            run_id = %report.run_id,
            reason = ?report.end_reason,
            ticks = report.ticks,
            active = report.active_count,
            nodes = report.node_count,
            "Run ended"
        );
        callback.on_run_end(&report);
        self.runs_ended = self.runs_ended.saturating_add(1);
        self.last_report = Some(report);
    }

    fn finish(self, end_reason: SimulationEndReason) -> SimulationResult {
        SimulationResult {
            end_reason,
            last_report: self.last_report,
            runs_ended: self.runs_ended,
            total_ticks: self.total_ticks,
        }
    }
}

/// Run the simulation loop until shutdown.
///
/// # Arguments
///
/// * `session` - Network session owning personas, filter, and graph
/// * `simulator` - Activation rules cloned into every run
/// * `operator` - Shared operator control state
/// * `bounds` - Run limits and start behaviour
/// * `rng` - Randomness for activation steps
/// * `callback` - Observer hooks
///
/// # Errors
///
/// Returns [`RunnerError`] if persona regeneration fails. Rejected filter
/// and toggle commands are logged and leave the graph untouched.
pub async fn run_simulation<S: Rng + Send>(
    session: &mut NetworkSession<S>,
    simulator: &DiffusionSimulator,
    operator: &Arc<OperatorState>,
    bounds: &SimulationBoundsConfig,
    rng: &mut (impl Rng + Send),
    callback: &mut dyn TickCallback,
) -> Result<SimulationResult, RunnerError> {
    let mut state = LoopState {
        run: None,
        last_report: None,
        runs_ended: 0,
        total_ticks: 0,
    };

    info!(
        max_ticks_per_run = bounds.max_ticks_per_run,
        auto_start = bounds.auto_start,
        tick_interval_ms = operator.tick_interval_ms(),
        graph_revision = session.revision(),
        "Simulation starting"
    );

    callback.on_graph_changed(&session.graph(), session.revision(), session.filter());
    if bounds.auto_start {
        state.start_run(session, simulator, callback);
    }

    loop {
        // Taken first so signals sent while commands are applied or a tick
        // runs still end the wait below.
        let wake = operator.wake_signal();
        tokio::pin!(wake);

        // --- Check shutdown ---
        if operator.is_shutdown_requested() {
            info!("Operator shutdown requested");
            state.end_run(RunEndReason::Shutdown, callback);
            let reason = SimulationEndReason::OperatorShutdown;
            operator.set_end_reason(reason).await;
            return Ok(state.finish(reason));
        }

        // --- Apply queued commands ---
        for command in operator.drain_commands().await {
            apply_command(command, session, simulator, bounds, &mut state, callback)?;
        }

        // --- Idle until woken when there is nothing to step ---
        if state.run.is_none() || operator.is_paused() {
            wake.await;
            continue;
        }
        let Some(run) = state.run.as_mut() else {
            continue;
        };

        // --- Execute tick ---
        let summary = run.step(rng);
        state.total_ticks = state.total_ticks.saturating_add(1);
        callback.on_tick(&summary, run);
        debug!(
            tick = summary.tick,
            phase = %summary.phase,
            active = summary.active_count,
            newly_active = summary.newly_active,
            "Tick complete"
        );

        // --- Check run end (after tick) ---
        let ended = if summary.saturated {
            Some(RunEndReason::Saturated)
        } else if bounds.max_ticks_per_run > 0 && summary.tick >= bounds.max_ticks_per_run {
            Some(RunEndReason::MaxTicksReached)
        } else {
            None
        };
        if let Some(reason) = ended {
            state.end_run(reason, callback);
            if bounds.exit_when_run_ends {
                let reason = SimulationEndReason::RunCompleted;
                operator.set_end_reason(reason).await;
                return Ok(state.finish(reason));
            }
            continue;
        }

        // --- Sleep for tick interval, waking early for commands ---
        let interval_ms = operator.tick_interval_ms();
        if interval_ms == 0 {
            tokio::task::yield_now().await;
        } else {
            tokio::select! {
                () = tokio::time::sleep(Duration::from_millis(interval_ms)) => {}
                () = &mut wake => {}
            }
        }
    }
}

/// Apply one operator command between ticks.
fn apply_command<S: Rng>(
    command: OperatorCommand,
    session: &mut NetworkSession<S>,
    simulator: &DiffusionSimulator,
    bounds: &SimulationBoundsConfig,
    state: &mut LoopState,
    callback: &mut dyn TickCallback,
) -> Result<(), RunnerError> {
    debug!(?command, "Applying operator command");
    let rebuilt = match command {
        OperatorCommand::StartRun => {
            state.start_run(session, simulator, callback);
            return Ok(());
        }
        OperatorCommand::StopRun => {
            if state.run.is_none() {
                debug!("Stop requested with no active run");
            }
            state.end_run(RunEndReason::OperatorStop, callback);
            return Ok(());
        }
        OperatorCommand::SetFilter { filter } => session.set_filter(filter),
        OperatorCommand::ToggleCommunity { community } => session.toggle_community(&community),
        OperatorCommand::Regenerate => Ok(session.regenerate()?),
    };

    let graph = match rebuilt {
        Ok(graph) => graph,
        Err(e) => {
            warn!(error = %e, "Operator command rejected");
            return Ok(());
        }
    };

    state.end_run(RunEndReason::GraphChanged, callback);
    callback.on_graph_changed(&graph, session.revision(), session.filter());
    info!(
        graph_revision = session.revision(),
        nodes = graph.node_count(),
        links = graph.link_count(),
        filter = ?session.filter().selectors(),
        "Graph changed"
    );
    if bounds.auto_start {
        state.start_run(session, simulator, callback);
    }
    Ok(())
}

/// Log the end of the simulation loop.
///
/// Called after [`run_simulation`] returns. The HTTP server may keep
/// serving the final snapshot after this.
pub fn log_simulation_end(result: &SimulationResult) {
    info!(
        reason = ?result.end_reason,
        runs_ended = result.runs_ended,
        total_ticks = result.total_ticks,
        "Simulation ended"
    );

    if let Some(ref report) = result.last_report {
        info!(
            run_id = %report.run_id,
            ticks = report.ticks,
            active = report.active_count,
            nodes = report.node_count,
            saturated = report.saturated,
            half_penetration_tick = ?report.activation.half_penetration_tick,
            "Final run report"
        );
    } else {
        warn!("Simulation ended with no completed runs");
    }
}
