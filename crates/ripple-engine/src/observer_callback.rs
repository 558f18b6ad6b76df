//! Tick callback that feeds the Observer API state.
//!
//! Each hook turns into a [`SnapshotUpdate`] sent to a writer task. The
//! writer waits for the snapshot lock on its own, so a REST reader never
//! stalls the tick loop and a queued update is applied even when the
//! runner goes idle right after producing it. Updates are applied in the
//! order the hooks fired; consecutive tick updates that pile up while the
//! lock is busy collapse into the newest one, since each carries the full
//! activation state.

use std::sync::Arc;

use ripple_core::run::{RunReport, SimulationRun, TickSummary};
use ripple_core::runner::TickCallback;
use ripple_observer::state::{AppState, SimulationSnapshot, SnapshotUpdate, TickBroadcast};
use ripple_types::{CommunityFilter, Graph};
use tokio::sync::{RwLock, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Most updates applied under one write lock.
const WRITE_BATCH: usize = 64;

/// Callback that bridges the runner to the Observer API.
pub struct ObserverCallback {
    state: Arc<AppState>,
    updates: mpsc::UnboundedSender<SnapshotUpdate>,
    writer: JoinHandle<()>,
}

impl ObserverCallback {
    /// Create a new observer callback and spawn its snapshot writer.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(state: Arc<AppState>) -> Self {
        let (updates, rx) = mpsc::unbounded_channel();
        let writer = tokio::spawn(write_updates(Arc::clone(&state.snapshot), rx));
        Self {
            state,
            updates,
            writer,
        }
    }

    /// Close the channel and wait until every queued update is applied.
    pub async fn finish(self) {
        drop(self.updates);
        if let Err(e) = self.writer.await {
            warn!(error = %e, "Snapshot writer task failed");
        }
    }

    fn push(&self, update: SnapshotUpdate) {
        if self.updates.send(update).is_err() {
            warn!("Snapshot writer is gone, dropping update");
        }
    }
}

/// Apply updates as they arrive until every sender is dropped.
async fn write_updates(
    snapshot: Arc<RwLock<SimulationSnapshot>>,
    mut rx: mpsc::UnboundedReceiver<SnapshotUpdate>,
) {
    let mut batch = Vec::with_capacity(WRITE_BATCH);
    while rx.recv_many(&mut batch, WRITE_BATCH).await > 0 {
        let updates = coalesce_ticks(batch.drain(..));
        debug!(updates = updates.len(), "Applying snapshot updates");
        let mut snap = snapshot.write().await;
        for update in updates {
            snap.apply(update);
        }
    }
}

/// Drop every tick update that is directly followed by another one.
fn coalesce_ticks(updates: impl IntoIterator<Item = SnapshotUpdate>) -> Vec<SnapshotUpdate> {
    let mut out: Vec<SnapshotUpdate> = Vec::new();
    for update in updates {
        let superseded = matches!(update, SnapshotUpdate::Tick { .. })
            && matches!(out.last(), Some(SnapshotUpdate::Tick { .. }));
        if superseded {
            out.pop();
        }
        out.push(update);
    }
    out
}

impl TickCallback for ObserverCallback {
    fn on_tick(&mut self, summary: &TickSummary, run: &SimulationRun) {
        let receivers = self
            .state
            .broadcast(&TickBroadcast::from_summary(summary, run.graph_revision()));
        debug!(tick = summary.tick, receivers, "Tick broadcast sent");

        self.push(SnapshotUpdate::Tick {
            tick: summary.tick,
            activation: run.state().clone(),
        });
    }

    fn on_run_start(&mut self, run: &SimulationRun) {
        self.push(SnapshotUpdate::RunStarted {
            run_id: run.run_id(),
        });
    }

    fn on_run_end(&mut self, report: &RunReport) {
        self.push(SnapshotUpdate::RunEnded {
            report: Box::new(report.clone()),
        });
    }

    fn on_graph_changed(&mut self, graph: &Arc<Graph>, revision: u64, filter: &CommunityFilter) {
        self.push(SnapshotUpdate::Graph {
            graph: Arc::clone(graph),
            revision,
            filter: filter.clone(),
        });
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use rand::SeedableRng;
    use rand::rngs::SmallRng;
    use ripple_core::diffusion::DiffusionSimulator;
    use ripple_core::run::RunEndReason;
    use ripple_network::{NetworkSession, NetworkSettings};
    use ripple_types::{ActivationState, RunId};

    use super::*;

    fn session() -> NetworkSession<SmallRng> {
        let settings = NetworkSettings {
            persona_count: 30,
            ..NetworkSettings::default()
        };
        NetworkSession::new(settings, SmallRng::seed_from_u64(9)).unwrap()
    }

    /// Poll the snapshot until `done` holds or a second passes.
    async fn wait_for(state: &AppState, done: impl Fn(&SimulationSnapshot) -> bool) -> bool {
        let poll = async {
            loop {
                if done(&*state.snapshot.read().await) {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        };
        tokio::time::timeout(Duration::from_secs(1), poll).await.is_ok()
    }

    #[tokio::test]
    async fn hooks_update_snapshot() {
        let state = Arc::new(AppState::new());
        let mut rx = state.subscribe();
        let mut cb = ObserverCallback::new(Arc::clone(&state));
        let session = session();

        cb.on_graph_changed(&session.graph(), session.revision(), session.filter());
        let mut run = SimulationRun::start(session.graph(), session.revision(), DiffusionSimulator::default());
        cb.on_run_start(&run);
        let mut rng = SmallRng::seed_from_u64(1);
        let summary = run.step(&mut rng);
        cb.on_tick(&summary, &run);

        let broadcast = rx.recv().await.unwrap();
        assert_eq!(broadcast.tick, 1);
        assert_eq!(broadcast.graph_revision, 1);

        let run_id = run.run_id();
        let activation = run.state().clone();
        assert!(wait_for(&state, |snap| snap.tick == 1).await);
        {
            let snap = state.snapshot.read().await;
            assert_eq!(snap.graph.node_count(), 30);
            assert_eq!(snap.run_id, Some(run_id));
            assert_eq!(snap.activation, activation);
        }

        cb.on_run_end(&run.stop(RunEndReason::OperatorStop));
        cb.finish().await;
        let snap = state.snapshot.read().await;
        assert_eq!(snap.run_id, None);
        assert_eq!(snap.runs_ended, 1);
    }

    #[tokio::test]
    async fn busy_snapshot_defers_updates() {
        let state = Arc::new(AppState::new());
        let mut cb = ObserverCallback::new(Arc::clone(&state));
        let session = session();
        let mut run = SimulationRun::start(session.graph(), session.revision(), DiffusionSimulator::default());
        let mut rng = SmallRng::seed_from_u64(2);

        {
            let _reader = state.snapshot.read().await;
            cb.on_graph_changed(&session.graph(), session.revision(), session.filter());
            cb.on_run_start(&run);
            for _ in 0..3 {
                let summary = run.step(&mut rng);
                cb.on_tick(&summary, &run);
            }
        }

        cb.finish().await;
        let snap = state.snapshot.read().await;
        assert_eq!(snap.graph_revision, 1);
        assert_eq!(snap.tick, 3);
        assert_eq!(&snap.activation, run.state());
    }

    #[tokio::test]
    async fn deferred_run_end_lands_without_further_hooks() {
        let state = Arc::new(AppState::new());
        let mut cb = ObserverCallback::new(Arc::clone(&state));
        let session = session();
        let run = SimulationRun::start(session.graph(), session.revision(), DiffusionSimulator::default());
        cb.on_run_start(&run);
        assert!(wait_for(&state, |snap| snap.run_id.is_some()).await);

        {
            let _reader = state.snapshot.read().await;
            cb.on_run_end(&run.stop(RunEndReason::Saturated));
        }

        // The runner is idle from here on: no hook fires and nothing flushes.
        assert!(wait_for(&state, |snap| snap.run_id.is_none() && snap.runs_ended == 1).await);
        drop(cb);
    }

    #[test]
    fn consecutive_ticks_collapse() {
        let tick = |tick| SnapshotUpdate::Tick {
            tick,
            activation: ActivationState::new(),
        };
        let updates = vec![
            tick(1),
            tick(2),
            SnapshotUpdate::RunStarted { run_id: RunId::new() },
            tick(1),
            tick(2),
            tick(3),
        ];
        let ticks: Vec<Option<u64>> = coalesce_ticks(updates)
            .iter()
            .map(|u| match u {
                SnapshotUpdate::Tick { tick, .. } => Some(*tick),
                _ => None,
            })
            .collect();
        assert_eq!(ticks, vec![Some(2), None, Some(3)]);
    }
}
