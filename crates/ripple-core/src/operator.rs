//! Operator control state for runtime simulation management.
//!
//! Shared between the tick runner and the operator REST API. The operator
//! can pause/resume stepping, change tick speed, queue commands that start,
//! stop, or reshape runs, and trigger a clean shutdown without killing the
//! process.
//!
//! # Architecture
//!
//! Flags use [`std::sync::atomic`] types so the runner reads them without
//! locks on the hot path. Commands go through a small [`Mutex`]-guarded
//! queue that the runner drains between ticks. A single [`Notify`] wakes
//! the runner whenever it has something new to look at. Signals only reach
//! a [`wake_signal`](OperatorState::wake_signal) taken before them; no
//! permit is stored for later.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use ripple_types::CommunityFilter;
use serde::{Deserialize, Serialize};
use tokio::sync::futures::Notified;
use tokio::sync::{Mutex, Notify};

/// Smallest tick interval accepted at runtime, in milliseconds.
pub const MIN_TICK_INTERVAL_MS: u64 = 100;

/// Reason why the runner loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimulationEndReason {
    /// An operator requested shutdown.
    OperatorShutdown,
    /// The run ended and the runner was configured to exit with it.
    RunCompleted,
}

/// A command queued by the operator and applied between ticks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum OperatorCommand {
    /// Start a new run on the current graph, replacing any active run.
    StartRun,
    /// Stop the active run.
    StopRun,
    /// Replace the community filter and rebuild the graph.
    SetFilter {
        /// The new filter.
        filter: CommunityFilter,
    },
    /// Toggle one community (or `all`) and rebuild the graph.
    ToggleCommunity {
        /// Community id or `all`.
        community: String,
    },
    /// Generate new personas and rebuild the graph.
    Regenerate,
}

/// Shared operator control state.
///
/// Wrapped in [`std::sync::Arc`] and shared between the runner and the
/// operator API handlers.
#[derive(Debug)]
pub struct OperatorState {
    /// Whether stepping is paused.
    paused: AtomicBool,

    /// Wakes the runner on resume, new commands, or shutdown.
    wake: Notify,

    /// Whether a shutdown has been requested.
    shutdown_requested: AtomicBool,

    /// Current tick interval in milliseconds (runtime-adjustable).
    tick_interval_ms: AtomicU64,

    /// Wall-clock time the runner was created.
    started_at: DateTime<Utc>,

    /// Commands awaiting the runner.
    commands: Mutex<VecDeque<OperatorCommand>>,

    /// Reason the runner ended, if it has.
    end_reason: Mutex<Option<SimulationEndReason>>,
}

impl OperatorState {
    /// Create operator state with the given starting interval.
    pub fn new(tick_interval_ms: u64) -> Self {
        Self {
            paused: AtomicBool::new(false),
            wake: Notify::new(),
            shutdown_requested: AtomicBool::new(false),
            tick_interval_ms: AtomicU64::new(tick_interval_ms),
            started_at: Utc::now(),
            commands: Mutex::new(VecDeque::new()),
            end_reason: Mutex::new(None),
        }
    }

    // -----------------------------------------------------------------------
    // Pause / Resume
    // -----------------------------------------------------------------------

    /// Check whether stepping is paused.
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    /// Pause stepping. Queued commands are still applied.
    pub fn pause(&self) {
        self.paused.store(true, Ordering::Release);
    }

    /// Resume stepping and wake the runner.
    pub fn resume(&self) {
        self.paused.store(false, Ordering::Release);
        self.wake.notify_waiters();
    }

    /// A future that completes on the next resume, command, or shutdown.
    ///
    /// Take it before checking flags and draining commands, then await it;
    /// a signal sent in between is not lost.
    pub fn wake_signal(&self) -> Notified<'_> {
        self.wake.notified()
    }

    // -----------------------------------------------------------------------
    // Shutdown
    // -----------------------------------------------------------------------

    /// Request a clean runner shutdown.
    pub fn request_shutdown(&self) {
        self.shutdown_requested.store(true, Ordering::Release);
        self.wake.notify_waiters();
    }

    /// Check whether a shutdown has been requested.
    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown_requested.load(Ordering::Acquire)
    }

    /// Record the reason the runner ended.
    pub async fn set_end_reason(&self, reason: SimulationEndReason) {
        let mut guard = self.end_reason.lock().await;
        *guard = Some(reason);
    }

    /// Get the reason the runner ended, if it has.
    pub async fn end_reason(&self) -> Option<SimulationEndReason> {
        *self.end_reason.lock().await
    }

    // -----------------------------------------------------------------------
    // Tick Speed
    // -----------------------------------------------------------------------

    /// Get the current tick interval in milliseconds.
    pub fn tick_interval_ms(&self) -> u64 {
        self.tick_interval_ms.load(Ordering::Acquire)
    }

    /// Set the tick interval in milliseconds.
    ///
    /// Returns the previous interval on success, or `None` if the value
    /// was below [`MIN_TICK_INTERVAL_MS`].
    pub fn set_tick_interval_ms(&self, ms: u64) -> Option<u64> {
        if ms < MIN_TICK_INTERVAL_MS {
            return None;
        }
        let prev = self.tick_interval_ms.swap(ms, Ordering::AcqRel);
        Some(prev)
    }

    /// Return the wall-clock start time.
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Return elapsed seconds since the runner started.
    pub fn elapsed_seconds(&self) -> u64 {
        let elapsed = Utc::now()
            .signed_duration_since(self.started_at)
            .num_seconds();
        // `num_seconds` can be negative if clocks are weird; treat as 0.
        u64::try_from(elapsed.max(0)).unwrap_or(u64::MAX)
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    /// Queue a command for the runner and wake it.
    pub async fn push_command(&self, command: OperatorCommand) {
        self.commands.lock().await.push_back(command);
        self.wake.notify_waiters();
    }

    /// Drain all queued commands in arrival order.
    pub async fn drain_commands(&self) -> Vec<OperatorCommand> {
        let mut queue = self.commands.lock().await;
        queue.drain(..).collect()
    }

    /// Number of commands waiting.
    pub async fn pending_commands(&self) -> usize {
        self.commands.lock().await.len()
    }
}

/// JSON-serializable runner status for the operator API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperatorStatus {
    /// Whether stepping is paused.
    pub paused: bool,
    /// Whether a shutdown has been requested.
    pub shutdown_requested: bool,
    /// Current tick interval in milliseconds.
    pub tick_interval_ms: u64,
    /// Elapsed wall-clock seconds since start.
    pub elapsed_seconds: u64,
    /// Commands waiting to be applied.
    pub pending_commands: usize,
    /// The active run, if any.
    pub run_id: Option<String>,
    /// Tick of the active run, or 0.
    pub tick: u64,
    /// Current graph revision.
    pub graph_revision: u64,
    /// Runs ended since start.
    pub runs_ended: u64,
    /// The reason the runner ended, if applicable.
    pub end_reason: Option<SimulationEndReason>,
    /// ISO 8601 timestamp of when the runner started.
    pub started_at: String,
}
