//! Engine binary for Ripple.
//!
//! Wires the persona network, the activation simulator, the operator
//! controls, and the Observer API together, then runs the simulation loop
//! until shutdown.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `ripple-config.yaml` (or `RIPPLE_CONFIG`)
//! 2. Initialize structured logging (tracing)
//! 3. Validate configuration
//! 4. Generate personas and build the first graph
//! 5. Create the simulator and operator state
//! 6. Start the Observer API server
//! 7. Run the simulation loop
//! 8. Log the result and stop the server

mod error;
mod observer_callback;

use std::path::PathBuf;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use ripple_core::config::{
    CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH, LogFormat, LoggingConfig, SimulationConfig,
};
use ripple_core::diffusion::DiffusionSimulator;
use ripple_core::operator::OperatorState;
use ripple_core::runner;
use ripple_network::{ComponentSummary, NetworkSession};
use ripple_observer::ServerConfig;
use ripple_observer::state::AppState;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;
use crate::observer_callback::ObserverCallback;

/// Application entry point for the engine.
///
/// # Errors
///
/// Returns an error if configuration is invalid, the network cannot be
/// built, the observer cannot start, or the simulation loop fails.
#[tokio::main]
#[allow(clippy::too_many_lines)]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration. The source is logged once tracing is up.
    let (config, source) = load_config()?;

    // 2. Initialize structured logging.
    init_tracing(&config.logging);
    info!(source = %source, "ripple-engine starting");

    // 3. Validate before anything is built.
    config.validate().map_err(EngineError::from)?;
    info!(
        world_name = config.world.name,
        seed = ?config.world.seed,
        tick_interval_ms = config.world.tick_interval_ms,
        persona_count = config.network.persona_count,
        communities = config.network.communities.len(),
        active_communities = ?config.network.active_communities,
        max_ticks_per_run = config.simulation.max_ticks_per_run,
        "Configuration loaded"
    );

    // 4. Generate personas and build the first graph.
    let mut root_rng = match config.world.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let mut step_rng = StdRng::seed_from_u64(root_rng.random());
    let mut session =
        NetworkSession::new(config.network.clone(), root_rng).map_err(EngineError::from)?;

    let graph = session.graph();
    let summary = ComponentSummary::of(&graph);
    info!(
        personas = session.store().len(),
        nodes = summary.node_count,
        links = summary.link_count,
        structural_links = summary.structural_links,
        auxiliary_links = summary.auxiliary_links,
        components = summary.component_count,
        "Persona network built"
    );
    if !summary.is_connected() {
        warn!(
            components = summary.component_count,
            largest = summary.largest_component,
            "Graph is not connected"
        );
    }

    // 5. Create the simulator and operator state.
    let simulator = DiffusionSimulator::new(config.diffusion.clone()).map_err(EngineError::from)?;
    let operator = Arc::new(OperatorState::new(config.world.tick_interval_ms));

    let app_state = Arc::new(AppState::with_operator(Arc::clone(&operator)));
    {
        let mut snap = app_state.snapshot.write().await;
        snap.communities = session.communities().to_vec();
        snap.persona_counts = session.store().community_counts();
    }

    // 6. Start Observer API server.
    let observer_handle = if config.observer.enabled {
        let server_config = ServerConfig {
            host: config.observer.host.clone(),
            port: config.observer.port,
        };
        let handle = ripple_observer::spawn_observer(server_config, Arc::clone(&app_state))
            .map_err(EngineError::from)?;
        Some(handle)
    } else {
        info!("Observer API disabled");
        None
    };

    {
        let operator = Arc::clone(&operator);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Interrupt received, shutting down");
                operator.request_shutdown();
            }
        });
    }

    // 7. Run the simulation.
    let mut callback = ObserverCallback::new(app_state);
    let result = runner::run_simulation(
        &mut session,
        &simulator,
        &operator,
        &config.simulation,
        &mut step_rng,
        &mut callback,
    )
    .await
    .map_err(EngineError::from)?;
    callback.finish().await;

    // 8. Log results and stop the server.
    runner::log_simulation_end(&result);
    if let Some(handle) = observer_handle {
        handle.abort();
    }

    info!(
        end_reason = ?result.end_reason,
        total_ticks = result.total_ticks,
        runs_ended = result.runs_ended,
        "ripple-engine shutdown complete"
    );

    Ok(())
}

/// Load configuration from `RIPPLE_CONFIG` or `ripple-config.yaml`.
///
/// A missing default file falls back to built-in defaults; a missing file
/// named explicitly through the environment is an error.
fn load_config() -> Result<(SimulationConfig, String), EngineError> {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        let config = SimulationConfig::from_file(&PathBuf::from(&path))?;
        return Ok((config, path));
    }

    let path = PathBuf::from(DEFAULT_CONFIG_PATH);
    if path.exists() {
        let config = SimulationConfig::from_file(&path)?;
        Ok((config, String::from(DEFAULT_CONFIG_PATH)))
    } else {
        let mut config = SimulationConfig::default();
        config.observer.apply_env_overrides();
        Ok((config, String::from("defaults")))
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over `logging.level`.
fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    match logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}
