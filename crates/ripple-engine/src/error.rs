//! Error types for the engine binary.
//!
//! [`EngineError`] wraps every failure mode of startup and the run loop so
//! `main` can propagate with `?`.

/// Top-level error for the engine binary.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading or validation failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: ripple_core::config::ConfigError,
    },

    /// Persona generation or graph construction failed.
    #[error("network error: {source}")]
    Network {
        /// The underlying network error.
        #[from]
        source: ripple_network::NetworkError,
    },

    /// The simulation loop failed.
    #[error("runner error: {source}")]
    Runner {
        /// The underlying runner error.
        #[from]
        source: ripple_core::runner::RunnerError,
    },

    /// Observer API server failed to start.
    #[error("observer error: {source}")]
    Observer {
        /// The underlying startup error.
        #[from]
        source: ripple_observer::StartupError,
    },
}
