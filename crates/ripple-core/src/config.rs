//! Configuration loading and typed config structures for Ripple.
//!
//! The canonical configuration lives in `ripple-config.yaml` at the project
//! root. Every section and field has a named default, so an empty file is a
//! valid configuration. [`SimulationConfig::validate`] rejects values the
//! generator or simulator cannot work with before anything is built.

use std::path::Path;

use ripple_network::{NetworkError, NetworkSettings};
use serde::Deserialize;
use tracing::warn;

use crate::diffusion::DiffusionParams;
use crate::operator::MIN_TICK_INTERVAL_MS;

/// Config file looked up in the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "ripple-config.yaml";

/// Environment variable overriding the config file path.
pub const CONFIG_PATH_ENV: &str = "RIPPLE_CONFIG";

/// Environment variable overriding `observer.port`.
pub const OBSERVER_PORT_ENV: &str = "RIPPLE_OBSERVER_PORT";

/// Errors that can occur when loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// The network section is invalid.
    #[error("invalid network section: {source}")]
    Network {
        /// The underlying network error.
        #[from]
        source: NetworkError,
    },

    /// A value is outside its allowed range.
    #[error("invalid configuration: {message}")]
    Invalid {
        /// Description of the problem.
        message: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

impl ConfigError {
    /// Shorthand for a [`ConfigError::Invalid`] error.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }
}

/// Top-level configuration.
///
/// Mirrors the structure of `ripple-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SimulationConfig {
    /// World-level settings (name, seed, tick interval).
    #[serde(default)]
    pub world: WorldConfig,

    /// Persona and graph generation.
    #[serde(default)]
    pub network: NetworkSettings,

    /// Activation constants.
    #[serde(default)]
    pub diffusion: DiffusionParams,

    /// Run boundaries and start behaviour.
    #[serde(default)]
    pub simulation: SimulationBoundsConfig,

    /// Observer API server.
    #[serde(default)]
    pub observer: ObserverConfig,

    /// Logging output.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SimulationConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// `RIPPLE_OBSERVER_PORT` overrides `observer.port` when set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Self = serde_yml::from_str(&contents)?;
        config.observer.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yml::from_str(yaml)?;
        Ok(config)
    }

    /// Check every section. Nothing is built from an invalid config.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.world.tick_interval_ms < MIN_TICK_INTERVAL_MS {
            return Err(ConfigError::invalid(format!(
                "world.tick_interval_ms must be at least {MIN_TICK_INTERVAL_MS}, got {}",
                self.world.tick_interval_ms
            )));
        }
        self.network.validate()?;
        self.diffusion.validate()?;
        Ok(())
    }
}

/// World-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WorldConfig {
    /// Human-readable name shown on the status page.
    #[serde(default = "default_world_name")]
    pub name: String,

    /// Random seed. When absent the engine seeds from the OS.
    #[serde(default)]
    pub seed: Option<u64>,

    /// Real-time milliseconds between activation steps.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            name: default_world_name(),
            seed: None,
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

/// Run boundary parameters.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SimulationBoundsConfig {
    /// Maximum steps per run before it ends on its own (0 = unlimited).
    #[serde(default)]
    pub max_ticks_per_run: u64,

    /// Start a run as soon as the engine is up.
    #[serde(default = "default_true")]
    pub auto_start: bool,

    /// Return from the runner once a run ends on its own (saturation or
    /// tick limit) instead of idling for the next start command.
    #[serde(default)]
    pub exit_when_run_ends: bool,
}

impl Default for SimulationBoundsConfig {
    fn default() -> Self {
        Self {
            max_ticks_per_run: 0,
            auto_start: true,
            exit_when_run_ends: false,
        }
    }
}

/// Observer server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ObserverConfig {
    /// Whether to start the observer at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Host address to bind.
    #[serde(default = "default_observer_host")]
    pub host: String,

    /// TCP port to bind.
    #[serde(default = "default_observer_port")]
    pub port: u16,
}

impl ObserverConfig {
    /// Override the port with `RIPPLE_OBSERVER_PORT` when it is set.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var(OBSERVER_PORT_ENV) {
            match val.parse::<u16>() {
                Ok(port) => self.port = port,
                Err(_) => warn!(value = %val, "Ignoring invalid {OBSERVER_PORT_ENV}"),
            }
        }
    }
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: default_observer_host(),
            port: default_observer_port(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_world_name() -> String {
    String::from("Ripple")
}

const fn default_tick_interval_ms() -> u64 {
    500
}

const fn default_true() -> bool {
    true
}

fn default_observer_host() -> String {
    String::from("0.0.0.0")
}

const fn default_observer_port() -> u16 {
    8090
}

fn default_log_level() -> String {
    String::from("info")
}
