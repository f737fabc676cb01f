//! Node configuration.

use std::path::{Path, PathBuf};

use kestrel_core::{KestrelError, Result};
use kestrel_dispatch::DispatcherConfiguration;
use kestrel_peripherals::PeripheralDispatcherConfiguration;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "KESTREL_CONFIG";

/// Configuration of the node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Log filter overriding `RUST_LOG`, e.g. `debug` or `kestrel_dispatch=trace`.
    pub log_level: Option<String>,

    pub dispatcher: DispatcherConfiguration,

    pub peripherals: PeripheralDispatcherConfiguration,

    /// Interval between steps of the simulated vehicles in milliseconds.
    pub simulation_step_ms: u64,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            log_level: None,
            dispatcher: DispatcherConfiguration::default(),
            peripherals: PeripheralDispatcherConfiguration::default(),
            simulation_step_ms: 500,
        }
    }
}

impl NodeConfig {
    /// Load the configuration from the given JSON file.
    ///
    /// A file that does not exist yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("No configuration at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            KestrelError::Configuration(format!("Cannot read {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Reject intervals of zero; the engine ticks on every configured interval.
    pub fn validate(&self) -> Result<()> {
        let intervals = [
            (
                "dispatcher.idle_vehicle_redispatching_interval_ms",
                self.dispatcher.idle_vehicle_redispatching_interval_ms,
            ),
            (
                "peripherals.idle_peripheral_redispatching_interval_ms",
                self.peripherals.idle_peripheral_redispatching_interval_ms,
            ),
            ("simulation_step_ms", self.simulation_step_ms),
        ];
        match intervals.iter().find(|(_, ms)| *ms == 0) {
            Some((name, _)) => Err(KestrelError::Configuration(format!(
                "{} must be greater than zero",
                name
            ))),
            None => Ok(()),
        }
    }

    /// Load the configuration named by the first argument or by `KESTREL_CONFIG`.
    pub fn from_args(mut args: impl Iterator<Item = String>) -> Result<Self> {
        let path = args
            .nth(1)
            .or_else(|| std::env::var(CONFIG_ENV).ok())
            .map(PathBuf::from);
        match path {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }
}
