//! Peripheral dispatcher configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the peripheral job dispatcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeripheralDispatcherConfiguration {
    /// Interval between periodic dispatch cycles in milliseconds.
    pub idle_peripheral_redispatching_interval_ms: u64,
}

impl Default for PeripheralDispatcherConfiguration {
    fn default() -> Self {
        Self {
            idle_peripheral_redispatching_interval_ms: 10_000,
        }
    }
}
