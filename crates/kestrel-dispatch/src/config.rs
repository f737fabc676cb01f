//! Dispatcher configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the transport order dispatcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfiguration {
    /// Send idle vehicles with a degraded energy level to a recharge location.
    pub recharge_idle_vehicles: bool,

    /// Send idle vehicles to a parking position.
    pub park_idle_vehicles: bool,

    /// Interval between periodic dispatch cycles in milliseconds.
    pub idle_vehicle_redispatching_interval_ms: u64,
}

impl Default for DispatcherConfiguration {
    fn default() -> Self {
        Self {
            recharge_idle_vehicles: true,
            park_idle_vehicles: false,
            idle_vehicle_redispatching_interval_ms: 10_000,
        }
    }
}
