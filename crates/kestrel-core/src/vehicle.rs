//! Vehicle model.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::types::ResourceSet;

/// Property naming the only location a vehicle may recharge at.
pub const PROPKEY_ASSIGNED_RECHARGE_LOCATION: &str = "kestrel:assignedRechargeLocation";

/// Property naming the location a vehicle should preferably recharge at.
pub const PROPKEY_PREFERRED_RECHARGE_LOCATION: &str = "kestrel:preferredRechargeLocation";

/// Property naming the only point a vehicle may park at.
pub const PROPKEY_ASSIGNED_PARKING_POSITION: &str = "kestrel:assignedParkingPosition";

/// Property naming the point a vehicle should preferably park at.
pub const PROPKEY_PREFERRED_PARKING_POSITION: &str = "kestrel:preferredParkingPosition";

/// Order type wildcard accepted in a vehicle's allowed order types.
pub const ORDER_TYPE_ANY: &str = "*";

/// Processing state of a vehicle from the dispatcher's view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProcState {
    /// Not processing any order.
    #[default]
    Idle,
    /// Done with the current drive order, waiting for the next one.
    AwaitingOrder,
    /// Executing a drive order.
    ProcessingOrder,
}

/// Physical state of a vehicle as reported by its driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum VehicleState {
    #[default]
    Unknown,
    Unavailable,
    Error,
    Idle,
    Executing,
    Charging,
}

/// How far the fleet core integrates a vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IntegrationLevel {
    /// Ignored entirely.
    ToBeIgnored,
    /// Position is shown, nothing else.
    #[default]
    ToBeNoticed,
    /// Position and resources are respected, no orders are assigned.
    ToBeRespected,
    /// Fully integrated and available for orders.
    ToBeUtilized,
}

/// A vehicle of the fleet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub name: String,

    pub proc_state: ProcState,

    pub state: VehicleState,

    pub integration_level: IntegrationLevel,

    /// Name of the point the vehicle is currently at.
    pub current_position: Option<String>,

    /// Key selecting the envelope used for this vehicle's footprint.
    pub envelope_key: Option<String>,

    /// Resources claimed for upcoming route steps, one set per step.
    #[serde(default)]
    pub claimed_resources: Vec<ResourceSet>,

    /// Resources currently allocated, one set per step.
    #[serde(default)]
    pub allocated_resources: Vec<ResourceSet>,

    /// Energy level in percent.
    pub energy_level: u8,

    /// At or below this level the vehicle must recharge before anything else.
    pub energy_level_critical: u8,

    /// At or below this level the vehicle should recharge when idle.
    pub energy_level_good: u8,

    /// Above this level a charging vehicle may take orders again.
    pub energy_level_sufficiently_recharged: u8,

    /// Operation to perform at a location to recharge.
    pub recharge_operation: String,

    /// Order types this vehicle may process.
    #[serde(default)]
    pub allowed_order_types: BTreeSet<String>,

    /// Order currently being processed.
    pub transport_order: Option<String>,

    /// Order sequence the vehicle is bound to.
    pub order_sequence: Option<String>,

    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl Vehicle {
    /// Create an unintegrated vehicle with default energy thresholds.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            proc_state: ProcState::Idle,
            state: VehicleState::Unknown,
            integration_level: IntegrationLevel::ToBeNoticed,
            current_position: None,
            envelope_key: None,
            claimed_resources: Vec::new(),
            allocated_resources: Vec::new(),
            energy_level: 100,
            energy_level_critical: 30,
            energy_level_good: 90,
            energy_level_sufficiently_recharged: 50,
            recharge_operation: "CHARGE".to_string(),
            allowed_order_types: [ORDER_TYPE_ANY.to_string()].into(),
            transport_order: None,
            order_sequence: None,
            properties: BTreeMap::new(),
        }
    }

    /// Idle, fully integrated vehicle standing at the given point.
    pub fn idle_at(name: impl Into<String>, position: impl Into<String>) -> Self {
        Self::new(name)
            .with_state(VehicleState::Idle)
            .with_integration_level(IntegrationLevel::ToBeUtilized)
            .with_position(position)
    }

    pub fn with_state(mut self, state: VehicleState) -> Self {
        self.state = state;
        self
    }

    pub fn with_proc_state(mut self, proc_state: ProcState) -> Self {
        self.proc_state = proc_state;
        self
    }

    pub fn with_integration_level(mut self, level: IntegrationLevel) -> Self {
        self.integration_level = level;
        self
    }

    pub fn with_position(mut self, position: impl Into<String>) -> Self {
        self.current_position = Some(position.into());
        self
    }

    pub fn with_envelope_key(mut self, key: impl Into<String>) -> Self {
        self.envelope_key = Some(key.into());
        self
    }

    pub fn with_energy_level(mut self, level: u8) -> Self {
        self.energy_level = level;
        self
    }

    pub fn with_allocated_resources(mut self, resources: ResourceSet) -> Self {
        self.allocated_resources.push(resources);
        self
    }

    pub fn with_allowed_order_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_order_types = types.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_transport_order(mut self, order: impl Into<String>) -> Self {
        self.transport_order = Some(order.into());
        self
    }

    pub fn with_order_sequence(mut self, sequence: impl Into<String>) -> Self {
        self.order_sequence = Some(sequence.into());
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    pub fn has_proc_state(&self, proc_state: ProcState) -> bool {
        self.proc_state == proc_state
    }

    pub fn has_state(&self, state: VehicleState) -> bool {
        self.state == state
    }

    /// Whether the vehicle is fully integrated.
    pub fn is_utilized(&self) -> bool {
        self.integration_level == IntegrationLevel::ToBeUtilized
    }

    /// Idle from the dispatcher's view and physically idle or charging.
    pub fn is_idle_or_charging(&self) -> bool {
        self.has_proc_state(ProcState::Idle)
            && matches!(self.state, VehicleState::Idle | VehicleState::Charging)
    }

    pub fn is_energy_level_critical(&self) -> bool {
        self.energy_level <= self.energy_level_critical
    }

    pub fn is_energy_level_degraded(&self) -> bool {
        self.energy_level <= self.energy_level_good
    }

    pub fn is_energy_level_sufficiently_recharged(&self) -> bool {
        self.energy_level > self.energy_level_sufficiently_recharged
    }

    /// Whether this vehicle may process orders of the given type.
    pub fn accepts_order_type(&self, order_type: &str) -> bool {
        self.allowed_order_types.contains(ORDER_TYPE_ANY)
            || self.allowed_order_types.contains(order_type)
    }

    /// All resources currently allocated, flattened.
    pub fn all_allocated_resources(&self) -> ResourceSet {
        self.allocated_resources.iter().flatten().cloned().collect()
    }
}
