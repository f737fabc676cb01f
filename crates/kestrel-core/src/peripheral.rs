//! Peripheral jobs: tasks for conveyors, lifts, doors and similar devices.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// State of a peripheral job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PeripheralJobState {
    #[default]
    ToBeProcessed,
    BeingProcessed,
    Finished,
    Failed,
}

impl PeripheralJobState {
    /// Returns true if this is a terminal state.
    pub fn is_final(&self) -> bool {
        matches!(self, PeripheralJobState::Finished | PeripheralJobState::Failed)
    }
}

/// When a peripheral operation is to be triggered relative to vehicle movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionTrigger {
    #[default]
    Immediate,
    AfterAllocation,
    AfterMovement,
}

/// The operation a peripheral device is to perform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeripheralOperation {
    /// Location of the device.
    pub location: String,
    pub operation: String,
    pub execution_trigger: ExecutionTrigger,
    /// Whether the vehicle has to wait for completion.
    pub completion_required: bool,
}

impl PeripheralOperation {
    pub fn new(location: impl Into<String>, operation: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            operation: operation.into(),
            execution_trigger: ExecutionTrigger::Immediate,
            completion_required: false,
        }
    }
}

/// A task for a peripheral device, optionally tied to a vehicle and order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeripheralJob {
    pub name: String,

    /// Token of the party the device gets reserved for while processing.
    pub reservation_token: String,

    pub state: PeripheralJobState,

    pub related_vehicle: Option<String>,

    pub related_transport_order: Option<String>,

    pub operation: PeripheralOperation,

    pub creation_time: DateTime<Utc>,

    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl PeripheralJob {
    pub fn new(
        name: impl Into<String>,
        reservation_token: impl Into<String>,
        operation: PeripheralOperation,
    ) -> Self {
        Self {
            name: name.into(),
            reservation_token: reservation_token.into(),
            state: PeripheralJobState::ToBeProcessed,
            related_vehicle: None,
            related_transport_order: None,
            operation,
            creation_time: Utc::now(),
            properties: BTreeMap::new(),
        }
    }

    pub fn with_state(mut self, state: PeripheralJobState) -> Self {
        self.state = state;
        self
    }

    pub fn with_related_vehicle(mut self, vehicle: impl Into<String>) -> Self {
        self.related_vehicle = Some(vehicle.into());
        self
    }

    pub fn with_related_transport_order(mut self, order: impl Into<String>) -> Self {
        self.related_transport_order = Some(order.into());
        self
    }

    pub fn with_creation_time(mut self, creation_time: DateTime<Utc>) -> Self {
        self.creation_time = creation_time;
        self
    }

    pub fn has_state(&self, state: PeripheralJobState) -> bool {
        self.state == state
    }

    /// Name of the device location this job targets.
    pub fn location(&self) -> &str {
        &self.operation.location
    }
}
