//! Transport orders, drive orders, routes and order sequences.
//!
//! A transport order is a list of destinations a vehicle must visit and the
//! operations it must perform there. Once assigned, every destination is
//! paired with a computed route, forming a drive order.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{KestrelError, Result};
use crate::types::{ResourceRef, ResourceSet};

/// Operation for moving to a point without doing anything there.
pub const OP_MOVE: &str = "MOVE";

/// Operation for parking at a point.
pub const OP_PARK: &str = "PARK";

/// Operation that does nothing.
pub const OP_NOP: &str = "NOP";

/// Order type used when none is given.
pub const ORDER_TYPE_DEFAULT: &str = "-";

/// Order type of orders created for recharging.
pub const ORDER_TYPE_CHARGE: &str = "Charge";

/// Order type of orders created for parking.
pub const ORDER_TYPE_PARK: &str = "Park";

/// State of a transport order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TransportOrderState {
    /// Just created.
    #[default]
    Raw,
    /// Parameters checked, waiting for dependencies.
    Active,
    /// Ready to be assigned to a vehicle.
    Dispatchable,
    /// Assigned to and processed by a vehicle.
    BeingProcessed,
    /// Withdrawn, waiting for the vehicle to stop processing it.
    Withdrawn,
    /// Processed successfully.
    Finished,
    /// Failed or aborted.
    Failed,
    /// No route to its destinations exists.
    Unroutable,
}

impl TransportOrderState {
    /// Returns true if this is a terminal state.
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            TransportOrderState::Finished
                | TransportOrderState::Failed
                | TransportOrderState::Unroutable
        )
    }
}

/// A destination of a transport order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    /// Name of the location or point to go to.
    pub location: String,

    /// Operation to perform there.
    pub operation: String,
}

impl Destination {
    pub fn new(location: impl Into<String>, operation: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            operation: operation.into(),
        }
    }
}

/// One step of a route: an optional path followed by the point it leads to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// Path travelled; `None` for a step that stays on its point.
    pub path: Option<String>,
    pub source_point: Option<String>,
    pub destination_point: String,
}

impl Step {
    /// A step along a path.
    pub fn along(
        path: impl Into<String>,
        source_point: impl Into<String>,
        destination_point: impl Into<String>,
    ) -> Self {
        Self {
            path: Some(path.into()),
            source_point: Some(source_point.into()),
            destination_point: destination_point.into(),
        }
    }

    /// A step that does not move the vehicle.
    pub fn stay(point: impl Into<String>) -> Self {
        Self {
            path: None,
            source_point: None,
            destination_point: point.into(),
        }
    }

    /// The resources a vehicle needs for this step.
    pub fn resources(&self) -> ResourceSet {
        let mut resources = ResourceSet::new();
        if let Some(path) = &self.path {
            resources.insert(ResourceRef::path(path.clone()));
        }
        resources.insert(ResourceRef::point(self.destination_point.clone()));
        resources
    }
}

/// A computed route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub steps: Vec<Step>,
    pub costs: u64,
}

impl Route {
    pub fn new(steps: Vec<Step>, costs: u64) -> Self {
        Self { steps, costs }
    }

    /// The point the route ends at.
    pub fn final_destination_point(&self) -> Option<&str> {
        self.steps.last().map(|step| step.destination_point.as_str())
    }

    /// Resources needed per step, in route order.
    pub fn step_resources(&self) -> Vec<ResourceSet> {
        self.steps.iter().map(Step::resources).collect()
    }
}

/// State of a single drive order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DriveOrderState {
    #[default]
    Pristine,
    Travelling,
    Finished,
    Failed,
}

/// One leg of a transport order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriveOrder {
    pub destination: Destination,
    pub route: Option<Route>,
    pub state: DriveOrderState,
}

impl DriveOrder {
    pub fn new(destination: Destination) -> Self {
        Self {
            destination,
            route: None,
            state: DriveOrderState::Pristine,
        }
    }

    pub fn with_route(mut self, route: Route) -> Self {
        self.route = Some(route);
        self
    }
}

/// A transport order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportOrder {
    pub name: String,

    pub order_type: String,

    pub drive_orders: Vec<DriveOrder>,

    /// Index of the drive order currently processed.
    pub current_drive_order: usize,

    pub state: TransportOrderState,

    /// Whether the order may be withdrawn in favor of another one.
    pub dispensable: bool,

    pub intended_vehicle: Option<String>,

    pub processing_vehicle: Option<String>,

    pub wrapping_sequence: Option<String>,

    /// Orders that must be finished before this one becomes dispatchable.
    #[serde(default)]
    pub dependencies: BTreeSet<String>,

    pub creation_time: DateTime<Utc>,

    pub deadline: DateTime<Utc>,

    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl TransportOrder {
    /// Create a raw order for the given destinations.
    pub fn new(name: impl Into<String>, destinations: Vec<Destination>) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            order_type: ORDER_TYPE_DEFAULT.to_string(),
            drive_orders: destinations.into_iter().map(DriveOrder::new).collect(),
            current_drive_order: 0,
            state: TransportOrderState::Raw,
            dispensable: false,
            intended_vehicle: None,
            processing_vehicle: None,
            wrapping_sequence: None,
            dependencies: BTreeSet::new(),
            creation_time: now,
            deadline: now + Duration::hours(1),
            properties: BTreeMap::new(),
        }
    }

    pub fn with_state(mut self, state: TransportOrderState) -> Self {
        self.state = state;
        self
    }

    pub fn with_type(mut self, order_type: impl Into<String>) -> Self {
        self.order_type = order_type.into();
        self
    }

    pub fn with_dispensable(mut self, dispensable: bool) -> Self {
        self.dispensable = dispensable;
        self
    }

    pub fn with_intended_vehicle(mut self, vehicle: impl Into<String>) -> Self {
        self.intended_vehicle = Some(vehicle.into());
        self
    }

    pub fn with_processing_vehicle(mut self, vehicle: impl Into<String>) -> Self {
        self.processing_vehicle = Some(vehicle.into());
        self
    }

    pub fn with_wrapping_sequence(mut self, sequence: impl Into<String>) -> Self {
        self.wrapping_sequence = Some(sequence.into());
        self
    }

    pub fn with_creation_time(mut self, creation_time: DateTime<Utc>) -> Self {
        self.creation_time = creation_time;
        self
    }

    pub fn with_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn has_state(&self, state: TransportOrderState) -> bool {
        self.state == state
    }

    /// Destinations of all drive orders, in order.
    pub fn destinations(&self) -> Vec<Destination> {
        self.drive_orders
            .iter()
            .map(|drive_order| drive_order.destination.clone())
            .collect()
    }

    pub fn current_drive_order(&self) -> Option<&DriveOrder> {
        self.drive_orders.get(self.current_drive_order)
    }

    /// Whether there is a drive order after the current one.
    pub fn has_future_drive_orders(&self) -> bool {
        self.current_drive_order + 1 < self.drive_orders.len()
    }

    /// The point the last routed drive order ends at.
    pub fn final_destination_point(&self) -> Option<&str> {
        self.drive_orders
            .last()
            .and_then(|drive_order| drive_order.route.as_ref())
            .and_then(Route::final_destination_point)
    }

    /// Whether the given vehicle may process this order.
    pub fn is_intended_for(&self, vehicle: &str) -> bool {
        self.intended_vehicle
            .as_deref()
            .map_or(true, |intended| intended == vehicle)
    }
}

/// An ordered group of transport orders processed by a single vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSequence {
    pub name: String,

    pub orders: Vec<String>,

    /// Index of the last finished order.
    pub finished_index: Option<usize>,

    /// No more orders will be added.
    pub complete: bool,

    /// All orders have been processed.
    pub finished: bool,

    /// A failed order fails the whole sequence.
    pub failure_fatal: bool,

    pub intended_vehicle: Option<String>,

    pub processing_vehicle: Option<String>,
}

impl OrderSequence {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            orders: Vec::new(),
            finished_index: None,
            complete: false,
            finished: false,
            failure_fatal: false,
            intended_vehicle: None,
            processing_vehicle: None,
        }
    }

    pub fn with_order(mut self, order: impl Into<String>) -> Self {
        self.orders.push(order.into());
        self
    }

    pub fn with_complete(mut self, complete: bool) -> Self {
        self.complete = complete;
        self
    }

    pub fn with_failure_fatal(mut self, failure_fatal: bool) -> Self {
        self.failure_fatal = failure_fatal;
        self
    }

    pub fn with_processing_vehicle(mut self, vehicle: impl Into<String>) -> Self {
        self.processing_vehicle = Some(vehicle.into());
        self
    }

    /// Orders after the last finished one.
    pub fn unfinished_orders(&self) -> &[String] {
        let start = self.finished_index.map_or(0, |index| index + 1);
        self.orders.get(start..).unwrap_or(&[])
    }

    /// Whether another order follows the given one in this sequence.
    pub fn has_successor(&self, order: &str) -> bool {
        self.orders
            .iter()
            .position(|name| name == order)
            .map_or(false, |index| index + 1 < self.orders.len())
    }

    /// Mark the given order as done and update the finished flag.
    pub fn mark_finished(&mut self, order: &str) {
        if let Some(index) = self.orders.iter().position(|name| name == order) {
            if self.finished_index.map_or(true, |finished| index > finished) {
                self.finished_index = Some(index);
            }
        }
        self.finished = self.complete && self.unfinished_orders().is_empty();
    }
}

/// Parameters for creating a new transport order.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportOrderCreation {
    pub name: String,
    /// Whether `name` is only a prefix the object pool completes.
    pub incomplete_name: bool,
    pub destinations: Vec<Destination>,
    pub order_type: String,
    pub dispensable: bool,
    pub intended_vehicle: Option<String>,
    pub wrapping_sequence: Option<String>,
    pub dependencies: BTreeSet<String>,
    pub deadline: Option<DateTime<Utc>>,
}

impl TransportOrderCreation {
    /// Create a new builder for an order with the given name.
    pub fn builder(name: impl Into<String>) -> TransportOrderCreationBuilder {
        TransportOrderCreationBuilder::new(name)
    }
}

/// Builder for [`TransportOrderCreation`] with a fluent API.
#[derive(Debug, Default)]
pub struct TransportOrderCreationBuilder {
    name: String,
    incomplete_name: bool,
    destinations: Vec<Destination>,
    order_type: Option<String>,
    dispensable: bool,
    intended_vehicle: Option<String>,
    wrapping_sequence: Option<String>,
    dependencies: BTreeSet<String>,
    deadline: Option<DateTime<Utc>>,
}

impl TransportOrderCreationBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Treat the name as a prefix to be made unique.
    pub fn incomplete_name(mut self, incomplete: bool) -> Self {
        self.incomplete_name = incomplete;
        self
    }

    pub fn destination(mut self, destination: Destination) -> Self {
        self.destinations.push(destination);
        self
    }

    pub fn destinations(mut self, destinations: impl IntoIterator<Item = Destination>) -> Self {
        self.destinations.extend(destinations);
        self
    }

    pub fn order_type(mut self, order_type: impl Into<String>) -> Self {
        self.order_type = Some(order_type.into());
        self
    }

    pub fn dispensable(mut self, dispensable: bool) -> Self {
        self.dispensable = dispensable;
        self
    }

    pub fn intended_vehicle(mut self, vehicle: impl Into<String>) -> Self {
        self.intended_vehicle = Some(vehicle.into());
        self
    }

    pub fn wrapping_sequence(mut self, sequence: impl Into<String>) -> Self {
        self.wrapping_sequence = Some(sequence.into());
        self
    }

    pub fn dependency(mut self, order: impl Into<String>) -> Self {
        self.dependencies.insert(order.into());
        self
    }

    pub fn deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Build the creation parameters.
    pub fn build(self) -> Result<TransportOrderCreation> {
        if self.name.trim().is_empty() && !self.incomplete_name {
            return Err(KestrelError::InvalidOrder {
                name: self.name,
                message: "Order name is required".to_string(),
            });
        }

        if self.destinations.is_empty() {
            return Err(KestrelError::InvalidOrder {
                name: self.name,
                message: "At least one destination is required".to_string(),
            });
        }

        Ok(TransportOrderCreation {
            name: self.name,
            incomplete_name: self.incomplete_name,
            destinations: self.destinations,
            order_type: self
                .order_type
                .unwrap_or_else(|| ORDER_TYPE_DEFAULT.to_string()),
            dispensable: self.dispensable,
            intended_vehicle: self.intended_vehicle,
            wrapping_sequence: self.wrapping_sequence,
            dependencies: self.dependencies,
            deadline: self.deadline,
        })
    }
}
