//! Assignment candidates.

use kestrel_core::{DriveOrder, TransportOrder, Vehicle};

use crate::routing::Router;

/// A vehicle, an order and the routed drive orders the vehicle would process.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentCandidate {
    pub vehicle: Vehicle,
    pub transport_order: TransportOrder,
    pub drive_orders: Vec<DriveOrder>,
    /// Costs of the route to the first destination.
    pub initial_routing_costs: u64,
}

impl AssignmentCandidate {
    pub fn new(vehicle: Vehicle, transport_order: TransportOrder, drive_orders: Vec<DriveOrder>) -> Self {
        let initial_routing_costs = drive_orders
            .first()
            .and_then(|drive_order| drive_order.route.as_ref())
            .map_or(0, |route| route.costs);
        Self {
            vehicle,
            transport_order,
            drive_orders,
            initial_routing_costs,
        }
    }

    /// Route the order for the vehicle from its current position.
    ///
    /// `None` if the vehicle's position is unknown or the order is not routable for it.
    pub fn compute(router: &dyn Router, vehicle: &Vehicle, order: &TransportOrder) -> Option<Self> {
        let position = vehicle.current_position.as_deref()?;
        let drive_orders = router.route(vehicle, position, order)?;
        Some(Self::new(vehicle.clone(), order.clone(), drive_orders))
    }
}
