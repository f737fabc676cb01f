//! Assignment candidate filters.

use kestrel_core::order::ORDER_TYPE_CHARGE;

use super::{
    reasons, CompositeFilter, SelectionFilter, ENERGY_LEVEL_CRITICAL, INTENDED_VEHICLE,
    ORDER_TYPE, ROUTE_INCOMPLETE,
};
use crate::candidate::AssignmentCandidate;

/// The composite filter every candidate must pass before it is assigned.
pub type AssignmentCandidateSelectionFilter = CompositeFilter<AssignmentCandidate>;

impl CompositeFilter<AssignmentCandidate> {
    /// All candidate filters of the dispatcher.
    pub fn standard() -> Self {
        Self::new()
            .with(OrderTypeAllowed)
            .with(IntendedVehicleMatches)
            .with(EnergyLevelSufficient)
            .with(RouteComplete)
    }
}

/// The vehicle accepts the order's type.
#[derive(Debug, Default)]
pub struct OrderTypeAllowed;

impl SelectionFilter<AssignmentCandidate> for OrderTypeAllowed {
    fn apply(&self, candidate: &AssignmentCandidate) -> Vec<String> {
        reasons([(
            !candidate
                .vehicle
                .accepts_order_type(&candidate.transport_order.order_type),
            ORDER_TYPE,
        )])
    }
}

/// The order is not intended for a different vehicle.
#[derive(Debug, Default)]
pub struct IntendedVehicleMatches;

impl SelectionFilter<AssignmentCandidate> for IntendedVehicleMatches {
    fn apply(&self, candidate: &AssignmentCandidate) -> Vec<String> {
        reasons([(
            !candidate
                .transport_order
                .is_intended_for(&candidate.vehicle.name),
            INTENDED_VEHICLE,
        )])
    }
}

/// A vehicle with critical energy level only takes recharge orders.
#[derive(Debug, Default)]
pub struct EnergyLevelSufficient;

impl SelectionFilter<AssignmentCandidate> for EnergyLevelSufficient {
    fn apply(&self, candidate: &AssignmentCandidate) -> Vec<String> {
        reasons([(
            candidate.vehicle.is_energy_level_critical()
                && candidate.transport_order.order_type != ORDER_TYPE_CHARGE,
            ENERGY_LEVEL_CRITICAL,
        )])
    }
}

/// Every drive order of the order has a route.
#[derive(Debug, Default)]
pub struct RouteComplete;

impl SelectionFilter<AssignmentCandidate> for RouteComplete {
    fn apply(&self, candidate: &AssignmentCandidate) -> Vec<String> {
        let complete = !candidate.drive_orders.is_empty()
            && candidate.drive_orders.len() == candidate.transport_order.drive_orders.len()
            && candidate
                .drive_orders
                .iter()
                .all(|drive_order| drive_order.route.is_some());
        reasons([(!complete, ROUTE_INCOMPLETE)])
    }
}
