//! Orders created for a specific vehicle and then either assigned or failed.
//!
//! Creating the order and resolving it are two separate steps against the
//! object service. If the process stops in between, the order stays behind
//! and is picked up by later cycles like any other order.

use kestrel_core::{
    ObjectService, Result, TransportOrder, TransportOrderCreation, TransportOrderState, Vehicle,
};
use tracing::{debug, warn};

use crate::candidate::AssignmentCandidate;
use crate::routing::Router;
use crate::selection::{AssignmentCandidateSelectionFilter, SelectionFilter};
use crate::util::TransportOrderUtil;

/// An order created on behalf of a vehicle.
#[derive(Debug, Clone, PartialEq)]
pub enum TentativeOrder {
    /// Created, but neither assigned nor failed yet.
    Tentative(TransportOrder),
    /// Assigned to the vehicle it was created for.
    Assigned(TransportOrder),
    /// Not routable or not acceptable for the vehicle, and marked failed.
    Failed(TransportOrder),
}

impl TentativeOrder {
    /// Create the order in the object pool.
    pub fn create(objects: &dyn ObjectService, creation: TransportOrderCreation) -> Result<Self> {
        let order = objects.create_transport_order(creation)?;
        Ok(Self::Tentative(order))
    }

    pub fn order(&self) -> &TransportOrder {
        match self {
            Self::Tentative(order) | Self::Assigned(order) | Self::Failed(order) => order,
        }
    }

    pub fn is_assigned(&self) -> bool {
        matches!(self, Self::Assigned(_))
    }

    /// Route the order for the vehicle and assign it if the candidate is
    /// acceptable; fail the order otherwise. Resolved orders are returned as is.
    pub fn resolve(
        self,
        vehicle: &Vehicle,
        router: &dyn Router,
        filter: &AssignmentCandidateSelectionFilter,
        util: &TransportOrderUtil,
    ) -> Self {
        let order = match self {
            Self::Tentative(order) => order,
            resolved => return resolved,
        };

        match AssignmentCandidate::compute(router, vehicle, &order) {
            Some(candidate) => {
                let reasons = filter.apply(&candidate);
                if reasons.is_empty() {
                    match util.assign_transport_order(vehicle, &order, candidate.drive_orders) {
                        Ok(()) => return Self::Assigned(order),
                        Err(e) => warn!("Failed to assign {} to {}: {}", order.name, vehicle.name, e),
                    }
                } else {
                    debug!("{} rejected for {}: {:?}", order.name, vehicle.name, reasons);
                }
            }
            None => debug!("No route for {} and {}", order.name, vehicle.name),
        }

        if let Err(e) = util.update_transport_order_state(&order.name, TransportOrderState::Failed) {
            warn!("Failed to mark {} as failed: {}", order.name, e);
        }
        Self::Failed(order)
    }
}
