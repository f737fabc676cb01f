//! Assigns orders reserved for vehicles that have become available.

use std::sync::Arc;

use kestrel_core::{ObjectService, TransportOrderState, Vehicle};
use tracing::{debug, warn};

use super::{impl_lifecycle, Phase};
use crate::candidate::AssignmentCandidate;
use crate::reservation::OrderReservationPool;
use crate::routing::Router;
use crate::selection::{AssignmentCandidateSelectionFilter, IsUsableForReservations, SelectionFilter};
use crate::util::TransportOrderUtil;

/// Assigns each idle vehicle the first usable order reserved for it.
///
/// A vehicle's reservations are dropped once it has been processed, whether
/// or not an order was assigned.
pub struct AssignReservedOrdersPhase {
    objects: Arc<dyn ObjectService>,
    router: Arc<dyn Router>,
    reservations: Arc<OrderReservationPool>,
    util: Arc<TransportOrderUtil>,
    candidate_filter: Arc<AssignmentCandidateSelectionFilter>,
    vehicle_filter: IsUsableForReservations,
    initialized: bool,
}

impl AssignReservedOrdersPhase {
    pub fn new(
        objects: Arc<dyn ObjectService>,
        router: Arc<dyn Router>,
        reservations: Arc<OrderReservationPool>,
        util: Arc<TransportOrderUtil>,
        candidate_filter: Arc<AssignmentCandidateSelectionFilter>,
    ) -> Self {
        Self {
            objects,
            router,
            reservations,
            util,
            candidate_filter,
            vehicle_filter: IsUsableForReservations,
            initialized: false,
        }
    }

    fn assign_reserved_order(&self, vehicle: &Vehicle, reserved: &[String]) {
        let Some(order) = reserved
            .iter()
            .filter_map(|name| self.objects.transport_order(name))
            .find(|order| {
                order.has_state(TransportOrderState::Dispatchable)
                    && order.is_intended_for(&vehicle.name)
            })
        else {
            debug!("None of the orders reserved for {} is dispatchable", vehicle.name);
            return;
        };

        let Some(candidate) = AssignmentCandidate::compute(self.router.as_ref(), vehicle, &order) else {
            debug!("No route for reserved order {} and {}", order.name, vehicle.name);
            return;
        };

        let reasons = self.candidate_filter.apply(&candidate);
        if !reasons.is_empty() {
            debug!("Reserved order {} rejected for {}: {:?}", order.name, vehicle.name, reasons);
            return;
        }

        if let Err(e) = self
            .util
            .assign_transport_order(vehicle, &order, candidate.drive_orders)
        {
            warn!("Failed to assign reserved order {} to {}: {}", order.name, vehicle.name, e);
        }
    }
}

impl_lifecycle!(AssignReservedOrdersPhase);

impl Phase for AssignReservedOrdersPhase {
    fn run(&mut self) {
        for vehicle in self.objects.vehicles(&|_| true) {
            if !self.vehicle_filter.accepts(&vehicle) {
                self.reservations.remove_reservations(&vehicle.name);
                continue;
            }
            if !vehicle.is_idle_or_charging() {
                continue;
            }

            let reserved = self.reservations.find_reservations(&vehicle.name);
            if reserved.is_empty() {
                continue;
            }

            self.assign_reserved_order(&vehicle, &reserved);
            self.reservations.remove_reservations(&vehicle.name);
        }
    }
}
