//! Matches available vehicles with freely dispatchable orders.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::sync::Arc;

use kestrel_core::{ObjectService, ProcState, TransportOrder, TransportOrderState, Vehicle};
use tracing::{debug, info, warn};

use super::{impl_lifecycle, Phase};
use crate::candidate::AssignmentCandidate;
use crate::reservation::OrderReservationPool;
use crate::routing::Router;
use crate::selection::{
    AssignmentCandidateSelectionFilter, IsAvailableForAnyOrder, IsFreelyDispatchableToAnyVehicle,
    SelectionFilter,
};
use crate::util::TransportOrderUtil;

/// Assigns free orders to available vehicles, cheapest candidates first.
///
/// A vehicle busy with a dispensable order has that order withdrawn and the
/// new order reserved for it instead.
pub struct AssignFreeOrdersPhase {
    objects: Arc<dyn ObjectService>,
    router: Arc<dyn Router>,
    reservations: Arc<OrderReservationPool>,
    util: Arc<TransportOrderUtil>,
    candidate_filter: Arc<AssignmentCandidateSelectionFilter>,
    vehicle_filter: IsAvailableForAnyOrder,
    order_filter: IsFreelyDispatchableToAnyVehicle,
    initialized: bool,
}

impl AssignFreeOrdersPhase {
    pub fn new(
        objects: Arc<dyn ObjectService>,
        router: Arc<dyn Router>,
        reservations: Arc<OrderReservationPool>,
        util: Arc<TransportOrderUtil>,
        candidate_filter: Arc<AssignmentCandidateSelectionFilter>,
    ) -> Self {
        Self {
            vehicle_filter: IsAvailableForAnyOrder::new(objects.clone(), reservations.clone()),
            order_filter: IsFreelyDispatchableToAnyVehicle::new(objects.clone(), reservations.clone()),
            objects,
            router,
            reservations,
            util,
            candidate_filter,
            initialized: false,
        }
    }

    fn candidates(&self, vehicles: &[Vehicle], orders: &[TransportOrder]) -> Vec<AssignmentCandidate> {
        let mut candidates = Vec::new();
        for vehicle in vehicles {
            for order in orders.iter().filter(|order| order.is_intended_for(&vehicle.name)) {
                let Some(candidate) = AssignmentCandidate::compute(self.router.as_ref(), vehicle, order)
                else {
                    continue;
                };
                let reasons = self.candidate_filter.apply(&candidate);
                if reasons.is_empty() {
                    candidates.push(candidate);
                } else {
                    debug!("{} rejected for {}: {:?}", order.name, vehicle.name, reasons);
                }
            }
        }
        candidates.sort_by(compare_candidates);
        candidates
    }

    fn assign(&self, candidate: AssignmentCandidate) -> bool {
        let vehicle = &candidate.vehicle;
        let order = &candidate.transport_order;

        if vehicle.has_proc_state(ProcState::ProcessingOrder) {
            let Some(current) = vehicle.transport_order.as_deref() else {
                return false;
            };
            if let Err(e) = self.util.withdraw_order(current) {
                warn!("Failed to withdraw {} from {}: {}", current, vehicle.name, e);
                return false;
            }
            self.reservations.add_reservation(&order.name, &vehicle.name);
            info!("Withdrew {} from {} in favor of {}", current, vehicle.name, order.name);
            return true;
        }

        match self
            .util
            .assign_transport_order(vehicle, order, candidate.drive_orders.clone())
        {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to assign {} to {}: {}", order.name, vehicle.name, e);
                false
            }
        }
    }
}

/// Cheapest first, then earliest deadline, oldest order and names.
fn compare_candidates(a: &AssignmentCandidate, b: &AssignmentCandidate) -> Ordering {
    a.initial_routing_costs
        .cmp(&b.initial_routing_costs)
        .then_with(|| a.transport_order.deadline.cmp(&b.transport_order.deadline))
        .then_with(|| a.transport_order.creation_time.cmp(&b.transport_order.creation_time))
        .then_with(|| a.transport_order.name.cmp(&b.transport_order.name))
        .then_with(|| a.vehicle.name.cmp(&b.vehicle.name))
}

impl_lifecycle!(AssignFreeOrdersPhase);

impl Phase for AssignFreeOrdersPhase {
    fn run(&mut self) {
        let vehicles: Vec<Vehicle> = self
            .objects
            .vehicles(&|_| true)
            .into_iter()
            .filter(|vehicle| self.vehicle_filter.accepts(vehicle))
            .collect();
        if vehicles.is_empty() {
            return;
        }

        let orders: Vec<TransportOrder> = self
            .objects
            .transport_orders(&|order| order.has_state(TransportOrderState::Dispatchable))
            .into_iter()
            .filter(|order| self.order_filter.accepts(order))
            .collect();
        if orders.is_empty() {
            return;
        }

        let mut assigned_vehicles = BTreeSet::new();
        let mut assigned_orders = BTreeSet::new();
        for candidate in self.candidates(&vehicles, &orders) {
            if assigned_vehicles.contains(&candidate.vehicle.name)
                || assigned_orders.contains(&candidate.transport_order.name)
            {
                continue;
            }
            let vehicle = candidate.vehicle.name.clone();
            let order = candidate.transport_order.name.clone();
            if self.assign(candidate) {
                assigned_vehicles.insert(vehicle);
                assigned_orders.insert(order);
            }
        }
    }
}
