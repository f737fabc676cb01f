//! Keeps vehicles bound to order sequences busy with the sequence's orders.

use std::sync::Arc;

use kestrel_core::{ObjectService, OrderSequence, ProcState, TransportOrder, Vehicle};
use tracing::{debug, warn};

use super::{impl_lifecycle, Phase};
use crate::candidate::AssignmentCandidate;
use crate::routing::Router;
use crate::selection::{AssignmentCandidateSelectionFilter, SelectionFilter};
use crate::util::TransportOrderUtil;

/// Assigns the next order of a sequence to the vehicle processing it.
///
/// A vehicle qualifies when it is idle or charging, or when it processes a
/// dispensable order of the sequence that its successor may replace.
pub struct AssignSequenceSuccessorsPhase {
    objects: Arc<dyn ObjectService>,
    router: Arc<dyn Router>,
    util: Arc<TransportOrderUtil>,
    candidate_filter: Arc<AssignmentCandidateSelectionFilter>,
    initialized: bool,
}

impl AssignSequenceSuccessorsPhase {
    pub fn new(
        objects: Arc<dyn ObjectService>,
        router: Arc<dyn Router>,
        util: Arc<TransportOrderUtil>,
        candidate_filter: Arc<AssignmentCandidateSelectionFilter>,
    ) -> Self {
        Self {
            objects,
            router,
            util,
            candidate_filter,
            initialized: false,
        }
    }

    /// The dispensable order of the sequence the vehicle may give up.
    fn skippable_order(&self, vehicle: &Vehicle, sequence: &OrderSequence) -> Option<TransportOrder> {
        if !vehicle.has_proc_state(ProcState::ProcessingOrder) {
            return None;
        }
        vehicle
            .transport_order
            .as_deref()
            .and_then(|name| self.objects.transport_order(name))
            .filter(|order| {
                order.dispensable
                    && !order.state.is_final()
                    && order.wrapping_sequence.as_deref() == Some(sequence.name.as_str())
            })
    }

    fn assign_successor(&self, vehicle: &Vehicle, sequence: &OrderSequence) {
        let skippable = self.skippable_order(vehicle, sequence);
        if !vehicle.is_idle_or_charging() && skippable.is_none() {
            return;
        }

        let current = skippable.as_ref().map(|order| order.name.as_str());
        let Some(next) = self.util.next_dispatchable_order_in_sequence(sequence, current) else {
            return;
        };

        let Some(candidate) = AssignmentCandidate::compute(self.router.as_ref(), vehicle, &next) else {
            debug!("No route for {} and {}", next.name, vehicle.name);
            return;
        };
        let reasons = self.candidate_filter.apply(&candidate);
        if !reasons.is_empty() {
            debug!("Sequence successor {} rejected for {}: {:?}", next.name, vehicle.name, reasons);
            return;
        }

        if let Some(skipped) = &skippable {
            if let Err(e) = self.util.skip_order(vehicle, skipped) {
                warn!("Failed to skip {} for {}: {}", skipped.name, next.name, e);
                return;
            }
        }
        if let Err(e) = self
            .util
            .assign_transport_order(vehicle, &next, candidate.drive_orders)
        {
            warn!("Failed to assign {} to {}: {}", next.name, vehicle.name, e);
        }
    }
}

impl_lifecycle!(AssignSequenceSuccessorsPhase);

impl Phase for AssignSequenceSuccessorsPhase {
    fn run(&mut self) {
        let vehicles = self
            .objects
            .vehicles(&|vehicle| vehicle.is_utilized() && vehicle.order_sequence.is_some());

        for vehicle in vehicles {
            let Some(sequence) = vehicle
                .order_sequence
                .as_deref()
                .and_then(|name| self.objects.order_sequence(name))
            else {
                continue;
            };
            self.assign_successor(&vehicle, &sequence);
        }
    }
}
