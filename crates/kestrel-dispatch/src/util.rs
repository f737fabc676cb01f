//! Side effects of dispatching on transport orders, sequences and vehicles.

use std::sync::Arc;

use kestrel_core::{
    DriveOrder, DriveOrderState, KestrelError, ObjectService, OrderSequence, ProcState, Result,
    ResourceSet, TransportOrder, TransportOrderState, Vehicle,
};
use tracing::{debug, info, warn};

use crate::routing::Router;

/// Applies assignments and order state transitions to the object pool.
pub struct TransportOrderUtil {
    objects: Arc<dyn ObjectService>,
    router: Arc<dyn Router>,
}

impl TransportOrderUtil {
    pub fn new(objects: Arc<dyn ObjectService>, router: Arc<dyn Router>) -> Self {
        Self { objects, router }
    }

    /// Promote new orders: routable raw orders become active, active orders
    /// whose dependencies are all finished become dispatchable.
    pub fn mark_new_dispatchable_orders(&self) {
        for order in self
            .objects
            .transport_orders(&|order| order.has_state(TransportOrderState::Raw))
        {
            let state = if self.router.check_routability(&order) {
                TransportOrderState::Active
            } else {
                warn!("Transport order {} is not routable", order.name);
                TransportOrderState::Unroutable
            };
            self.log_failure(self.update_transport_order_state(&order.name, state));
        }

        for order in self
            .objects
            .transport_orders(&|order| order.has_state(TransportOrderState::Active))
        {
            if self.dependencies_finished(&order) {
                self.log_failure(
                    self.update_transport_order_state(&order.name, TransportOrderState::Dispatchable),
                );
            }
        }
    }

    pub fn update_transport_order_state(&self, order: &str, state: TransportOrderState) -> Result<()> {
        self.objects
            .update_transport_order(order, &mut |order| order.state = state)?;
        debug!("Transport order {} is now {:?}", order, state);
        Ok(())
    }

    /// Hand the routed order to the vehicle.
    pub fn assign_transport_order(
        &self,
        vehicle: &Vehicle,
        order: &TransportOrder,
        drive_orders: Vec<DriveOrder>,
    ) -> Result<()> {
        let claims = claims_of(drive_orders.first());

        self.objects.update_transport_order(&order.name, &mut |order| {
            order.drive_orders = drive_orders.clone();
            order.current_drive_order = 0;
            if let Some(first) = order.drive_orders.first_mut() {
                first.state = DriveOrderState::Travelling;
            }
            order.state = TransportOrderState::BeingProcessed;
            order.processing_vehicle = Some(vehicle.name.clone());
        })?;

        if let Some(sequence) = &order.wrapping_sequence {
            self.objects.update_order_sequence(sequence, &mut |sequence| {
                sequence.processing_vehicle = Some(vehicle.name.clone());
            })?;
        }

        self.objects.update_vehicle(&vehicle.name, &mut |vehicle| {
            vehicle.transport_order = Some(order.name.clone());
            vehicle.proc_state = ProcState::ProcessingOrder;
            vehicle.claimed_resources = claims.clone();
            if order.wrapping_sequence.is_some() {
                vehicle.order_sequence = order.wrapping_sequence.clone();
            }
        })?;

        info!("Assigned transport order {} to {}", order.name, vehicle.name);
        Ok(())
    }

    /// The order of the sequence to process next, if it is dispatchable.
    ///
    /// `current` is the order the vehicle is processing; it is passed over
    /// when looking for its successor.
    pub fn next_dispatchable_order_in_sequence(
        &self,
        sequence: &OrderSequence,
        current: Option<&str>,
    ) -> Option<TransportOrder> {
        let next = sequence
            .unfinished_orders()
            .iter()
            .find(|name| Some(name.as_str()) != current)?;
        self.objects
            .transport_order(next)
            .filter(|order| order.has_state(TransportOrderState::Dispatchable))
    }

    /// Advance the vehicle to the order's next drive order, or finish the order.
    pub fn assign_next_drive_order(&self, vehicle: &Vehicle, order: &TransportOrder) -> Result<()> {
        if order.has_future_drive_orders() {
            let next = order.current_drive_order + 1;
            let claims = claims_of(order.drive_orders.get(next));

            self.objects.update_transport_order(&order.name, &mut |order| {
                if let Some(current) = order.drive_orders.get_mut(order.current_drive_order) {
                    current.state = DriveOrderState::Finished;
                }
                order.current_drive_order = next;
                if let Some(upcoming) = order.drive_orders.get_mut(next) {
                    upcoming.state = DriveOrderState::Travelling;
                }
            })?;
            self.objects.update_vehicle(&vehicle.name, &mut |vehicle| {
                vehicle.proc_state = ProcState::ProcessingOrder;
                vehicle.claimed_resources = claims.clone();
            })?;

            debug!("{} continues with drive order {} of {}", vehicle.name, next, order.name);
            return Ok(());
        }

        self.objects.update_transport_order(&order.name, &mut |order| {
            if let Some(current) = order.drive_orders.get_mut(order.current_drive_order) {
                current.state = DriveOrderState::Finished;
            }
            order.state = TransportOrderState::Finished;
        })?;
        self.release_vehicle(vehicle)?;
        self.finish_in_sequence(vehicle, order, false)?;

        info!("{} finished transport order {}", vehicle.name, order.name);
        Ok(())
    }

    /// Withdraw the order.
    ///
    /// An order a vehicle is processing becomes `Withdrawn` until the vehicle
    /// has stopped; any other unfinished order fails right away.
    pub fn withdraw_order(&self, order: &str) -> Result<()> {
        let order = self
            .objects
            .transport_order(order)
            .ok_or_else(|| KestrelError::not_found("transport order", order))?;

        if order.state.is_final() || order.has_state(TransportOrderState::Withdrawn) {
            return Ok(());
        }

        if order.has_state(TransportOrderState::BeingProcessed) {
            self.update_transport_order_state(&order.name, TransportOrderState::Withdrawn)?;
        } else {
            self.update_transport_order_state(&order.name, TransportOrderState::Failed)?;
            if let Some(sequence) = &order.wrapping_sequence {
                self.objects
                    .update_order_sequence(sequence, &mut |sequence| sequence.mark_finished(&order.name))?;
            }
        }

        info!("Withdrew transport order {}", order.name);
        Ok(())
    }

    /// Complete the withdrawal of an order the vehicle has stopped processing.
    pub fn finish_abortion(&self, vehicle: &Vehicle, order: &TransportOrder) -> Result<()> {
        self.fail_order(order)?;
        self.release_vehicle(vehicle)?;
        self.finish_in_sequence(vehicle, order, true)?;

        info!("{} aborted transport order {}", vehicle.name, order.name);
        Ok(())
    }

    /// Give up a dispensable order in favor of its sequence successor.
    ///
    /// The order fails without failing the sequence, even if failure is fatal.
    pub fn skip_order(&self, vehicle: &Vehicle, order: &TransportOrder) -> Result<()> {
        self.fail_order(order)?;
        self.finish_in_sequence(vehicle, order, false)?;

        info!("{} skipped transport order {}", vehicle.name, order.name);
        Ok(())
    }

    fn fail_order(&self, order: &TransportOrder) -> Result<()> {
        self.objects.update_transport_order(&order.name, &mut |order| {
            if let Some(current) = order.drive_orders.get_mut(order.current_drive_order) {
                current.state = DriveOrderState::Failed;
            }
            order.state = TransportOrderState::Failed;
        })?;
        Ok(())
    }

    fn release_vehicle(&self, vehicle: &Vehicle) -> Result<()> {
        self.objects.update_vehicle(&vehicle.name, &mut |vehicle| {
            vehicle.transport_order = None;
            vehicle.proc_state = ProcState::Idle;
            vehicle.claimed_resources.clear();
        })?;
        Ok(())
    }

    /// Record progress of the order's sequence and unbind the vehicle once it is done.
    fn finish_in_sequence(&self, vehicle: &Vehicle, order: &TransportOrder, failed: bool) -> Result<()> {
        let Some(sequence) = order.wrapping_sequence.as_deref() else {
            return Ok(());
        };
        let Some(current) = self.objects.order_sequence(sequence) else {
            return Err(KestrelError::not_found("order sequence", sequence));
        };

        let mut remaining: Vec<String> = Vec::new();
        if failed && current.failure_fatal {
            remaining = current
                .unfinished_orders()
                .iter()
                .filter(|name| **name != order.name)
                .cloned()
                .collect();
            for name in &remaining {
                self.update_transport_order_state(name, TransportOrderState::Failed)?;
            }
        }

        let updated = self.objects.update_order_sequence(sequence, &mut |sequence| {
            sequence.mark_finished(&order.name);
            if !remaining.is_empty() || (failed && sequence.failure_fatal) {
                for name in &remaining {
                    sequence.mark_finished(name);
                }
                sequence.complete = true;
                sequence.finished = true;
            }
        })?;

        if updated.finished {
            self.objects
                .update_vehicle(&vehicle.name, &mut |vehicle| vehicle.order_sequence = None)?;
            info!("Order sequence {} finished", sequence);
        }
        Ok(())
    }

    fn dependencies_finished(&self, order: &TransportOrder) -> bool {
        order.dependencies.iter().all(|dependency| {
            self.objects
                .transport_order(dependency)
                .map_or(true, |dependency| dependency.has_state(TransportOrderState::Finished))
        })
    }

    fn log_failure(&self, result: Result<()>) {
        if let Err(e) = result {
            warn!("Failed to update transport order: {}", e);
        }
    }
}

/// Resources to claim for the steps of a drive order's route.
fn claims_of(drive_order: Option<&DriveOrder>) -> Vec<ResourceSet> {
    drive_order
        .and_then(|drive_order| drive_order.route.as_ref())
        .map(|route| route.step_resources())
        .unwrap_or_default()
}
