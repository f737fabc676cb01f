//! Completes withdrawals of orders once their vehicles have stopped.

use std::sync::Arc;

use kestrel_core::{ObjectService, ProcState, TransportOrderState};
use tracing::warn;

use super::{impl_lifecycle, Phase};
use crate::util::TransportOrderUtil;

/// Fails withdrawn orders of vehicles waiting for a new order and releases the vehicles.
pub struct FinishWithdrawalsPhase {
    objects: Arc<dyn ObjectService>,
    util: Arc<TransportOrderUtil>,
    initialized: bool,
}

impl FinishWithdrawalsPhase {
    pub fn new(objects: Arc<dyn ObjectService>, util: Arc<TransportOrderUtil>) -> Self {
        Self {
            objects,
            util,
            initialized: false,
        }
    }
}

impl_lifecycle!(FinishWithdrawalsPhase);

impl Phase for FinishWithdrawalsPhase {
    fn run(&mut self) {
        let vehicles = self
            .objects
            .vehicles(&|vehicle| vehicle.has_proc_state(ProcState::AwaitingOrder));

        for vehicle in vehicles {
            let Some(order) = vehicle
                .transport_order
                .as_deref()
                .and_then(|name| self.objects.transport_order(name))
            else {
                continue;
            };
            if !order.has_state(TransportOrderState::Withdrawn) {
                continue;
            }
            if let Err(e) = self.util.finish_abortion(&vehicle, &order) {
                warn!("Failed to finish withdrawal of {}: {}", order.name, e);
            }
        }
    }
}
