//! Advances vehicles that finished a drive order.

use std::sync::Arc;

use kestrel_core::{ObjectService, ProcState, TransportOrderState};
use tracing::warn;

use super::{impl_lifecycle, Phase};
use crate::util::TransportOrderUtil;

/// Hands the next drive order to vehicles waiting for one, or finishes their order.
pub struct AssignNextDriveOrdersPhase {
    objects: Arc<dyn ObjectService>,
    util: Arc<TransportOrderUtil>,
    initialized: bool,
}

impl AssignNextDriveOrdersPhase {
    pub fn new(objects: Arc<dyn ObjectService>, util: Arc<TransportOrderUtil>) -> Self {
        Self {
            objects,
            util,
            initialized: false,
        }
    }
}

impl_lifecycle!(AssignNextDriveOrdersPhase);

impl Phase for AssignNextDriveOrdersPhase {
    fn run(&mut self) {
        let vehicles = self
            .objects
            .vehicles(&|vehicle| vehicle.has_proc_state(ProcState::AwaitingOrder));

        for vehicle in vehicles {
            let Some(order) = vehicle
                .transport_order
                .as_deref()
                .and_then(|name| self.objects.transport_order(name))
                .filter(|order| order.has_state(TransportOrderState::BeingProcessed))
            else {
                continue;
            };
            if let Err(e) = self.util.assign_next_drive_order(&vehicle, &order) {
                warn!("Failed to advance {} on {}: {}", vehicle.name, order.name, e);
            }
        }
    }
}
