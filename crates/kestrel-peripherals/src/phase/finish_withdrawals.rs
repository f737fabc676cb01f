//! Fails peripheral jobs whose transport order has failed.

use std::sync::Arc;

use kestrel_core::{ObjectService, PeripheralJobState, TransportOrderState};
use tracing::warn;

use super::{impl_lifecycle, PeripheralDispatcherPhase};
use crate::util::PeripheralJobUtil;

/// Fails unfinished jobs tied to a failed transport order.
///
/// A job the device is already processing gets aborted first.
pub struct FinishWithdrawalsPhase {
    objects: Arc<dyn ObjectService>,
    util: Arc<PeripheralJobUtil>,
    initialized: bool,
}

impl FinishWithdrawalsPhase {
    pub fn new(objects: Arc<dyn ObjectService>, util: Arc<PeripheralJobUtil>) -> Self {
        Self {
            objects,
            util,
            initialized: false,
        }
    }
}

impl_lifecycle!(FinishWithdrawalsPhase);

impl PeripheralDispatcherPhase for FinishWithdrawalsPhase {
    fn run(&mut self) {
        let jobs = self
            .objects
            .peripheral_jobs(&|job| !job.state.is_final() && job.related_transport_order.is_some());

        for job in jobs {
            let order_failed = job
                .related_transport_order
                .as_deref()
                .and_then(|name| self.objects.transport_order(name))
                .map_or(false, |order| order.has_state(TransportOrderState::Failed));
            if !order_failed {
                continue;
            }

            let result = if job.has_state(PeripheralJobState::BeingProcessed) {
                self.util.abort_job(&job)
            } else {
                self.util.fail_job(&job)
            };
            if let Err(e) = result {
                warn!("Failed to withdraw peripheral job {}: {}", job.name, e);
            }
        }
    }
}
