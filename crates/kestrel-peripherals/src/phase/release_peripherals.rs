//! Releases reservations of devices nobody needs any more.

use std::sync::Arc;

use kestrel_core::ObjectService;
use tracing::warn;

use super::{impl_lifecycle, PeripheralDispatcherPhase};
use crate::strategy::PeripheralReleaseStrategy;
use crate::util::PeripheralJobUtil;

pub struct ReleasePeripheralsPhase {
    objects: Arc<dyn ObjectService>,
    util: Arc<PeripheralJobUtil>,
    strategy: Arc<dyn PeripheralReleaseStrategy>,
    initialized: bool,
}

impl ReleasePeripheralsPhase {
    pub fn new(
        objects: Arc<dyn ObjectService>,
        util: Arc<PeripheralJobUtil>,
        strategy: Arc<dyn PeripheralReleaseStrategy>,
    ) -> Self {
        Self {
            objects,
            util,
            strategy,
            initialized: false,
        }
    }
}

impl_lifecycle!(ReleasePeripheralsPhase);

impl PeripheralDispatcherPhase for ReleasePeripheralsPhase {
    fn run(&mut self) {
        let reserved = self
            .objects
            .locations(&|location| location.peripheral.reservation_token.is_some());
        if reserved.is_empty() {
            return;
        }

        for location in self.strategy.select_peripherals_to_release(&reserved) {
            if let Err(e) = self.util.release_peripheral(&location.name) {
                warn!("Failed to release peripheral {}: {}", location.name, e);
            }
        }
    }
}
