//! Assigns jobs to devices that are neither busy nor reserved.

use std::sync::Arc;

use kestrel_core::{ObjectService, PeripheralJobState};
use tracing::{debug, warn};

use super::{impl_lifecycle, PeripheralDispatcherPhase};
use crate::strategy::JobSelectionStrategy;
use crate::util::PeripheralJobUtil;

/// Gives each available device the job its selection strategy picks.
pub struct AssignFreePeripheralsPhase {
    objects: Arc<dyn ObjectService>,
    util: Arc<PeripheralJobUtil>,
    strategy: Arc<dyn JobSelectionStrategy>,
    initialized: bool,
}

impl AssignFreePeripheralsPhase {
    pub fn new(
        objects: Arc<dyn ObjectService>,
        util: Arc<PeripheralJobUtil>,
        strategy: Arc<dyn JobSelectionStrategy>,
    ) -> Self {
        Self {
            objects,
            util,
            strategy,
            initialized: false,
        }
    }
}

impl_lifecycle!(AssignFreePeripheralsPhase);

impl PeripheralDispatcherPhase for AssignFreePeripheralsPhase {
    fn run(&mut self) {
        let locations = self
            .objects
            .locations(&|location| location.is_peripheral_available());
        if locations.is_empty() {
            return;
        }

        let mut jobs = self
            .objects
            .peripheral_jobs(&|job| job.has_state(PeripheralJobState::ToBeProcessed));

        for location in locations {
            let Some(job) = self.strategy.select(&location, &jobs) else {
                continue;
            };
            let answer = self.util.can_process(&location.name, &job);
            if !answer.value() {
                debug!("{} cannot process {}: {}", location.name, job.name, answer.reason());
                continue;
            }
            match self.util.assign_peripheral_job(&location, &job) {
                Ok(()) => jobs.retain(|pending| pending.name != job.name),
                Err(e) => warn!("Failed to assign {} to {}: {}", job.name, location.name, e),
            }
        }
    }
}
