//! Assigns jobs to devices reserved for the jobs' token.

use std::sync::Arc;

use kestrel_core::{Location, ObjectService, PeripheralJob, PeripheralJobState};
use tracing::{debug, warn};

use super::{impl_lifecycle, PeripheralDispatcherPhase};
use crate::strategy::oldest;
use crate::util::PeripheralJobUtil;

/// Gives each idle, reserved device the oldest job carrying its reservation token.
pub struct AssignReservedPeripheralsPhase {
    objects: Arc<dyn ObjectService>,
    util: Arc<PeripheralJobUtil>,
    initialized: bool,
}

impl AssignReservedPeripheralsPhase {
    pub fn new(objects: Arc<dyn ObjectService>, util: Arc<PeripheralJobUtil>) -> Self {
        Self {
            objects,
            util,
            initialized: false,
        }
    }

    fn select_job<'a>(&self, location: &Location, token: &str, jobs: &'a [PeripheralJob]) -> Option<&'a PeripheralJob> {
        oldest(
            jobs.iter()
                .filter(|job| job.location() == location.name && job.reservation_token == token)
                .filter(|job| {
                    let answer = self.util.can_process(&location.name, job);
                    if !answer.value() {
                        debug!("{} cannot process {}: {}", location.name, job.name, answer.reason());
                    }
                    answer.value()
                }),
        )
    }
}

impl_lifecycle!(AssignReservedPeripheralsPhase);

impl PeripheralDispatcherPhase for AssignReservedPeripheralsPhase {
    fn run(&mut self) {
        let locations = self.objects.locations(&|location| {
            location.is_peripheral_idle() && location.peripheral.reservation_token.is_some()
        });
        if locations.is_empty() {
            return;
        }

        let mut jobs = self
            .objects
            .peripheral_jobs(&|job| job.has_state(PeripheralJobState::ToBeProcessed));

        for location in locations {
            let Some(token) = location.peripheral.reservation_token.as_deref() else {
                continue;
            };
            let Some(job) = self.select_job(&location, token, &jobs).cloned() else {
                continue;
            };
            match self.util.assign_peripheral_job(&location, &job) {
                Ok(()) => jobs.retain(|pending| pending.name != job.name),
                Err(e) => warn!("Failed to assign {} to {}: {}", job.name, location.name, e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::PeripheralControllerRegistry;
    use crate::testing::RecordingController;
    use chrono::{Duration, Utc};
    use kestrel_core::{Lifecycle, PeripheralOperation, PeripheralState};
    use kestrel_state::InMemoryPlant;

    fn job(name: &str, token: &str, age_minutes: i64) -> PeripheralJob {
        PeripheralJob::new(name, token, PeripheralOperation::new("Lift-01", "UP"))
            .with_creation_time(Utc::now() - Duration::minutes(age_minutes))
    }

    fn create_phase(plant: &Arc<InMemoryPlant>, controller: RecordingController) -> (AssignReservedPeripheralsPhase, Arc<RecordingController>) {
        let controller = Arc::new(controller);
        let registry = Arc::new(PeripheralControllerRegistry::new());
        registry.attach("Lift-01", controller.clone());
        let util = Arc::new(PeripheralJobUtil::new(plant.clone(), registry));
        let mut phase = AssignReservedPeripheralsPhase::new(plant.clone(), util);
        phase.initialize();
        (phase, controller)
    }

    fn create_plant() -> Arc<InMemoryPlant> {
        let plant = Arc::new(InMemoryPlant::new());
        plant
            .add_location(
                Location::new("Lift-01", "Lift")
                    .with_peripheral_state(PeripheralState::Idle)
                    .with_reservation_token("Vehicle-01"),
            )
            .add_peripheral_job(job("Job-01", "Vehicle-02", 30))
            .add_peripheral_job(job("Job-02", "Vehicle-01", 5))
            .add_peripheral_job(job("Job-03", "Vehicle-01", 10));
        plant
    }

    #[test]
    fn test_oldest_job_with_matching_token_is_assigned() {
        let plant = create_plant();
        let (mut phase, controller) = create_phase(&plant, RecordingController::default());

        phase.run();

        assert_eq!(controller.processed(), vec!["Job-03"]);
        assert_eq!(
            plant.peripheral_job("Job-01").unwrap().state,
            PeripheralJobState::ToBeProcessed
        );
    }

    #[test]
    fn test_refused_jobs_are_not_assigned() {
        let plant = create_plant();
        let (mut phase, controller) = create_phase(&plant, RecordingController::refusing("Door open"));

        phase.run();

        assert!(controller.processed().is_empty());
        assert_eq!(
            plant.peripheral_job("Job-03").unwrap().state,
            PeripheralJobState::ToBeProcessed
        );
    }
}
