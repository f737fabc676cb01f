//! Loopback peripheral devices.
//!
//! A loopback device accepts one job at a time and reports it finished on
//! the next simulation step.

use std::sync::Arc;

use kestrel_core::{
    ExplainedBoolean, KestrelError, ObjectService, PeripheralJob, PeripheralState, Result,
};
use kestrel_peripherals::{PeripheralController, PeripheralControllerRegistry, PeripheralJobUtil};
use parking_lot::Mutex;
use tracing::{info, warn};

pub struct LoopbackController {
    location: String,
    current: Mutex<Option<PeripheralJob>>,
}

impl LoopbackController {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            current: Mutex::new(None),
        }
    }

    /// Take the job the device has been working on.
    pub fn take_job(&self) -> Option<PeripheralJob> {
        self.current.lock().take()
    }

    pub fn current_job(&self) -> Option<PeripheralJob> {
        self.current.lock().clone()
    }
}

impl PeripheralController for LoopbackController {
    fn can_process(&self, job: &PeripheralJob) -> ExplainedBoolean {
        if job.location() != self.location {
            return ExplainedBoolean::no(format!("{} is not a job for {}", job.name, self.location));
        }
        match self.current.lock().as_ref() {
            Some(busy) => ExplainedBoolean::no(format!("Busy with {}", busy.name)),
            None => ExplainedBoolean::yes(),
        }
    }

    fn process(&self, job: &PeripheralJob) -> Result<()> {
        let mut current = self.current.lock();
        if let Some(busy) = current.as_ref() {
            return Err(KestrelError::IllegalState {
                name: self.location.clone(),
                message: format!("Busy with {}", busy.name),
            });
        }
        info!("{} processing {} ({})", self.location, job.name, job.operation.operation);
        *current = Some(job.clone());
        Ok(())
    }

    fn abort_job(&self) {
        if let Some(job) = self.current.lock().take() {
            info!("{} aborted {}", self.location, job.name);
        }
    }
}

/// Loopback devices for every location of the plant that has a peripheral.
pub struct LoopbackPeripherals {
    util: PeripheralJobUtil,
    registry: Arc<PeripheralControllerRegistry>,
    controllers: Vec<Arc<LoopbackController>>,
}

impl LoopbackPeripherals {
    /// Create a device per peripheral location and attach it to the registry.
    pub fn attach_all(
        objects: Arc<dyn ObjectService>,
        registry: Arc<PeripheralControllerRegistry>,
    ) -> Self {
        let mut controllers = Vec::new();
        for location in objects.locations(&|location| {
            location.peripheral.state != PeripheralState::NoPeripheral
        }) {
            let controller = Arc::new(LoopbackController::new(location.name.clone()));
            registry.attach(location.name, controller.clone());
            controllers.push(controller);
        }

        Self {
            util: PeripheralJobUtil::new(objects, registry.clone()),
            registry,
            controllers,
        }
    }

    /// Abort what the devices are processing and detach them from the registry.
    pub fn detach_all(&self) {
        for controller in &self.controllers {
            if let Some(job) = controller.current_job() {
                if let Err(e) = self.util.abort_job(&job) {
                    warn!("Failed to abort peripheral job {}: {}", job.name, e);
                }
            }
            if self.registry.detach(&controller.location).is_some() {
                info!("Detached loopback device from {}", controller.location);
            }
        }
    }

    /// Report every job in progress finished. Returns how many were finished.
    pub fn advance(&self) -> usize {
        let mut finished = 0;
        for job in self.controllers.iter().filter_map(|controller| controller.take_job()) {
            match self.util.finish_job(&job) {
                Ok(()) => finished += 1,
                Err(e) => warn!("Failed to finish peripheral job {}: {}", job.name, e),
            }
        }
        finished
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kestrel_core::{
        Lifecycle, Location, PeripheralJobState, PeripheralOperation, PeripheralProcState,
    };
    use kestrel_peripherals::{PeripheralDispatcher, PeripheralDispatcherConfiguration};
    use kestrel_state::InMemoryPlant;

    fn create_plant() -> Arc<InMemoryPlant> {
        let plant = Arc::new(InMemoryPlant::new());
        plant
            .add_location(Location::new("Lift-01", "Lift").with_peripheral_state(PeripheralState::Idle))
            .add_location(Location::new("Storage-01", "Storage"))
            .add_peripheral_job(PeripheralJob::new(
                "Job-01",
                "Vehicle-01",
                PeripheralOperation::new("Lift-01", "LIFT_UP"),
            ));
        plant
    }

    #[test]
    fn test_devices_are_attached_to_peripheral_locations_only() {
        let plant = create_plant();
        let registry = Arc::new(PeripheralControllerRegistry::new());

        LoopbackPeripherals::attach_all(plant, registry.clone());

        assert_eq!(registry.locations(), vec!["Lift-01"]);
    }

    #[test]
    fn test_processing_a_job_and_finishing_it() {
        let plant = create_plant();
        let registry = Arc::new(PeripheralControllerRegistry::new());
        let devices = LoopbackPeripherals::attach_all(plant.clone(), registry.clone());
        let mut dispatcher =
            PeripheralDispatcher::new(plant.clone(), registry, PeripheralDispatcherConfiguration::default());
        dispatcher.initialize();

        dispatcher.dispatch();
        assert_eq!(
            plant.peripheral_job("Job-01").unwrap().state,
            PeripheralJobState::BeingProcessed
        );

        assert_eq!(devices.advance(), 1);
        assert_eq!(devices.advance(), 0);
        assert_eq!(plant.peripheral_job("Job-01").unwrap().state, PeripheralJobState::Finished);
        let lift = plant.location("Lift-01").unwrap();
        assert_eq!(lift.peripheral.proc_state, PeripheralProcState::Idle);
        assert_eq!(lift.peripheral.reservation_token.as_deref(), Some("Vehicle-01"));

        // The token nobody needs any more is dropped by the next cycle.
        dispatcher.dispatch();
        assert!(plant.location("Lift-01").unwrap().peripheral.reservation_token.is_none());
    }

    #[test]
    fn test_detaching_aborts_jobs_in_progress() {
        let plant = create_plant();
        let registry = Arc::new(PeripheralControllerRegistry::new());
        let devices = LoopbackPeripherals::attach_all(plant.clone(), registry.clone());
        let mut dispatcher = PeripheralDispatcher::new(
            plant.clone(),
            registry.clone(),
            PeripheralDispatcherConfiguration::default(),
        );
        dispatcher.initialize();
        dispatcher.dispatch();

        devices.detach_all();

        assert!(registry.locations().is_empty());
        assert_eq!(plant.peripheral_job("Job-01").unwrap().state, PeripheralJobState::Failed);
        let lift = plant.location("Lift-01").unwrap();
        assert_eq!(lift.peripheral.proc_state, PeripheralProcState::Idle);
        assert!(lift.peripheral.peripheral_job.is_none());
        assert_eq!(devices.advance(), 0);
    }

    #[test]
    fn test_busy_device_refuses_jobs() {
        let controller = LoopbackController::new("Lift-01");
        let first = PeripheralJob::new("Job-01", "A", PeripheralOperation::new("Lift-01", "LIFT_UP"));
        let second = PeripheralJob::new("Job-02", "B", PeripheralOperation::new("Lift-01", "LIFT_UP"));
        let elsewhere = PeripheralJob::new("Job-03", "C", PeripheralOperation::new("Lift-02", "LIFT_UP"));

        assert!(!controller.can_process(&elsewhere).value());
        controller.process(&first).unwrap();
        assert_eq!(controller.can_process(&second).reason(), "Busy with Job-01");
        assert!(controller.process(&second).is_err());

        controller.abort_job();
        assert!(controller.can_process(&second).value());
        assert!(controller.take_job().is_none());
    }
}
