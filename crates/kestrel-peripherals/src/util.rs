//! Side effects of dispatching on peripheral jobs and devices.

use std::sync::Arc;

use kestrel_core::{
    ExplainedBoolean, KestrelError, Location, ObjectService, PeripheralJob, PeripheralJobState,
    PeripheralProcState, Result,
};
use tracing::{debug, info, warn};

use crate::controller::PeripheralControllerPool;

/// Applies job assignments and job state transitions to the object pool.
pub struct PeripheralJobUtil {
    objects: Arc<dyn ObjectService>,
    controllers: Arc<dyn PeripheralControllerPool>,
}

impl PeripheralJobUtil {
    pub fn new(objects: Arc<dyn ObjectService>, controllers: Arc<dyn PeripheralControllerPool>) -> Self {
        Self {
            objects,
            controllers,
        }
    }

    /// Ask the device's controller whether it can process the job.
    pub fn can_process(&self, location: &str, job: &PeripheralJob) -> ExplainedBoolean {
        match self.controllers.controller(location) {
            Some(controller) => controller.can_process(job),
            None => ExplainedBoolean::no(format!("No controller attached to {}", location)),
        }
    }

    /// Hand the job to the device at the location.
    ///
    /// The device gets reserved for the job's token. If the controller
    /// refuses to start, the job fails.
    pub fn assign_peripheral_job(&self, location: &Location, job: &PeripheralJob) -> Result<()> {
        let controller = self
            .controllers
            .controller(&location.name)
            .ok_or_else(|| KestrelError::not_found("peripheral controller", location.name.clone()))?;

        self.objects.update_peripheral_job(&job.name, &mut |job| {
            job.state = PeripheralJobState::BeingProcessed;
        })?;
        self.objects.update_location(&location.name, &mut |location| {
            location.peripheral.proc_state = PeripheralProcState::ProcessingJob;
            location.peripheral.peripheral_job = Some(job.name.clone());
            location.peripheral.reservation_token = Some(job.reservation_token.clone());
        })?;
        info!("Assigned peripheral job {} to {}", job.name, location.name);

        if let Err(e) = controller.process(job) {
            self.fail_job(job)?;
            return Err(e);
        }
        Ok(())
    }

    /// Mark the job finished and free its device.
    pub fn finish_job(&self, job: &PeripheralJob) -> Result<()> {
        self.complete_job(job, PeripheralJobState::Finished)?;
        info!("Peripheral job {} finished", job.name);
        Ok(())
    }

    /// Mark the job failed and free its device if it was processing it.
    pub fn fail_job(&self, job: &PeripheralJob) -> Result<()> {
        self.complete_job(job, PeripheralJobState::Failed)?;
        info!("Peripheral job {} failed", job.name);
        Ok(())
    }

    /// Abort the job on its device and fail it.
    ///
    /// The device is reset to idle whatever job it reports to be processing.
    pub fn abort_job(&self, job: &PeripheralJob) -> Result<()> {
        match self.controllers.controller(job.location()) {
            Some(controller) => controller.abort_job(),
            None => warn!("No controller attached to {} to abort {}", job.location(), job.name),
        }
        self.objects.update_peripheral_job(&job.name, &mut |job| {
            job.state = PeripheralJobState::Failed;
        })?;
        self.objects
            .update_location(job.location(), &mut |location| reset_device(location))?;
        info!("Peripheral job {} aborted", job.name);
        Ok(())
    }

    /// Clear the reservation token of the device at the location.
    pub fn release_peripheral(&self, location: &str) -> Result<()> {
        self.objects.update_location(location, &mut |location| {
            location.peripheral.reservation_token = None;
        })?;
        info!("Released peripheral {}", location);
        Ok(())
    }

    fn complete_job(&self, job: &PeripheralJob, state: PeripheralJobState) -> Result<()> {
        self.objects
            .update_peripheral_job(&job.name, &mut |job| job.state = state)?;
        self.objects.update_location(job.location(), &mut |location| {
            if location.peripheral.peripheral_job.as_deref() == Some(job.name.as_str()) {
                reset_device(location);
            }
        })?;
        debug!("Peripheral job {} is now {:?}", job.name, state);
        Ok(())
    }
}

fn reset_device(location: &mut Location) {
    location.peripheral.proc_state = PeripheralProcState::Idle;
    location.peripheral.peripheral_job = None;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::PeripheralControllerRegistry;
    use crate::testing::RecordingController;
    use kestrel_core::{PeripheralOperation, PeripheralState};
    use kestrel_state::InMemoryPlant;

    fn create_plant() -> Arc<InMemoryPlant> {
        let plant = Arc::new(InMemoryPlant::new());
        plant
            .add_location(Location::new("Lift-01", "Lift").with_peripheral_state(PeripheralState::Idle))
            .add_peripheral_job(PeripheralJob::new(
                "Job-01",
                "Vehicle-01",
                PeripheralOperation::new("Lift-01", "UP"),
            ));
        plant
    }

    #[test]
    fn test_assign_and_finish_job() {
        let plant = create_plant();
        let controller = Arc::new(RecordingController::default());
        let registry = Arc::new(PeripheralControllerRegistry::new());
        registry.attach("Lift-01", controller.clone());
        let util = PeripheralJobUtil::new(plant.clone(), registry);

        let location = plant.location("Lift-01").unwrap();
        let job = plant.peripheral_job("Job-01").unwrap();
        util.assign_peripheral_job(&location, &job).unwrap();

        assert_eq!(controller.processed(), vec!["Job-01"]);
        assert_eq!(
            plant.peripheral_job("Job-01").unwrap().state,
            PeripheralJobState::BeingProcessed
        );
        let device = plant.location("Lift-01").unwrap().peripheral;
        assert_eq!(device.proc_state, PeripheralProcState::ProcessingJob);
        assert_eq!(device.reservation_token.as_deref(), Some("Vehicle-01"));

        util.finish_job(&job).unwrap();
        assert_eq!(plant.peripheral_job("Job-01").unwrap().state, PeripheralJobState::Finished);
        let device = plant.location("Lift-01").unwrap().peripheral;
        assert_eq!(device.proc_state, PeripheralProcState::Idle);
        assert!(device.peripheral_job.is_none());
        // The reservation outlives the job until the device is released.
        assert_eq!(device.reservation_token.as_deref(), Some("Vehicle-01"));

        util.release_peripheral("Lift-01").unwrap();
        assert!(plant.location("Lift-01").unwrap().peripheral.reservation_token.is_none());
    }

    #[test]
    fn test_abort_resets_device_processing_another_job() {
        let plant = create_plant();
        let controller = Arc::new(RecordingController::default());
        let registry = Arc::new(PeripheralControllerRegistry::new());
        registry.attach("Lift-01", controller.clone());
        let util = PeripheralJobUtil::new(plant.clone(), registry);

        let location = plant.location("Lift-01").unwrap();
        let job = plant.peripheral_job("Job-01").unwrap();
        util.assign_peripheral_job(&location, &job).unwrap();
        plant
            .update_location("Lift-01", &mut |location| {
                location.peripheral.peripheral_job = Some("Job-02".to_string());
            })
            .unwrap();

        util.abort_job(&job).unwrap();

        assert_eq!(controller.abort_count(), 1);
        assert_eq!(plant.peripheral_job("Job-01").unwrap().state, PeripheralJobState::Failed);
        let device = plant.location("Lift-01").unwrap().peripheral;
        assert_eq!(device.proc_state, PeripheralProcState::Idle);
        assert!(device.peripheral_job.is_none());
    }

    #[test]
    fn test_failing_unstarted_job_leaves_busy_device_alone() {
        let plant = create_plant();
        plant
            .update_location("Lift-01", &mut |location| {
                location.peripheral.proc_state = PeripheralProcState::ProcessingJob;
                location.peripheral.peripheral_job = Some("Job-02".to_string());
            })
            .unwrap();
        let util = PeripheralJobUtil::new(plant.clone(), Arc::new(PeripheralControllerRegistry::new()));

        util.fail_job(&plant.peripheral_job("Job-01").unwrap()).unwrap();

        let device = plant.location("Lift-01").unwrap().peripheral;
        assert_eq!(device.proc_state, PeripheralProcState::ProcessingJob);
        assert_eq!(device.peripheral_job.as_deref(), Some("Job-02"));
    }

    #[test]
    fn test_assign_without_controller_fails() {
        let plant = create_plant();
        let util = PeripheralJobUtil::new(plant.clone(), Arc::new(PeripheralControllerRegistry::new()));

        let location = plant.location("Lift-01").unwrap();
        let job = plant.peripheral_job("Job-01").unwrap();

        assert!(util.assign_peripheral_job(&location, &job).unwrap_err().is_not_found());
        assert!(!util.can_process("Lift-01", &job).value());
        assert_eq!(
            plant.peripheral_job("Job-01").unwrap().state,
            PeripheralJobState::ToBeProcessed
        );
    }
}
