//! The peripheral job dispatcher.

use std::sync::Arc;

use kestrel_core::{KestrelError, Lifecycle, ObjectService, PeripheralJobState, Result};
use tracing::{debug, info, warn};

use crate::config::PeripheralDispatcherConfiguration;
use crate::controller::PeripheralControllerPool;
use crate::phase::{
    AssignFreePeripheralsPhase, AssignReservedPeripheralsPhase, FinishWithdrawalsPhase,
    PeripheralDispatcherPhase, ReleasePeripheralsPhase,
};
use crate::strategy::{
    DefaultJobSelectionStrategy, DefaultPeripheralReleaseStrategy, JobSelectionStrategy,
    PeripheralReleaseStrategy,
};
use crate::util::PeripheralJobUtil;

/// Runs the peripheral phases in a fixed order, one cycle per
/// [`PeripheralDispatcher::dispatch`] call.
pub struct PeripheralDispatcher {
    objects: Arc<dyn ObjectService>,
    util: Arc<PeripheralJobUtil>,
    phases: Vec<Box<dyn PeripheralDispatcherPhase>>,
    configuration: PeripheralDispatcherConfiguration,
    initialized: bool,
}

impl PeripheralDispatcher {
    /// Create a dispatcher with the default job selection and release strategies.
    pub fn new(
        objects: Arc<dyn ObjectService>,
        controllers: Arc<dyn PeripheralControllerPool>,
        configuration: PeripheralDispatcherConfiguration,
    ) -> Self {
        let release = Arc::new(DefaultPeripheralReleaseStrategy::new(objects.clone()));
        Self::with_strategies(
            objects,
            controllers,
            configuration,
            Arc::new(DefaultJobSelectionStrategy),
            release,
        )
    }

    pub fn with_strategies(
        objects: Arc<dyn ObjectService>,
        controllers: Arc<dyn PeripheralControllerPool>,
        configuration: PeripheralDispatcherConfiguration,
        selection: Arc<dyn JobSelectionStrategy>,
        release: Arc<dyn PeripheralReleaseStrategy>,
    ) -> Self {
        let util = Arc::new(PeripheralJobUtil::new(objects.clone(), controllers));

        let phases: Vec<Box<dyn PeripheralDispatcherPhase>> = vec![
            Box::new(FinishWithdrawalsPhase::new(objects.clone(), util.clone())),
            Box::new(ReleasePeripheralsPhase::new(objects.clone(), util.clone(), release)),
            Box::new(AssignReservedPeripheralsPhase::new(objects.clone(), util.clone())),
            Box::new(AssignFreePeripheralsPhase::new(objects.clone(), util.clone(), selection)),
        ];

        Self {
            objects,
            util,
            phases,
            configuration,
            initialized: false,
        }
    }

    /// Run one dispatch cycle.
    pub fn dispatch(&mut self) {
        if !self.initialized {
            warn!("Peripheral dispatcher not initialized, skipping dispatch cycle");
            return;
        }

        debug!("Starting peripheral dispatch cycle");
        for phase in &mut self.phases {
            phase.run();
        }
        debug!("Finished peripheral dispatch cycle");
    }

    /// Withdraw the job, aborting it if its device is already processing it.
    pub fn withdraw_job(&self, job: &str) -> Result<()> {
        let job = self
            .objects
            .peripheral_job(job)
            .ok_or_else(|| KestrelError::not_found("peripheral job", job))?;

        if job.state.is_final() {
            return Ok(());
        }
        if job.has_state(PeripheralJobState::BeingProcessed) {
            self.util.abort_job(&job)
        } else {
            self.util.fail_job(&job)
        }
    }
}

impl Lifecycle for PeripheralDispatcher {
    fn initialize(&mut self) {
        if self.initialized {
            return;
        }
        for phase in &mut self.phases {
            phase.initialize();
        }
        self.initialized = true;
        info!(
            "Peripheral dispatcher initialized with {} phases, redispatching every {} ms",
            self.phases.len(),
            self.configuration.idle_peripheral_redispatching_interval_ms
        );
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn terminate(&mut self) {
        if !self.initialized {
            return;
        }
        for phase in &mut self.phases {
            phase.terminate();
        }
        self.initialized = false;
        info!("Peripheral dispatcher terminated");
    }
}
