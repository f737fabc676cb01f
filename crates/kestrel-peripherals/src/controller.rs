//! Controllers of peripheral devices.

use std::collections::HashMap;
use std::sync::Arc;

use kestrel_core::{ExplainedBoolean, PeripheralJob, Result};
use parking_lot::RwLock;
use tracing::debug;

/// Drives the peripheral device attached to one location.
pub trait PeripheralController: Send + Sync {
    /// Whether the device is able to process the job right now.
    fn can_process(&self, job: &PeripheralJob) -> ExplainedBoolean;

    /// Start processing the job.
    fn process(&self, job: &PeripheralJob) -> Result<()>;

    /// Abort the job the device is currently processing.
    fn abort_job(&self);
}

/// Looks up the controller attached to a location.
pub trait PeripheralControllerPool: Send + Sync {
    fn controller(&self, location: &str) -> Option<Arc<dyn PeripheralController>>;
}

/// Controllers attached to locations at runtime.
#[derive(Default)]
pub struct PeripheralControllerRegistry {
    controllers: RwLock<HashMap<String, Arc<dyn PeripheralController>>>,
}

impl PeripheralControllerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a controller to the location, replacing any attached before.
    pub fn attach(&self, location: impl Into<String>, controller: Arc<dyn PeripheralController>) {
        let location = location.into();
        debug!("Attaching peripheral controller to {}", location);
        self.controllers.write().insert(location, controller);
    }

    pub fn detach(&self, location: &str) -> Option<Arc<dyn PeripheralController>> {
        self.controllers.write().remove(location)
    }

    /// Locations with an attached controller, sorted by name.
    pub fn locations(&self) -> Vec<String> {
        let mut locations: Vec<String> = self.controllers.read().keys().cloned().collect();
        locations.sort();
        locations
    }
}

impl PeripheralControllerPool for PeripheralControllerRegistry {
    fn controller(&self, location: &str) -> Option<Arc<dyn PeripheralController>> {
        self.controllers.read().get(location).cloned()
    }
}
