//! Test doubles shared by the peripheral dispatcher's unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use kestrel_core::{
    Block, ExplainedBoolean, Filter, Location, LocationType, ObjectService, OrderSequence, Path,
    PeripheralJob, Point, Result, TransportOrder, TransportOrderCreation, Vehicle,
};
use kestrel_state::InMemoryPlant;
use parking_lot::Mutex;

use crate::controller::PeripheralController;

/// Controller recording what it was asked to do.
#[derive(Default)]
pub struct RecordingController {
    refusal: Option<String>,
    processed: Mutex<Vec<String>>,
    aborts: AtomicUsize,
}

impl RecordingController {
    /// A controller refusing every job for the given reason.
    pub fn refusing(reason: &str) -> Self {
        Self {
            refusal: Some(reason.to_string()),
            ..Default::default()
        }
    }

    pub fn processed(&self) -> Vec<String> {
        self.processed.lock().clone()
    }

    pub fn abort_count(&self) -> usize {
        self.aborts.load(Ordering::SeqCst)
    }
}

impl PeripheralController for RecordingController {
    fn can_process(&self, _job: &PeripheralJob) -> ExplainedBoolean {
        match &self.refusal {
            Some(reason) => ExplainedBoolean::no(reason.clone()),
            None => ExplainedBoolean::yes(),
        }
    }

    fn process(&self, job: &PeripheralJob) -> Result<()> {
        self.processed.lock().push(job.name.clone());
        Ok(())
    }

    fn abort_job(&self) {
        self.aborts.fetch_add(1, Ordering::SeqCst);
    }
}

/// Object service counting how often peripheral jobs are fetched.
pub struct CountingObjects {
    inner: Arc<InMemoryPlant>,
    job_fetches: AtomicUsize,
}

impl CountingObjects {
    pub fn new(inner: Arc<InMemoryPlant>) -> Self {
        Self {
            inner,
            job_fetches: AtomicUsize::new(0),
        }
    }

    pub fn job_fetches(&self) -> usize {
        self.job_fetches.load(Ordering::SeqCst)
    }
}

impl ObjectService for CountingObjects {
    fn vehicle(&self, name: &str) -> Option<Vehicle> {
        self.inner.vehicle(name)
    }

    fn vehicles(&self, filter: Filter<'_, Vehicle>) -> Vec<Vehicle> {
        self.inner.vehicles(filter)
    }

    fn transport_order(&self, name: &str) -> Option<TransportOrder> {
        self.inner.transport_order(name)
    }

    fn transport_orders(&self, filter: Filter<'_, TransportOrder>) -> Vec<TransportOrder> {
        self.inner.transport_orders(filter)
    }

    fn order_sequence(&self, name: &str) -> Option<OrderSequence> {
        self.inner.order_sequence(name)
    }

    fn point(&self, name: &str) -> Option<Point> {
        self.inner.point(name)
    }

    fn points(&self, filter: Filter<'_, Point>) -> Vec<Point> {
        self.inner.points(filter)
    }

    fn path(&self, name: &str) -> Option<Path> {
        self.inner.path(name)
    }

    fn paths(&self, filter: Filter<'_, Path>) -> Vec<Path> {
        self.inner.paths(filter)
    }

    fn location(&self, name: &str) -> Option<Location> {
        self.inner.location(name)
    }

    fn locations(&self, filter: Filter<'_, Location>) -> Vec<Location> {
        self.inner.locations(filter)
    }

    fn location_type(&self, name: &str) -> Option<LocationType> {
        self.inner.location_type(name)
    }

    fn blocks(&self) -> Vec<Block> {
        self.inner.blocks()
    }

    fn peripheral_job(&self, name: &str) -> Option<PeripheralJob> {
        self.inner.peripheral_job(name)
    }

    fn peripheral_jobs(&self, filter: Filter<'_, PeripheralJob>) -> Vec<PeripheralJob> {
        self.job_fetches.fetch_add(1, Ordering::SeqCst);
        self.inner.peripheral_jobs(filter)
    }

    fn create_transport_order(&self, creation: TransportOrderCreation) -> Result<TransportOrder> {
        self.inner.create_transport_order(creation)
    }

    fn update_vehicle(&self, name: &str, update: &mut dyn FnMut(&mut Vehicle)) -> Result<Vehicle> {
        self.inner.update_vehicle(name, update)
    }

    fn update_transport_order(
        &self,
        name: &str,
        update: &mut dyn FnMut(&mut TransportOrder),
    ) -> Result<TransportOrder> {
        self.inner.update_transport_order(name, update)
    }

    fn update_order_sequence(
        &self,
        name: &str,
        update: &mut dyn FnMut(&mut OrderSequence),
    ) -> Result<OrderSequence> {
        self.inner.update_order_sequence(name, update)
    }

    fn update_location(&self, name: &str, update: &mut dyn FnMut(&mut Location)) -> Result<Location> {
        self.inner.update_location(name, update)
    }

    fn update_peripheral_job(
        &self,
        name: &str,
        update: &mut dyn FnMut(&mut PeripheralJob),
    ) -> Result<PeripheralJob> {
        self.inner.update_peripheral_job(name, update)
    }
}
