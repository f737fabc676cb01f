//! In-memory object pool.

use std::collections::BTreeMap;

use chrono::{Duration, Utc};
use kestrel_core::{
    Block, Filter, KestrelError, Location, LocationType, ObjectService, OrderSequence, Path,
    PeripheralJob, Point, Result, TransportOrder, TransportOrderCreation, TransportOrderState,
    Vehicle,
};
use parking_lot::RwLock;
use tracing::debug;
use uuid::Uuid;

/// All objects of the plant, keyed by name.
#[derive(Debug, Default)]
struct PlantObjects {
    points: BTreeMap<String, Point>,
    paths: BTreeMap<String, Path>,
    location_types: BTreeMap<String, LocationType>,
    locations: BTreeMap<String, Location>,
    blocks: BTreeMap<String, Block>,
    vehicles: BTreeMap<String, Vehicle>,
    transport_orders: BTreeMap<String, TransportOrder>,
    order_sequences: BTreeMap<String, OrderSequence>,
    peripheral_jobs: BTreeMap<String, PeripheralJob>,
}

/// Thread-safe in-memory implementation of [`ObjectService`].
///
/// Objects are kept in name order, so every fetch returns them sorted by name.
#[derive(Debug, Default)]
pub struct InMemoryPlant {
    objects: RwLock<PlantObjects>,
}

impl InMemoryPlant {
    /// Create an empty plant.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_point(&self, point: Point) -> &Self {
        self.objects.write().points.insert(point.name.clone(), point);
        self
    }

    pub fn add_path(&self, path: Path) -> &Self {
        self.objects.write().paths.insert(path.name.clone(), path);
        self
    }

    pub fn add_location_type(&self, location_type: LocationType) -> &Self {
        self.objects
            .write()
            .location_types
            .insert(location_type.name.clone(), location_type);
        self
    }

    pub fn add_location(&self, location: Location) -> &Self {
        self.objects
            .write()
            .locations
            .insert(location.name.clone(), location);
        self
    }

    pub fn add_block(&self, block: Block) -> &Self {
        self.objects.write().blocks.insert(block.name.clone(), block);
        self
    }

    pub fn add_vehicle(&self, vehicle: Vehicle) -> &Self {
        self.objects
            .write()
            .vehicles
            .insert(vehicle.name.clone(), vehicle);
        self
    }

    /// Store a transport order as given, bypassing creation checks.
    pub fn add_transport_order(&self, order: TransportOrder) -> &Self {
        self.objects
            .write()
            .transport_orders
            .insert(order.name.clone(), order);
        self
    }

    pub fn add_order_sequence(&self, sequence: OrderSequence) -> &Self {
        self.objects
            .write()
            .order_sequences
            .insert(sequence.name.clone(), sequence);
        self
    }

    pub fn add_peripheral_job(&self, job: PeripheralJob) -> &Self {
        self.objects
            .write()
            .peripheral_jobs
            .insert(job.name.clone(), job);
        self
    }
}

fn select<T: Clone>(objects: &BTreeMap<String, T>, filter: Filter<'_, T>) -> Vec<T> {
    objects.values().filter(|object| filter(object)).cloned().collect()
}

fn update<T: Clone>(
    objects: &mut BTreeMap<String, T>,
    kind: &'static str,
    name: &str,
    update: &mut dyn FnMut(&mut T),
) -> Result<T> {
    let object = objects
        .get_mut(name)
        .ok_or_else(|| KestrelError::not_found(kind, name))?;
    update(object);
    Ok(object.clone())
}

impl ObjectService for InMemoryPlant {
    fn vehicle(&self, name: &str) -> Option<Vehicle> {
        self.objects.read().vehicles.get(name).cloned()
    }

    fn vehicles(&self, filter: Filter<'_, Vehicle>) -> Vec<Vehicle> {
        select(&self.objects.read().vehicles, filter)
    }

    fn transport_order(&self, name: &str) -> Option<TransportOrder> {
        self.objects.read().transport_orders.get(name).cloned()
    }

    fn transport_orders(&self, filter: Filter<'_, TransportOrder>) -> Vec<TransportOrder> {
        select(&self.objects.read().transport_orders, filter)
    }

    fn order_sequence(&self, name: &str) -> Option<OrderSequence> {
        self.objects.read().order_sequences.get(name).cloned()
    }

    fn point(&self, name: &str) -> Option<Point> {
        self.objects.read().points.get(name).cloned()
    }

    fn points(&self, filter: Filter<'_, Point>) -> Vec<Point> {
        select(&self.objects.read().points, filter)
    }

    fn path(&self, name: &str) -> Option<Path> {
        self.objects.read().paths.get(name).cloned()
    }

    fn paths(&self, filter: Filter<'_, Path>) -> Vec<Path> {
        select(&self.objects.read().paths, filter)
    }

    fn location(&self, name: &str) -> Option<Location> {
        self.objects.read().locations.get(name).cloned()
    }

    fn locations(&self, filter: Filter<'_, Location>) -> Vec<Location> {
        select(&self.objects.read().locations, filter)
    }

    fn location_type(&self, name: &str) -> Option<LocationType> {
        self.objects.read().location_types.get(name).cloned()
    }

    fn blocks(&self) -> Vec<Block> {
        self.objects.read().blocks.values().cloned().collect()
    }

    fn peripheral_job(&self, name: &str) -> Option<PeripheralJob> {
        self.objects.read().peripheral_jobs.get(name).cloned()
    }

    fn peripheral_jobs(&self, filter: Filter<'_, PeripheralJob>) -> Vec<PeripheralJob> {
        select(&self.objects.read().peripheral_jobs, filter)
    }

    fn create_transport_order(&self, creation: TransportOrderCreation) -> Result<TransportOrder> {
        let mut objects = self.objects.write();

        let name = if creation.incomplete_name {
            format!("{}{}", creation.name, Uuid::new_v4().simple())
        } else {
            creation.name.clone()
        };

        if objects.transport_orders.contains_key(&name) {
            return Err(KestrelError::AlreadyExists {
                kind: "transport order",
                name,
            });
        }

        // Every destination must name a known location or point
        for destination in &creation.destinations {
            if !objects.locations.contains_key(&destination.location)
                && !objects.points.contains_key(&destination.location)
            {
                return Err(KestrelError::InvalidOrder {
                    name,
                    message: format!("Unknown destination {}", destination.location),
                });
            }
        }

        if let Some(vehicle) = &creation.intended_vehicle {
            if !objects.vehicles.contains_key(vehicle) {
                return Err(KestrelError::not_found("vehicle", vehicle.clone()));
            }
        }

        if let Some(sequence_name) = &creation.wrapping_sequence {
            let sequence = objects
                .order_sequences
                .get_mut(sequence_name)
                .ok_or_else(|| KestrelError::not_found("order sequence", sequence_name.clone()))?;
            if sequence.complete {
                return Err(KestrelError::IllegalState {
                    name: sequence_name.clone(),
                    message: "Order sequence is already complete".to_string(),
                });
            }
            sequence.orders.push(name.clone());
        }

        let now = Utc::now();
        let mut order = TransportOrder::new(name.clone(), creation.destinations)
            .with_type(creation.order_type)
            .with_dispensable(creation.dispensable)
            .with_state(TransportOrderState::Raw)
            .with_creation_time(now)
            .with_deadline(creation.deadline.unwrap_or(now + Duration::hours(1)));
        order.intended_vehicle = creation.intended_vehicle;
        order.wrapping_sequence = creation.wrapping_sequence;
        order.dependencies = creation.dependencies;

        debug!("Created transport order {}", name);
        objects.transport_orders.insert(name, order.clone());

        Ok(order)
    }

    fn update_vehicle(&self, name: &str, f: &mut dyn FnMut(&mut Vehicle)) -> Result<Vehicle> {
        update(&mut self.objects.write().vehicles, "vehicle", name, f)
    }

    fn update_transport_order(
        &self,
        name: &str,
        f: &mut dyn FnMut(&mut TransportOrder),
    ) -> Result<TransportOrder> {
        update(
            &mut self.objects.write().transport_orders,
            "transport order",
            name,
            f,
        )
    }

    fn update_order_sequence(
        &self,
        name: &str,
        f: &mut dyn FnMut(&mut OrderSequence),
    ) -> Result<OrderSequence> {
        update(
            &mut self.objects.write().order_sequences,
            "order sequence",
            name,
            f,
        )
    }

    fn update_location(&self, name: &str, f: &mut dyn FnMut(&mut Location)) -> Result<Location> {
        update(&mut self.objects.write().locations, "location", name, f)
    }

    fn update_peripheral_job(
        &self,
        name: &str,
        f: &mut dyn FnMut(&mut PeripheralJob),
    ) -> Result<PeripheralJob> {
        update(
            &mut self.objects.write().peripheral_jobs,
            "peripheral job",
            name,
            f,
        )
    }
}
