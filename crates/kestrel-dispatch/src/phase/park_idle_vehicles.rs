//! Sends idle vehicles to parking positions.

use std::sync::Arc;

use kestrel_core::order::{OP_PARK, ORDER_TYPE_PARK};
use kestrel_core::{Destination, ObjectService, TransportOrderCreation, Vehicle};
use tracing::{debug, info, warn};

use super::{impl_lifecycle, Phase, TentativeOrder};
use crate::config::DispatcherConfiguration;
use crate::routing::Router;
use crate::selection::{AssignmentCandidateSelectionFilter, IsParkable, SelectionFilter};
use crate::supplier::ParkingPositionSupplier;
use crate::util::TransportOrderUtil;

pub struct ParkIdleVehiclesPhase {
    objects: Arc<dyn ObjectService>,
    router: Arc<dyn Router>,
    util: Arc<TransportOrderUtil>,
    candidate_filter: Arc<AssignmentCandidateSelectionFilter>,
    supplier: Arc<dyn ParkingPositionSupplier>,
    vehicle_filter: IsParkable,
    configuration: DispatcherConfiguration,
    initialized: bool,
}

impl ParkIdleVehiclesPhase {
    pub fn new(
        objects: Arc<dyn ObjectService>,
        router: Arc<dyn Router>,
        util: Arc<TransportOrderUtil>,
        candidate_filter: Arc<AssignmentCandidateSelectionFilter>,
        supplier: Arc<dyn ParkingPositionSupplier>,
        configuration: DispatcherConfiguration,
    ) -> Self {
        Self {
            vehicle_filter: IsParkable::new(objects.clone()),
            objects,
            router,
            util,
            candidate_filter,
            supplier,
            configuration,
            initialized: false,
        }
    }

    fn create_parking_order(&self, vehicle: &Vehicle) {
        let Some(position) = self.supplier.find_parking_position(vehicle) else {
            debug!("No parking position for {}", vehicle.name);
            return;
        };

        let creation = TransportOrderCreation::builder("Park-")
            .incomplete_name(true)
            .destination(Destination::new(position, OP_PARK))
            .order_type(ORDER_TYPE_PARK)
            .intended_vehicle(vehicle.name.clone())
            .dispensable(true)
            .build();
        let tentative = match creation.and_then(|creation| TentativeOrder::create(self.objects.as_ref(), creation)) {
            Ok(tentative) => tentative,
            Err(e) => {
                warn!("Failed to create parking order for {}: {}", vehicle.name, e);
                return;
            }
        };
        info!("Created parking order {} for {}", tentative.order().name, vehicle.name);

        let resolved = tentative.resolve(
            vehicle,
            self.router.as_ref(),
            &self.candidate_filter,
            &self.util,
        );
        if !resolved.is_assigned() {
            warn!("Parking order {} for {} failed", resolved.order().name, vehicle.name);
        }
    }
}

impl_lifecycle!(ParkIdleVehiclesPhase);

impl Phase for ParkIdleVehiclesPhase {
    fn run(&mut self) {
        if !self.configuration.park_idle_vehicles {
            return;
        }

        for vehicle in self
            .objects
            .vehicles(&|_| true)
            .into_iter()
            .filter(|vehicle| self.vehicle_filter.accepts(vehicle))
        {
            self.create_parking_order(&vehicle);
        }
    }
}
