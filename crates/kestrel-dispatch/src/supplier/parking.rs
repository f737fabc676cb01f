//! Default parking position supplier.

use std::sync::Arc;

use kestrel_core::vehicle::{PROPKEY_ASSIGNED_PARKING_POSITION, PROPKEY_PREFERRED_PARKING_POSITION};
use kestrel_core::{ObjectService, ResourceSet, Vehicle};
use tracing::debug;

use super::{Occupancy, ParkingPositionSupplier};
use crate::routing::{Router, UNREACHABLE_COSTS};

/// Picks a free park position for a vehicle, using the same assigned,
/// preferred and cheapest rules as recharge locations.
pub struct DefaultParkingPositionSupplier {
    objects: Arc<dyn ObjectService>,
    router: Arc<dyn Router>,
}

impl DefaultParkingPositionSupplier {
    pub fn new(objects: Arc<dyn ObjectService>, router: Arc<dyn Router>) -> Self {
        Self { objects, router }
    }

    /// Free park positions other than the vehicle's position, in name order.
    fn candidates(&self, vehicle: &Vehicle, position: &str) -> Vec<String> {
        let occupancy = Occupancy::snapshot(self.objects.as_ref(), &vehicle.name);
        self.objects
            .points(&|point| point.is_park_position() && point.name != position)
            .into_iter()
            .map(|point| point.name)
            .filter(|point| !occupancy.is_occupied(point))
            .collect()
    }
}

impl ParkingPositionSupplier for DefaultParkingPositionSupplier {
    fn find_parking_position(&self, vehicle: &Vehicle) -> Option<String> {
        let position = vehicle.current_position.as_deref()?;
        let candidates = self.candidates(vehicle, position);
        let is_candidate = |name: &str| candidates.iter().any(|candidate| candidate == name);

        let chosen = if let Some(assigned) = vehicle.property(PROPKEY_ASSIGNED_PARKING_POSITION) {
            is_candidate(assigned).then(|| assigned.to_string())
        } else if let Some(preferred) = vehicle
            .property(PROPKEY_PREFERRED_PARKING_POSITION)
            .filter(|preferred| is_candidate(*preferred))
        {
            Some(preferred.to_string())
        } else {
            let no_resources = ResourceSet::new();
            candidates
                .iter()
                .map(|point| (self.router.costs(vehicle, position, point, &no_resources), point))
                .filter(|(costs, _)| *costs != UNREACHABLE_COSTS)
                .min()
                .map(|(_, point)| point.clone())
        };

        debug!("Parking position for {}: {:?}", vehicle.name, chosen);
        chosen
    }
}
