//! Default recharge position supplier.

use std::collections::BTreeMap;
use std::sync::Arc;

use kestrel_core::vehicle::{PROPKEY_ASSIGNED_RECHARGE_LOCATION, PROPKEY_PREFERRED_RECHARGE_LOCATION};
use kestrel_core::{Destination, Location, ObjectService, ResourceSet, Vehicle};
use tracing::debug;

use super::{Occupancy, RechargePositionSupplier};
use crate::routing::{Router, UNREACHABLE_COSTS};

/// Picks a recharge location for a vehicle.
///
/// A location assigned to the vehicle by property is used if it is free, and
/// nothing else is. Otherwise a free preferred location wins, and failing
/// that the cheapest free location. Cost ties go to the lexicographically
/// smallest location name, then access point name.
pub struct DefaultRechargePositionSupplier {
    objects: Arc<dyn ObjectService>,
    router: Arc<dyn Router>,
}

impl DefaultRechargePositionSupplier {
    pub fn new(objects: Arc<dyn ObjectService>, router: Arc<dyn Router>) -> Self {
        Self { objects, router }
    }

    /// Free recharge locations for the vehicle, with their free access points.
    fn candidates(&self, vehicle: &Vehicle) -> BTreeMap<String, Vec<String>> {
        let occupancy = Occupancy::snapshot(self.objects.as_ref(), &vehicle.name);
        let operation = vehicle.recharge_operation.as_str();

        self.objects
            .locations(&|location| self.allows_operation(location, operation))
            .into_iter()
            .filter_map(|location| {
                let access_points: Vec<String> = location
                    .links
                    .iter()
                    .filter(|link| link.permits(operation))
                    .map(|link| link.point.clone())
                    .filter(|point| !occupancy.is_occupied(point))
                    .collect();
                (!access_points.is_empty()).then_some((location.name, access_points))
            })
            .collect()
    }

    fn allows_operation(&self, location: &Location, operation: &str) -> bool {
        self.objects
            .location_type(&location.location_type)
            .map_or(false, |location_type| location_type.is_allowed_operation(operation))
    }

    fn cheapest(
        &self,
        vehicle: &Vehicle,
        position: &str,
        candidates: &BTreeMap<String, Vec<String>>,
    ) -> Option<String> {
        let no_resources = ResourceSet::new();
        candidates
            .iter()
            .flat_map(|(location, access_points)| {
                access_points.iter().map(move |point| (location, point))
            })
            .map(|(location, point)| {
                let costs = self.router.costs(vehicle, position, point, &no_resources);
                (costs, location, point)
            })
            .filter(|(costs, _, _)| *costs != UNREACHABLE_COSTS)
            .min()
            .map(|(_, location, _)| location.clone())
    }
}

impl RechargePositionSupplier for DefaultRechargePositionSupplier {
    fn find_recharge_sequence(&self, vehicle: &Vehicle) -> Vec<Destination> {
        let Some(position) = vehicle.current_position.as_deref() else {
            return Vec::new();
        };

        let candidates = self.candidates(vehicle);

        let chosen = if let Some(assigned) = vehicle.property(PROPKEY_ASSIGNED_RECHARGE_LOCATION) {
            candidates
                .contains_key(assigned)
                .then(|| assigned.to_string())
        } else if let Some(preferred) = vehicle
            .property(PROPKEY_PREFERRED_RECHARGE_LOCATION)
            .filter(|preferred| candidates.contains_key(*preferred))
        {
            Some(preferred.to_string())
        } else {
            self.cheapest(vehicle, position, &candidates)
        };

        match chosen {
            Some(location) => {
                debug!("Recharge location for {}: {}", vehicle.name, location);
                vec![Destination::new(location, vehicle.recharge_operation.clone())]
            }
            None => {
                debug!("No recharge location available for {}", vehicle.name);
                Vec::new()
            }
        }
    }
}
