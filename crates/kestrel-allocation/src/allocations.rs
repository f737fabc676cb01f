//! Per-vehicle record of allocated areas.

use std::collections::HashMap;

use tracing::debug;

use crate::area::Area;

/// Keeps track of the area each vehicle currently occupies.
#[derive(Debug, Default)]
pub struct AreaAllocations {
    allocated_areas: HashMap<String, Area>,
}

impl AreaAllocations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the vehicle may occupy the requested area.
    ///
    /// Only other vehicles' areas count; overlapping one's own area is fine.
    pub fn is_area_allocation_allowed(&self, vehicle: &str, requested_area: &Area) -> bool {
        let conflict = self
            .allocated_areas
            .iter()
            .find(|(other, area)| other.as_str() != vehicle && area.intersects(requested_area));

        match conflict {
            Some((other, _)) => {
                debug!(
                    "Area requested by {} intersects area allocated by {}",
                    vehicle, other
                );
                false
            }
            None => true,
        }
    }

    /// Replace the area recorded for the vehicle.
    pub fn set_allocated_area(&mut self, vehicle: &str, area: Area) {
        self.allocated_areas.insert(vehicle.to_string(), area);
    }

    /// Forget the area recorded for the vehicle.
    pub fn clear_allocated_area(&mut self, vehicle: &str) {
        self.allocated_areas.remove(vehicle);
    }

    pub fn allocated_area(&self, vehicle: &str) -> Option<&Area> {
        self.allocated_areas.get(vehicle)
    }
}
