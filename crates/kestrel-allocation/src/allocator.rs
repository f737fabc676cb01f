//! Facade combining plain and block-aware area allocation.

use std::sync::Arc;

use kestrel_core::{Block, ResourceSet};

use crate::allocations::AreaAllocations;
use crate::area::AreaProvider;
use crate::block::BlockAreaAllocations;

/// Decides whether vehicles may occupy areas and keeps the area records current.
pub struct AreaAllocator {
    area_provider: Arc<dyn AreaProvider>,
    area_allocations: AreaAllocations,
    block_area_allocations: BlockAreaAllocations,
}

impl AreaAllocator {
    pub fn new(blocks: Vec<Block>, area_provider: Arc<dyn AreaProvider>) -> Self {
        Self {
            block_area_allocations: BlockAreaAllocations::new(blocks, area_provider.clone()),
            area_allocations: AreaAllocations::new(),
            area_provider,
        }
    }

    /// Whether the vehicle may allocate the areas of the given resources.
    ///
    /// Vehicles without an envelope key have no footprint and are always allowed.
    pub fn may_allocate_areas(
        &self,
        vehicle: &str,
        envelope_key: Option<&str>,
        resources: &ResourceSet,
    ) -> bool {
        if resources.is_empty() {
            return true;
        }
        let Some(envelope_key) = envelope_key else {
            return true;
        };

        let requested_area = self.area_provider.area_for(envelope_key, resources);

        self.area_allocations
            .is_area_allocation_allowed(vehicle, &requested_area)
            && self
                .block_area_allocations
                .is_area_allocation_allowed(vehicle, envelope_key, resources)
    }

    /// Replace the recorded areas of the vehicle.
    ///
    /// `resources` must be the vehicle's complete current allocation, not a delta.
    /// An empty set clears the vehicle's records.
    pub fn update_allocated_areas(
        &mut self,
        vehicle: &str,
        envelope_key: Option<&str>,
        resources: &ResourceSet,
    ) {
        if resources.is_empty() {
            self.area_allocations.clear_allocated_area(vehicle);
            self.block_area_allocations.clear_allocated_resources(vehicle);
            return;
        }

        match envelope_key {
            Some(key) => {
                let area = self.area_provider.area_for(key, resources);
                self.area_allocations.set_allocated_area(vehicle, area);
            }
            None => self.area_allocations.clear_allocated_area(vehicle),
        }
        self.block_area_allocations
            .set_allocated_resources(vehicle, envelope_key, resources.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::area::EnvelopeAreaProvider;
    use kestrel_core::{BlockType, Envelope, Point, ResourceRef};
    use kestrel_state::InMemoryPlant;

    fn set(names: &[&str]) -> ResourceSet {
        names.iter().map(|name| ResourceRef::point(*name)).collect()
    }

    fn create_allocator() -> AreaAllocator {
        let plant = Arc::new(InMemoryPlant::new());
        for (name, x) in [("P1", 0.0), ("P2", 5.0), ("P3", 20.0), ("P4", 6.0)] {
            plant.add_point(
                Point::new(name).with_envelope("default", Envelope::rectangle(x, 0.0, x + 2.0, 2.0)),
            );
        }
        let blocks = vec![Block::new("B", BlockType::SingleVehicleOnly)
            .with_member(ResourceRef::point("P1"))
            .with_member(ResourceRef::point("P2"))];
        AreaAllocator::new(blocks, Arc::new(EnvelopeAreaProvider::new(plant)))
    }

    #[test]
    fn test_empty_request_is_always_allowed() {
        let mut allocator = create_allocator();
        allocator.update_allocated_areas("Vehicle-01", Some("default"), &set(&["P1"]));
        assert!(allocator.may_allocate_areas("Vehicle-02", Some("default"), &ResourceSet::new()));
    }

    #[test]
    fn test_plain_overlap_is_disallowed() {
        let mut allocator = create_allocator();
        allocator.update_allocated_areas("Vehicle-01", Some("default"), &set(&["P3"]));

        assert!(!allocator.may_allocate_areas("Vehicle-02", Some("default"), &set(&["P3"])));
        assert!(allocator.may_allocate_areas("Vehicle-02", Some("default"), &set(&["P1"])));
    }

    #[test]
    fn test_block_overlap_is_disallowed() {
        let mut allocator = create_allocator();
        allocator.update_allocated_areas("Vehicle-01", Some("default"), &set(&["P1"]));

        // P4 overlaps P2, which is in Vehicle-01's block, but not P1 itself.
        assert!(!allocator.may_allocate_areas("Vehicle-02", Some("default"), &set(&["P4"])));
    }

    #[test]
    fn test_update_replaces_and_clears() {
        let mut allocator = create_allocator();
        allocator.update_allocated_areas("Vehicle-01", Some("default"), &set(&["P3"]));
        allocator.update_allocated_areas("Vehicle-01", Some("default"), &set(&["P4"]));

        // The earlier allocation was replaced wholesale.
        assert!(allocator.may_allocate_areas("Vehicle-02", Some("default"), &set(&["P3"])));
        assert!(!allocator.may_allocate_areas("Vehicle-02", Some("default"), &set(&["P4"])));

        allocator.update_allocated_areas("Vehicle-01", Some("default"), &ResourceSet::new());
        assert!(allocator.may_allocate_areas("Vehicle-02", Some("default"), &set(&["P4"])));
    }

    #[test]
    fn test_vehicle_without_envelope_is_allowed() {
        let mut allocator = create_allocator();
        allocator.update_allocated_areas("Vehicle-01", Some("default"), &set(&["P3"]));
        assert!(allocator.may_allocate_areas("Vehicle-02", None, &set(&["P3"])));
    }
}
