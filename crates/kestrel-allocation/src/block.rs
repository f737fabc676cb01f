//! Block-aware area exclusivity.
//!
//! A vehicle holding any member of a block is treated as occupying the area of
//! the whole block. Requests are checked against these expanded areas, so a
//! vehicle cannot drive into the footprint of a block another vehicle is in,
//! even if the resources it requests do not overlap the ones actually held.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use kestrel_core::plant::{blocks_touching, expand_resources};
use kestrel_core::{Block, ResourceSet};
use tracing::debug;

use crate::area::AreaProvider;

/// Resources a vehicle holds, together with its envelope key.
#[derive(Debug, Clone, PartialEq)]
struct HeldResources {
    envelope_key: Option<String>,
    resources: ResourceSet,
}

/// Block layer of the area allocation engine.
pub struct BlockAreaAllocations {
    blocks: Vec<Block>,
    area_provider: Arc<dyn AreaProvider>,
    allocations: HashMap<String, HeldResources>,
}

impl BlockAreaAllocations {
    pub fn new(blocks: Vec<Block>, area_provider: Arc<dyn AreaProvider>) -> Self {
        Self {
            blocks,
            area_provider,
            allocations: HashMap::new(),
        }
    }

    /// Whether the vehicle may allocate the requested resources with respect to blocks.
    pub fn is_area_allocation_allowed(
        &self,
        vehicle: &str,
        envelope_key: &str,
        requested_resources: &ResourceSet,
    ) -> bool {
        let requested_blocks = blocks_touching(&self.blocks, requested_resources);

        for (other, held) in &self.allocations {
            if other == vehicle || held.resources.is_empty() {
                continue;
            }

            let occupied_blocks = blocks_touching(&self.blocks, &held.resources);

            // Without blocks on either side, plain area checks cover the request.
            if requested_blocks.is_empty() && occupied_blocks.is_empty() {
                continue;
            }
            // Same block set on both sides is left to the block rules.
            if requested_blocks == occupied_blocks {
                continue;
            }

            let Some(other_envelope_key) = held.envelope_key.as_deref() else {
                continue;
            };

            let shared_blocks: BTreeSet<String> = requested_blocks
                .intersection(&occupied_blocks)
                .cloned()
                .collect();

            let expanded_requested = self.expand_excluding(requested_resources, &shared_blocks);
            let expanded_occupied = self.expand_excluding(&held.resources, &shared_blocks);

            let requested_area = self.area_provider.area_for(envelope_key, &expanded_requested);
            let occupied_area = self
                .area_provider
                .area_for(other_envelope_key, &expanded_occupied);

            if requested_area.intersects(&occupied_area) {
                debug!(
                    "Block area requested by {} intersects block area occupied by {}",
                    vehicle, other
                );
                return false;
            }
        }

        true
    }

    /// Replace the resources recorded for the vehicle.
    pub fn set_allocated_resources(
        &mut self,
        vehicle: &str,
        envelope_key: Option<&str>,
        resources: ResourceSet,
    ) {
        self.allocations.insert(
            vehicle.to_string(),
            HeldResources {
                envelope_key: envelope_key.map(str::to_string),
                resources,
            },
        );
    }

    /// Forget the resources recorded for the vehicle.
    pub fn clear_allocated_resources(&mut self, vehicle: &str) {
        self.allocations.remove(vehicle);
    }

    /// Expand resources to full block membership, leaving out members of shared blocks.
    fn expand_excluding(&self, resources: &ResourceSet, shared_blocks: &BTreeSet<String>) -> ResourceSet {
        let shared_members: ResourceSet = self
            .blocks
            .iter()
            .filter(|block| shared_blocks.contains(&block.name))
            .flat_map(|block| block.members.iter().cloned())
            .collect();

        let mut expanded = expand_resources(&self.blocks, resources);
        expanded.retain(|resource| !shared_members.contains(resource));
        expanded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::area::Area;
    use kestrel_core::{BlockType, ResourceRef};

    /// Area provider giving every point a fixed rectangle, independent of the envelope key.
    struct FixedAreas(HashMap<String, Area>);

    impl AreaProvider for FixedAreas {
        fn area_for(&self, _envelope_key: &str, resources: &ResourceSet) -> Area {
            resources
                .iter()
                .filter_map(|resource| self.0.get(&resource.name).cloned())
                .fold(Area::empty(), Area::union)
        }
    }

    fn set(names: &[&str]) -> ResourceSet {
        names.iter().map(|name| ResourceRef::point(*name)).collect()
    }

    /// P1..P4 lie on a line, one unit apart. P1/P2 form block B, P3 forms block C.
    /// P5 overlaps P2, P6 overlaps nothing.
    fn create_allocations() -> BlockAreaAllocations {
        let areas: HashMap<String, Area> = [
            ("P1", Area::rectangle(0.0, 0.0, 1.0, 1.0)),
            ("P2", Area::rectangle(10.0, 0.0, 11.0, 1.0)),
            ("P3", Area::rectangle(10.5, 0.5, 11.5, 1.5)),
            ("P4", Area::rectangle(30.0, 0.0, 31.0, 1.0)),
            ("P5", Area::rectangle(10.2, 0.2, 10.8, 0.8)),
            ("P6", Area::rectangle(50.0, 0.0, 51.0, 1.0)),
        ]
        .into_iter()
        .map(|(name, area)| (name.to_string(), area))
        .collect();

        let blocks = vec![
            Block::new("B", BlockType::SingleVehicleOnly)
                .with_member(ResourceRef::point("P1"))
                .with_member(ResourceRef::point("P2")),
            Block::new("C", BlockType::SingleVehicleOnly).with_member(ResourceRef::point("P3")),
        ];

        BlockAreaAllocations::new(blocks, Arc::new(FixedAreas(areas)))
    }

    #[test]
    fn test_identical_block_sets_are_always_allowed() {
        let mut allocations = create_allocations();
        allocations.set_allocated_resources("Vehicle-01", Some("default"), set(&["P1"]));

        // P2 overlaps nothing held, but even the expanded areas of B overlap completely.
        assert!(allocations.is_area_allocation_allowed("Vehicle-02", "default", &set(&["P2"])));
        assert!(allocations.is_area_allocation_allowed("Vehicle-02", "default", &set(&["P1"])));
    }

    #[test]
    fn test_expanded_block_area_conflict_is_disallowed() {
        let mut allocations = create_allocations();
        allocations.set_allocated_resources("Vehicle-01", Some("default"), set(&["P1"]));

        // P5 does not overlap P1, but it overlaps P2, another member of block B.
        assert!(!Area::rectangle(0.0, 0.0, 1.0, 1.0).intersects(&Area::rectangle(10.2, 0.2, 10.8, 0.8)));
        assert!(!allocations.is_area_allocation_allowed("Vehicle-02", "default", &set(&["P5"])));
    }

    #[test]
    fn test_request_in_other_block_touching_occupied_block_is_disallowed() {
        let mut allocations = create_allocations();
        allocations.set_allocated_resources("Vehicle-01", Some("default"), set(&["P1"]));

        // P3 (block C) overlaps P2, the block-B member Vehicle-01 does not hold.
        assert!(!allocations.is_area_allocation_allowed("Vehicle-02", "default", &set(&["P3"])));
    }

    #[test]
    fn test_unrelated_request_is_allowed() {
        let mut allocations = create_allocations();
        allocations.set_allocated_resources("Vehicle-01", Some("default"), set(&["P1"]));

        assert!(allocations.is_area_allocation_allowed("Vehicle-02", "default", &set(&["P6"])));
        assert!(allocations.is_area_allocation_allowed("Vehicle-02", "default", &set(&["P4"])));
    }

    #[test]
    fn test_no_blocks_on_either_side_is_skipped() {
        let mut allocations = create_allocations();
        allocations.set_allocated_resources("Vehicle-01", Some("default"), set(&["P5"]));

        // Raw overlap without blocks is the plain layer's business.
        assert!(allocations.is_area_allocation_allowed("Vehicle-02", "default", &set(&["P5"])));
    }

    #[test]
    fn test_vehicle_without_envelope_key_is_skipped() {
        let mut allocations = create_allocations();
        allocations.set_allocated_resources("Vehicle-01", None, set(&["P1"]));

        assert!(allocations.is_area_allocation_allowed("Vehicle-02", "default", &set(&["P5"])));
    }

    #[test]
    fn test_shared_block_members_are_excluded() {
        let mut allocations = create_allocations();
        // Vehicle-01 is in both B and C, the requester only in B: B is shared.
        allocations.set_allocated_resources("Vehicle-01", Some("default"), set(&["P1", "P3"]));

        // Requesting P2 (block B) alone: B is shared and excluded on both sides,
        // leaving the requester nothing to collide with C's expanded area.
        assert!(allocations.is_area_allocation_allowed("Vehicle-02", "default", &set(&["P2"])));

        // Requesting P2 plus P5: P5 overlaps P3, which Vehicle-01 holds in non-shared block C.
        assert!(!allocations.is_area_allocation_allowed("Vehicle-02", "default", &set(&["P2", "P5"])));
    }

    #[test]
    fn test_own_allocation_is_ignored() {
        let mut allocations = create_allocations();
        allocations.set_allocated_resources("Vehicle-01", Some("default"), set(&["P1"]));

        assert!(allocations.is_area_allocation_allowed("Vehicle-01", "default", &set(&["P5"])));

        allocations.clear_allocated_resources("Vehicle-01");
        assert!(allocations.is_area_allocation_allowed("Vehicle-02", "default", &set(&["P5"])));
    }
}
