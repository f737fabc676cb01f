//! Discrete resource scheduling with block rules and area checks.
//!
//! Allocation is granted in three stages: every requested resource must be
//! free or already held by the requesting vehicle, the rules of all touched
//! blocks must permit it, and the area allocator must not report a collision.

use std::collections::HashMap;
use std::sync::Arc;

use kestrel_core::{Block, BlockType, ResourceKind, ResourceRef, ResourceSet};
use tracing::{debug, info};

use crate::allocator::AreaAllocator;
use crate::area::AreaProvider;

/// Keeps track of claimed and allocated resources for all vehicles.
pub struct ResourceScheduler {
    blocks: Vec<Block>,
    area_allocator: AreaAllocator,
    allocations: HashMap<String, ResourceSet>,
    claims: HashMap<String, Vec<ResourceSet>>,
    /// Entry path of every occupied same-direction block.
    block_entries: HashMap<String, String>,
}

impl ResourceScheduler {
    pub fn new(blocks: Vec<Block>, area_provider: Arc<dyn AreaProvider>) -> Self {
        Self {
            area_allocator: AreaAllocator::new(blocks.clone(), area_provider),
            blocks,
            allocations: HashMap::new(),
            claims: HashMap::new(),
            block_entries: HashMap::new(),
        }
    }

    /// Record the resources the vehicle will need for its upcoming route steps.
    pub fn claim(&mut self, vehicle: &str, claims: Vec<ResourceSet>) {
        self.claims.insert(vehicle.to_string(), claims);
    }

    pub fn unclaim(&mut self, vehicle: &str) {
        self.claims.remove(vehicle);
    }

    pub fn claims(&self, vehicle: &str) -> &[ResourceSet] {
        self.claims.get(vehicle).map_or(&[], Vec::as_slice)
    }

    /// The vehicle currently holding the given resource.
    pub fn holder_of(&self, resource: &ResourceRef) -> Option<&str> {
        self.allocations
            .iter()
            .find(|(_, held)| held.contains(resource))
            .map(|(vehicle, _)| vehicle.as_str())
    }

    /// Resources currently held by the vehicle.
    pub fn allocated_by(&self, vehicle: &str) -> ResourceSet {
        self.allocations.get(vehicle).cloned().unwrap_or_default()
    }

    /// Try to allocate the given resources for the vehicle right now.
    pub fn allocate(
        &mut self,
        vehicle: &str,
        envelope_key: Option<&str>,
        resources: &ResourceSet,
    ) -> bool {
        if let Some((resource, holder)) = resources
            .iter()
            .find_map(|r| self.holder_of(r).filter(|h| *h != vehicle).map(|h| (r, h)))
        {
            debug!(
                "{} cannot allocate {}: held by {}",
                vehicle, resource, holder
            );
            return false;
        }

        if !self.blocks_allow(vehicle, resources) {
            return false;
        }

        if !self
            .area_allocator
            .may_allocate_areas(vehicle, envelope_key, resources)
        {
            debug!("{} cannot allocate {:?}: area conflict", vehicle, resources);
            return false;
        }

        self.record_block_entries(resources);

        let held = self.allocations.entry(vehicle.to_string()).or_default();
        held.extend(resources.iter().cloned());
        let complete = held.clone();
        self.area_allocator
            .update_allocated_areas(vehicle, envelope_key, &complete);

        true
    }

    /// Release the given resources held by the vehicle.
    pub fn free(&mut self, vehicle: &str, envelope_key: Option<&str>, resources: &ResourceSet) {
        let remaining = match self.allocations.get_mut(vehicle) {
            Some(held) => {
                held.retain(|resource| !resources.contains(resource));
                held.clone()
            }
            None => return,
        };
        if remaining.is_empty() {
            self.allocations.remove(vehicle);
        }
        self.area_allocator
            .update_allocated_areas(vehicle, envelope_key, &remaining);
        self.forget_empty_block_entries();
    }

    /// Release everything the vehicle holds and claims.
    pub fn free_all(&mut self, vehicle: &str) {
        if self.allocations.remove(vehicle).is_some() {
            info!("Freed all resources of {}", vehicle);
        }
        self.claims.remove(vehicle);
        self.area_allocator
            .update_allocated_areas(vehicle, None, &ResourceSet::new());
        self.forget_empty_block_entries();
    }

    fn blocks_allow(&self, vehicle: &str, resources: &ResourceSet) -> bool {
        for block in self.blocks.iter().filter(|block| block.touches(resources)) {
            let occupied_by_others = self
                .allocations
                .iter()
                .any(|(other, held)| other != vehicle && block.touches(held));
            if !occupied_by_others {
                continue;
            }

            match block.block_type {
                BlockType::SingleVehicleOnly => {
                    debug!("{} cannot enter block {}: occupied", vehicle, block.name);
                    return false;
                }
                BlockType::SameDirectionOnly => {
                    let already_inside = self
                        .allocations
                        .get(vehicle)
                        .map_or(false, |held| block.touches(held));
                    if already_inside {
                        continue;
                    }
                    let enters_same_way = self
                        .block_entries
                        .get(&block.name)
                        .map_or(false, |entry| resources.contains(&ResourceRef::path(entry.clone())));
                    if !enters_same_way {
                        debug!(
                            "{} cannot enter block {}: opposite direction",
                            vehicle, block.name
                        );
                        return false;
                    }
                }
            }
        }
        true
    }

    fn record_block_entries(&mut self, resources: &ResourceSet) {
        for block in &self.blocks {
            if block.block_type != BlockType::SameDirectionOnly
                || self.block_entries.contains_key(&block.name)
            {
                continue;
            }
            let entry_path = resources
                .iter()
                .find(|r| r.kind == ResourceKind::Path && block.members.contains(r));
            if let Some(entry_path) = entry_path {
                self.block_entries
                    .insert(block.name.clone(), entry_path.name.clone());
            }
        }
    }

    fn forget_empty_block_entries(&mut self) {
        let blocks = &self.blocks;
        let allocations = &self.allocations;
        self.block_entries.retain(|block_name, _| {
            blocks
                .iter()
                .find(|block| &block.name == block_name)
                .map_or(false, |block| allocations.values().any(|held| block.touches(held)))
        });
    }
}
