//! Simulated vehicles.
//!
//! Every step a vehicle processing a drive order tries to allocate the
//! resources of its next route step. Once granted, it moves onto the step's
//! point and frees what it held before. At the end of the route, or when its
//! order has been withdrawn, the vehicle stops and reports that it awaits
//! its next drive order.

use std::sync::Arc;

use kestrel_allocation::{EnvelopeAreaProvider, ResourceScheduler};
use kestrel_core::{
    IntegrationLevel, ObjectService, ProcState, ResourceKind, ResourceRef, ResourceSet, Result,
    TransportOrderState, Vehicle, VehicleState,
};
use tracing::{debug, info, warn};

/// Energy used for driving along one path, in percent.
const ENERGY_PER_PATH: u8 = 1;

pub struct VehicleSimulation {
    objects: Arc<dyn ObjectService>,
    scheduler: ResourceScheduler,
}

impl VehicleSimulation {
    /// Create the simulation and let every integrated vehicle allocate the point it stands on.
    pub fn new(objects: Arc<dyn ObjectService>) -> Self {
        let area_provider = Arc::new(EnvelopeAreaProvider::new(objects.clone()));
        let mut simulation = Self {
            scheduler: ResourceScheduler::new(objects.blocks(), area_provider),
            objects,
        };
        simulation.place_vehicles();
        simulation
    }

    #[cfg(test)]
    pub fn scheduler(&self) -> &ResourceScheduler {
        &self.scheduler
    }

    fn place_vehicles(&mut self) {
        for vehicle in self
            .objects
            .vehicles(&|vehicle| vehicle.integration_level >= IntegrationLevel::ToBeRespected)
        {
            let Some(position) = vehicle.current_position.clone() else {
                continue;
            };
            let resources: ResourceSet = [ResourceRef::point(position.clone())].into();
            if !self
                .scheduler
                .allocate(&vehicle.name, vehicle.envelope_key.as_deref(), &resources)
            {
                warn!("{} cannot allocate its position {}", vehicle.name, position);
                continue;
            }
            if let Err(e) = self.objects.update_vehicle(&vehicle.name, &mut |vehicle| {
                vehicle.allocated_resources = vec![resources.clone()];
            }) {
                warn!("Failed to record allocation of {}: {}", vehicle.name, e);
            }
        }
    }

    /// Advance every vehicle processing a drive order by one step.
    ///
    /// Returns whether any vehicle changed its state.
    pub fn advance(&mut self) -> bool {
        let mut changed = false;
        for vehicle in self
            .objects
            .vehicles(&|vehicle| vehicle.has_proc_state(ProcState::ProcessingOrder))
        {
            match self.step(&vehicle) {
                Ok(moved) => changed |= moved,
                Err(e) => warn!("Simulation step of {} failed: {}", vehicle.name, e),
            }
        }
        changed
    }

    fn step(&mut self, vehicle: &Vehicle) -> Result<bool> {
        let order = vehicle
            .transport_order
            .as_deref()
            .and_then(|name| self.objects.transport_order(name));
        let Some(order) = order.filter(|order| !order.has_state(TransportOrderState::Withdrawn))
        else {
            self.stop(vehicle, vehicle.current_position.as_deref(), false)?;
            return Ok(true);
        };
        let recharging = order.current_drive_order().map_or(false, |drive_order| {
            drive_order.destination.operation == vehicle.recharge_operation
        });

        let Some(next) = vehicle.claimed_resources.first() else {
            self.stop(vehicle, vehicle.current_position.as_deref(), recharging)?;
            return Ok(true);
        };

        let envelope_key = vehicle.envelope_key.as_deref();
        if !self.scheduler.allocate(&vehicle.name, envelope_key, next) {
            debug!("{} waiting for {:?}", vehicle.name, next);
            return Ok(false);
        }
        let behind: ResourceSet = self
            .scheduler
            .allocated_by(&vehicle.name)
            .difference(next)
            .cloned()
            .collect();
        self.scheduler.free(&vehicle.name, envelope_key, &behind);

        let position = next
            .iter()
            .find(|resource| resource.is_point())
            .map(|resource| resource.name.clone());
        let driving = next.iter().any(|resource| resource.kind == ResourceKind::Path);
        let remaining = vehicle.claimed_resources[1..].to_vec();
        self.scheduler.claim(&vehicle.name, remaining.clone());

        let allocated = next.clone();
        let updated = self.objects.update_vehicle(&vehicle.name, &mut |vehicle| {
            if position.is_some() {
                vehicle.current_position = position.clone();
            }
            vehicle.claimed_resources = remaining.clone();
            vehicle.allocated_resources = vec![allocated.clone()];
            vehicle.state = VehicleState::Executing;
            if driving {
                vehicle.energy_level = vehicle.energy_level.saturating_sub(ENERGY_PER_PATH);
            }
        })?;
        debug!("{} moved to {:?}", updated.name, updated.current_position);

        if remaining.is_empty() {
            self.stop(&updated, updated.current_position.as_deref(), recharging)?;
        }
        Ok(true)
    }

    /// Stop the vehicle on its position and free everything else it holds.
    fn stop(&mut self, vehicle: &Vehicle, position: Option<&str>, recharge: bool) -> Result<()> {
        let keep: ResourceSet = position.map(ResourceRef::point).into_iter().collect();
        let release: ResourceSet = self
            .scheduler
            .allocated_by(&vehicle.name)
            .difference(&keep)
            .cloned()
            .collect();
        let envelope_key = vehicle.envelope_key.as_deref();
        self.scheduler.free(&vehicle.name, envelope_key, &release);
        self.scheduler.unclaim(&vehicle.name);

        self.objects.update_vehicle(&vehicle.name, &mut |vehicle| {
            vehicle.claimed_resources.clear();
            vehicle.allocated_resources = if keep.is_empty() {
                Vec::new()
            } else {
                vec![keep.clone()]
            };
            vehicle.proc_state = ProcState::AwaitingOrder;
            vehicle.state = VehicleState::Idle;
            if recharge {
                vehicle.energy_level = 100;
            }
        })?;

        if recharge {
            info!("{} recharged at {:?}", vehicle.name, position);
        } else {
            debug!("{} stopped at {:?}", vehicle.name, position);
        }
        Ok(())
    }
}
