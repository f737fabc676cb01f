//! Destinations for recharging and parking idle vehicles.

pub mod parking;
pub mod recharge;

use std::collections::BTreeSet;

use kestrel_core::plant::expand_resources;
use kestrel_core::{
    Block, Destination, ObjectService, ResourceRef, ResourceSet, TransportOrderState, Vehicle,
};

pub use parking::DefaultParkingPositionSupplier;
pub use recharge::DefaultRechargePositionSupplier;

/// Finds where a vehicle should go to recharge.
pub trait RechargePositionSupplier: Send + Sync {
    /// Destinations for recharging the vehicle; empty if there is none.
    fn find_recharge_sequence(&self, vehicle: &Vehicle) -> Vec<Destination>;
}

/// Finds where a vehicle should go to park.
pub trait ParkingPositionSupplier: Send + Sync {
    /// Name of the point the vehicle should park at.
    fn find_parking_position(&self, vehicle: &Vehicle) -> Option<String>;
}

/// Snapshot of the points other vehicles occupy or are heading to.
pub(crate) struct Occupancy {
    blocks: Vec<Block>,
    allocated_by_others: ResourceSet,
    targeted_points: BTreeSet<String>,
}

impl Occupancy {
    pub fn snapshot(objects: &dyn ObjectService, vehicle: &str) -> Self {
        let allocated_by_others = objects
            .vehicles(&|other| other.name != vehicle)
            .iter()
            .flat_map(Vehicle::all_allocated_resources)
            .collect();
        let targeted_points = objects
            .transport_orders(&|order| order.has_state(TransportOrderState::BeingProcessed))
            .iter()
            .filter_map(|order| order.final_destination_point().map(str::to_string))
            .collect();
        Self {
            blocks: objects.blocks(),
            allocated_by_others,
            targeted_points,
        }
    }

    /// Whether any member of the point's blocks is allocated by another
    /// vehicle or is the destination of an order being processed.
    pub fn is_occupied(&self, point: &str) -> bool {
        let members = expand_resources(&self.blocks, &[ResourceRef::point(point)].into());
        members.iter().any(|member| {
            self.allocated_by_others.contains(member)
                || (member.is_point() && self.targeted_points.contains(&member.name))
        })
    }
}
