//! Collaborator contract for reading and updating plant objects.

use crate::error::Result;
use crate::order::{OrderSequence, TransportOrder, TransportOrderCreation};
use crate::peripheral::PeripheralJob;
use crate::plant::{Block, Location, LocationType, Path, Point};
use crate::vehicle::Vehicle;

/// Predicate used to select objects.
///
/// Filters run while the service holds its read lock and must not call back into it.
pub type Filter<'a, T> = &'a dyn Fn(&T) -> bool;

/// Access to the objects of the plant model and fleet.
///
/// Fetch operations return snapshots: later updates never show through a
/// previously returned value. Update operations apply a closure to the
/// stored object and return the updated snapshot.
pub trait ObjectService: Send + Sync {
    fn vehicle(&self, name: &str) -> Option<Vehicle>;

    fn vehicles(&self, filter: Filter<'_, Vehicle>) -> Vec<Vehicle>;

    fn transport_order(&self, name: &str) -> Option<TransportOrder>;

    fn transport_orders(&self, filter: Filter<'_, TransportOrder>) -> Vec<TransportOrder>;

    fn order_sequence(&self, name: &str) -> Option<OrderSequence>;

    fn point(&self, name: &str) -> Option<Point>;

    fn points(&self, filter: Filter<'_, Point>) -> Vec<Point>;

    fn path(&self, name: &str) -> Option<Path>;

    fn paths(&self, filter: Filter<'_, Path>) -> Vec<Path>;

    fn location(&self, name: &str) -> Option<Location>;

    fn locations(&self, filter: Filter<'_, Location>) -> Vec<Location>;

    fn location_type(&self, name: &str) -> Option<LocationType>;

    fn blocks(&self) -> Vec<Block>;

    fn peripheral_job(&self, name: &str) -> Option<PeripheralJob>;

    fn peripheral_jobs(&self, filter: Filter<'_, PeripheralJob>) -> Vec<PeripheralJob>;

    /// Create a new transport order in state `Raw`.
    fn create_transport_order(&self, creation: TransportOrderCreation) -> Result<TransportOrder>;

    fn update_vehicle(&self, name: &str, update: &mut dyn FnMut(&mut Vehicle)) -> Result<Vehicle>;

    fn update_transport_order(
        &self,
        name: &str,
        update: &mut dyn FnMut(&mut TransportOrder),
    ) -> Result<TransportOrder>;

    fn update_order_sequence(
        &self,
        name: &str,
        update: &mut dyn FnMut(&mut OrderSequence),
    ) -> Result<OrderSequence>;

    fn update_location(&self, name: &str, update: &mut dyn FnMut(&mut Location)) -> Result<Location>;

    fn update_peripheral_job(
        &self,
        name: &str,
        update: &mut dyn FnMut(&mut PeripheralJob),
    ) -> Result<PeripheralJob>;
}
