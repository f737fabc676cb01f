//! Router collaborator.

use kestrel_core::{DriveOrder, ResourceSet, TransportOrder, Vehicle};

/// Costs reported for points that cannot be reached.
pub const UNREACHABLE_COSTS: u64 = u64::MAX;

/// Computes routes and routing costs for vehicles.
///
/// Implementations are expected to answer synchronously from in-memory data.
pub trait Router: Send + Sync {
    /// Whether a route exists for every drive order of the order, for any vehicle.
    fn check_routability(&self, order: &TransportOrder) -> bool;

    /// Drive orders of `order`, each with a route, starting at `source_point`.
    ///
    /// Returns `None` if any destination cannot be reached.
    fn route(
        &self,
        vehicle: &Vehicle,
        source_point: &str,
        order: &TransportOrder,
    ) -> Option<Vec<DriveOrder>>;

    /// Costs of travelling between two points, avoiding the given resources.
    ///
    /// Returns [`UNREACHABLE_COSTS`] if there is no such route.
    fn costs(
        &self,
        vehicle: &Vehicle,
        source_point: &str,
        destination_point: &str,
        resources_to_avoid: &ResourceSet,
    ) -> u64;
}
