//! Filters selecting vehicles, orders and assignment candidates.
//!
//! A filter returns the reasons it rejects a subject. An empty list means the
//! subject is accepted.

pub mod candidates;
pub mod orders;
pub mod vehicles;

pub use candidates::{
    AssignmentCandidateSelectionFilter, EnergyLevelSufficient, IntendedVehicleMatches,
    OrderTypeAllowed, RouteComplete,
};
pub use orders::IsFreelyDispatchableToAnyVehicle;
pub use vehicles::{IsAvailableForAnyOrder, IsIdleAndDegraded, IsParkable, IsUsableForReservations};

pub const NOT_UTILIZED: &str = "notUtilized";
pub const NO_POSITION: &str = "noPosition";
pub const PROC_STATE: &str = "procState";
pub const VEHICLE_STATE: &str = "vehicleState";
pub const ENERGY_LEVEL_CRITICAL: &str = "energyLevelCritical";
pub const ENERGY_LEVEL_NOT_DEGRADED: &str = "energyLevelNotDegraded";
pub const NEEDS_MORE_CHARGING: &str = "needsMoreCharging";
pub const ORDER_SEQUENCE: &str = "orderSequence";
pub const RESERVED: &str = "reserved";
pub const PARKING_POSITION: &str = "parkingPosition";
pub const ORDER_PENDING: &str = "orderPending";
pub const ORDER_STATE: &str = "orderState";
pub const ORDER_TYPE: &str = "orderType";
pub const INTENDED_VEHICLE: &str = "intendedVehicle";
pub const IN_SEQUENCE: &str = "inSequence";
pub const ROUTE_INCOMPLETE: &str = "routeIncomplete";

/// A predicate that explains its rejections.
pub trait SelectionFilter<T>: Send + Sync {
    /// Reasons for rejecting the subject; empty if it is accepted.
    fn apply(&self, subject: &T) -> Vec<String>;

    fn accepts(&self, subject: &T) -> bool {
        self.apply(subject).is_empty()
    }
}

/// Applies several filters and collects all of their reasons.
pub struct CompositeFilter<T> {
    filters: Vec<Box<dyn SelectionFilter<T>>>,
}

impl<T> CompositeFilter<T> {
    pub fn new() -> Self {
        Self {
            filters: Vec::new(),
        }
    }

    /// Add a filter.
    pub fn with(mut self, filter: impl SelectionFilter<T> + 'static) -> Self {
        self.filters.push(Box::new(filter));
        self
    }
}

impl<T> Default for CompositeFilter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SelectionFilter<T> for CompositeFilter<T> {
    fn apply(&self, subject: &T) -> Vec<String> {
        self.filters
            .iter()
            .flat_map(|filter| filter.apply(subject))
            .collect()
    }
}

/// Turn a list of `(rejected, reason)` checks into a reason list.
pub(crate) fn reasons<const N: usize>(checks: [(bool, &str); N]) -> Vec<String> {
    checks
        .into_iter()
        .filter(|(rejected, _)| *rejected)
        .map(|(_, reason)| reason.to_string())
        .collect()
}
