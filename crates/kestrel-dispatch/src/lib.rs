//! # Kestrel Dispatch
//!
//! Transport order dispatching for the Kestrel fleet core.
//!
//! A [`Dispatcher`] runs a fixed pipeline of phases once per dispatch cycle:
//! - [`FinishWithdrawalsPhase`] - Complete withdrawals of stopped vehicles
//! - [`AssignNextDriveOrdersPhase`] - Advance vehicles to their next drive order
//! - [`AssignReservedOrdersPhase`] - Pick up orders reserved for vehicles
//! - [`AssignSequenceSuccessorsPhase`] - Continue order sequences
//! - [`AssignFreeOrdersPhase`] - Match free orders with available vehicles
//! - [`RechargeIdleVehiclesPhase`] - Send degraded vehicles to recharge
//! - [`ParkIdleVehiclesPhase`] - Send idle vehicles to park

pub mod candidate;
pub mod config;
pub mod dispatcher;
pub mod phase;
pub mod reservation;
pub mod routing;
pub mod selection;
pub mod supplier;
pub mod util;

#[cfg(test)]
mod testing;

// Re-exports for convenience
pub use candidate::AssignmentCandidate;
pub use config::DispatcherConfiguration;
pub use dispatcher::Dispatcher;
pub use phase::{
    AssignFreeOrdersPhase, AssignNextDriveOrdersPhase, AssignReservedOrdersPhase,
    AssignSequenceSuccessorsPhase, FinishWithdrawalsPhase, ParkIdleVehiclesPhase, Phase,
    RechargeIdleVehiclesPhase, TentativeOrder,
};
pub use reservation::OrderReservationPool;
pub use routing::{Router, UNREACHABLE_COSTS};
pub use selection::{AssignmentCandidateSelectionFilter, SelectionFilter};
pub use supplier::{
    DefaultParkingPositionSupplier, DefaultRechargePositionSupplier, ParkingPositionSupplier,
    RechargePositionSupplier,
};
pub use util::TransportOrderUtil;
