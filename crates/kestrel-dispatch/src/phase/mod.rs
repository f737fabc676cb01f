//! Phases of a dispatch cycle.
//!
//! Each phase reads fresh snapshots from the object service when it runs, so
//! a phase sees the effects of all phases before it in the same cycle.

use kestrel_core::Lifecycle;

pub(crate) use kestrel_core::impl_lifecycle;

pub mod assign_free_orders;
pub mod assign_next_drive_orders;
pub mod assign_reserved_orders;
pub mod assign_sequence_successors;
pub mod finish_withdrawals;
pub mod park_idle_vehicles;
pub mod recharge_idle_vehicles;
pub mod tentative;

pub use assign_free_orders::AssignFreeOrdersPhase;
pub use assign_next_drive_orders::AssignNextDriveOrdersPhase;
pub use assign_reserved_orders::AssignReservedOrdersPhase;
pub use assign_sequence_successors::AssignSequenceSuccessorsPhase;
pub use finish_withdrawals::FinishWithdrawalsPhase;
pub use park_idle_vehicles::ParkIdleVehiclesPhase;
pub use recharge_idle_vehicles::RechargeIdleVehiclesPhase;
pub use tentative::TentativeOrder;

/// One step of the dispatch pipeline.
pub trait Phase: Lifecycle + Send {
    /// Do this phase's work for the current dispatch cycle.
    fn run(&mut self);
}
