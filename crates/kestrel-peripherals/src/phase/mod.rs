//! Phases of a peripheral dispatch cycle.

use kestrel_core::Lifecycle;

pub(crate) use kestrel_core::impl_lifecycle;

pub mod assign_free_peripherals;
pub mod assign_reserved_peripherals;
pub mod finish_withdrawals;
pub mod release_peripherals;

pub use assign_free_peripherals::AssignFreePeripheralsPhase;
pub use assign_reserved_peripherals::AssignReservedPeripheralsPhase;
pub use finish_withdrawals::FinishWithdrawalsPhase;
pub use release_peripherals::ReleasePeripheralsPhase;

/// One step of the peripheral dispatch pipeline.
pub trait PeripheralDispatcherPhase: Lifecycle + Send {
    fn run(&mut self);
}
