//! # Kestrel Peripherals
//!
//! Peripheral job dispatching for the Kestrel fleet core.
//!
//! A [`PeripheralDispatcher`] runs its phases once per dispatch cycle:
//! - [`FinishWithdrawalsPhase`] - Fail jobs of failed transport orders
//! - [`ReleasePeripheralsPhase`] - Drop reservations nobody needs
//! - [`AssignReservedPeripheralsPhase`] - Serve reserved devices, oldest job first
//! - [`AssignFreePeripheralsPhase`] - Serve free devices via a [`JobSelectionStrategy`]

pub mod config;
pub mod controller;
pub mod dispatcher;
pub mod phase;
pub mod strategy;
pub mod util;

#[cfg(test)]
mod testing;

// Re-exports for convenience
pub use config::PeripheralDispatcherConfiguration;
pub use controller::{PeripheralController, PeripheralControllerPool, PeripheralControllerRegistry};
pub use dispatcher::PeripheralDispatcher;
pub use phase::{
    AssignFreePeripheralsPhase, AssignReservedPeripheralsPhase, FinishWithdrawalsPhase,
    PeripheralDispatcherPhase, ReleasePeripheralsPhase,
};
pub use strategy::{
    DefaultJobSelectionStrategy, DefaultPeripheralReleaseStrategy, JobSelectionStrategy,
    PeripheralReleaseStrategy,
};
pub use util::PeripheralJobUtil;
