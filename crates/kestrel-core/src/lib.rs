//! # Kestrel Core
//!
//! Core primitives and types for the Kestrel fleet core.
//!
//! This crate provides the fundamental building blocks:
//! - [`Vehicle`] - A vehicle of the fleet
//! - [`TransportOrder`] - Destinations a vehicle must visit
//! - [`PeripheralJob`] - A task for a peripheral device
//! - [`Block`] - A group of resources owned as a unit
//! - [`ObjectService`] - Access to all of the above
//! - [`KestrelError`] - Error types

pub mod error;
pub mod order;
pub mod peripheral;
pub mod plant;
pub mod service;
pub mod types;
pub mod vehicle;

// Re-exports for convenience
pub use error::{KestrelError, Result};
pub use order::{
    Destination, DriveOrder, DriveOrderState, OrderSequence, Route, Step, TransportOrder,
    TransportOrderCreation, TransportOrderCreationBuilder, TransportOrderState,
};
pub use peripheral::{ExecutionTrigger, PeripheralJob, PeripheralJobState, PeripheralOperation};
pub use plant::{
    Block, BlockType, Couple, Envelope, Link, Location, LocationType, Path, PeripheralInformation,
    PeripheralProcState, PeripheralState, Point, PointType,
};
pub use service::{Filter, ObjectService};
pub use types::*;
pub use vehicle::{IntegrationLevel, ProcState, Vehicle, VehicleState};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::error::{KestrelError, Result};
    pub use crate::order::{Destination, DriveOrder, TransportOrder, TransportOrderState};
    pub use crate::peripheral::{PeripheralJob, PeripheralJobState};
    pub use crate::plant::{Block, BlockType, Location, Point};
    pub use crate::service::ObjectService;
    pub use crate::types::{ExplainedBoolean, Lifecycle, ResourceRef, ResourceSet};
    pub use crate::vehicle::{ProcState, Vehicle, VehicleState};
}
