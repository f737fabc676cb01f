//! # Kestrel Allocation
//!
//! Resource scheduling for the Kestrel fleet core: discrete resources,
//! block rules and geometric area exclusivity.

pub mod allocations;
pub mod allocator;
pub mod area;
pub mod block;
pub mod scheduler;

pub use allocations::AreaAllocations;
pub use allocator::AreaAllocator;
pub use area::{Area, AreaProvider, EnvelopeAreaProvider};
pub use block::BlockAreaAllocations;
pub use scheduler::ResourceScheduler;
