//! # Kestrel State
//!
//! In-memory object pool backing the [`ObjectService`](kestrel_core::ObjectService) contract.

pub mod pool;

pub use pool::InMemoryPlant;
