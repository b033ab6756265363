//! # Adapters
//!
//! Implementations of the transport port.

pub mod memory;

pub use memory::{MemoryNetwork, MemoryTransport};
