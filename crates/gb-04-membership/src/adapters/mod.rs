//! Adapters for the membership ports.

pub mod memory;

pub use memory::MemoryControlPlane;
