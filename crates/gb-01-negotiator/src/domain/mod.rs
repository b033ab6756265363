//! Domain layer for connection negotiation.

mod config;
mod link;
mod negotiator;
mod types;

pub use config::*;
pub use link::*;
pub use negotiator::*;
pub use types::*;
