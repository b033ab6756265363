//! Domain layer for quorum consensus.

mod candidates;
mod config;
mod error;
mod participants;
mod proposal;
pub mod quorum;
mod state;

pub use candidates::*;
pub use config::*;
pub use error::*;
pub use participants::*;
pub use proposal::*;
pub use state::*;
