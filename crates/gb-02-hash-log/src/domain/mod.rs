//! Domain layer for the hash-chained log.

mod entry;
mod error;
mod log;

pub use entry::*;
pub use error::*;
pub use log::*;
