//! # Error Types
//!
//! Errors raised while moving messages on and off the wire.

use thiserror::Error;

/// Wire encoding errors.
#[derive(Debug, Error)]
pub enum WireError {
    #[error("Failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Failed to decode message: {0}")]
    Decode(#[source] serde_json::Error),
}
