//! Membership error types.

use crate::ports::ControlPlaneError;
use gb_03_consensus::ConsensusError;
use thiserror::Error;

/// Errors returned to callers of a room.
#[derive(Debug, Error)]
pub enum MembershipError {
    #[error("Control plane error: {0}")]
    ControlPlane(#[from] ControlPlaneError),

    #[error("Consensus error: {0}")]
    Consensus(#[from] ConsensusError),

    #[error("Already in room {0}")]
    AlreadyInRoom(String),

    #[error("Not in a room")]
    NotInRoom,

    /// The room task has stopped.
    #[error("Room closed")]
    Closed,
}

pub type MembershipResult<T> = Result<T, MembershipError>;
