//! # Wire Envelope
//!
//! `{ type, from, origin, payload }` wrapper used on the control-plane
//! channel and on every peer channel. `from` is the hop that delivered the
//! message, `origin` the participant that created it.

use crate::entities::ParticipantName;
use crate::errors::WireError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope<M> {
    pub from: ParticipantName,
    pub origin: ParticipantName,
    #[serde(flatten)]
    pub message: M,
}

impl<M> Envelope<M> {
    /// Envelope for a message created by `from` itself.
    pub fn new(from: ParticipantName, message: M) -> Self {
        Self {
            origin: from.clone(),
            from,
            message,
        }
    }

    /// Envelope for a message forwarded by `from` on behalf of `origin`.
    pub fn relayed(from: ParticipantName, origin: ParticipantName, message: M) -> Self {
        Self {
            from,
            origin,
            message,
        }
    }
}

impl<M: Serialize> Envelope<M> {
    pub fn encode(&self) -> Result<Vec<u8>, WireError> {
        serde_json::to_vec(self).map_err(WireError::Encode)
    }
}

impl<M: DeserializeOwned> Envelope<M> {
    pub fn decode(bytes: &[u8]) -> Result<Self, WireError> {
        serde_json::from_slice(bytes).map_err(WireError::Decode)
    }
}
