//! # Wire Messages
//!
//! Closed set of messages exchanged over peer channels. Dispatch is an
//! exhaustive `match`; adding a kind is a compile-checked change.

use crate::entities::{Entry, ParticipantName};
use serde::{Deserialize, Serialize};

/// Kind of an opaque signaling blob produced by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalKind {
    Offer,
    Answer,
    Candidate,
}

/// Signaling blob relayed between two negotiating peers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signal {
    #[serde(rename = "type")]
    pub kind: SignalKind,
    pub sdp: String,
}

impl Signal {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SignalKind::Offer,
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SignalKind::Answer,
            sdp: sdp.into(),
        }
    }

    pub fn is_offer(&self) -> bool {
        self.kind == SignalKind::Offer
    }
}

/// Public key and ready-participant count exchanged during readiness
/// negotiation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyExchange {
    /// Hex-encoded Ed25519 verifying key.
    pub public_key: String,
    pub ready_count: usize,
}

/// Messages carried on a direct peer channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PeerMessage {
    // Consensus
    NegotiationRequest(KeyExchange),
    NegotiationResponse(KeyExchange),
    GetLastBlockRequest,
    GetLastBlockResponse { entry: Entry },
    GetBlocksRequest { from: u64, to: u64 },
    GetBlocksResponse { entries: Vec<Entry> },
    NewBlockApproved { entry: Entry },
    NewBlockDeclined { entry: Entry },

    // Membership
    NewPlayer { name: ParticipantName },
    RemoteSignal { from: ParticipantName, signal: Signal },
    Signal { to: ParticipantName, signal: Signal },
}

impl PeerMessage {
    /// Wire name of the message kind, for log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            PeerMessage::NegotiationRequest(_) => "NEGOTIATION_REQUEST",
            PeerMessage::NegotiationResponse(_) => "NEGOTIATION_RESPONSE",
            PeerMessage::GetLastBlockRequest => "GET_LAST_BLOCK_REQUEST",
            PeerMessage::GetLastBlockResponse { .. } => "GET_LAST_BLOCK_RESPONSE",
            PeerMessage::GetBlocksRequest { .. } => "GET_BLOCKS_REQUEST",
            PeerMessage::GetBlocksResponse { .. } => "GET_BLOCKS_RESPONSE",
            PeerMessage::NewBlockApproved { .. } => "NEW_BLOCK_APPROVED",
            PeerMessage::NewBlockDeclined { .. } => "NEW_BLOCK_DECLINED",
            PeerMessage::NewPlayer { .. } => "NEW_PLAYER",
            PeerMessage::RemoteSignal { .. } => "REMOTE_SIGNAL",
            PeerMessage::Signal { .. } => "SIGNAL",
        }
    }

    /// Whether the message belongs to the consensus protocol.
    pub fn is_consensus(&self) -> bool {
        !matches!(
            self,
            PeerMessage::NewPlayer { .. }
                | PeerMessage::RemoteSignal { .. }
                | PeerMessage::Signal { .. }
        )
    }
}
