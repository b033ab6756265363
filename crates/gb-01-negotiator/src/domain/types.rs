//! Session-level value types.

use shared_types::{ParticipantName, Signal};
use std::time::Duration;
use thiserror::Error;

/// Which side of the handshake this session plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Initiator,
    Responder,
}

/// Connectivity of a negotiating session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Checking,
    Connected,
}

/// Data sub-channel of a peer connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelDirection {
    Outbound,
    Inbound,
}

/// How signals produced by a session reach the remote peer.
///
/// The first link to the host is signaled over the control plane; later
/// links between peers are signaled through the host's open channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalRoute {
    ControlPlane,
    PeerChannel { via: ParticipantName },
}

/// Why a session ended without a usable link.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NegotiationFailure {
    #[error("signaling retries exhausted after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },

    #[error("not connected within {0:?}")]
    Timeout(Duration),

    #[error("transport closed")]
    Closed,
}

/// Output of the negotiator, to be acted on by its owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NegotiatorEvent {
    /// Relay `signal` to `to` over `route`.
    Signal {
        to: ParticipantName,
        route: SignalRoute,
        signal: Signal,
    },
    /// Both data sub-channels are open. Emitted at most once.
    Connected,
    /// Terminal failure. Emitted at most once.
    Disconnected(NegotiationFailure),
}
