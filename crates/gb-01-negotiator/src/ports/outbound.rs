//! # Driven Ports (Outbound SPI)
//!
//! The media/transport stack is an external collaborator. The negotiator
//! only needs the capability below plus a stream of [`TransportEvent`]s,
//! which the host wires through a [`TransportFactory`].

use crate::domain::{ChannelDirection, Role};
use async_trait::async_trait;
use shared_types::{ParticipantName, Signal};
use thiserror::Error;
use tokio::sync::mpsc;

/// Connectivity reported by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    Checking,
    Connected,
    Disconnected,
    Failed,
}

/// Event raised by a transport for one peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    State(TransportState),
    ChannelOpen(ChannelDirection),
    Data(Vec<u8>),
}

/// Transport events tagged with the remote peer they concern.
pub type TransportEventSender = mpsc::UnboundedSender<(ParticipantName, TransportEvent)>;

/// Errors from the transport capability.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("Transport configuration failed: {0}")]
    Configure(String),

    #[error("Signaling failed: {0}")]
    Signaling(String),

    /// Send attempted on a channel that is not open.
    #[error("Channel is not open")]
    ChannelClosed,
}

/// Direct peer data-channel capability.
///
/// # Example Implementation
///
/// ```rust,ignore
/// struct WebRtcTransport { pc: RTCPeerConnection, dc: Option<Arc<RTCDataChannel>> }
///
/// #[async_trait]
/// impl PeerTransport for WebRtcTransport {
///     async fn create_offer(&mut self) -> Result<Signal, TransportError> {
///         let offer = self.pc.create_offer(None).await.map_err(..)?;
///         // ...
///     }
///     // ...
/// }
/// ```
#[async_trait]
pub trait PeerTransport: Send {
    /// Tear down any previous session and prepare a fresh one.
    async fn configure(&mut self, role: Role, ice_servers: &[String]) -> Result<(), TransportError>;

    async fn create_offer(&mut self) -> Result<Signal, TransportError>;

    async fn create_answer(&mut self) -> Result<Signal, TransportError>;

    async fn register_signal(&mut self, remote: &Signal) -> Result<(), TransportError>;

    /// Fire-and-forget send over the data channel.
    fn send(&self, bytes: &[u8]) -> Result<(), TransportError>;

    fn close(&mut self);
}

/// Creates one transport per remote peer, wired to the owner's event queue.
pub trait TransportFactory: Send + Sync {
    type Transport: PeerTransport + 'static;

    fn create(
        &self,
        local: &ParticipantName,
        peer: &ParticipantName,
        events: TransportEventSender,
    ) -> Self::Transport;
}
