//! Live link to a connected peer.

use crate::ports::{PeerTransport, TransportError, TransportEvent, TransportState};
use shared_types::ParticipantName;
use tracing::debug;

/// What a live link reports to its owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    Data(Vec<u8>),
    /// The channel went away. Reported once.
    Disconnected,
}

/// A connected peer channel, produced by [`Negotiator::into_link`](super::Negotiator::into_link).
pub struct PeerLink<T: PeerTransport> {
    peer: ParticipantName,
    transport: T,
    closed: bool,
}

impl<T: PeerTransport> PeerLink<T> {
    pub(crate) fn new(peer: ParticipantName, transport: T) -> Self {
        Self {
            peer,
            transport,
            closed: false,
        }
    }

    pub fn peer(&self) -> &ParticipantName {
        &self.peer
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Send bytes to the peer.
    pub fn send(&self, bytes: &[u8]) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::ChannelClosed);
        }
        self.transport.send(bytes)
    }

    /// Translate a transport event into a link event.
    pub fn on_transport_event(&mut self, event: TransportEvent) -> Option<LinkEvent> {
        if self.closed {
            return None;
        }
        match event {
            TransportEvent::Data(bytes) => Some(LinkEvent::Data(bytes)),
            TransportEvent::State(TransportState::Disconnected | TransportState::Failed) => {
                debug!("[gb-01] Link to {} dropped", self.peer);
                self.closed = true;
                Some(LinkEvent::Disconnected)
            }
            TransportEvent::State(_) | TransportEvent::ChannelOpen(_) => None,
        }
    }

    pub fn close(&mut self) {
        self.closed = true;
        self.transport.close();
    }
}
