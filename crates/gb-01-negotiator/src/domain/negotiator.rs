//! The per-peer bootstrap state machine.

use super::{
    ChannelDirection, ConnectionState, NegotiationFailure, NegotiatorConfig, NegotiatorEvent,
    PeerLink, Role, SignalRoute,
};
use crate::ports::{PeerTransport, TransportError, TransportEvent, TransportState};
use shared_types::{ParticipantName, Signal};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Transient session turning a signaling exchange into a live channel.
///
/// Time is passed in explicitly (`now`) so the owner decides what clock
/// drives it; [`next_deadline`](Self::next_deadline) tells the owner when
/// [`poll`](Self::poll) must run next.
///
/// # Invariants
/// - `Connected` is surfaced once, and only when the transport reports
///   connectivity and both data sub-channels are open.
/// - `Disconnected` is surfaced at most once; afterwards every call is a no-op.
/// - An initiator makes at most `max_attempts` signaling attempts.
pub struct Negotiator<T: PeerTransport> {
    peer: ParticipantName,
    role: Role,
    route: SignalRoute,
    state: ConnectionState,
    outbound_open: bool,
    inbound_open: bool,
    attempts: u32,
    created_at: Instant,
    retry_at: Option<Instant>,
    surfaced: bool,
    finished: bool,
    early_data: Vec<Vec<u8>>,
    config: NegotiatorConfig,
    transport: T,
}

impl<T: PeerTransport> Negotiator<T> {
    /// Create a session. It acts as responder until [`initiate`](Self::initiate).
    pub fn new(
        peer: ParticipantName,
        route: SignalRoute,
        transport: T,
        config: NegotiatorConfig,
        now: Instant,
    ) -> Self {
        Self {
            peer,
            role: Role::Responder,
            route,
            state: ConnectionState::Disconnected,
            outbound_open: false,
            inbound_open: false,
            attempts: 0,
            created_at: now,
            retry_at: None,
            surfaced: false,
            finished: false,
            early_data: Vec::new(),
            config,
            transport,
        }
    }

    pub fn peer(&self) -> &ParticipantName {
        &self.peer
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn route(&self) -> &SignalRoute {
        &self.route
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Become the initiator and emit the first offer.
    pub async fn initiate(&mut self, now: Instant) -> Vec<NegotiatorEvent> {
        if self.finished {
            return Vec::new();
        }
        self.role = Role::Initiator;
        self.start_attempt(now).await
    }

    /// Apply a signal relayed from the remote peer.
    ///
    /// A responder answers every offer, reconfiguring from scratch so a
    /// retried offer replaces the previous attempt.
    pub async fn register_signal(&mut self, remote: &Signal, now: Instant) -> Vec<NegotiatorEvent> {
        if self.finished {
            return Vec::new();
        }

        if self.role == Role::Responder && remote.is_offer() {
            self.attempts += 1;
            self.reset_connectivity();
            return match self.answer(remote).await {
                Ok(answer) => {
                    debug!("[gb-01] Answering offer from {}", self.peer);
                    vec![self.signal_event(answer)]
                }
                Err(e) => {
                    warn!("[gb-01] Failed to answer {}: {}", self.peer, e);
                    Vec::new()
                }
            };
        }

        match self.transport.register_signal(remote).await {
            Ok(()) => Vec::new(),
            Err(e) => {
                warn!("[gb-01] Failed to apply signal from {}: {}", self.peer, e);
                self.fail_attempt(now)
            }
        }
    }

    /// React to a connectivity or data event from the transport.
    pub fn on_transport_event(&mut self, event: TransportEvent, now: Instant) -> Vec<NegotiatorEvent> {
        if self.finished {
            return Vec::new();
        }

        match event {
            TransportEvent::State(TransportState::Checking) => {
                self.state = ConnectionState::Checking;
                if self.role == Role::Initiator {
                    self.retry_at = Some(now + self.config.retry_delay());
                }
                Vec::new()
            }
            TransportEvent::State(TransportState::Connected) => {
                self.state = ConnectionState::Connected;
                self.surface_if_ready()
            }
            TransportEvent::State(TransportState::Disconnected | TransportState::Failed) => {
                debug!("[gb-01] Transport to {} dropped while negotiating", self.peer);
                self.reset_connectivity();
                self.fail_attempt(now)
            }
            TransportEvent::ChannelOpen(ChannelDirection::Outbound) => {
                self.outbound_open = true;
                self.surface_if_ready()
            }
            TransportEvent::ChannelOpen(ChannelDirection::Inbound) => {
                self.inbound_open = true;
                self.surface_if_ready()
            }
            TransportEvent::Data(bytes) => {
                self.early_data.push(bytes);
                Vec::new()
            }
        }
    }

    /// Fire due timers: the absolute session deadline, then the retry delay.
    pub async fn poll(&mut self, now: Instant) -> Vec<NegotiatorEvent> {
        if self.finished || self.surfaced {
            return Vec::new();
        }

        let timeout = self.config.session_timeout();
        if now >= self.created_at + timeout {
            info!("[gb-01] Negotiation with {} timed out", self.peer);
            return self.finish(NegotiationFailure::Timeout(timeout));
        }

        match self.retry_at {
            Some(at) if self.role == Role::Initiator && now >= at => {
                if self.attempts >= self.config.max_attempts {
                    info!(
                        "[gb-01] Negotiation with {} failed after {} attempts",
                        self.peer, self.attempts
                    );
                    self.finish(NegotiationFailure::RetriesExhausted {
                        attempts: self.attempts,
                    })
                } else {
                    debug!("[gb-01] Retrying negotiation with {}", self.peer);
                    self.start_attempt(now).await
                }
            }
            _ => Vec::new(),
        }
    }

    /// Earliest instant at which [`poll`](Self::poll) has work to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        if self.finished || self.surfaced {
            return None;
        }
        let deadline = self.created_at + self.config.session_timeout();
        Some(match self.retry_at {
            Some(at) if self.role == Role::Initiator => at.min(deadline),
            _ => deadline,
        })
    }

    /// Abandon the session and release the transport.
    pub fn close(&mut self) {
        self.finished = true;
        self.retry_at = None;
        self.transport.close();
    }

    /// Promote a connected session into a live link.
    ///
    /// Returns the link and any data that arrived before the gate opened.
    pub fn into_link(self) -> (PeerLink<T>, Vec<Vec<u8>>) {
        (PeerLink::new(self.peer, self.transport), self.early_data)
    }

    async fn start_attempt(&mut self, now: Instant) -> Vec<NegotiatorEvent> {
        self.attempts += 1;
        self.reset_connectivity();
        self.retry_at = Some(now + self.config.retry_delay());

        match self.offer().await {
            Ok(offer) => {
                debug!(
                    "[gb-01] Offer #{} to {} via {:?}",
                    self.attempts, self.peer, self.route
                );
                vec![self.signal_event(offer)]
            }
            Err(e) => {
                warn!("[gb-01] Failed to create offer for {}: {}", self.peer, e);
                self.fail_attempt(now)
            }
        }
    }

    async fn offer(&mut self) -> Result<Signal, TransportError> {
        self.transport
            .configure(Role::Initiator, &self.config.ice_servers)
            .await?;
        self.transport.create_offer().await
    }

    async fn answer(&mut self, remote: &Signal) -> Result<Signal, TransportError> {
        self.transport
            .configure(Role::Responder, &self.config.ice_servers)
            .await?;
        self.transport.register_signal(remote).await?;
        self.transport.create_answer().await
    }

    /// Count a failed attempt against the budget.
    ///
    /// Initiators retry on the next poll; responders wait for a new offer
    /// until the session deadline.
    fn fail_attempt(&mut self, now: Instant) -> Vec<NegotiatorEvent> {
        if self.role != Role::Initiator {
            return Vec::new();
        }
        if self.attempts >= self.config.max_attempts {
            return self.finish(NegotiationFailure::RetriesExhausted {
                attempts: self.attempts,
            });
        }
        self.retry_at = Some(now);
        Vec::new()
    }

    fn surface_if_ready(&mut self) -> Vec<NegotiatorEvent> {
        let ready = self.state == ConnectionState::Connected && self.outbound_open && self.inbound_open;
        if !ready || self.surfaced {
            return Vec::new();
        }
        self.surfaced = true;
        self.retry_at = None;
        info!(
            "[gb-01] Connected to {} after {} attempt(s)",
            self.peer,
            self.attempts.max(1)
        );
        vec![NegotiatorEvent::Connected]
    }

    fn reset_connectivity(&mut self) {
        self.state = ConnectionState::Disconnected;
        self.outbound_open = false;
        self.inbound_open = false;
    }

    fn finish(&mut self, failure: NegotiationFailure) -> Vec<NegotiatorEvent> {
        self.close();
        vec![NegotiatorEvent::Disconnected(failure)]
    }

    fn signal_event(&self, signal: Signal) -> NegotiatorEvent {
        NegotiatorEvent::Signal {
            to: self.peer.clone(),
            route: self.route.clone(),
            signal,
        }
    }
}
