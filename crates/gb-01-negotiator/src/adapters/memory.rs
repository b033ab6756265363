//! In-process transport where endpoints pair up by exchanging tokens.
//!
//! An offer carries the offering endpoint's id; registering the matching
//! answer pairs the two endpoints and plays the usual connectivity sequence
//! on both sides. Pairs marked with [`MemoryNetwork::block`] only ever reach
//! `Checking`, which exercises the retry path.

use crate::domain::{ChannelDirection, Role};
use crate::ports::{
    PeerTransport, TransportError, TransportEvent, TransportEventSender, TransportFactory,
    TransportState,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use shared_types::{ParticipantName, Signal, SignalKind};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::trace;

type EndpointId = u64;

struct Endpoint {
    local: ParticipantName,
    peer: ParticipantName,
    events: TransportEventSender,
    remote: Option<EndpointId>,
    offered_by: Option<EndpointId>,
}

impl Endpoint {
    fn emit(&self, event: TransportEvent) {
        // The owner may already have dropped its queue.
        let _ = self.events.send((self.peer.clone(), event));
    }
}

#[derive(Default)]
struct NetworkState {
    next_id: EndpointId,
    endpoints: HashMap<EndpointId, Endpoint>,
    blocked: HashSet<(ParticipantName, ParticipantName)>,
}

impl NetworkState {
    fn is_blocked(&self, a: &ParticipantName, b: &ParticipantName) -> bool {
        self.blocked.contains(&(a.clone(), b.clone())) || self.blocked.contains(&(b.clone(), a.clone()))
    }

    fn unpair(&mut self, id: EndpointId, notify: bool) {
        let remote = self.endpoints.get_mut(&id).and_then(|e| e.remote.take());
        if let Some(remote_id) = remote {
            if let Some(remote) = self.endpoints.get_mut(&remote_id) {
                if remote.remote == Some(id) {
                    remote.remote = None;
                    if notify {
                        remote.emit(TransportEvent::State(TransportState::Disconnected));
                    }
                }
            }
        }
    }

    fn pair(&mut self, a: EndpointId, b: EndpointId) -> Result<(), TransportError> {
        let (a_local, a_peer) = match self.endpoints.get(&a) {
            Some(e) => (e.local.clone(), e.peer.clone()),
            None => return Err(TransportError::ChannelClosed),
        };
        let blocked = self.is_blocked(&a_local, &a_peer);

        for (this, other) in [(a, b), (b, a)] {
            let endpoint = self
                .endpoints
                .get_mut(&this)
                .ok_or(TransportError::ChannelClosed)?;
            endpoint.emit(TransportEvent::State(TransportState::Checking));
            if !blocked {
                endpoint.remote = Some(other);
            }
        }
        if blocked {
            trace!("[gb-01] {} <-> {} blocked, stuck at checking", a_local, a_peer);
            return Ok(());
        }

        for id in [a, b] {
            if let Some(endpoint) = self.endpoints.get(&id) {
                endpoint.emit(TransportEvent::State(TransportState::Connected));
                endpoint.emit(TransportEvent::ChannelOpen(ChannelDirection::Outbound));
                endpoint.emit(TransportEvent::ChannelOpen(ChannelDirection::Inbound));
            }
        }
        Ok(())
    }
}

/// Shared in-process network handing out [`MemoryTransport`]s.
#[derive(Clone, Default)]
pub struct MemoryNetwork {
    state: Arc<Mutex<NetworkState>>,
}

impl MemoryNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep every future handshake between `a` and `b` from connecting.
    pub fn block(&self, a: impl Into<ParticipantName>, b: impl Into<ParticipantName>) {
        self.state.lock().blocked.insert((a.into(), b.into()));
    }

    pub fn unblock(&self, a: impl Into<ParticipantName>, b: impl Into<ParticipantName>) {
        let (a, b) = (a.into(), b.into());
        let mut state = self.state.lock();
        state.blocked.remove(&(a.clone(), b.clone()));
        state.blocked.remove(&(b, a));
    }

    /// Drop the live link between `a` and `b`, notifying both sides.
    pub fn sever(&self, a: &ParticipantName, b: &ParticipantName) {
        let mut state = self.state.lock();
        let ids: Vec<EndpointId> = state
            .endpoints
            .iter()
            .filter(|(_, e)| (&e.local == a && &e.peer == b) || (&e.local == b && &e.peer == a))
            .filter(|(_, e)| e.remote.is_some())
            .map(|(id, _)| *id)
            .collect();
        for id in ids {
            if let Some(endpoint) = state.endpoints.get(&id) {
                endpoint.emit(TransportEvent::State(TransportState::Disconnected));
            }
            state.unpair(id, false);
        }
    }
}

impl TransportFactory for MemoryNetwork {
    type Transport = MemoryTransport;

    fn create(
        &self,
        local: &ParticipantName,
        peer: &ParticipantName,
        events: TransportEventSender,
    ) -> MemoryTransport {
        let mut state = self.state.lock();
        let id = state.next_id;
        state.next_id += 1;
        state.endpoints.insert(
            id,
            Endpoint {
                local: local.clone(),
                peer: peer.clone(),
                events,
                remote: None,
                offered_by: None,
            },
        );
        MemoryTransport {
            id,
            network: self.clone(),
        }
    }
}

/// One endpoint of the in-process network.
pub struct MemoryTransport {
    id: EndpointId,
    network: MemoryNetwork,
}

fn parse_token(sdp: &str, prefix: &str) -> Result<EndpointId, TransportError> {
    sdp.strip_prefix(prefix)
        .and_then(|id| id.parse().ok())
        .ok_or_else(|| TransportError::Signaling(format!("unrecognised token {sdp:?}")))
}

#[async_trait]
impl PeerTransport for MemoryTransport {
    async fn configure(&mut self, _role: Role, _ice_servers: &[String]) -> Result<(), TransportError> {
        let mut state = self.network.state.lock();
        state.unpair(self.id, false);
        let endpoint = state
            .endpoints
            .get_mut(&self.id)
            .ok_or_else(|| TransportError::Configure("endpoint closed".into()))?;
        endpoint.offered_by = None;
        Ok(())
    }

    async fn create_offer(&mut self) -> Result<Signal, TransportError> {
        Ok(Signal::offer(format!("offer:{}", self.id)))
    }

    async fn create_answer(&mut self) -> Result<Signal, TransportError> {
        let state = self.network.state.lock();
        match state.endpoints.get(&self.id).and_then(|e| e.offered_by) {
            Some(_) => Ok(Signal::answer(format!("answer:{}", self.id))),
            None => Err(TransportError::Signaling("no offer registered".into())),
        }
    }

    async fn register_signal(&mut self, remote: &Signal) -> Result<(), TransportError> {
        let mut state = self.network.state.lock();
        match remote.kind {
            SignalKind::Offer => {
                let offerer = parse_token(&remote.sdp, "offer:")?;
                let endpoint = state
                    .endpoints
                    .get_mut(&self.id)
                    .ok_or(TransportError::ChannelClosed)?;
                endpoint.offered_by = Some(offerer);
                Ok(())
            }
            SignalKind::Answer => {
                let answerer = parse_token(&remote.sdp, "answer:")?;
                state.pair(self.id, answerer)
            }
            SignalKind::Candidate => Ok(()),
        }
    }

    fn send(&self, bytes: &[u8]) -> Result<(), TransportError> {
        let state = self.network.state.lock();
        let remote = state
            .endpoints
            .get(&self.id)
            .and_then(|e| e.remote)
            .and_then(|id| state.endpoints.get(&id))
            .ok_or(TransportError::ChannelClosed)?;
        remote.emit(TransportEvent::Data(bytes.to_vec()));
        Ok(())
    }

    fn close(&mut self) {
        let mut state = self.network.state.lock();
        state.unpair(self.id, true);
        state.endpoints.remove(&self.id);
    }
}

impl Drop for MemoryTransport {
    fn drop(&mut self) {
        let mut state = self.network.state.lock();
        state.unpair(self.id, true);
        state.endpoints.remove(&self.id);
    }
}
