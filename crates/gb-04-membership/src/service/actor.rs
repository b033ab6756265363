//! Room task.
//!
//! One task owns every negotiator, every link and the consensus service of
//! a participant. Commands, transport events, control-plane notifications
//! and timers are multiplexed on a single `select!` loop.
//!
//! A host admits joiners over the control plane and announces each newcomer
//! to the peers already linked, which then negotiate direct links to it with
//! the host relaying their signals. The star around the host becomes a full
//! mesh.

use super::handle::RoomCommand;
use crate::domain::{
    is_full, MembershipConfig, MembershipError, MembershipResult, RoomEvent, RoomInfo, RoomRole,
};
use crate::ports::{ControlNotification, ControlPlane, NotificationSender};
use gb_01_negotiator::{
    LinkEvent, Negotiator, NegotiatorEvent, PeerLink, SignalRoute, TransportEvent,
    TransportEventSender, TransportFactory,
};
use gb_03_consensus::{ConsensusService, Effect};
use serde_json::Value;
use shared_types::{Envelope, ParticipantName, PeerEnvelope, PeerMessage, Signal};
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Current instant on the runtime clock, so paused test time drives the
/// negotiators too.
fn now() -> Instant {
    tokio::time::Instant::now().into_std()
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(tokio::time::Instant::from_std(at)).await,
        None => std::future::pending().await,
    }
}

pub(crate) struct RoomActor<F: TransportFactory> {
    local: ParticipantName,
    config: MembershipConfig,
    control: Arc<dyn ControlPlane>,
    transports: F,
    consensus: ConsensusService,
    role: Option<RoomRole>,
    room: Option<String>,
    pending: BTreeMap<ParticipantName, Negotiator<F::Transport>>,
    links: BTreeMap<ParticipantName, PeerLink<F::Transport>>,
    /// Data that reached a negotiator before its link opened, in arrival order.
    replay: VecDeque<(ParticipantName, Vec<u8>)>,
    commands: mpsc::UnboundedReceiver<RoomCommand>,
    events: mpsc::UnboundedSender<RoomEvent>,
    transport_tx: TransportEventSender,
    transport_rx: mpsc::UnboundedReceiver<(ParticipantName, TransportEvent)>,
    notify_tx: NotificationSender,
    notify_rx: mpsc::UnboundedReceiver<ControlNotification>,
}

impl<F: TransportFactory + 'static> RoomActor<F> {
    pub(crate) fn new(
        local: ParticipantName,
        control: Arc<dyn ControlPlane>,
        transports: F,
        config: MembershipConfig,
        commands: mpsc::UnboundedReceiver<RoomCommand>,
        events: mpsc::UnboundedSender<RoomEvent>,
    ) -> Self {
        let (transport_tx, transport_rx) = mpsc::unbounded_channel();
        let (notify_tx, notify_rx) = mpsc::unbounded_channel();
        let consensus = ConsensusService::new(local.clone(), config.consensus.clone());
        Self {
            local,
            config,
            control,
            transports,
            consensus,
            role: None,
            room: None,
            pending: BTreeMap::new(),
            links: BTreeMap::new(),
            replay: VecDeque::new(),
            commands,
            events,
            transport_tx,
            transport_rx,
            notify_tx,
            notify_rx,
        }
    }

    pub(crate) async fn run(mut self) {
        if let Err(e) = self.consensus.start().await {
            warn!("[gb-04] {} could not start consensus: {}", self.local, e);
            self.emit(RoomEvent::Closed);
            return;
        }

        let period = self.config.reconcile_interval();
        let mut reconcile = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        reconcile.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            self.drain_replay().await;
            let deadline = self.next_deadline();
            let hosting = self.is_host();

            tokio::select! {
                command = self.commands.recv() => {
                    match command {
                        Some(command) => {
                            if self.on_command(command).await {
                                break;
                            }
                        }
                        None => break,
                    }
                }

                Some((peer, event)) = self.transport_rx.recv() => {
                    self.on_transport_event(peer, event).await;
                }

                Some(notification) = self.notify_rx.recv() => {
                    self.on_notification(notification).await;
                }

                () = sleep_until(deadline) => {
                    self.on_timers().await;
                }

                _ = reconcile.tick(), if hosting => {
                    self.reconcile().await;
                }
            }
        }

        self.shutdown().await;
    }

    /// Returns `true` when the task should stop.
    async fn on_command(&mut self, command: RoomCommand) -> bool {
        match command {
            RoomCommand::Create { room, reply } => {
                let result = self.create(room).await;
                let _ = reply.send(result);
            }
            RoomCommand::Join { room, reply } => {
                let result = self.join(room).await;
                let _ = reply.send(result);
            }
            RoomCommand::Broadcast {
                kind,
                payload,
                reply,
            } => {
                let _ = reply.send(self.broadcast(kind, payload));
            }
            RoomCommand::Peers { reply } => {
                let _ = reply.send(self.links.keys().cloned().collect());
            }
            RoomCommand::Stats { reply } => {
                let _ = reply.send(self.consensus.stats());
            }
            RoomCommand::Entries { reply } => {
                let entries = self
                    .consensus
                    .log()
                    .map(|log| log.iter().cloned().collect())
                    .unwrap_or_default();
                let _ = reply.send(entries);
            }
            RoomCommand::Close => return true,
        }
        false
    }

    async fn create(&mut self, room: String) -> MembershipResult<RoomInfo> {
        if let Some(current) = &self.room {
            return Err(MembershipError::AlreadyInRoom(current.clone()));
        }
        let info = self
            .control
            .create(&room, self.config.max_players, &self.local, self.notify_tx.clone())
            .await?;
        info!(
            "[gb-04] {} hosting room {} ({} seats)",
            self.local, room, info.max_players
        );
        self.role = Some(RoomRole::Host);
        self.room = Some(room);
        Ok(info)
    }

    async fn join(&mut self, room: String) -> MembershipResult<ParticipantName> {
        if let Some(current) = &self.room {
            return Err(MembershipError::AlreadyInRoom(current.clone()));
        }
        let host = self
            .control
            .join(&room, &self.local, self.notify_tx.clone())
            .await?;
        info!("[gb-04] {} joining room {} hosted by {}", self.local, room, host);
        self.role = Some(RoomRole::Peer { host: host.clone() });
        self.room = Some(room);
        Ok(host)
    }

    fn broadcast(&mut self, kind: String, payload: Value) -> MembershipResult<()> {
        if self.room.is_none() {
            return Err(MembershipError::NotInRoom);
        }
        let effects = self.consensus.propose(kind, payload)?;
        self.apply(effects);
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Control plane
    // ---------------------------------------------------------------------

    async fn on_notification(&mut self, notification: ControlNotification) {
        match notification {
            ControlNotification::JoinRequest { player } => self.admit(player).await,
            ControlNotification::RemoteSignal { from, signal } => {
                self.on_remote_signal(from, signal, SignalRoute::ControlPlane).await;
            }
            ControlNotification::Full => {
                info!("[gb-04] {} was turned away: room is full", self.local);
                self.emit(RoomEvent::RoomFull);
            }
        }
    }

    /// Host side of a join request.
    async fn admit(&mut self, player: ParticipantName) {
        let Some(room) = self.hosted_room() else {
            debug!("[gb-04] Not hosting, ignoring join request from {}", player);
            return;
        };
        if player == self.local || self.knows(&player) {
            debug!("[gb-04] Duplicate join request from {}", player);
            return;
        }
        if is_full(self.links.len(), self.pending.len(), self.config.max_players) {
            info!("[gb-04] Room {} is full, turning away {}", room, player);
            if let Err(e) = self.control.full(&player, &room).await {
                warn!("[gb-04] Could not notify {} of full room: {}", player, e);
            }
            return;
        }
        info!("[gb-04] {} asked to join {}", player, room);
        self.start_initiator(player, SignalRoute::ControlPlane).await;
    }

    /// Host side: bring the control-plane roster back in line with the links.
    async fn reconcile(&mut self) {
        let Some(room) = self.hosted_room() else {
            return;
        };
        let roster = match self.control.player_get_all(&room).await {
            Ok(roster) => roster,
            Err(e) => {
                warn!("[gb-04] Roster fetch for {} failed: {}", room, e);
                return;
            }
        };

        let stale: Vec<ParticipantName> = roster
            .iter()
            .filter(|name| **name != self.local && !self.links.contains_key(*name))
            .cloned()
            .collect();
        let missing: Vec<ParticipantName> = self
            .links
            .keys()
            .filter(|name| !roster.contains(name))
            .cloned()
            .collect();

        for name in &stale {
            if let Err(e) = self.control.player_remove(&room, name).await {
                warn!("[gb-04] Roster removal of {} failed: {}", name, e);
            }
        }
        for name in &missing {
            if let Err(e) = self.control.player_add(&room, name).await {
                warn!("[gb-04] Roster addition of {} failed: {}", name, e);
            }
        }
        debug!(
            "[gb-04] Reconciled {}: {} removed, {} added",
            room,
            stale.len(),
            missing.len()
        );
    }

    // ---------------------------------------------------------------------
    // Negotiation
    // ---------------------------------------------------------------------

    async fn start_initiator(&mut self, peer: ParticipantName, route: SignalRoute) {
        let now = now();
        let transport = self
            .transports
            .create(&self.local, &peer, self.transport_tx.clone());
        let negotiator = Negotiator::new(
            peer.clone(),
            route,
            transport,
            self.config.negotiator.clone(),
            now,
        );
        let events = self
            .pending
            .entry(peer.clone())
            .or_insert(negotiator)
            .initiate(now)
            .await;
        self.on_negotiator_events(&peer, events).await;
    }

    /// Signal relayed from `from`. An offer from a participant we are not
    /// negotiating with starts a responder session.
    async fn on_remote_signal(&mut self, from: ParticipantName, signal: Signal, route: SignalRoute) {
        if self.room.is_none() || from == self.local {
            debug!("[gb-04] Ignoring signal from {}", from);
            return;
        }
        if self.links.contains_key(&from) {
            debug!("[gb-04] Already linked with {}, ignoring signal", from);
            return;
        }

        let now = now();
        if !self.pending.contains_key(&from) {
            if !signal.is_offer() {
                debug!("[gb-04] Stray {:?} from {}", signal.kind, from);
                return;
            }
            let transport = self
                .transports
                .create(&self.local, &from, self.transport_tx.clone());
            let negotiator = Negotiator::new(
                from.clone(),
                route,
                transport,
                self.config.negotiator.clone(),
                now,
            );
            self.pending.insert(from.clone(), negotiator);
        }

        let events = match self.pending.get_mut(&from) {
            Some(negotiator) => negotiator.register_signal(&signal, now).await,
            None => return,
        };
        self.on_negotiator_events(&from, events).await;
    }

    async fn on_negotiator_events(&mut self, peer: &ParticipantName, events: Vec<NegotiatorEvent>) {
        for event in events {
            match event {
                NegotiatorEvent::Signal { to, route, signal } => {
                    self.relay_signal(&to, route, signal).await;
                }
                NegotiatorEvent::Connected => self.promote(peer).await,
                NegotiatorEvent::Disconnected(reason) => {
                    info!("[gb-04] Negotiation with {} ended: {}", peer, reason);
                    self.drop_peer(peer).await;
                }
            }
        }
    }

    async fn relay_signal(&mut self, to: &ParticipantName, route: SignalRoute, signal: Signal) {
        match route {
            SignalRoute::ControlPlane => {
                let Some(room) = &self.room else {
                    return;
                };
                if let Err(e) = self.control.signal(&self.local, to, room, &signal).await {
                    warn!("[gb-04] Signal to {} via control plane failed: {}", to, e);
                }
            }
            SignalRoute::PeerChannel { via } => {
                self.send_to(
                    &via,
                    PeerMessage::Signal {
                        to: to.clone(),
                        signal,
                    },
                );
            }
        }
    }

    /// Turn a connected negotiator into a participant.
    async fn promote(&mut self, peer: &ParticipantName) {
        let Some(negotiator) = self.pending.remove(peer) else {
            return;
        };
        let (link, early) = negotiator.into_link();
        self.links.insert(peer.clone(), link);
        info!(
            "[gb-04] {} linked with {} ({} peers)",
            self.local,
            peer,
            self.links.len()
        );
        self.emit(RoomEvent::PlayerJoined(peer.clone()));

        let effects = self.consensus.register_participant(peer.clone());
        self.apply(effects);

        if let Some(room) = self.hosted_room() {
            if let Err(e) = self.control.player_add(&room, peer).await {
                warn!("[gb-04] Roster addition of {} failed: {}", peer, e);
            }
            for other in self.links.keys().filter(|name| *name != peer) {
                self.send_to(other, PeerMessage::NewPlayer { name: peer.clone() });
            }
        }

        // Handled before the next transport event, behind the registration.
        self.replay
            .extend(early.into_iter().map(|bytes| (peer.clone(), bytes)));
    }

    /// Hand early data of freshly promoted links to the link path.
    async fn drain_replay(&mut self) {
        while let Some((peer, bytes)) = self.replay.pop_front() {
            if self.links.contains_key(&peer) {
                self.on_peer_data(&peer, &bytes).await;
            } else {
                debug!("[gb-04] Link to {} gone, dropping early data", peer);
            }
        }
    }

    /// Forget `peer` entirely: link, handshake and consensus membership.
    async fn drop_peer(&mut self, peer: &ParticipantName) {
        if let Some(mut negotiator) = self.pending.remove(peer) {
            negotiator.close();
        }
        let Some(mut link) = self.links.remove(peer) else {
            return;
        };
        link.close();
        info!(
            "[gb-04] {} lost {} ({} peers)",
            self.local,
            peer,
            self.links.len()
        );

        let effects = self.consensus.remove_participant(peer);
        self.apply(effects);
        self.emit(RoomEvent::PlayerLeft(peer.clone()));

        if let Some(room) = self.hosted_room() {
            if let Err(e) = self.control.player_remove(&room, peer).await {
                warn!("[gb-04] Roster removal of {} failed: {}", peer, e);
            }
        }
    }

    fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().filter_map(Negotiator::next_deadline).min()
    }

    async fn on_timers(&mut self) {
        let now = now();
        let due: Vec<ParticipantName> = self
            .pending
            .iter()
            .filter(|(_, n)| n.next_deadline().is_some_and(|at| at <= now))
            .map(|(peer, _)| peer.clone())
            .collect();

        for peer in due {
            let events = match self.pending.get_mut(&peer) {
                Some(negotiator) => negotiator.poll(now).await,
                None => continue,
            };
            self.on_negotiator_events(&peer, events).await;
        }
    }

    // ---------------------------------------------------------------------
    // Links
    // ---------------------------------------------------------------------

    async fn on_transport_event(&mut self, peer: ParticipantName, event: TransportEvent) {
        if let Some(link) = self.links.get_mut(&peer) {
            match link.on_transport_event(event) {
                Some(LinkEvent::Data(bytes)) => self.on_peer_data(&peer, &bytes).await,
                Some(LinkEvent::Disconnected) => self.drop_peer(&peer).await,
                None => {}
            }
            return;
        }

        let events = match self.pending.get_mut(&peer) {
            Some(negotiator) => negotiator.on_transport_event(event, now()),
            None => {
                debug!("[gb-04] Transport event for unknown peer {}", peer);
                return;
            }
        };
        self.on_negotiator_events(&peer, events).await;
    }

    /// `peer` is the link the bytes arrived on and is the identity consensus
    /// sees, whatever the envelope claims.
    async fn on_peer_data(&mut self, peer: &ParticipantName, bytes: &[u8]) {
        let envelope = match PeerEnvelope::decode(bytes) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!("[gb-04] Malformed message from {}: {}", peer, e);
                return;
            }
        };

        match envelope.message {
            PeerMessage::NewPlayer { name } => self.on_new_player(peer, name).await,
            PeerMessage::Signal { to, signal } => self.forward_signal(peer, &to, signal),
            PeerMessage::RemoteSignal { from, signal } => {
                if !self.is_host_link(peer) {
                    warn!("[gb-04] REMOTE_SIGNAL from non-host {}", peer);
                    return;
                }
                let route = SignalRoute::PeerChannel { via: peer.clone() };
                self.on_remote_signal(from, signal, route).await;
            }
            message => {
                let effects = self.consensus.handle(peer, message);
                self.apply(effects);
            }
        }
    }

    /// Peer side: the host announced a newcomer; negotiate a direct link
    /// with it through the host.
    async fn on_new_player(&mut self, from: &ParticipantName, name: ParticipantName) {
        if !self.is_host_link(from) {
            warn!("[gb-04] NEW_PLAYER from non-host {}", from);
            return;
        }
        if name == self.local || self.knows(&name) {
            return;
        }
        info!("[gb-04] {} meshing with newcomer {}", self.local, name);
        let route = SignalRoute::PeerChannel { via: from.clone() };
        self.start_initiator(name, route).await;
    }

    /// Host side: pass a peer's signal on to its target.
    fn forward_signal(&self, from: &ParticipantName, to: &ParticipantName, signal: Signal) {
        if !self.is_host() {
            debug!("[gb-04] Not hosting, dropping signal from {} to {}", from, to);
            return;
        }
        if !self.links.contains_key(to) {
            debug!("[gb-04] No link to {}, dropping signal from {}", to, from);
            return;
        }
        let envelope = Envelope::relayed(
            self.local.clone(),
            from.clone(),
            PeerMessage::RemoteSignal {
                from: from.clone(),
                signal,
            },
        );
        self.send_envelope(to, &envelope);
    }

    fn apply(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Send { to, message } => self.send_to(&to, message),
                Effect::Broadcast(message) => {
                    match Envelope::new(self.local.clone(), message).encode() {
                        Ok(bytes) => {
                            for link in self.links.values() {
                                Self::transmit(link, &bytes);
                            }
                        }
                        Err(e) => warn!("[gb-04] Could not encode broadcast: {}", e),
                    }
                }
                Effect::Deliver(entry) => self.emit(RoomEvent::Committed(entry)),
                Effect::Revert(entries) => self.emit(RoomEvent::Reverted(entries)),
            }
        }
    }

    fn send_to(&self, to: &ParticipantName, message: PeerMessage) {
        self.send_envelope(to, &Envelope::new(self.local.clone(), message));
    }

    fn send_envelope(&self, to: &ParticipantName, envelope: &PeerEnvelope) {
        let Some(link) = self.links.get(to) else {
            debug!("[gb-04] No link to {}, dropping {}", to, envelope.message.kind());
            return;
        };
        match envelope.encode() {
            Ok(bytes) => Self::transmit(link, &bytes),
            Err(e) => warn!("[gb-04] Could not encode {}: {}", envelope.message.kind(), e),
        }
    }

    fn transmit(link: &PeerLink<F::Transport>, bytes: &[u8]) {
        if let Err(e) = link.send(bytes) {
            debug!("[gb-04] Send to {} failed: {}", link.peer(), e);
        }
    }

    // ---------------------------------------------------------------------
    // Helpers
    // ---------------------------------------------------------------------

    fn is_host(&self) -> bool {
        self.role.as_ref().is_some_and(RoomRole::is_host)
    }

    fn is_host_link(&self, peer: &ParticipantName) -> bool {
        self.role
            .as_ref()
            .is_some_and(|role| !role.is_host() && role.host(&self.local) == peer)
    }

    fn hosted_room(&self) -> Option<String> {
        match (&self.role, &self.room) {
            (Some(RoomRole::Host), Some(room)) => Some(room.clone()),
            _ => None,
        }
    }

    fn knows(&self, peer: &ParticipantName) -> bool {
        self.links.contains_key(peer) || self.pending.contains_key(peer)
    }

    fn emit(&self, event: RoomEvent) {
        // The owner may have stopped listening.
        let _ = self.events.send(event);
    }

    async fn shutdown(&mut self) {
        for (_, mut link) in std::mem::take(&mut self.links) {
            link.close();
        }
        for (_, mut negotiator) in std::mem::take(&mut self.pending) {
            negotiator.close();
        }
        if let Some(room) = self.room.take() {
            if let Err(e) = self.control.leave(&room, &self.local).await {
                debug!("[gb-04] Leaving {} failed: {}", room, e);
            }
        }
        self.role = None;
        info!("[gb-04] {} closed", self.local);
        self.emit(RoomEvent::Closed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MemoryControlPlane;
    use gb_01_negotiator::{ChannelDirection, MemoryNetwork, TransportState};
    use gb_02_hash_log::build_entry;
    use shared_crypto::KeyPair;
    use shared_types::{Entry, KeyExchange};

    fn actor(network: &MemoryNetwork) -> RoomActor<MemoryNetwork> {
        let (_commands_tx, commands) = mpsc::unbounded_channel();
        let (events, _events_rx) = mpsc::unbounded_channel();
        RoomActor::new(
            "alice".into(),
            Arc::new(MemoryControlPlane::new()),
            network.clone(),
            MembershipConfig::default(),
            commands,
            events,
        )
    }

    fn encoded(from: &str, message: PeerMessage) -> Vec<u8> {
        Envelope::new(from.into(), message).encode().unwrap()
    }

    #[tokio::test]
    async fn test_early_data_handled_before_later_transport_events() {
        let network = MemoryNetwork::new();
        let mut alice = actor(&network);
        alice.consensus.start_with_keypair(KeyPair::from_seed([1; 32]));

        let bob: ParticipantName = "bob".into();
        let bob_key = KeyPair::from_seed([2; 32]);
        let transport = network.create(&alice.local, &bob, alice.transport_tx.clone());
        let negotiator = Negotiator::new(
            bob.clone(),
            SignalRoute::ControlPlane,
            transport,
            alice.config.negotiator.clone(),
            now(),
        );
        alice.pending.insert(bob.clone(), negotiator);

        // Bob's key arrives while the handshake is still open.
        let exchange = KeyExchange {
            public_key: bob_key.public_key().to_hex(),
            ready_count: 1,
        };
        alice
            .on_transport_event(
                bob.clone(),
                TransportEvent::Data(encoded("bob", PeerMessage::NegotiationRequest(exchange))),
            )
            .await;

        // His first vote is already queued when the link opens.
        let entry = build_entry(&Entry::genesis(), bob.clone(), "MOVE", serde_json::json!("e4"), 1, &bob_key);
        let vote = encoded("bob", PeerMessage::NewBlockApproved { entry: entry.clone() });
        alice
            .transport_tx
            .send((bob.clone(), TransportEvent::Data(vote)))
            .unwrap();

        for event in [
            TransportEvent::State(TransportState::Connected),
            TransportEvent::ChannelOpen(ChannelDirection::Outbound),
            TransportEvent::ChannelOpen(ChannelDirection::Inbound),
        ] {
            alice.on_transport_event(bob.clone(), event).await;
        }
        assert!(alice.links.contains_key(&bob));

        alice.drain_replay().await;
        while let Ok((peer, event)) = alice.transport_rx.try_recv() {
            alice.on_transport_event(peer, event).await;
        }

        let candidates = alice.consensus.engine().unwrap().candidates();
        assert_eq!(candidates.hashes_at(1), vec![entry.hash.clone()]);
        assert!(candidates.get(&entry.hash).unwrap().has_approved(&bob));
        assert_eq!(alice.consensus.log().unwrap().height(), 1);
    }

    #[tokio::test]
    async fn test_only_the_host_link_is_trusted_for_relays() {
        let network = MemoryNetwork::new();
        let mut alice = actor(&network);
        assert!(!alice.is_host_link(&"carol".into()));

        alice.role = Some(RoomRole::Peer { host: "carol".into() });
        assert!(alice.is_host_link(&"carol".into()));
        assert!(!alice.is_host_link(&"bob".into()));

        alice.role = Some(RoomRole::Host);
        assert!(!alice.is_host_link(&"alice".into()));
    }
}
