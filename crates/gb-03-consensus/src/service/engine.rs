//! Synchronous consensus core.
//!
//! Every handler mutates local state and returns the [`Effect`]s its owner
//! must carry out. Nothing here performs I/O or reads a clock other than
//! through [`TimeSource`].

use crate::domain::{
    quorum, Candidate, CandidateTable, ConsensusConfig, ConsensusError, ConsensusResult,
    ConsensusStats, LocalProposal, ParticipantSet, ProposalQueue, QueuedEvent, SyncState,
    VoteKind,
};
use crate::ports::TimeSource;
use gb_02_hash_log::{build_entry, verify_signature, HashLog, LogError, LogResult};
use serde_json::Value;
use shared_crypto::KeyPair;
use shared_types::{Entry, KeyExchange, ParticipantName, PeerMessage};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Side effect requested by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Send to one participant.
    Send {
        to: ParticipantName,
        message: PeerMessage,
    },
    /// Send to every connected participant.
    Broadcast(PeerMessage),
    /// Hand a committed entry to the application.
    Deliver(Entry),
    /// Withdraw previously delivered entries, in log order. A competing
    /// branch replaced them; its entries follow as `Deliver`.
    Revert(Vec<Entry>),
}

/// Checks on a replayed entry the log cannot make itself. The signature is
/// verified when the author's key is known.
fn verify_replayed(participants: &ParticipantSet, entry: &Entry) -> LogResult<()> {
    let author = entry
        .author()
        .ok_or(LogError::MissingAuthor { index: entry.index })?;
    match participants.public_key(author) {
        Some(key) => verify_signature(entry, key),
        None => Ok(()),
    }
}

/// Leader-less quorum consensus over a [`HashLog`].
///
/// # Invariants
/// - Only entries whose hash recomputes and whose signature verifies against
///   the author's known key are ever counted or appended.
/// - The local participant votes at most once per direction per hash.
/// - After entry `k` commits, no candidate below `k - prune_depth` remains.
/// - Committed entries are only withdrawn when a peer's branch holds the
///   lexicographically smaller hash at the first index where the two
///   histories differ.
pub struct ConsensusEngine {
    keypair: KeyPair,
    participants: ParticipantSet,
    log: HashLog,
    candidates: CandidateTable,
    proposal: LocalProposal,
    queue: ProposalQueue,
    sync: SyncState,
    catch_up_peer: Option<ParticipantName>,
    config: ConsensusConfig,
    time: Arc<dyn TimeSource>,
}

impl ConsensusEngine {
    pub fn new(
        local: ParticipantName,
        keypair: KeyPair,
        config: ConsensusConfig,
        time: Arc<dyn TimeSource>,
    ) -> Self {
        let participants = ParticipantSet::new(local, keypair.public_key());
        Self {
            keypair,
            participants,
            log: HashLog::new(),
            candidates: CandidateTable::new(),
            proposal: LocalProposal::NoProposal,
            queue: ProposalQueue::new(),
            sync: SyncState::UpToDate,
            catch_up_peer: None,
            config,
            time,
        }
    }

    pub fn local(&self) -> &ParticipantName {
        self.participants.local()
    }

    pub fn log(&self) -> &HashLog {
        &self.log
    }

    pub fn participants(&self) -> &ParticipantSet {
        &self.participants
    }

    pub fn candidates(&self) -> &CandidateTable {
        &self.candidates
    }

    pub fn proposal(&self) -> &LocalProposal {
        &self.proposal
    }

    pub fn sync_state(&self) -> SyncState {
        self.sync
    }

    pub fn stats(&self) -> ConsensusStats {
        let head = self.log.head();
        ConsensusStats {
            head_index: head.index,
            head_hash: head.short_hash().to_string(),
            participants: self.participants.len(),
            ready: self.participants.ready_count(),
            quorum: quorum::quorum_size(self.participants.ready_count()),
            candidates: self.candidates.len(),
            proposal: self.proposal.label(),
            queued: self.queue.len(),
            sync: self.sync,
        }
    }

    // =========================================================================
    // Membership
    // =========================================================================

    /// Add a connected remote and start the key exchange with it.
    pub fn register_participant(&mut self, name: ParticipantName) -> Vec<Effect> {
        if &name == self.local() || !self.participants.register(name.clone()) {
            return Vec::new();
        }
        info!("[gb-03] Registered participant {}", name);
        vec![Effect::Send {
            to: name,
            message: PeerMessage::NegotiationRequest(self.key_exchange()),
        }]
    }

    /// Drop a departed remote. Its votes stop counting immediately.
    pub fn remove_participant(&mut self, name: &ParticipantName) -> Vec<Effect> {
        let mut effects = Vec::new();
        if self.participants.remove(name).is_none() {
            return effects;
        }
        info!(
            "[gb-03] Removed participant {} ({} ready)",
            name,
            self.participants.ready_count()
        );

        if self.catch_up_peer.as_ref() == Some(name) {
            self.catch_up_peer = None;
            if self.sync == SyncState::Outdated {
                self.ask_head(None, &mut effects);
            }
        }
        self.settle(&mut effects);
        effects
    }

    // =========================================================================
    // Proposals
    // =========================================================================

    /// Propose an application event for the next log index.
    ///
    /// While an earlier proposal is pending the event is queued and proposed
    /// once that one commits.
    pub fn propose(&mut self, kind: impl Into<String>, payload: Value) -> Vec<Effect> {
        let mut effects = Vec::new();
        let event = QueuedEvent {
            kind: kind.into(),
            payload,
        };
        if self.proposal.is_pending() {
            debug!(
                "[gb-03] Queued {} behind pending proposal ({} waiting)",
                event.kind,
                self.queue.len() + 1
            );
            self.queue.push_back(event);
            return effects;
        }
        self.submit(event, &mut effects);
        self.settle(&mut effects);
        effects
    }

    // =========================================================================
    // Message intake
    // =========================================================================

    /// Dispatch a message received on the link to `from`.
    pub fn handle(&mut self, from: &ParticipantName, message: PeerMessage) -> Vec<Effect> {
        let mut effects = Vec::new();
        if !self.participants.contains(from) {
            debug!(
                "[gb-03] Dropping {} from unregistered {}",
                message.kind(),
                from
            );
            return effects;
        }

        match message {
            PeerMessage::NegotiationRequest(exchange) => {
                self.on_key_exchange(from, &exchange, true, &mut effects)
            }
            PeerMessage::NegotiationResponse(exchange) => {
                self.on_key_exchange(from, &exchange, false, &mut effects)
            }
            PeerMessage::GetLastBlockRequest => effects.push(Effect::Send {
                to: from.clone(),
                message: PeerMessage::GetLastBlockResponse {
                    entry: self.log.head().clone(),
                },
            }),
            PeerMessage::GetLastBlockResponse { entry } => {
                self.on_last_block(from, &entry, &mut effects)
            }
            PeerMessage::GetBlocksRequest { from: start, to } => effects.push(Effect::Send {
                to: from.clone(),
                message: PeerMessage::GetBlocksResponse {
                    entries: self.log.range(start, to),
                },
            }),
            PeerMessage::GetBlocksResponse { entries } => {
                self.on_blocks(from, entries, &mut effects)
            }
            PeerMessage::NewBlockApproved { entry } => {
                self.on_vote(from, entry, VoteKind::Approve, &mut effects)
            }
            PeerMessage::NewBlockDeclined { entry } => {
                self.on_vote(from, entry, VoteKind::Decline, &mut effects)
            }
            PeerMessage::NewPlayer { .. }
            | PeerMessage::RemoteSignal { .. }
            | PeerMessage::Signal { .. } => {
                debug!("[gb-03] Ignoring membership message {}", message.kind());
            }
        }
        effects
    }

    fn on_key_exchange(
        &mut self,
        from: &ParticipantName,
        exchange: &KeyExchange,
        is_request: bool,
        effects: &mut Vec<Effect>,
    ) {
        let newly_ready = match self.participants.learn_key(from, &exchange.public_key) {
            Ok(newly_ready) => newly_ready,
            Err(e) => {
                warn!("[gb-03] Rejected key exchange from {}: {}", from, e);
                return;
            }
        };

        if is_request {
            effects.push(Effect::Send {
                to: from.clone(),
                message: PeerMessage::NegotiationResponse(self.key_exchange()),
            });
        }
        if newly_ready {
            info!(
                "[gb-03] {} is ready ({} ready, peer reports {})",
                from,
                self.participants.ready_count(),
                exchange.ready_count
            );
            effects.push(Effect::Send {
                to: from.clone(),
                message: PeerMessage::GetLastBlockRequest,
            });
            self.settle(effects);
        }
    }

    fn on_vote(
        &mut self,
        voter: &ParticipantName,
        entry: Entry,
        kind: VoteKind,
        effects: &mut Vec<Effect>,
    ) {
        if let Err(e) = self.authenticate(&entry) {
            warn!(
                "[gb-03] Dropping vote from {} on entry {}: {}",
                voter, entry.index, e
            );
            return;
        }

        let head_index = self.log.height();
        if entry.index.saturating_add(self.config.prune_depth) < head_index {
            debug!("[gb-03] Ignoring vote on long-settled entry {}", entry.index);
            return;
        }

        if self.candidates.insert(entry.clone()) {
            debug!(
                "[gb-03] New candidate {} ({}) from {}",
                entry.index,
                entry.short_hash(),
                voter
            );
        }
        self.candidates.record(&entry.hash, voter, kind);

        if entry.index > head_index + 1 {
            self.on_gap(voter, entry.index, effects);
        } else if self.contradicts_history(&entry) {
            self.on_divergence(voter, &entry, effects);
        } else if entry.index <= head_index {
            self.on_stale(&entry, effects);
        } else {
            self.settle(effects);
        }
    }

    /// Hash, author key and signature checks shared by all vote intake.
    fn authenticate(&self, entry: &Entry) -> ConsensusResult<()> {
        if !entry.hash_matches() {
            return Err(LogError::HashMismatch { index: entry.index }.into());
        }
        let author = entry
            .author()
            .ok_or(LogError::MissingAuthor { index: entry.index })?;
        let key = self
            .participants
            .public_key(author)
            .ok_or_else(|| ConsensusError::UnknownAuthor(author.clone()))?;
        verify_signature(entry, key)?;
        Ok(())
    }

    fn on_gap(&mut self, voter: &ParticipantName, index: u64, effects: &mut Vec<Effect>) {
        if self.sync != SyncState::Outdated {
            info!(
                "[gb-03] Entry {} is ahead of head {}, catching up",
                index,
                self.log.height()
            );
            self.sync = SyncState::Outdated;
        }
        if self.catch_up_peer.is_none() {
            self.ask_head(Some(voter), effects);
        }
    }

    /// Whether `entry` claims a parent other than the one we committed.
    fn contradicts_history(&self, entry: &Entry) -> bool {
        entry
            .index
            .checked_sub(1)
            .and_then(|parent| self.log.get(parent))
            .is_some_and(|parent| parent.hash != entry.previous_hash)
    }

    /// The voter builds on a different history. Stop voting and compare
    /// heads with it before counting anything at this index.
    fn on_divergence(&mut self, voter: &ParticipantName, entry: &Entry, effects: &mut Vec<Effect>) {
        if self.sync != SyncState::Outdated {
            warn!(
                "[gb-03] Entry {} ({}) from {} does not chain onto our log",
                entry.index,
                entry.short_hash(),
                voter
            );
            self.sync = SyncState::Outdated;
        }
        if self.catch_up_peer.is_none() {
            self.ask_head(Some(voter), effects);
        }
    }

    fn on_stale(&mut self, entry: &Entry, effects: &mut Vec<Effect>) {
        if self
            .log
            .get(entry.index)
            .is_some_and(|committed| committed.hash == entry.hash)
        {
            return;
        }

        if self
            .proposal
            .pending()
            .is_some_and(|pending| pending.hash == entry.hash)
        {
            self.reconcile_pending(effects);
            self.settle(effects);
            return;
        }

        let local = self.local().clone();
        let decline = match self.candidates.get(&entry.hash) {
            Some(candidate) => !candidate.has_declined(&local) && !self.approval_quorum(candidate),
            None => false,
        };
        if decline {
            debug!(
                "[gb-03] Declining stale entry {} ({})",
                entry.index,
                entry.short_hash()
            );
            self.cast(&entry.hash, VoteKind::Decline, effects);
        }
    }

    // =========================================================================
    // Catch-up
    // =========================================================================

    /// Ask one ready remote for its head, preferring `preferred`.
    fn ask_head(&mut self, preferred: Option<&ParticipantName>, effects: &mut Vec<Effect>) {
        let target = preferred
            .filter(|p| self.participants.is_ready(p))
            .or_else(|| self.participants.ready_remotes().next())
            .cloned();

        match target {
            Some(peer) => {
                debug!("[gb-03] Asking {} for its head", peer);
                self.catch_up_peer = Some(peer.clone());
                effects.push(Effect::Send {
                    to: peer,
                    message: PeerMessage::GetLastBlockRequest,
                });
            }
            None => debug!("[gb-03] No ready peer to catch up from"),
        }
    }

    fn on_last_block(&mut self, from: &ParticipantName, remote_head: &Entry, effects: &mut Vec<Effect>) {
        let head = self.log.height();
        if remote_head.index > head {
            if self.sync != SyncState::Outdated {
                info!(
                    "[gb-03] {} is at {} while we are at {}, catching up",
                    from, remote_head.index, head
                );
                self.sync = SyncState::Outdated;
            }
            self.catch_up_peer = Some(from.clone());
            effects.push(Effect::Send {
                to: from.clone(),
                message: PeerMessage::GetBlocksRequest {
                    from: head + 1,
                    to: remote_head.index,
                },
            });
            return;
        }

        let shared = self
            .log
            .get(remote_head.index)
            .is_some_and(|ours| ours.hash == remote_head.hash);
        if !shared {
            warn!(
                "[gb-03] {} committed {} at {}, which we do not hold",
                from,
                remote_head.short_hash(),
                remote_head.index
            );
            self.request_history(from, remote_head.index, effects);
            return;
        }
        self.finish_catch_up(from, effects);
    }

    /// Ask `from` for its whole log up to `to` to locate where the two
    /// histories part.
    fn request_history(&mut self, from: &ParticipantName, to: u64, effects: &mut Vec<Effect>) {
        self.sync = SyncState::Outdated;
        self.catch_up_peer = Some(from.clone());
        effects.push(Effect::Send {
            to: from.clone(),
            message: PeerMessage::GetBlocksRequest { from: 1, to },
        });
    }

    fn finish_catch_up(&mut self, from: &ParticipantName, effects: &mut Vec<Effect>) {
        let awaited = self.catch_up_peer.as_ref().map_or(true, |p| p == from);
        if !awaited {
            return;
        }
        self.catch_up_peer = None;
        if self.sync == SyncState::Outdated {
            info!("[gb-03] Caught up at index {}", self.log.height());
            self.sync = SyncState::UpToDate;
            self.settle(effects);
        }
    }

    fn on_blocks(&mut self, from: &ParticipantName, entries: Vec<Entry>, effects: &mut Vec<Effect>) {
        let Some(first) = entries.first() else {
            debug!("[gb-03] Empty catch-up batch from {}", from);
            self.catch_up_peer = None;
            return;
        };
        let first_index = first.index;
        let last_index = entries.last().map_or(first_index, |e| e.index);

        let anchored = first_index
            .checked_sub(1)
            .and_then(|parent| self.log.get(parent))
            .is_some_and(|parent| parent.hash == first.previous_hash);
        if !anchored {
            if first_index > 1 {
                debug!(
                    "[gb-03] Batch from {} does not chain onto entry {}, fetching history",
                    from,
                    first_index - 1
                );
                self.request_history(from, last_index, effects);
            } else {
                warn!("[gb-03] Batch from {} does not start at genesis", from);
                self.catch_up_peer = None;
            }
            return;
        }

        if first_index <= self.log.height() {
            self.on_overlap(from, entries, effects);
        } else {
            self.extend_from(from, entries, effects);
        }
    }

    /// A batch covering entries we already hold: either the same history
    /// with possibly more on top, or a competing branch.
    fn on_overlap(&mut self, from: &ParticipantName, mut entries: Vec<Entry>, effects: &mut Vec<Effect>) {
        let divergence = entries.iter().position(|theirs| {
            self.log
                .get(theirs.index)
                .is_some_and(|ours| ours.hash != theirs.hash)
        });

        let Some(at) = divergence else {
            let height = self.log.height();
            entries.retain(|e| e.index > height);
            if entries.is_empty() {
                self.finish_catch_up(from, effects);
            } else {
                self.extend_from(from, entries, effects);
            }
            return;
        };

        let index = entries[at].index;
        let ours = self.log.get(index).map(|e| e.hash.clone()).unwrap_or_default();
        if entries[at].hash < ours {
            let branch = entries.split_off(at);
            self.adopt_branch(from, index, branch, effects);
        } else {
            info!(
                "[gb-03] Histories with {} part at {}; keeping ours ({})",
                from,
                index,
                ours.get(..12).unwrap_or(ours.as_str())
            );
            self.finish_catch_up(from, effects);
        }
    }

    /// Append entries that continue our head.
    fn extend_from(&mut self, from: &ParticipantName, entries: Vec<Entry>, effects: &mut Vec<Effect>) {
        let participants = &self.participants;
        let outcome = self
            .log
            .append_batch(entries, |entry| verify_replayed(participants, entry));

        if let Some((index, e)) = &outcome.rejected {
            warn!(
                "[gb-03] Catch-up batch from {} stopped at entry {}: {}",
                from, index, e
            );
        }
        if outcome.applied.is_empty() {
            self.catch_up_peer = None;
            return;
        }

        info!(
            "[gb-03] Applied {} entries from {}, head now {}",
            outcome.applied.len(),
            from,
            self.log.height()
        );
        for entry in &outcome.applied {
            self.candidates.mark_committed(&entry.hash);
        }
        self.reconcile_pending(effects);
        effects.extend(outcome.applied.into_iter().map(Effect::Deliver));
        self.prune();

        // Ask again until the remote head no longer moves us forward.
        self.ask_head_again(from, effects);
        self.settle(effects);
    }

    /// Replace our entries from `index` on with `branch`, which holds the
    /// smaller hash at `index`. Nothing changes unless the branch verifies
    /// at least at `index`.
    fn adopt_branch(
        &mut self,
        from: &ParticipantName,
        index: u64,
        branch: Vec<Entry>,
        effects: &mut Vec<Effect>,
    ) {
        let mut log = self.log.clone();
        let withdrawn = log.rewind(index.saturating_sub(1));
        let participants = &self.participants;
        let outcome = log.append_batch(branch, |entry| verify_replayed(participants, entry));

        if let Some((at, e)) = &outcome.rejected {
            warn!("[gb-03] Branch from {} rejected at entry {}: {}", from, at, e);
        }
        if outcome.applied.is_empty() {
            self.catch_up_peer = None;
            return;
        }

        warn!(
            "[gb-03] Adopting branch of {} from entry {}: {} entries withdrawn, {} applied",
            from,
            index,
            withdrawn.len(),
            outcome.applied.len()
        );
        self.log = log;
        for entry in &outcome.applied {
            self.candidates.mark_committed(&entry.hash);
        }
        effects.push(Effect::Revert(withdrawn.clone()));
        effects.extend(outcome.applied.into_iter().map(Effect::Deliver));
        self.requeue_withdrawn(&withdrawn, effects);
        self.prune();
        self.ask_head_again(from, effects);
    }

    /// Put our own withdrawn events back in front of the queue, followed by
    /// the pending proposal, and propose the first of them.
    fn requeue_withdrawn(&mut self, withdrawn: &[Entry], effects: &mut Vec<Effect>) {
        let local = self.local().clone();
        let mut requeue: ProposalQueue = withdrawn
            .iter()
            .filter(|entry| entry.author() == Some(&local))
            .filter_map(|entry| entry.data.clone())
            .map(QueuedEvent::from)
            .collect();

        if let Some(pending) = self.proposal.pending().cloned() {
            let committed = self
                .log
                .get(pending.index)
                .is_some_and(|e| e.hash == pending.hash);
            if committed {
                self.proposal = LocalProposal::Committed(pending);
            } else if let Some(data) = pending.data {
                requeue.push_back(data.into());
                self.proposal = LocalProposal::NoProposal;
            }
        }
        if requeue.is_empty() {
            return;
        }

        info!(
            "[gb-03] Resubmitting {} withdrawn or pending events at {}",
            requeue.len(),
            self.log.height() + 1
        );
        requeue.extend(self.queue.drain(..));
        self.queue = requeue;
        if !self.proposal.is_pending() {
            if let Some(next) = self.queue.pop_front() {
                self.submit(next, effects);
            }
        }
    }

    fn ask_head_again(&mut self, from: &ParticipantName, effects: &mut Vec<Effect>) {
        self.catch_up_peer = Some(from.clone());
        effects.push(Effect::Send {
            to: from.clone(),
            message: PeerMessage::GetLastBlockRequest,
        });
    }

    // =========================================================================
    // Voting and commit
    // =========================================================================

    /// Cast local votes and commit at the next index until nothing changes.
    fn settle(&mut self, effects: &mut Vec<Effect>) {
        loop {
            let next = self.log.height() + 1;
            if self.sync == SyncState::UpToDate {
                self.vote_at(next, effects);
            }

            let ready = self
                .candidates
                .hashes_at(next)
                .into_iter()
                .find(|hash| self.tally(hash));
            match ready {
                Some(hash) => self.commit(&hash, effects),
                None => break,
            }
        }
    }

    /// Local votes at `index`: approve the smallest hash that extends the
    /// head and decline every other candidate once.
    fn vote_at(&mut self, index: u64, effects: &mut Vec<Effect>) {
        let local = self.local().clone();
        let head_hash = self.log.head().hash.clone();
        let hashes = self.candidates.hashes_at(index);

        let winner = hashes
            .iter()
            .find(|hash| {
                self.candidates
                    .get(hash)
                    .is_some_and(|c| c.is_open() && c.entry.previous_hash == head_hash)
            })
            .cloned();

        for hash in hashes {
            let Some(candidate) = self.candidates.get(&hash) else {
                continue;
            };
            if !candidate.is_open() {
                continue;
            }

            if winner.as_ref() == Some(&hash) {
                if !candidate.has_voted(&local) {
                    self.cast(&hash, VoteKind::Approve, effects);
                }
                continue;
            }

            let extends_head = candidate.entry.previous_hash == head_hash;
            let spare = !extends_head && self.approval_quorum(candidate);
            if !candidate.has_declined(&local) && !spare {
                debug!(
                    "[gb-03] Declining {} ({}) at index {}",
                    if extends_head { "losing fork" } else { "stale entry" },
                    candidate.entry.short_hash(),
                    index
                );
                self.cast(&hash, VoteKind::Decline, effects);
            }
        }
    }

    /// Record a local vote and broadcast it.
    fn cast(&mut self, hash: &str, kind: VoteKind, effects: &mut Vec<Effect>) {
        let local = self.local().clone();
        if !self.candidates.record(hash, &local, kind) {
            return;
        }
        let Some(candidate) = self.candidates.get(hash) else {
            return;
        };
        let entry = candidate.entry.clone();
        effects.push(Effect::Broadcast(match kind {
            VoteKind::Approve => PeerMessage::NewBlockApproved { entry },
            VoteKind::Decline => PeerMessage::NewBlockDeclined { entry },
        }));
    }

    fn approval_quorum(&self, candidate: &Candidate) -> bool {
        let approvals = candidate.approvals(|v| self.participants.is_ready(v));
        quorum::has_quorum(approvals, self.participants.ready_count())
    }

    /// Whether the candidate can commit now. Marks it rejected once
    /// declines reach quorum.
    fn tally(&mut self, hash: &str) -> bool {
        let participants = &self.participants;
        let ready = participants.ready_count();
        let Some(candidate) = self.candidates.get_mut(hash) else {
            return false;
        };
        if !candidate.is_open() {
            return false;
        }

        let declines = candidate.declines(|v| participants.is_ready(v));
        if quorum::has_quorum(declines, ready) {
            candidate.rejected = true;
            info!(
                "[gb-03] Entry {} ({}) declined by {}/{}",
                candidate.entry.index,
                candidate.entry.short_hash(),
                declines,
                ready
            );
            return false;
        }

        let approvals = candidate.approvals(|v| participants.is_ready(v));
        quorum::has_quorum(approvals, ready) && self.log.can_append(&candidate.entry)
    }

    fn commit(&mut self, hash: &str, effects: &mut Vec<Effect>) {
        let Some(entry) = self.candidates.get(hash).map(|c| c.entry.clone()) else {
            return;
        };
        if let Err(e) = self.log.append(entry.clone()) {
            warn!("[gb-03] Commit of {} failed: {}", entry.short_hash(), e);
            return;
        }
        self.candidates.mark_committed(hash);
        info!(
            "[gb-03] Committed entry {} ({}) from {}",
            entry.index,
            entry.short_hash(),
            entry.author().map(ParticipantName::as_str).unwrap_or("-")
        );

        self.reconcile_pending(effects);
        effects.push(Effect::Deliver(entry));
        self.prune();
    }

    // =========================================================================
    // Local proposal
    // =========================================================================

    fn submit(&mut self, event: QueuedEvent, effects: &mut Vec<Effect>) {
        let entry = build_entry(
            self.log.head(),
            self.local().clone(),
            event.kind,
            event.payload,
            self.time.now_millis(),
            &self.keypair,
        );
        debug!(
            "[gb-03] Proposing entry {} ({})",
            entry.index,
            entry.short_hash()
        );
        let hash = entry.hash.clone();
        self.proposal = LocalProposal::Pending(entry.clone());
        self.candidates.insert(entry);
        self.cast(&hash, VoteKind::Approve, effects);
    }

    /// Settle the pending proposal against a head that just moved.
    ///
    /// Committed: the next queued event is proposed. Superseded: the same
    /// event is rebuilt on the new head and resubmitted.
    fn reconcile_pending(&mut self, effects: &mut Vec<Effect>) {
        let Some(pending) = self.proposal.pending().cloned() else {
            return;
        };

        let committed = self
            .log
            .get(pending.index)
            .is_some_and(|e| e.hash == pending.hash);
        if committed {
            self.proposal = LocalProposal::Committed(pending);
            if let Some(next) = self.queue.pop_front() {
                self.submit(next, effects);
            }
            return;
        }

        if self.log.can_append(&pending) {
            return;
        }
        info!(
            "[gb-03] Proposal {} superseded, resubmitting at {}",
            pending.short_hash(),
            self.log.height() + 1
        );
        if let Some(data) = pending.data {
            self.submit(data.into(), effects);
        }
    }

    fn prune(&mut self) {
        let floor = self.log.height().saturating_sub(self.config.prune_depth);
        let removed = self.candidates.prune_below(floor);
        if removed > 0 {
            debug!("[gb-03] Pruned {} candidates below {}", removed, floor);
        }
    }

    fn key_exchange(&self) -> KeyExchange {
        KeyExchange {
            public_key: self.keypair.public_key().to_hex(),
            ready_count: self.participants.ready_count(),
        }
    }
}
