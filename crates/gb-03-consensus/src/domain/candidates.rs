//! Candidate entries under vote.

use shared_types::{Entry, ParticipantName};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Direction of a vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteKind {
    Approve,
    Decline,
}

/// An entry proposed for some index, with the votes seen for it.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub entry: Entry,
    pub approved_by: BTreeSet<ParticipantName>,
    pub declined_by: BTreeSet<ParticipantName>,
    pub committed: bool,
    /// Quorum-declined; never commits.
    pub rejected: bool,
}

impl Candidate {
    fn new(entry: Entry) -> Self {
        Self {
            entry,
            approved_by: BTreeSet::new(),
            declined_by: BTreeSet::new(),
            committed: false,
            rejected: false,
        }
    }

    pub fn hash(&self) -> &str {
        &self.entry.hash
    }

    pub fn index(&self) -> u64 {
        self.entry.index
    }

    pub fn has_voted(&self, voter: &ParticipantName) -> bool {
        self.has_approved(voter) || self.has_declined(voter)
    }

    pub fn has_approved(&self, voter: &ParticipantName) -> bool {
        self.approved_by.contains(voter)
    }

    pub fn has_declined(&self, voter: &ParticipantName) -> bool {
        self.declined_by.contains(voter)
    }

    /// Still eligible to commit.
    pub fn is_open(&self) -> bool {
        !self.committed && !self.rejected
    }

    /// Record a vote. Returns whether anything changed.
    ///
    /// Approvals and declines are tallied independently; a voter that
    /// approved and later declined counts on both sides.
    pub fn record(&mut self, voter: &ParticipantName, kind: VoteKind) -> bool {
        match kind {
            VoteKind::Approve => self.approved_by.insert(voter.clone()),
            VoteKind::Decline => self.declined_by.insert(voter.clone()),
        }
    }

    /// Approvals counted against `is_ready`.
    pub fn approvals(&self, is_ready: impl Fn(&ParticipantName) -> bool) -> usize {
        self.approved_by.iter().filter(|&v| is_ready(v)).count()
    }

    /// Declines counted against `is_ready`.
    pub fn declines(&self, is_ready: impl Fn(&ParticipantName) -> bool) -> usize {
        self.declined_by.iter().filter(|&v| is_ready(v)).count()
    }
}

/// Candidates keyed by hash, indexed by log position.
#[derive(Debug, Default)]
pub struct CandidateTable {
    by_hash: HashMap<String, Candidate>,
    by_index: BTreeMap<u64, BTreeSet<String>>,
}

impl CandidateTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, hash: &str) -> Option<&Candidate> {
        self.by_hash.get(hash)
    }

    pub fn get_mut(&mut self, hash: &str) -> Option<&mut Candidate> {
        self.by_hash.get_mut(hash)
    }

    pub fn contains(&self, hash: &str) -> bool {
        self.by_hash.contains_key(hash)
    }

    /// Track `entry` if not already known. Returns whether it was new.
    pub fn insert(&mut self, entry: Entry) -> bool {
        if self.by_hash.contains_key(&entry.hash) {
            return false;
        }
        self.by_index
            .entry(entry.index)
            .or_default()
            .insert(entry.hash.clone());
        self.by_hash.insert(entry.hash.clone(), Candidate::new(entry));
        true
    }

    /// Record a vote on a known candidate. Returns whether anything changed.
    pub fn record(&mut self, hash: &str, voter: &ParticipantName, kind: VoteKind) -> bool {
        self.by_hash
            .get_mut(hash)
            .is_some_and(|c| c.record(voter, kind))
    }

    /// Hashes of candidates at `index`, in ascending (tie-break) order.
    pub fn hashes_at(&self, index: u64) -> Vec<String> {
        self.by_index
            .get(&index)
            .map(|hashes| hashes.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn mark_committed(&mut self, hash: &str) {
        if let Some(candidate) = self.by_hash.get_mut(hash) {
            candidate.committed = true;
        }
    }

    /// Drop every candidate below `index`. Returns how many were removed.
    pub fn prune_below(&mut self, index: u64) -> usize {
        let keep = self.by_index.split_off(&index);
        let dropped = std::mem::replace(&mut self.by_index, keep);
        let mut removed = 0;
        for hash in dropped.into_values().flatten() {
            if self.by_hash.remove(&hash).is_some() {
                removed += 1;
            }
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.by_hash.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_hash.is_empty()
    }
}
