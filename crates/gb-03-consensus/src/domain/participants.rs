//! Voting participants and their keys.

use super::{ConsensusError, ConsensusResult};
use shared_crypto::PublicKey;
use shared_types::ParticipantName;
use std::collections::{BTreeMap, HashMap};
use tracing::warn;

/// A voting member of the room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub name: ParticipantName,
    pub is_local: bool,
    /// Key exchange completed. Always true for the local participant.
    pub ready: bool,
}

/// Registered participants plus every key learned so far.
///
/// Keys outlive membership: a participant that leaves can still be the
/// author of entries replayed during catch-up. A key, once learned for a
/// name, is never replaced.
#[derive(Debug)]
pub struct ParticipantSet {
    local: ParticipantName,
    members: BTreeMap<ParticipantName, Participant>,
    keys: HashMap<ParticipantName, PublicKey>,
}

impl ParticipantSet {
    pub fn new(local: ParticipantName, local_key: PublicKey) -> Self {
        let mut members = BTreeMap::new();
        members.insert(
            local.clone(),
            Participant {
                name: local.clone(),
                is_local: true,
                ready: true,
            },
        );
        let mut keys = HashMap::new();
        keys.insert(local.clone(), local_key);
        Self {
            local,
            members,
            keys,
        }
    }

    pub fn local(&self) -> &ParticipantName {
        &self.local
    }

    /// Register a remote participant. Returns `false` if already present.
    pub fn register(&mut self, name: ParticipantName) -> bool {
        if self.members.contains_key(&name) {
            return false;
        }
        self.members.insert(
            name.clone(),
            Participant {
                name,
                is_local: false,
                ready: false,
            },
        );
        true
    }

    /// Remove a remote participant. The local participant cannot be removed.
    pub fn remove(&mut self, name: &ParticipantName) -> Option<Participant> {
        if name == &self.local {
            return None;
        }
        self.members.remove(name)
    }

    /// Record the key announced by `name` and mark it ready.
    ///
    /// Returns whether the participant became ready with this call.
    pub fn learn_key(&mut self, name: &ParticipantName, key_hex: &str) -> ConsensusResult<bool> {
        let member = self
            .members
            .get_mut(name)
            .ok_or_else(|| ConsensusError::UnknownParticipant(name.clone()))?;

        match self.keys.get(name) {
            Some(known) if known.to_hex() != key_hex => {
                warn!("[gb-03] Ignoring replacement key announced by {}", name);
            }
            Some(_) => {}
            None => {
                let key = PublicKey::from_hex(key_hex).map_err(|source| {
                    ConsensusError::InvalidPublicKey {
                        name: name.clone(),
                        source,
                    }
                })?;
                self.keys.insert(name.clone(), key);
            }
        }

        let newly_ready = !member.ready;
        member.ready = true;
        Ok(newly_ready)
    }

    pub fn contains(&self, name: &ParticipantName) -> bool {
        self.members.contains_key(name)
    }

    pub fn is_ready(&self, name: &ParticipantName) -> bool {
        self.members.get(name).is_some_and(|p| p.ready)
    }

    pub fn public_key(&self, name: &ParticipantName) -> Option<&PublicKey> {
        self.keys.get(name)
    }

    /// Number of ready participants, the local one included.
    pub fn ready_count(&self) -> usize {
        self.members.values().filter(|p| p.ready).count()
    }

    /// Ready remote participants in name order.
    pub fn ready_remotes(&self) -> impl Iterator<Item = &ParticipantName> {
        self.members
            .values()
            .filter(|p| p.ready && !p.is_local)
            .map(|p| &p.name)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Always false; the local participant is present from construction.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Participant> {
        self.members.values()
    }
}
