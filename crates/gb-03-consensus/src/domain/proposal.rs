//! The local participant's own proposal.

use serde_json::Value;
use shared_types::{Entry, EntryData};
use std::collections::VecDeque;

/// Lifecycle of the entry this node most recently proposed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LocalProposal {
    #[default]
    NoProposal,
    /// Proposed and awaiting quorum.
    Pending(Entry),
    /// Last proposal, now part of the log.
    Committed(Entry),
}

impl LocalProposal {
    pub fn pending(&self) -> Option<&Entry> {
        match self {
            LocalProposal::Pending(entry) => Some(entry),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending().is_some()
    }

    pub fn label(&self) -> &'static str {
        match self {
            LocalProposal::NoProposal => "none",
            LocalProposal::Pending(_) => "pending",
            LocalProposal::Committed(_) => "committed",
        }
    }
}

/// An application event waiting for its turn to be proposed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedEvent {
    pub kind: String,
    pub payload: Value,
}

impl From<EntryData> for QueuedEvent {
    fn from(data: EntryData) -> Self {
        Self {
            kind: data.kind,
            payload: data.payload,
        }
    }
}

/// FIFO of events submitted while a proposal was pending.
pub type ProposalQueue = VecDeque<QueuedEvent>;
