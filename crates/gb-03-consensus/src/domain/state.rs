//! Synchronisation state and diagnostics.

use serde::Serialize;
use std::fmt;

/// Whether the local log is believed to match the mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncState {
    /// Key pair and log not created yet.
    Initialising,
    UpToDate,
    /// A gap was observed; catch-up is running.
    Outdated,
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SyncState::Initialising => "INITIALISING",
            SyncState::UpToDate => "UP_TO_DATE",
            SyncState::Outdated => "OUTDATED",
        };
        f.write_str(label)
    }
}

/// Point-in-time view of a consensus engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsensusStats {
    pub head_index: u64,
    pub head_hash: String,
    pub participants: usize,
    pub ready: usize,
    /// Approvals an entry needs with the current ready count.
    pub quorum: usize,
    pub candidates: usize,
    pub proposal: &'static str,
    pub queued: usize,
    pub sync: SyncState,
}
