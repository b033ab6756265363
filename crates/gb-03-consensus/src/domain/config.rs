//! Consensus configuration.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsensusConfig {
    /// Candidates whose index is more than this many entries behind the
    /// head are dropped.
    pub prune_depth: u64,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self { prune_depth: 10 }
    }
}
