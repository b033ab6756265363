//! Membership configuration.

use gb_01_negotiator::NegotiatorConfig;
use gb_03_consensus::ConsensusConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Room-level settings plus the settings of the subsystems a room drives.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MembershipConfig {
    /// Capacity of a created room, host included.
    pub max_players: usize,

    /// How often a host compares its links with the control-plane roster.
    pub reconcile_interval_secs: u64,

    pub negotiator: NegotiatorConfig,

    pub consensus: ConsensusConfig,
}

impl MembershipConfig {
    pub fn reconcile_interval(&self) -> Duration {
        Duration::from_secs(self.reconcile_interval_secs.max(1))
    }
}

impl Default for MembershipConfig {
    fn default() -> Self {
        Self {
            max_players: 8,
            reconcile_interval_secs: 360,
            negotiator: NegotiatorConfig::default(),
            consensus: ConsensusConfig::default(),
        }
    }
}
