//! Negotiator configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timing and retry budget of a negotiation session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NegotiatorConfig {
    /// Delay before an initiator still waiting on connectivity retries.
    pub retry_delay_secs: u64,

    /// Signaling attempts before giving up.
    pub max_attempts: u32,

    /// Absolute deadline from session creation.
    pub session_timeout_secs: u64,

    /// Connectivity-assist (STUN-style) servers handed to the transport.
    pub ice_servers: Vec<String>,
}

impl NegotiatorConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout_secs)
    }
}

impl Default for NegotiatorConfig {
    fn default() -> Self {
        Self {
            retry_delay_secs: 3,
            max_attempts: 3,
            session_timeout_secs: 15,
            ice_servers: vec!["stun:stun.l.google.com:19302".to_string()],
        }
    }
}
