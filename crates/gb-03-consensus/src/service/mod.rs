//! Consensus Service
//!
//! Owns the engine once the local key pair exists. Until [`ConsensusService::start`]
//! completes the service reports [`SyncState::Initialising`] and refuses
//! proposals.

mod engine;

pub use engine::{ConsensusEngine, Effect};

use crate::domain::{ConsensusConfig, ConsensusError, ConsensusResult, ConsensusStats, SyncState};
use crate::ports::{SystemTimeSource, TimeSource};
use gb_02_hash_log::HashLog;
use serde_json::Value;
use shared_crypto::KeyPair;
use shared_types::{ParticipantName, PeerMessage};
use std::sync::Arc;
use tracing::{debug, info};

/// Consensus Service
pub struct ConsensusService {
    local: ParticipantName,
    config: ConsensusConfig,
    time: Arc<dyn TimeSource>,
    engine: Option<ConsensusEngine>,
}

impl ConsensusService {
    pub fn new(local: ParticipantName, config: ConsensusConfig) -> Self {
        Self::with_time_source(local, config, Arc::new(SystemTimeSource))
    }

    pub fn with_time_source(
        local: ParticipantName,
        config: ConsensusConfig,
        time: Arc<dyn TimeSource>,
    ) -> Self {
        Self {
            local,
            config,
            time,
            engine: None,
        }
    }

    /// Generate the local key pair off the async runtime and create the
    /// engine with a fresh log.
    pub async fn start(&mut self) -> ConsensusResult<()> {
        if self.engine.is_some() {
            return Ok(());
        }
        let keypair = tokio::task::spawn_blocking(KeyPair::generate)
            .await
            .map_err(|e| ConsensusError::KeyGeneration(e.to_string()))?;
        self.start_with_keypair(keypair);
        Ok(())
    }

    /// Create the engine with an existing key pair.
    pub fn start_with_keypair(&mut self, keypair: KeyPair) {
        info!(
            "[gb-03] Consensus ready for {} (key {})",
            self.local,
            &keypair.public_key().to_hex()[..12]
        );
        self.engine = Some(ConsensusEngine::new(
            self.local.clone(),
            keypair,
            self.config.clone(),
            Arc::clone(&self.time),
        ));
    }

    pub fn local(&self) -> &ParticipantName {
        &self.local
    }

    pub fn state(&self) -> SyncState {
        self.engine
            .as_ref()
            .map_or(SyncState::Initialising, ConsensusEngine::sync_state)
    }

    pub fn engine(&self) -> Option<&ConsensusEngine> {
        self.engine.as_ref()
    }

    pub fn log(&self) -> Option<&HashLog> {
        self.engine.as_ref().map(ConsensusEngine::log)
    }

    pub fn stats(&self) -> Option<ConsensusStats> {
        self.engine.as_ref().map(ConsensusEngine::stats)
    }

    pub fn propose(&mut self, kind: impl Into<String>, payload: Value) -> ConsensusResult<Vec<Effect>> {
        let engine = self.engine.as_mut().ok_or(ConsensusError::NotInitialised)?;
        Ok(engine.propose(kind, payload))
    }

    pub fn register_participant(&mut self, name: ParticipantName) -> Vec<Effect> {
        match self.engine.as_mut() {
            Some(engine) => engine.register_participant(name),
            None => {
                debug!("[gb-03] Not initialised, ignoring registration of {}", name);
                Vec::new()
            }
        }
    }

    pub fn remove_participant(&mut self, name: &ParticipantName) -> Vec<Effect> {
        self.engine
            .as_mut()
            .map(|engine| engine.remove_participant(name))
            .unwrap_or_default()
    }

    pub fn handle(&mut self, from: &ParticipantName, message: PeerMessage) -> Vec<Effect> {
        match self.engine.as_mut() {
            Some(engine) => engine.handle(from, message),
            None => {
                debug!(
                    "[gb-03] Not initialised, dropping {} from {}",
                    message.kind(),
                    from
                );
                Vec::new()
            }
        }
    }
}
