//! Error types for the consensus subsystem.

use gb_02_hash_log::LogError;
use shared_crypto::CryptoError;
use shared_types::ParticipantName;

/// Consensus error types
#[derive(Debug, thiserror::Error)]
pub enum ConsensusError {
    #[error("Consensus engine is still initialising")]
    NotInitialised,

    #[error("Unknown participant: {0}")]
    UnknownParticipant(ParticipantName),

    #[error("No key known for author {0}")]
    UnknownAuthor(ParticipantName),

    #[error("Invalid public key from {name}: {source}")]
    InvalidPublicKey {
        name: ParticipantName,
        #[source]
        source: CryptoError,
    },

    #[error("Key generation failed: {0}")]
    KeyGeneration(String),

    #[error("Log error: {0}")]
    Log(#[from] LogError),
}

/// Result type for consensus operations
pub type ConsensusResult<T> = Result<T, ConsensusError>;
