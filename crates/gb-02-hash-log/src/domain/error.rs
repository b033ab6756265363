//! Error types for the hash-chained log.

use shared_crypto::CryptoError;
use thiserror::Error;

/// Log error types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LogError {
    /// Entry does not extend the current head.
    #[error("Chain conflict: entry {index} (prev {previous_hash}) does not extend head {head_index} ({head_hash})")]
    ChainConflict {
        index: u64,
        previous_hash: String,
        head_index: u64,
        head_hash: String,
    },

    /// Stored hash does not match the canonical fields.
    #[error("Hash mismatch at index {index}")]
    HashMismatch { index: u64 },

    /// Entry carries no author data.
    #[error("Entry {index} has no author")]
    MissingAuthor { index: u64 },

    /// Signature does not verify against the author's key.
    #[error("Invalid signature on entry {index}: {source}")]
    InvalidSignature {
        index: u64,
        #[source]
        source: CryptoError,
    },

    /// Stored chain link broken (only reachable through corruption).
    #[error("Broken link at index {index}")]
    BrokenLink { index: u64 },
}

/// Result type for log operations.
pub type LogResult<T> = Result<T, LogError>;
