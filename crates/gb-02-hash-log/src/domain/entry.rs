//! Construction and authorship checks for log entries.

use super::{LogError, LogResult};
use shared_crypto::{KeyPair, PublicKey};
use shared_types::{Entry, EntryData, ParticipantName};

/// Build and sign the entry that would extend `head`.
pub fn build_entry(
    head: &Entry,
    from: ParticipantName,
    kind: impl Into<String>,
    payload: serde_json::Value,
    timestamp: u64,
    keypair: &KeyPair,
) -> Entry {
    let data = EntryData {
        from,
        kind: kind.into(),
        payload,
    };
    let entry = Entry::unsigned(head.index + 1, head.hash.clone(), timestamp, Some(data));
    sign_entry(entry, keypair)
}

/// Attach the author's signature over the entry hash.
pub fn sign_entry(mut entry: Entry, keypair: &KeyPair) -> Entry {
    entry.signature = keypair.sign(entry.hash.as_bytes()).to_hex();
    entry
}

/// Check the entry signature against the author's key.
///
/// The key lookup (by `data.from`) is the caller's job.
pub fn verify_signature(entry: &Entry, key: &PublicKey) -> LogResult<()> {
    if entry.data.is_none() {
        return Err(LogError::MissingAuthor { index: entry.index });
    }
    key.verify_hex(entry.hash.as_bytes(), &entry.signature)
        .map_err(|source| LogError::InvalidSignature {
            index: entry.index,
            source,
        })
}
