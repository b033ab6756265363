//! # Domain Entities
//!
//! Participant identity and the hash-linked log `Entry` shared by the log,
//! consensus and membership subsystems.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of a participant, unique within a room.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantName(String);

impl ParticipantName {
    /// Create a participant name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Borrow the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ParticipantName {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ParticipantName {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Application event carried by an entry.
///
/// `kind` and `payload` are opaque to every subsystem; only the application
/// interprets them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryData {
    pub from: ParticipantName,
    #[serde(rename = "type")]
    pub kind: String,
    pub payload: serde_json::Value,
}

/// One signed, hash-linked record of the shared log.
///
/// Immutable once constructed. `hash` is the lowercase hex SHA-256 of the
/// canonical string, `signature` the hex Ed25519 signature of `hash` by
/// `data.from`. The genesis entry has no data and no signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub index: u64,
    /// Unix milliseconds.
    pub timestamp: u64,
    pub data: Option<EntryData>,
    pub previous_hash: String,
    pub hash: String,
    pub signature: String,
}

impl Entry {
    /// The fixed genesis entry every log starts from.
    pub fn genesis() -> Self {
        Self::unsigned(0, String::new(), 0, None)
    }

    /// Build an entry with its hash computed and an empty signature.
    pub fn unsigned(
        index: u64,
        previous_hash: String,
        timestamp: u64,
        data: Option<EntryData>,
    ) -> Self {
        let mut entry = Self {
            index,
            timestamp,
            data,
            previous_hash,
            hash: String::new(),
            signature: String::new(),
        };
        entry.hash = entry.compute_hash();
        entry
    }

    /// Whether this is the index-0 entry.
    pub fn is_genesis(&self) -> bool {
        self.index == 0
    }

    /// Author of the entry, `None` for genesis.
    pub fn author(&self) -> Option<&ParticipantName> {
        self.data.as_ref().map(|d| &d.from)
    }

    /// `index:previousHash:timestamp:json(data)`.
    ///
    /// serde_json keeps object keys sorted, so every peer derives the same
    /// string for the same payload.
    pub fn canonical_string(&self) -> String {
        let data_json =
            serde_json::to_string(&self.data).unwrap_or_else(|_| String::from("null"));
        format!(
            "{}:{}:{}:{}",
            self.index, self.previous_hash, self.timestamp, data_json
        )
    }

    /// Recompute the content hash from the canonical fields.
    pub fn compute_hash(&self) -> String {
        shared_crypto::sha256_hex(self.canonical_string().as_bytes())
    }

    /// Whether the stored hash matches the canonical fields.
    pub fn hash_matches(&self) -> bool {
        self.hash == self.compute_hash()
    }

    /// Short hash prefix for log lines.
    pub fn short_hash(&self) -> &str {
        &self.hash[..self.hash.len().min(12)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn move_data(from: &str) -> EntryData {
        EntryData {
            from: from.into(),
            kind: "MOVE".to_string(),
            payload: json!({"from": "e2", "to": "e4"}),
        }
    }

    #[test]
    fn test_genesis_is_stable() {
        let a = Entry::genesis();
        let b = Entry::genesis();
        assert_eq!(a.hash, b.hash);
        assert!(a.is_genesis());
        assert!(a.previous_hash.is_empty());
        assert!(a.signature.is_empty());
        assert!(a.hash_matches());
    }

    #[test]
    fn test_hash_covers_payload() {
        let genesis = Entry::genesis();
        let mut entry = Entry::unsigned(1, genesis.hash.clone(), 42, Some(move_data("alice")));
        assert!(entry.hash_matches());

        entry.data = Some(EntryData {
            payload: json!({"from": "e2", "to": "e3"}),
            ..move_data("alice")
        });
        assert!(!entry.hash_matches());
    }

    #[test]
    fn test_canonical_string_sorts_payload_keys() {
        let a = Entry::unsigned(
            1,
            "abc".into(),
            7,
            Some(EntryData {
                payload: json!({"b": 1, "a": 2}),
                ..move_data("bob")
            }),
        );
        let b = Entry::unsigned(
            1,
            "abc".into(),
            7,
            Some(EntryData {
                payload: serde_json::from_str(r#"{"a":2,"b":1}"#).unwrap(),
                ..move_data("bob")
            }),
        );
        assert_eq!(a.hash, b.hash);
        assert!(a.canonical_string().starts_with("1:abc:7:"));
    }

    #[test]
    fn test_entry_wire_field_names() {
        let entry = Entry::unsigned(3, "prev".into(), 9, Some(move_data("carol")));
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["previousHash"], "prev");
        assert_eq!(value["data"]["type"], "MOVE");
        assert_eq!(value["data"]["from"], "carol");
    }
}
