//! # gb-02-hash-log
//!
//! Canonical, verifiable record of committed history.
//!
//! ## Rules
//!
//! - `append(entry)` succeeds iff `entry.index == head.index + 1`,
//!   `entry.previous_hash == head.hash` and the hash recomputes. Otherwise
//!   the log is unchanged.
//! - `verify(entry)` only recomputes the hash. Signature checks use the
//!   author's key and belong to the caller (see [`verify_signature`]).
//! - The genesis entry is trusted by construction and never signature-checked.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use gb_02_hash_log::{build_entry, HashLog};
//!
//! let mut log = HashLog::new();
//! let entry = build_entry(log.head(), "alice".into(), "MOVE", payload, now_ms, &keypair);
//! log.append(entry)?;
//! ```

pub mod domain;

pub use domain::{
    build_entry, sign_entry, verify_signature, BatchOutcome, HashLog, LogError, LogResult,
};
