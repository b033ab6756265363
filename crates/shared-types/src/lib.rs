//! # Shared Types Crate
//!
//! Types every Gambit subsystem speaks: participant names, the hash-linked
//! log `Entry`, the closed `PeerMessage` set and the JSON wire `Envelope`.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: cross-subsystem types live here only.
//! - **Closed dispatch**: message kinds are enum variants, never strings
//!   looked up at runtime.
//! - **Envelope identity**: `from` is the delivering hop; `origin` is the
//!   participant that created the message.

pub mod entities;
pub mod envelope;
pub mod errors;
pub mod messages;

pub use entities::{Entry, EntryData, ParticipantName};
pub use envelope::Envelope;
pub use errors::WireError;
pub use messages::{KeyExchange, PeerMessage, Signal, SignalKind};

/// Envelope carrying a peer-channel message.
pub type PeerEnvelope = Envelope<PeerMessage>;
