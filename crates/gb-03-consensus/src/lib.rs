//! # gb-03-consensus
//!
//! Leader-less quorum consensus for Gambit.
//!
//! ## Architecture
//!
//! Every participant may propose the next log entry. Proposals spread as
//! signed votes (`NEW_BLOCK_APPROVED` / `NEW_BLOCK_DECLINED`); an entry
//! commits once strictly more than two thirds of the ready participants
//! approved it.
//!
//! ```text
//!  propose ──→ candidate (self-approved) ──Broadcast──→ peers
//!                    ↑                                   │
//!                    └──────── votes ←───────────────────┘
//!                    │
//!            quorum reached ──→ HashLog::append ──→ Deliver
//! ```
//!
//! Competing entries for one index are resolved by hash: every participant
//! declines the lexicographically larger one, so the mesh converges without
//! a leader. The loser's author rebuilds its event on the new head.
//!
//! A participant that sees a vote beyond `head + 1` is `OUTDATED` and pulls
//! the missing range from a peer (`GET_LAST_BLOCK_*`, `GET_BLOCKS_*`).
//!
//! Participants that committed different entries while cut off from each
//! other notice when their heads are compared after reconnecting. The branch
//! holding the smaller hash where the histories part is kept everywhere;
//! the other is withdrawn (`Effect::Revert`) and its authors propose their
//! events again on the kept branch.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use gb_03_consensus::{ConsensusConfig, ConsensusService, Effect};
//!
//! let mut consensus = ConsensusService::new("alice".into(), ConsensusConfig::default());
//! consensus.start().await?;
//!
//! for effect in consensus.propose("MOVE", payload)? {
//!     match effect {
//!         Effect::Send { to, message } => { /* one link */ }
//!         Effect::Broadcast(message) => { /* every link */ }
//!         Effect::Deliver(entry) => { /* application */ }
//!         Effect::Revert(entries) => { /* application: withdrawn */ }
//!     }
//! }
//! ```

pub mod domain;
pub mod ports;
pub mod service;
pub mod testing;

pub use domain::{
    quorum, Candidate, CandidateTable, ConsensusConfig, ConsensusError, ConsensusResult,
    ConsensusStats, LocalProposal, Participant, ParticipantSet, QueuedEvent, SyncState, VoteKind,
};
pub use ports::{SystemTimeSource, TimeSource};
pub use service::{ConsensusEngine, ConsensusService, Effect};
