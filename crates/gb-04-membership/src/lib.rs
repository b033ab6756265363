//! # gb-04-membership
//!
//! Room lifecycle for Gambit: create or join a room through the control
//! plane, grow the host-centred star into a full mesh of direct links, and
//! feed every link into consensus.
//!
//! ## Architecture
//!
//! ```text
//!            ┌──────────── control plane ────────────┐
//!            │ JOIN_REQUEST / REMOTE_SIGNAL / FULL    │
//!            ▼                                        ▼
//!   ┌──────────────┐  NEW_PLAYER, relayed SIGNAL  ┌──────────────┐
//!   │  host room   │ ───────────────────────────→ │  peer room   │
//!   │  task        │ ←─────────────────────────── │  task        │
//!   └──────┬───────┘     consensus messages       └──────┬───────┘
//!          │ Negotiator → PeerLink                       │
//!          └──────────── ConsensusService ───────────────┘
//! ```
//!
//! Every participant runs one room task ([`spawn_room`]). The host admits a
//! joiner over the control plane; once linked it announces the newcomer to
//! the peers it already has, and each of them negotiates a direct link to
//! the newcomer with the host relaying signals.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::MemoryControlPlane;
pub use domain::{
    is_full, MembershipConfig, MembershipError, MembershipResult, RoomEvent, RoomInfo, RoomRole,
};
pub use ports::{ControlNotification, ControlPlane, ControlPlaneError, NotificationSender};
pub use service::{spawn_room, RoomHandle};
