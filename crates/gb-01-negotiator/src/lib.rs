//! # gb-01-negotiator
//!
//! Connection negotiation subsystem for Gambit.
//!
//! ## Architecture
//!
//! One [`Negotiator`] exists per remote peer while a direct channel is being
//! bootstrapped. It drives a [`PeerTransport`] through offer/answer
//! signaling, gates the connection on both data sub-channels being open, and
//! enforces the retry budget and the absolute session deadline.
//!
//! ```text
//!  owner ──initiate/register_signal/poll──→ Negotiator ──configure/offer──→ PeerTransport
//!    ↑                                          │                               │
//!    └──────── NegotiatorEvent (Signal, ────────┘←──── TransportEvent ──────────┘
//!              Connected, Disconnected)
//! ```
//!
//! Once connected, [`Negotiator::into_link`] hands the transport over as a
//! [`PeerLink`] together with any data that arrived early.
//!
//! ## Timing
//!
//! The negotiator never sleeps. Every call takes the current instant and
//! [`Negotiator::next_deadline`] reports when [`Negotiator::poll`] is due,
//! so the owning task multiplexes all sessions on one timer.

pub mod adapters;
pub mod domain;
pub mod ports;

pub use adapters::{MemoryNetwork, MemoryTransport};
pub use domain::{
    ChannelDirection, ConnectionState, LinkEvent, NegotiationFailure, Negotiator,
    NegotiatorConfig, NegotiatorEvent, PeerLink, Role, SignalRoute,
};
pub use ports::{
    PeerTransport, TransportError, TransportEvent, TransportEventSender, TransportFactory,
    TransportState,
};
