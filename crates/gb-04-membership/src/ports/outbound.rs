//! # Driven Ports (Outbound SPI)
//!
//! The matchmaking service is an external collaborator reached over a
//! request/response channel. It also pushes asynchronous notifications to
//! every subscribed participant.

use crate::domain::RoomInfo;
use async_trait::async_trait;
use shared_types::{ParticipantName, Signal};
use thiserror::Error;
use tokio::sync::mpsc;

/// Notification pushed by the control plane to one participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlNotification {
    /// Delivered to the host: `player` asked to join.
    JoinRequest { player: ParticipantName },
    /// Signaling relayed from `from`.
    RemoteSignal {
        from: ParticipantName,
        signal: Signal,
    },
    /// Delivered to a joiner the host turned away.
    Full,
}

pub type NotificationSender = mpsc::UnboundedSender<ControlNotification>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControlPlaneError {
    #[error("Room is full")]
    RoomFull,

    #[error("Room not found: {0}")]
    RoomNotFound(String),

    #[error("Control plane request timed out")]
    Timeout,

    #[error("Control plane rejected request: {0}")]
    Rpc(String),
}

/// Matchmaking service contract.
///
/// `create` and `join` subscribe `notify` to the room's notifications for the
/// calling participant until `leave`.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    async fn create(
        &self,
        room: &str,
        max_players: usize,
        player: &ParticipantName,
        notify: NotificationSender,
    ) -> Result<RoomInfo, ControlPlaneError>;

    /// Returns the host's name.
    async fn join(
        &self,
        room: &str,
        player: &ParticipantName,
        notify: NotificationSender,
    ) -> Result<ParticipantName, ControlPlaneError>;

    async fn player_add(&self, room: &str, player: &ParticipantName) -> Result<(), ControlPlaneError>;

    async fn player_remove(&self, room: &str, player: &ParticipantName) -> Result<(), ControlPlaneError>;

    async fn player_get_all(&self, room: &str) -> Result<Vec<ParticipantName>, ControlPlaneError>;

    /// Relay `signal` to `to`, who receives it as a `RemoteSignal` from `from`.
    async fn signal(
        &self,
        from: &ParticipantName,
        to: &ParticipantName,
        room: &str,
        signal: &Signal,
    ) -> Result<(), ControlPlaneError>;

    /// Tell `to` that the room is full.
    async fn full(&self, to: &ParticipantName, room: &str) -> Result<(), ControlPlaneError>;

    /// Drop the caller's notification subscription.
    async fn leave(&self, room: &str, player: &ParticipantName) -> Result<(), ControlPlaneError>;
}
