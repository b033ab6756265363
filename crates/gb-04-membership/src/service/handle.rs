//! Caller side of a room.

use crate::domain::{MembershipError, MembershipResult, RoomInfo};
use gb_03_consensus::ConsensusStats;
use serde_json::Value;
use shared_types::{Entry, ParticipantName};
use tokio::sync::{mpsc, oneshot};

/// Requests served by the room task.
pub(crate) enum RoomCommand {
    Create {
        room: String,
        reply: oneshot::Sender<MembershipResult<RoomInfo>>,
    },
    Join {
        room: String,
        reply: oneshot::Sender<MembershipResult<ParticipantName>>,
    },
    Broadcast {
        kind: String,
        payload: Value,
        reply: oneshot::Sender<MembershipResult<()>>,
    },
    Peers {
        reply: oneshot::Sender<Vec<ParticipantName>>,
    },
    Stats {
        reply: oneshot::Sender<Option<ConsensusStats>>,
    },
    Entries {
        reply: oneshot::Sender<Vec<Entry>>,
    },
    Close,
}

/// Cloneable handle to a running room task.
#[derive(Clone)]
pub struct RoomHandle {
    local: ParticipantName,
    commands: mpsc::UnboundedSender<RoomCommand>,
}

impl RoomHandle {
    pub(crate) fn new(local: ParticipantName, commands: mpsc::UnboundedSender<RoomCommand>) -> Self {
        Self { local, commands }
    }

    pub fn local(&self) -> &ParticipantName {
        &self.local
    }

    /// Create `room` with this participant as host.
    pub async fn create(&self, room: impl Into<String>) -> MembershipResult<RoomInfo> {
        let room = room.into();
        self.request(|reply| RoomCommand::Create { room, reply }).await?
    }

    /// Join `room`. Returns the host's name; links form in the background.
    pub async fn join(&self, room: impl Into<String>) -> MembershipResult<ParticipantName> {
        let room = room.into();
        self.request(|reply| RoomCommand::Join { room, reply }).await?
    }

    /// Propose an application event to the room. It is reported back as
    /// [`RoomEvent::Committed`](crate::RoomEvent::Committed) once agreed.
    pub async fn broadcast(&self, kind: impl Into<String>, payload: Value) -> MembershipResult<()> {
        let kind = kind.into();
        self.request(|reply| RoomCommand::Broadcast {
            kind,
            payload,
            reply,
        })
        .await?
    }

    /// Participants with an open direct link.
    pub async fn peers(&self) -> MembershipResult<Vec<ParticipantName>> {
        self.request(|reply| RoomCommand::Peers { reply }).await
    }

    /// Consensus statistics, `None` while initialising.
    pub async fn stats(&self) -> MembershipResult<Option<ConsensusStats>> {
        self.request(|reply| RoomCommand::Stats { reply }).await
    }

    /// Committed entries, genesis first.
    pub async fn entries(&self) -> MembershipResult<Vec<Entry>> {
        self.request(|reply| RoomCommand::Entries { reply }).await
    }

    /// Leave the room and stop the task.
    pub fn close(&self) {
        let _ = self.commands.send(RoomCommand::Close);
    }

    async fn request<R>(
        &self,
        make: impl FnOnce(oneshot::Sender<R>) -> RoomCommand,
    ) -> MembershipResult<R> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(make(reply))
            .map_err(|_| MembershipError::Closed)?;
        response.await.map_err(|_| MembershipError::Closed)
    }
}
