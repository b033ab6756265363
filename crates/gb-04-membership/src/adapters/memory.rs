//! In-process control plane.
//!
//! Rooms, rosters and subscriptions live in one shared table; notifications
//! go straight into the subscribers' queues. Capacity is left to the host.

use crate::domain::RoomInfo;
use crate::ports::{ControlNotification, ControlPlane, ControlPlaneError, NotificationSender};
use async_trait::async_trait;
use parking_lot::Mutex;
use shared_types::{ParticipantName, Signal};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::debug;

struct RoomRecord {
    host: ParticipantName,
    roster: BTreeSet<ParticipantName>,
    subscribers: HashMap<ParticipantName, NotificationSender>,
}

impl RoomRecord {
    fn notify(
        &self,
        to: &ParticipantName,
        notification: ControlNotification,
    ) -> Result<(), ControlPlaneError> {
        let subscriber = self
            .subscribers
            .get(to)
            .ok_or_else(|| ControlPlaneError::Rpc(format!("{to} is not subscribed")))?;
        subscriber
            .send(notification)
            .map_err(|_| ControlPlaneError::Rpc(format!("{to} stopped listening")))
    }
}

/// Shared in-memory matchmaking service.
#[derive(Clone, Default)]
pub struct MemoryControlPlane {
    rooms: Arc<Mutex<HashMap<String, RoomRecord>>>,
}

impl MemoryControlPlane {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current roster of `room`, for inspection.
    pub fn roster(&self, room: &str) -> Vec<ParticipantName> {
        self.rooms
            .lock()
            .get(room)
            .map(|r| r.roster.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn with_room<R>(
        &self,
        room: &str,
        f: impl FnOnce(&mut RoomRecord) -> Result<R, ControlPlaneError>,
    ) -> Result<R, ControlPlaneError> {
        let mut rooms = self.rooms.lock();
        let record = rooms
            .get_mut(room)
            .ok_or_else(|| ControlPlaneError::RoomNotFound(room.to_string()))?;
        f(record)
    }
}

#[async_trait]
impl ControlPlane for MemoryControlPlane {
    async fn create(
        &self,
        room: &str,
        max_players: usize,
        player: &ParticipantName,
        notify: NotificationSender,
    ) -> Result<RoomInfo, ControlPlaneError> {
        let mut rooms = self.rooms.lock();
        if rooms.contains_key(room) {
            return Err(ControlPlaneError::Rpc(format!("room {room} already exists")));
        }
        let mut record = RoomRecord {
            host: player.clone(),
            roster: BTreeSet::new(),
            subscribers: HashMap::new(),
        };
        record.roster.insert(player.clone());
        record.subscribers.insert(player.clone(), notify);
        rooms.insert(room.to_string(), record);
        Ok(RoomInfo {
            room: room.to_string(),
            host: player.clone(),
            max_players,
        })
    }

    async fn join(
        &self,
        room: &str,
        player: &ParticipantName,
        notify: NotificationSender,
    ) -> Result<ParticipantName, ControlPlaneError> {
        self.with_room(room, |record| {
            record.subscribers.insert(player.clone(), notify);
            let host = record.host.clone();
            record.notify(
                &host,
                ControlNotification::JoinRequest {
                    player: player.clone(),
                },
            )?;
            Ok(host)
        })
    }

    async fn player_add(&self, room: &str, player: &ParticipantName) -> Result<(), ControlPlaneError> {
        self.with_room(room, |record| {
            record.roster.insert(player.clone());
            Ok(())
        })
    }

    async fn player_remove(&self, room: &str, player: &ParticipantName) -> Result<(), ControlPlaneError> {
        self.with_room(room, |record| {
            record.roster.remove(player);
            Ok(())
        })
    }

    async fn player_get_all(&self, room: &str) -> Result<Vec<ParticipantName>, ControlPlaneError> {
        self.with_room(room, |record| Ok(record.roster.iter().cloned().collect()))
    }

    async fn signal(
        &self,
        from: &ParticipantName,
        to: &ParticipantName,
        room: &str,
        signal: &Signal,
    ) -> Result<(), ControlPlaneError> {
        self.with_room(room, |record| {
            record.notify(
                to,
                ControlNotification::RemoteSignal {
                    from: from.clone(),
                    signal: signal.clone(),
                },
            )
        })
    }

    async fn full(&self, to: &ParticipantName, room: &str) -> Result<(), ControlPlaneError> {
        self.with_room(room, |record| record.notify(to, ControlNotification::Full))
    }

    async fn leave(&self, room: &str, player: &ParticipantName) -> Result<(), ControlPlaneError> {
        let mut rooms = self.rooms.lock();
        let Some(record) = rooms.get_mut(room) else {
            return Ok(());
        };
        record.subscribers.remove(player);
        if record.subscribers.is_empty() {
            debug!("[gb-04] Room {} is empty, removing", room);
            rooms.remove(room);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_join_notifies_host() {
        let plane = MemoryControlPlane::new();
        let (host_tx, mut host_rx) = mpsc::unbounded_channel();
        let (bob_tx, _bob_rx) = mpsc::unbounded_channel();

        let info = plane.create("r1", 4, &"alice".into(), host_tx).await.unwrap();
        assert_eq!(info.host.as_str(), "alice");

        let host = plane.join("r1", &"bob".into(), bob_tx).await.unwrap();
        assert_eq!(host.as_str(), "alice");
        assert_eq!(
            host_rx.try_recv().unwrap(),
            ControlNotification::JoinRequest {
                player: "bob".into()
            }
        );
    }

    #[tokio::test]
    async fn test_join_unknown_room() {
        let plane = MemoryControlPlane::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        assert_eq!(
            plane.join("nope", &"bob".into(), tx).await,
            Err(ControlPlaneError::RoomNotFound("nope".into()))
        );
    }

    #[tokio::test]
    async fn test_duplicate_create_rejected() {
        let plane = MemoryControlPlane::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        plane.create("r1", 2, &"alice".into(), tx.clone()).await.unwrap();
        assert!(matches!(
            plane.create("r1", 2, &"bob".into(), tx).await,
            Err(ControlPlaneError::Rpc(_))
        ));
    }

    #[tokio::test]
    async fn test_signal_and_full_are_relayed() {
        let plane = MemoryControlPlane::new();
        let (host_tx, _host_rx) = mpsc::unbounded_channel();
        let (bob_tx, mut bob_rx) = mpsc::unbounded_channel();
        plane.create("r1", 4, &"alice".into(), host_tx).await.unwrap();
        plane.join("r1", &"bob".into(), bob_tx).await.unwrap();

        let offer = Signal::offer("sdp");
        plane
            .signal(&"alice".into(), &"bob".into(), "r1", &offer)
            .await
            .unwrap();
        plane.full(&"bob".into(), "r1").await.unwrap();

        assert_eq!(
            bob_rx.try_recv().unwrap(),
            ControlNotification::RemoteSignal {
                from: "alice".into(),
                signal: offer
            }
        );
        assert_eq!(bob_rx.try_recv().unwrap(), ControlNotification::Full);
    }

    #[tokio::test]
    async fn test_roster_updates() {
        let plane = MemoryControlPlane::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        plane.create("r1", 4, &"alice".into(), tx).await.unwrap();

        plane.player_add("r1", &"bob".into()).await.unwrap();
        plane.player_add("r1", &"carol".into()).await.unwrap();
        plane.player_remove("r1", &"bob".into()).await.unwrap();

        let roster = plane.player_get_all("r1").await.unwrap();
        assert_eq!(roster, vec!["alice".into(), "carol".into()]);
    }

    #[tokio::test]
    async fn test_last_leave_removes_room() {
        let plane = MemoryControlPlane::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        plane.create("r1", 4, &"alice".into(), tx).await.unwrap();
        plane.leave("r1", &"alice".into()).await.unwrap();
        assert!(plane.roster("r1").is_empty());
    }
}
