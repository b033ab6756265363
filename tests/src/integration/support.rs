//! Room fixtures.

use gb_01_negotiator::MemoryNetwork;
use gb_03_consensus::ConsensusStats;
use gb_04_membership::{spawn_room, MembershipConfig, MemoryControlPlane, RoomEvent, RoomHandle};
use shared_types::Entry;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

pub const ROOM: &str = "table-1";

pub struct Player {
    pub handle: RoomHandle,
    pub events: mpsc::UnboundedReceiver<RoomEvent>,
}

/// A control plane and a network shared by every player spawned from it.
pub struct World {
    pub control: MemoryControlPlane,
    pub network: MemoryNetwork,
    pub config: MembershipConfig,
}

impl World {
    pub fn new() -> Self {
        Self {
            control: MemoryControlPlane::new(),
            network: MemoryNetwork::new(),
            config: MembershipConfig::default(),
        }
    }

    pub fn spawn(&self, name: &str) -> Player {
        let (handle, events) = spawn_room(
            name.into(),
            Arc::new(self.control.clone()),
            self.network.clone(),
            self.config.clone(),
        );
        Player { handle, events }
    }

    /// Spawn `names`, the first one hosting, and wait for the full mesh.
    pub async fn meshed_room(&self, names: &[&str]) -> Vec<Player> {
        let players: Vec<Player> = names.iter().map(|name| self.spawn(name)).collect();
        players[0].handle.create(ROOM).await.unwrap();
        for (joined, player) in players.iter().enumerate().skip(1) {
            player.handle.join(ROOM).await.unwrap();
            wait_meshed(player, joined).await;
        }
        for player in &players {
            wait_meshed(player, names.len() - 1).await;
        }
        players
    }
}

pub async fn eventually<F, Fut>(what: &str, mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..500 {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for {what}");
}

/// Wait until `player` is linked to `peers` others with keys exchanged.
pub async fn wait_meshed(player: &Player, peers: usize) {
    let handle = player.handle.clone();
    eventually("mesh", || {
        let handle = handle.clone();
        async move {
            let linked = handle.peers().await.unwrap().len();
            let ready = handle.stats().await.unwrap().map_or(0, |s| s.ready);
            linked == peers && ready == peers + 1
        }
    })
    .await;
}

/// Consensus statistics of a started player.
pub async fn stats(player: &Player) -> ConsensusStats {
    player
        .handle
        .stats()
        .await
        .unwrap()
        .expect("consensus not started")
}

/// Next commit at or beyond `index`.
pub async fn commit_at(player: &mut Player, index: u64) -> Entry {
    loop {
        match tokio::time::timeout(Duration::from_secs(5), player.events.recv()).await {
            Ok(Some(RoomEvent::Committed(entry))) if entry.index >= index => return entry,
            Ok(Some(_)) => continue,
            other => panic!("no commit at {index}: {other:?}"),
        }
    }
}

pub async fn expect_event(player: &mut Player, wanted: &RoomEvent) {
    loop {
        match tokio::time::timeout(Duration::from_secs(5), player.events.recv()).await {
            Ok(Some(event)) if &event == wanted => return,
            Ok(Some(_)) => continue,
            other => panic!("expected {wanted:?}, got {other:?}"),
        }
    }
}
