//! # Node Runtime
//!
//! Plays one room in-process. Every configured player gets its own room
//! task; all of them share one in-memory control plane and one in-memory
//! transport network, so the full negotiation, mesh and consensus paths run
//! exactly as they would between machines.

use crate::config::NodeConfig;
use anyhow::{bail, Context, Result};
use gb_01_negotiator::MemoryNetwork;
use gb_03_consensus::ConsensusStats;
use gb_04_membership::{spawn_room, MemoryControlPlane, MembershipResult, RoomEvent, RoomHandle};
use serde_json::json;
use shared_types::{Entry, ParticipantName};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// One player's room task.
struct Seat {
    name: ParticipantName,
    handle: RoomHandle,
    events: mpsc::UnboundedReceiver<RoomEvent>,
}

/// The main node runtime orchestrating every player of the room.
pub struct NodeRuntime {
    config: NodeConfig,
    control: MemoryControlPlane,
    network: MemoryNetwork,
    seats: Vec<Seat>,
}

impl NodeRuntime {
    pub fn new(config: NodeConfig) -> Self {
        Self {
            config,
            control: MemoryControlPlane::new(),
            network: MemoryNetwork::new(),
            seats: Vec::new(),
        }
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// Spawn every player, create the room and wait for the full mesh.
    ///
    /// ## Startup Sequence
    ///
    /// 1. Spawn one room task per player
    /// 2. First player creates the room
    /// 3. Remaining players join in order
    /// 4. Wait until every player is linked to every other and keys are exchanged
    pub async fn start(&mut self) -> Result<()> {
        info!("===========================================");
        info!("  Gambit Node Runtime v{}", env!("CARGO_PKG_VERSION"));
        info!("  Room: {}", self.config.room);
        info!("  Players: {}", self.config.players.join(", "));
        info!("===========================================");

        for name in &self.config.players {
            let name = ParticipantName::new(name.as_str());
            let (handle, events) = spawn_room(
                name.clone(),
                Arc::new(self.control.clone()),
                self.network.clone(),
                self.config.membership.clone(),
            );
            self.seats.push(Seat {
                name,
                handle,
                events,
            });
        }

        let Some((host, guests)) = self.seats.split_first() else {
            bail!("no players configured");
        };
        let info = host
            .handle
            .create(self.config.room.as_str())
            .await
            .with_context(|| format!("{} could not create {}", host.name, self.config.room))?;
        info!("Room {} created by {}", info.room, info.host);

        for guest in guests {
            guest
                .handle
                .join(self.config.room.as_str())
                .await
                .with_context(|| format!("{} could not join {}", guest.name, self.config.room))?;
        }

        tokio::time::timeout(self.config.settle_timeout(), self.wait_for_mesh())
            .await
            .context("mesh did not form in time")??;
        info!("Mesh formed with {} players", self.seats.len());
        Ok(())
    }

    async fn wait_for_mesh(&self) -> MembershipResult<()> {
        let others = self.seats.len().saturating_sub(1);
        loop {
            let mut meshed = true;
            for seat in &self.seats {
                let linked = seat.handle.peers().await?.len();
                let ready = seat.handle.stats().await?.map_or(0, |s| s.ready);
                meshed &= linked == others && ready == others + 1;
            }
            if meshed {
                return Ok(());
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Play the configured moves in turn and return the committed log.
    ///
    /// Each move waits for its own commit before the next player moves.
    pub async fn play(&mut self) -> Result<Vec<Entry>> {
        if self.seats.is_empty() {
            bail!("runtime not started");
        }
        let timeout = self.config.settle_timeout();
        let moves = self.config.moves.clone();
        let seat_count = self.seats.len();

        for (turn, san) in moves.iter().enumerate() {
            let seat = &mut self.seats[turn % seat_count];
            seat.handle
                .broadcast("MOVE", json!({ "san": san }))
                .await
                .with_context(|| format!("{} could not play {}", seat.name, san))?;

            let index = turn as u64 + 1;
            let entry = tokio::time::timeout(timeout, next_commit(&mut seat.events, index))
                .await
                .with_context(|| format!("{san} was not committed in time"))??;
            info!(
                "#{} {} plays {} ({})",
                entry.index,
                seat.name,
                san,
                entry.hash.get(..12).unwrap_or(&entry.hash)
            );
        }

        let host = &self.seats[0];
        Ok(host.handle.entries().await?)
    }

    /// Consensus statistics of every started player, in seat order.
    pub async fn stats(&self) -> Result<Vec<(ParticipantName, ConsensusStats)>> {
        let mut all = Vec::with_capacity(self.seats.len());
        for seat in &self.seats {
            if let Some(stats) = seat.handle.stats().await? {
                all.push((seat.name.clone(), stats));
            }
        }
        Ok(all)
    }

    /// Close every room task and wait for it to report closure.
    pub async fn shutdown(&mut self) {
        info!("Initiating graceful shutdown...");
        for seat in &self.seats {
            seat.handle.close();
        }
        for seat in &mut self.seats {
            let closed = tokio::time::timeout(Duration::from_secs(2), async {
                while let Some(event) = seat.events.recv().await {
                    if event == RoomEvent::Closed {
                        return;
                    }
                }
            })
            .await;
            if closed.is_err() {
                warn!("{} did not close in time", seat.name);
            }
        }
        self.seats.clear();
        info!("Shutdown complete");
    }
}

/// Wait for the commit of log position `index` on one player's event stream.
async fn next_commit(events: &mut mpsc::UnboundedReceiver<RoomEvent>, index: u64) -> Result<Entry> {
    while let Some(event) = events.recv().await {
        match event {
            RoomEvent::Committed(entry) if entry.index >= index => return Ok(entry),
            RoomEvent::PlayerLeft(name) => warn!("{} left mid-game", name),
            RoomEvent::Reverted(entries) => warn!("{} entries withdrawn", entries.len()),
            RoomEvent::Closed => bail!("room closed"),
            _ => {}
        }
    }
    bail!("room task stopped")
}
