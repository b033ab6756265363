//! Room Service
//!
//! [`spawn_room`] starts the task that owns one participant's view of a room
//! and returns the [`RoomHandle`] used to drive it plus the stream of
//! [`RoomEvent`]s it produces.

mod actor;
mod handle;

pub use handle::RoomHandle;

use crate::domain::{MembershipConfig, RoomEvent};
use crate::ports::ControlPlane;
use actor::RoomActor;
use gb_01_negotiator::TransportFactory;
use shared_types::ParticipantName;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Spawn the room task for `local` on the current runtime.
///
/// The task first generates the local signing key; commands sent before that
/// completes are queued.
pub fn spawn_room<F>(
    local: ParticipantName,
    control: Arc<dyn ControlPlane>,
    transports: F,
    config: MembershipConfig,
) -> (RoomHandle, mpsc::UnboundedReceiver<RoomEvent>)
where
    F: TransportFactory + 'static,
{
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let actor = RoomActor::new(
        local.clone(),
        control,
        transports,
        config,
        command_rx,
        event_tx,
    );
    tokio::spawn(actor.run());
    (RoomHandle::new(local, command_tx), event_rx)
}

#[cfg(test)]
mod tests;
