//! Events a room reports to its owner.

use shared_types::{Entry, ParticipantName};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomEvent {
    /// An entry was committed to the shared log, in log order.
    Committed(Entry),
    /// Committed entries withdrawn after a competing branch won, in log
    /// order. The winning entries follow as `Committed`.
    Reverted(Vec<Entry>),
    /// A direct link to `0` is open and registered with consensus.
    PlayerJoined(ParticipantName),
    PlayerLeft(ParticipantName),
    /// The host refused this participant because the room is at capacity.
    RoomFull,
    Closed,
}
