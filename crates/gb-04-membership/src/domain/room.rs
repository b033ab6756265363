//! Room identity and the local participant's role in it.

use shared_types::ParticipantName;

/// Answer of the control plane to a room creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomInfo {
    pub room: String,
    pub host: ParticipantName,
    pub max_players: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomRole {
    /// Created the room; admits joiners and relays signals between peers.
    Host,
    Peer { host: ParticipantName },
}

impl RoomRole {
    pub fn is_host(&self) -> bool {
        matches!(self, RoomRole::Host)
    }

    pub fn host<'a>(&'a self, local: &'a ParticipantName) -> &'a ParticipantName {
        match self {
            RoomRole::Host => local,
            RoomRole::Peer { host } => host,
        }
    }
}

/// Whether a host with `connected` links and `pending` handshakes must turn
/// a new joiner away. The host itself takes one seat.
pub fn is_full(connected: usize, pending: usize, max_players: usize) -> bool {
    connected + pending + 1 >= max_players
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_seat_room() {
        assert!(!is_full(0, 0, 2));
        assert!(is_full(1, 0, 2));
        assert!(is_full(0, 1, 2));
    }

    #[test]
    fn test_pending_handshakes_hold_seats() {
        assert!(!is_full(1, 1, 4));
        assert!(is_full(1, 2, 4));
    }

    #[test]
    fn test_role_host() {
        let local: ParticipantName = "alice".into();
        assert_eq!(RoomRole::Host.host(&local), &local);
        let peer = RoomRole::Peer { host: "bob".into() };
        assert_eq!(peer.host(&local).as_str(), "bob");
        assert!(!peer.is_host());
    }
}
