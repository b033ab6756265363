//! Domain layer for room membership.

mod config;
mod error;
mod events;
mod room;

pub use config::MembershipConfig;
pub use error::{MembershipError, MembershipResult};
pub use events::RoomEvent;
pub use room::{is_full, RoomInfo, RoomRole};
