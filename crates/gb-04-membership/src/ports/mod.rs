//! Ports for room membership.

pub mod outbound;

pub use outbound::{ControlNotification, ControlPlane, ControlPlaneError, NotificationSender};
