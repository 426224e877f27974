//! Session event system.
//!
//! A [`crate::DeviceSession`] publishes lifecycle changes, discoveries,
//! inbound notifications and dropped sends on a broadcast channel. Nothing
//! in the session depends on anyone listening.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Connection lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No link held.
    #[default]
    Disconnected,
    /// Discovering or connecting.
    Scanning,
    /// Link held and bootstrapped.
    Connected,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Disconnected => write!(f, "disconnected"),
            SessionState::Scanning => write!(f, "scanning"),
            SessionState::Connected => write!(f, "connected"),
        }
    }
}

/// Why a send never reached the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// No link was held.
    NotConnected,
    /// The rate limiter had no token.
    RateLimited,
}

/// Reason for disconnection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum DisconnectReason {
    /// Normal disconnection requested by the host.
    UserRequested,
    /// A new scan replaced the previous link.
    Rescan,
    /// The transport reported the link gone.
    LinkLost,
    /// Connecting or bootstrapping failed.
    ConnectFailed(String),
}

/// Events published by a session.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new event types
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[non_exhaustive]
pub enum SessionEvent {
    /// The session moved between lifecycle states.
    StateChanged {
        from: SessionState,
        to: SessionState,
    },
    /// A peripheral was seen during a scan.
    Discovered { id: String, name: Option<String> },
    /// Link established and bootstrap frames written.
    Connected { id: String },
    /// Link released or lost.
    Disconnected { reason: DisconnectReason },
    /// Raw notification from the TX characteristic.
    Notification { data: Vec<u8> },
    /// A frame was dropped before reaching the transport.
    SendDropped { frame: Vec<u8>, reason: DropReason },
}

/// Sender for session events.
pub type EventSender = broadcast::Sender<SessionEvent>;

/// Receiver for session events.
pub type EventReceiver = broadcast::Receiver<SessionEvent>;

/// Event dispatcher for sending events to multiple receivers.
#[derive(Debug, Clone)]
pub struct EventDispatcher {
    sender: EventSender,
}

impl EventDispatcher {
    /// Create a new event dispatcher.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to events.
    pub fn subscribe(&self) -> EventReceiver {
        self.sender.subscribe()
    }

    /// Send an event.
    pub fn send(&self, event: SessionEvent) {
        // Ignore error if no receivers
        let _ = self.sender.send(event);
    }

    /// Get the number of active receivers.
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new(100)
    }
}
