//! Authentication events published by the login flow.
//!
//! The core broadcasts an [`AuthEvent`] at each terminal outcome of a login
//! attempt. Frontends subscribe to audit or notify; nobody is required to
//! listen.

use tokio::sync::broadcast;

/// Capacity of the event channel. Slow subscribers miss the oldest events.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Something that happened to a login attempt.
///
/// Events flow **Core → subscribers**. They never carry the secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    /// A throttle key hit its attempt ceiling and a request was turned away.
    Lockout { key: String, retry_after_secs: u64 },
    /// The directory accepted the credentials.
    Authenticated { identity: String, client_addr: String },
    /// The directory rejected the credentials.
    Failed {
        identity: String,
        client_addr: String,
        attempts: u32,
    },
}

/// Fan-out publisher for [`AuthEvent`]s.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<AuthEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(EVENT_CHANNEL_CAPACITY)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.sender.subscribe()
    }

    /// Publishes `event`. Having no subscribers is fine.
    pub fn publish(&self, event: AuthEvent) {
        // send only fails when no receiver exists
        let _ = self.sender.send(event);
    }
}
