//! Session lifecycle notifications
//!
//! The application shell subscribes here to learn when the session ends so
//! it can return the user to the sign-in entry point.

use tokio::sync::broadcast;
use tracing::debug;

const CHANNEL_CAPACITY: usize = 16;

/// Change in session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    LoggedIn,
    LoggedOut,
    /// Credentials could not be renewed and were cleared
    Expired,
}

/// Broadcast hub for [`SessionEvent`]s
#[derive(Debug, Clone)]
pub struct SessionEvents {
    sender: broadcast::Sender<SessionEvent>,
}

impl Default for SessionEvents {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionEvents {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    pub fn publish(&self, event: SessionEvent) {
        // No subscribers is fine
        let receivers = self.sender.send(event).unwrap_or(0);
        debug!(?event, receivers, "Published session event");
    }
}
