//! Fan-out of user balance updates to connected cashier sockets

use tokio::sync::broadcast;

use crate::models::user::{UserEvent, UserSnapshot};

/// Shared state for user event broadcasting
#[derive(Clone)]
pub struct UserBroadcaster {
    tx: broadcast::Sender<UserEvent>,
}

impl UserBroadcaster {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1000);
        Self { tx }
    }

    /// Push a fresh snapshot to every session of `user.id`
    pub fn broadcast_user(&self, user: UserSnapshot) {
        // No subscribers is fine
        let _ = self.tx.send(UserEvent {
            user_id: user.id,
            user,
        });
    }

    pub fn subscribe(&self) -> broadcast::Receiver<UserEvent> {
        self.tx.subscribe()
    }
}

impl Default for UserBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}
