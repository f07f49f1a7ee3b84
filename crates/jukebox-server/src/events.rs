//! In-process event bus for server-side updates.
//!
//! Provides a lightweight broadcast channel for UI subscriptions.

use tokio::sync::broadcast;

/// Server event payloads published by the queue controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JukeboxEvent {
    QueueChanged,
    StatusChanged,
}

#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<JukeboxEvent>,
}

impl EventBus {
    /// Create a new event bus with a bounded broadcast channel.
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(64);
        Self { sender }
    }

    /// Subscribe to the event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<JukeboxEvent> {
        self.sender.subscribe()
    }

    /// Notify subscribers that the pending queue has changed.
    pub fn queue_changed(&self) {
        let _ = self.sender.send(JukeboxEvent::QueueChanged);
    }

    /// Notify subscribers that playback status has changed.
    pub fn status_changed(&self) {
        let _ = self.sender.send(JukeboxEvent::StatusChanged);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscribers_receive_published_events() {
        let bus = EventBus::new();
        let mut receiver = bus.subscribe();

        bus.queue_changed();
        bus.status_changed();

        assert_eq!(receiver.try_recv().unwrap(), JukeboxEvent::QueueChanged);
        assert_eq!(receiver.try_recv().unwrap(), JukeboxEvent::StatusChanged);
    }

    #[test]
    fn publishing_without_subscribers_is_harmless() {
        let bus = EventBus::new();
        bus.queue_changed();
    }
}
