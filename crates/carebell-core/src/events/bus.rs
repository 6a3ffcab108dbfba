//! Alert event bus on a tokio broadcast channel.
//!
//! Slow subscribers miss events rather than blocking the presenter.

use crate::events::AlertEvent;
use tokio::sync::broadcast;

const DEFAULT_CAPACITY: usize = 256;

/// Fan-out channel for [`AlertEvent`]s.
///
/// Emitting never blocks and never fails; with no subscribers the event is
/// dropped.
#[derive(Clone)]
pub struct AlertBus {
    sender: broadcast::Sender<AlertEvent>,
}

impl AlertBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to events emitted from now on.
    pub fn subscribe(&self) -> AlertSubscriber {
        AlertSubscriber {
            receiver: self.sender.subscribe(),
        }
    }

    pub fn emit(&self, event: AlertEvent) {
        tracing::trace!(
            event_type = event.event_type(),
            reminder_id = event.reminder_id(),
            "Alert event"
        );
        let _ = self.sender.send(event);
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for AlertBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving end of an [`AlertBus`].
pub struct AlertSubscriber {
    receiver: broadcast::Receiver<AlertEvent>,
}

impl AlertSubscriber {
    /// Receive the next event, skipping over any lag.
    ///
    /// Returns None once the bus is dropped.
    pub async fn recv(&mut self) -> Option<AlertEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(missed = n, "Alert subscriber lagged");
                }
            }
        }
    }

    /// Try to receive an event without blocking
    pub fn try_recv(&mut self) -> Option<AlertEvent> {
        self.receiver.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_alert_bus_basic() {
        let bus = AlertBus::new();
        let mut sub = bus.subscribe();

        bus.emit(AlertEvent::Acknowledged { reminder_id: 9 });

        let received = sub.recv().await.unwrap();
        assert_eq!(received.reminder_id(), 9);
        assert!(sub.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_multiple_subscribers() {
        let bus = AlertBus::new();
        let mut sub1 = bus.subscribe();
        let mut sub2 = bus.subscribe();

        bus.emit(AlertEvent::Dismissed { reminder_id: 1 });

        assert_eq!(sub1.recv().await, sub2.recv().await);
    }

    #[test]
    fn test_emit_without_subscribers() {
        let bus = AlertBus::new();
        bus.emit(AlertEvent::Dismissed { reminder_id: 1 });
        assert_eq!(bus.subscriber_count(), 0);

        let _sub = bus.clone().subscribe();
        assert_eq!(bus.subscriber_count(), 1);
    }
}
