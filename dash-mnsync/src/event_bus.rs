//! Broadcast of sync events to any number of subscribers.

use thiserror::Error;
use tokio::sync::broadcast;

const DEFAULT_EVENT_LIMIT: usize = 1024;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("Subscriber lagged behind by {0} events")]
    Lagged(u64),

    #[error("Event bus closed")]
    Closed,
}

type Result<T> = std::result::Result<T, Error>;

/// Every subscriber receives every event emitted after it subscribed. A subscriber
/// more than `capacity` events behind loses the oldest ones.
#[derive(Debug, Clone)]
pub struct EventBus<T: Clone> {
    sender: broadcast::Sender<T>,
}

impl<T: Clone> EventBus<T> {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
        }
    }

    pub fn subscribe(&self) -> EventReceiver<T> {
        EventReceiver {
            receiver: self.sender.subscribe(),
        }
    }

    /// Having no subscriber is not an error.
    pub fn emit(&self, event: T) {
        let _ = self.sender.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl<T: Clone> Default for EventBus<T> {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_LIMIT)
    }
}

#[derive(Debug)]
pub struct EventReceiver<T: Clone> {
    receiver: broadcast::Receiver<T>,
}

impl<T: Clone> EventReceiver<T> {
    pub async fn recv(&mut self) -> Result<T> {
        self.receiver.recv().await.map_err(|e| match e {
            broadcast::error::RecvError::Lagged(n) => Error::Lagged(n),
            broadcast::error::RecvError::Closed => Error::Closed,
        })
    }

    /// The next event if one is already waiting.
    pub fn try_recv(&mut self) -> Option<T> {
        self.receiver.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_emit_reaches_every_subscriber() {
        let bus = EventBus::new(16);
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        bus.emit(7u32);
        assert_eq!(first.recv().await, Ok(7));
        assert_eq!(second.recv().await, Ok(7));
        assert_eq!(first.try_recv(), None);
    }

    #[test]
    fn test_emit_without_subscribers() {
        let bus = EventBus::<u32>::default();
        bus.emit(1);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_slow_subscriber_lags() {
        let bus = EventBus::new(2);
        let mut receiver = bus.subscribe();
        for i in 0..4u32 {
            bus.emit(i);
        }
        assert_eq!(receiver.recv().await, Err(Error::Lagged(2)));
        assert_eq!(receiver.recv().await, Ok(2));
    }

    #[tokio::test]
    async fn test_closed_bus() {
        let bus = EventBus::<u32>::new(2);
        let mut receiver = bus.subscribe();
        drop(bus);
        assert_eq!(receiver.recv().await, Err(Error::Closed));
    }
}
