/// Domain events
///
/// Successful mutations publish a [`DomainEvent`] on an in-process broadcast
/// bus. Events also land in the structured log. There is no durable event
/// log: a subscriber that lags far enough to drop events just misses them,
/// which is acceptable for notification-style consumers.
///
/// # Example
///
/// ```
/// use taskhub_shared::events::{DomainEvent, EventBus};
/// use uuid::Uuid;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let bus = EventBus::new(64);
/// let mut rx = bus.subscribe();
///
/// let id = Uuid::new_v4();
/// bus.emit(DomainEvent::TodoDeleted { id });
///
/// assert_eq!(rx.recv().await.unwrap(), DomainEvent::TodoDeleted { id });
/// # }
/// ```

use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Something that happened to a resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    TodoCreated { id: Uuid, author_id: Uuid },
    TodoUpdated { id: Uuid },
    TodoDeleted { id: Uuid },

    UserSignedUp { id: Uuid },
    UserSignedIn { id: Uuid },
    UserUpdated { id: Uuid },
    UserDeleted { id: Uuid },

    SessionsTerminated { user_id: Uuid, count: u64 },
}

/// In-process broadcast bus for domain events
///
/// Cloning is cheap; all clones publish to the same channel. Emitting with
/// no live subscribers is not an error.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<DomainEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publishes an event and logs it.
    pub fn emit(&self, event: DomainEvent) {
        tracing::info!(event = ?event, "domain event");
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
