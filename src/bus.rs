use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info};
use uuid::Uuid;

use crate::types::BalanceChanged;

pub type SubscriberId = Uuid;

/// Bus carrying balance refresh signals to the rest of the page
pub type BalanceBus = EventBus<BalanceChanged>;

/// Receiving end of a bus subscription.
///
/// Dropping it is enough to stop receiving; the bus prunes closed
/// subscribers on the next publish. `EventBus::unsubscribe` removes it eagerly.
pub struct Subscription<T> {
    pub id: SubscriberId,
    pub rx: mpsc::Receiver<T>,
}

impl<T> Subscription<T> {
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }
}

/// Typed publish/subscribe dispatcher shared across the process
pub struct EventBus<T> {
    subscribers: Arc<Mutex<HashMap<SubscriberId, mpsc::Sender<T>>>>,
    capacity: usize,
}

impl<T: Clone + Send> EventBus<T> {
    /// `capacity` is the per-subscriber queue depth (at least 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            subscribers: Arc::new(Mutex::new(HashMap::new())),
            capacity: capacity.max(1),
        }
    }

    pub async fn subscribe(&self) -> Subscription<T> {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(self.capacity);

        let mut subscribers = self.subscribers.lock().await;
        subscribers.insert(id, tx);
        info!("Subscriber {} added to bus ({} total)", id, subscribers.len());

        Subscription { id, rx }
    }

    pub async fn unsubscribe(&self, id: SubscriberId) {
        let mut subscribers = self.subscribers.lock().await;
        if subscribers.remove(&id).is_some() {
            info!("Subscriber {} removed from bus ({} remaining)", id, subscribers.len());
        }
    }

    /// Fire-and-forget delivery to every subscriber.
    pub async fn publish(&self, event: T) {
        let mut subscribers = self.subscribers.lock().await;

        if subscribers.is_empty() {
            return;
        }

        debug!("Publishing event to {} subscribers", subscribers.len());

        let mut closed = Vec::new();
        for (id, tx) in subscribers.iter() {
            match tx.try_send(event.clone()) {
                Ok(_) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    // Slow subscriber, it misses this one
                    debug!("Subscriber {} queue full, dropping event", id);
                }
                Err(mpsc::error::TrySendError::Closed(_)) => closed.push(*id),
            }
        }

        for id in closed {
            subscribers.remove(&id);
            debug!("Subscriber {} gone, pruned from bus", id);
        }
    }

    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.lock().await.len()
    }
}
