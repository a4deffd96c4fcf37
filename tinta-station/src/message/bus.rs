//! Station event bus
//!
//! # Architecture
//!
//! ```text
//!  IntakeWorker ─┐                         ┌─▶ subscriber #1 (registration order)
//!  JobTracker  ──┼──▶ EventBus::publish ───┼─▶ subscriber #2
//!  MixingEngine ─┘                         ├─▶ ...
//!                                          └─▶ broadcast::Sender<StationEvent> ──▶ async receivers
//! ```
//!
//! Delivery to registered subscribers is synchronous and in registration
//! order, on the publishing thread. The broadcast channel is a best-effort
//! bridge for async consumers (UI sockets); a lagging receiver drops events
//! without affecting the synchronous subscribers.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use shared::message::StationEvent;
use tokio::sync::broadcast;

/// Synchronous event observer
///
/// `on_event` runs on the publisher's thread and may be called while the
/// publisher holds its own lock: it must return quickly and must not call
/// back into the component that published.
pub trait EventSubscriber: Send + Sync {
    fn name(&self) -> &str {
        "subscriber"
    }

    fn on_event(&self, event: &StationEvent);
}

impl<F> EventSubscriber for F
where
    F: Fn(&StationEvent) + Send + Sync,
{
    fn on_event(&self, event: &StationEvent) {
        self(event)
    }
}

/// Handle returned by [`EventBus::add_subscriber`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

/// Default broadcast capacity
const DEFAULT_CAPACITY: usize = 256;

/// Publish-subscribe hub for [`StationEvent`]s
pub struct EventBus {
    subscribers: RwLock<Vec<(SubscriberId, Arc<dyn EventSubscriber>)>>,
    next_id: AtomicU64,
    tx: broadcast::Sender<StationEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a bus with a specific broadcast capacity
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            subscribers: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
            tx,
        }
    }

    /// Register a synchronous subscriber (appended to the delivery order)
    pub fn add_subscriber(&self, subscriber: Arc<dyn EventSubscriber>) -> SubscriberId {
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));
        tracing::debug!(subscriber = subscriber.name(), "Event subscriber registered");
        self.subscribers.write().push((id, subscriber));
        id
    }

    /// Returns false when the id is unknown
    pub fn remove_subscriber(&self, id: SubscriberId) -> bool {
        let mut subs = self.subscribers.write();
        let before = subs.len();
        subs.retain(|(sid, _)| *sid != id);
        subs.len() != before
    }

    /// Async receiver for every event published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<StationEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Deliver an event to every subscriber, then to the broadcast channel
    pub fn publish(&self, event: StationEvent) {
        // Snapshot so a subscriber may (un)register without deadlocking
        let subscribers: Vec<Arc<dyn EventSubscriber>> = self
            .subscribers
            .read()
            .iter()
            .map(|(_, s)| Arc::clone(s))
            .collect();

        for subscriber in &subscribers {
            subscriber.on_event(&event);
        }

        // No async receiver is fine
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .field("receivers", &self.tx.receiver_count())
            .finish()
    }
}

/// Subscriber that writes every event to the log
#[derive(Debug, Default)]
pub struct LoggingSubscriber;

impl EventSubscriber for LoggingSubscriber {
    fn name(&self) -> &str {
        "logging"
    }

    fn on_event(&self, event: &StationEvent) {
        match event {
            StationEvent::RecipeDetected(recipe) => tracing::info!(
                recipe = %recipe.number,
                ingredients = recipe.ingredient_count(),
                "Recipe detected"
            ),
            StationEvent::WeightUpdated(update) => tracing::debug!(
                recipe = %update.recipe_id,
                index = update.index,
                weight = %update.weight,
                target = %update.target,
                within = update.within_tolerance,
                "Weight updated"
            ),
            StationEvent::PrinterStatusChanged { status, queue_len } => {
                tracing::info!(%status, queue_len, "Printer status changed")
            }
            StationEvent::PrinterQueueChanged(jobs) => {
                tracing::debug!(jobs = jobs.len(), "Printer queue changed")
            }
            StationEvent::SessionStarted(session) => tracing::info!(
                recipe = %session.recipe_id,
                session_id = %session.session_id,
                "Session started"
            ),
            StationEvent::SessionCompleted(session) => tracing::info!(
                recipe = %session.recipe_id,
                final_weight = ?session.final_weight,
                classification = ?session.classification,
                "Session completed"
            ),
            StationEvent::SessionCancelled { recipe_id } => {
                tracing::info!(recipe = ?recipe_id, "Session cancelled")
            }
            StationEvent::SessionError { message } => {
                tracing::warn!(%message, "Session error")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use shared::models::PrinterStatus;

    fn status(status: PrinterStatus) -> StationEvent {
        StationEvent::PrinterStatusChanged {
            status,
            queue_len: 0,
        }
    }

    #[test]
    fn test_delivery_in_registration_order() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let log = Arc::clone(&log);
            bus.add_subscriber(Arc::new(move |_: &StationEvent| log.lock().push(tag)));
        }

        bus.publish(status(PrinterStatus::Receiving));
        assert_eq!(*log.lock(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_events_arrive_in_publish_order() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        bus.add_subscriber(Arc::new(move |e: &StationEvent| {
            if let StationEvent::PrinterStatusChanged { status, .. } = e {
                sink.lock().push(*status);
            }
        }));

        bus.publish(status(PrinterStatus::Receiving));
        bus.publish(status(PrinterStatus::Processing));
        bus.publish(status(PrinterStatus::Idle));

        assert_eq!(
            *seen.lock(),
            vec![
                PrinterStatus::Receiving,
                PrinterStatus::Processing,
                PrinterStatus::Idle
            ]
        );
    }

    #[test]
    fn test_remove_subscriber() {
        let bus = EventBus::new();
        let count = Arc::new(AtomicU64::new(0));
        let c = Arc::clone(&count);
        let id = bus.add_subscriber(Arc::new(move |_: &StationEvent| {
            c.fetch_add(1, Ordering::SeqCst);
        }));

        bus.publish(status(PrinterStatus::Idle));
        assert!(bus.remove_subscriber(id));
        assert!(!bus.remove_subscriber(id));
        bus.publish(status(PrinterStatus::Idle));

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_publish_without_receivers() {
        let bus = EventBus::new();
        bus.add_subscriber(Arc::new(LoggingSubscriber));
        bus.publish(StationEvent::session_error("nothing listens"));
    }

    #[tokio::test]
    async fn test_broadcast_bridge() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        bus.publish(status(PrinterStatus::Error));

        match rx.recv().await.unwrap() {
            StationEvent::PrinterStatusChanged { status, .. } => {
                assert_eq!(status, PrinterStatus::Error)
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
