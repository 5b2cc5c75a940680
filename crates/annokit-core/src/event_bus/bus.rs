//! Event Bus implementation.
//!
//! Synchronous handlers are invoked after the handler table lock is
//! released, so a handler may subscribe, unsubscribe or publish on the same
//! bus. Callers that publish while holding their own locks still block any
//! handler that takes those locks; collect events and publish after
//! releasing them (see [`EventBus::publish_all`]).

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use uuid::Uuid;

use super::events::{AppEvent, EventCategory};

/// Default broadcast channel capacity.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Subscription handle for unsubscribing from events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Filter to receive only specific event types
#[derive(Debug, Clone, Default)]
pub enum EventFilter {
    /// Receive all events.
    #[default]
    All,
    /// Receive events matching any of these categories.
    Categories(Vec<EventCategory>),
}

impl EventFilter {
    /// Check if an event matches this filter
    pub fn matches(&self, event: &AppEvent) -> bool {
        match self {
            EventFilter::All => true,
            EventFilter::Categories(categories) => categories.contains(&event.category()),
        }
    }
}

type EventHandler = Arc<dyn Fn(AppEvent) + Send + Sync>;

/// Error types for event bus operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum EventBusError {
    /// No subscribers are listening
    #[error("No active subscribers")]
    NoSubscribers,
}

/// Event bus for distributing shape, cache, sync and notification events
pub struct EventBus {
    sender: broadcast::Sender<AppEvent>,
    handlers: RwLock<HashMap<SubscriptionId, (EventFilter, EventHandler)>>,
}

impl EventBus {
    /// Create a new event bus with the default channel capacity
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a new event bus whose async receivers lag after `capacity`
    /// unread events
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            handlers: RwLock::new(HashMap::new()),
        }
    }

    /// Publish an event to all subscribers
    ///
    /// Synchronous handlers run on the calling thread before the event is
    /// broadcast to async receivers. Returns the number of async receivers,
    /// or `NoSubscribers` when nobody at all is listening.
    pub fn publish(&self, event: AppEvent) -> Result<usize, EventBusError> {
        let matching: Vec<EventHandler> = self
            .handlers
            .read()
            .values()
            .filter(|(filter, _)| filter.matches(&event))
            .map(|(_, handler)| handler.clone())
            .collect();
        let handled = !matching.is_empty();

        for handler in matching {
            handler(event.clone());
        }

        match self.sender.send(event) {
            Ok(count) => Ok(count),
            Err(_) if handled => Ok(0),
            Err(_) => Err(EventBusError::NoSubscribers),
        }
    }

    /// Publish an event, ignoring the case where nobody listens
    pub fn emit(&self, event: AppEvent) {
        tracing::trace!(event = %event.description(), "emit");
        let _ = self.publish(event);
    }

    /// Emit a batch of events in order
    pub fn publish_all(&self, events: impl IntoIterator<Item = AppEvent>) {
        for event in events {
            self.emit(event);
        }
    }

    /// Subscribe to events with a synchronous handler
    ///
    /// The handler runs on the publishing thread.
    pub fn subscribe<F>(&self, filter: EventFilter, handler: F) -> SubscriptionId
    where
        F: Fn(AppEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId::new();
        self.handlers.write().insert(id, (filter, Arc::new(handler)));
        tracing::debug!(subscription = ?id, "subscribed");
        id
    }

    /// Get a receiver for polling events from a tokio task
    pub fn receiver(&self) -> broadcast::Receiver<AppEvent> {
        self.sender.subscribe()
    }

    /// Unsubscribe from events
    ///
    /// Returns true if the subscription was found and removed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let removed = self.handlers.write().remove(&id).is_some();
        if removed {
            tracing::debug!(subscription = ?id, "unsubscribed");
        }
        removed
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.handlers.read().len())
            .field("receivers", &self.sender.receiver_count())
            .finish()
    }
}
