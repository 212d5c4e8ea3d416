//! Event dispatch for Knocki WebSocket events
//!
//! Two ways to consume events:
//! - callbacks registered per [`EventType`], removed again by [`ListenerId`]
//! - broadcast receivers, per event type or for all events

use dashmap::DashMap;
use knocki_core::{Event, EventType};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, trace};

/// Default channel capacity for event subscriptions
const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// A unique identifier for a registered callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

/// Callback invoked for each matching event
pub type Callback = Arc<dyn Fn(&Event) + Send + Sync>;

struct Listener {
    event_type: EventType,
    callback: Callback,
}

/// Fan-out of received events
pub struct EventBus {
    /// Registered callbacks
    listeners: DashMap<ListenerId, Listener>,
    /// Broadcast senders per event type
    channels: DashMap<EventType, broadcast::Sender<Event>>,
    /// Sender for subscribers of every event type
    match_all_sender: broadcast::Sender<Event>,
    next_listener_id: AtomicU64,
    capacity: usize,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a new event bus with specified channel capacity
    pub fn with_capacity(capacity: usize) -> Self {
        let (match_all_sender, _) = broadcast::channel(capacity);
        Self {
            listeners: DashMap::new(),
            channels: DashMap::new(),
            match_all_sender,
            next_listener_id: AtomicU64::new(1),
            capacity,
        }
    }

    /// Register a callback for one event type
    pub fn register_listener<F>(&self, event_type: EventType, callback: F) -> ListenerId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_listener_id.fetch_add(1, Ordering::SeqCst));
        debug!(event_type = %event_type, listener = id.0, "Registering listener");
        self.listeners.insert(
            id,
            Listener {
                event_type,
                callback: Arc::new(callback),
            },
        );
        id
    }

    /// Remove a callback. Returns false if it was already gone.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.listeners.remove(&id).is_some()
    }

    /// Subscribe to events of a specific type
    pub fn subscribe(&self, event_type: EventType) -> broadcast::Receiver<Event> {
        trace!(event_type = %event_type, "Subscribing to event type");
        self.channels
            .entry(event_type)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Subscribe to all events
    pub fn subscribe_all(&self) -> broadcast::Receiver<Event> {
        self.match_all_sender.subscribe()
    }

    /// Deliver an event to matching callbacks and subscribers
    pub fn fire(&self, event: Event) {
        let event_type = event.event_type();
        debug!(event_type = %event_type, device = %event.payload.device_id, "Firing event");

        // Collected first so a callback may register or remove listeners
        // without contending on the map shard it is iterating.
        let mut matching: Vec<(ListenerId, Callback)> = self
            .listeners
            .iter()
            .filter(|entry| entry.event_type == event_type)
            .map(|entry| (*entry.key(), entry.callback.clone()))
            .collect();
        matching.sort_by_key(|(id, _)| *id);

        for (id, callback) in matching {
            trace!(listener = id.0, "Invoking listener");
            callback(&event);
        }

        if let Some(sender) = self.channels.get(&event_type) {
            // Send errors only mean there are no receivers
            let _ = sender.send(event.clone());
        }
        let _ = self.match_all_sender.send(event);
    }

    /// Number of registered callbacks
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
