//! Broadcast event bus.
//!
//! Fans core events out to any number of in-process subscribers (audit
//! writers, notifiers, the CLI's `run` loop). Publishing never blocks: a
//! subscriber that falls behind loses the oldest events and sees a
//! `RecvError::Lagged` on its next receive.

use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;

use crate::domain::models::{CoreEvent, EventEnvelope};
use crate::domain::ports::EventSink;

/// Configuration for the event bus.
#[derive(Debug, Clone)]
pub struct EventBusConfig {
    /// Channel capacity for the broadcast channel.
    pub channel_capacity: usize,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self { channel_capacity: 1024 }
    }
}

/// [`EventSink`] backed by a tokio broadcast channel.
pub struct BroadcastEventSink {
    sender: broadcast::Sender<EventEnvelope>,
    published: AtomicU64,
}

impl BroadcastEventSink {
    pub fn new(config: EventBusConfig) -> Self {
        let (sender, _) = broadcast::channel(config.channel_capacity.max(1));
        Self {
            sender,
            published: AtomicU64::new(0),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Total events published since creation, delivered or not.
    pub fn published_count(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }
}

impl Default for BroadcastEventSink {
    fn default() -> Self {
        Self::new(EventBusConfig::default())
    }
}

impl EventSink for BroadcastEventSink {
    fn publish(&self, event: CoreEvent) {
        self.published.fetch_add(1, Ordering::Relaxed);
        // No subscribers is not an error.
        let _ = self.sender.send(EventEnvelope::now(event));
    }
}
