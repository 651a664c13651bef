//! Outbound event port for messaging and audit collaborators.

use crate::domain::models::CoreEvent;

/// Receives core events. Publishing must never block the caller.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: CoreEvent);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn publish(&self, _event: CoreEvent) {}
}
