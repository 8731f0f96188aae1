use serde::{Deserialize, Serialize};

/// Emitted after a transaction commits that wrote one or more webhook outbox rows.
///
/// Subscribers use this as a latency hint to drain the outbox immediately instead of
/// waiting for the next timer tick. Delivery does not depend on the event arriving:
/// the outbox row is the durable record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationQueuedEvent {
    pub event: String,
}

impl NotificationQueuedEvent {
    pub fn new<S: Into<String>>(event: S) -> Self {
        Self { event: event.into() }
    }
}
